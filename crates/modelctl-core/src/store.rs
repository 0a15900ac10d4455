//! Record IO shared by the registry and the monitor.
//!
//! Snapshots (`registry.json`, `metrics.json`, `alerts.json`) are rewritten
//! wholesale through a temp file in the same directory followed by an atomic
//! rename, so a crash mid-write leaves the previous content intact. The
//! outcome log is newline-delimited JSON opened in append mode.
//!
//! [`ResourceLock`] guards a read-modify-write cycle with an advisory
//! exclusive lock on a sidecar `.lock` file. It serializes writers that go
//! through this crate on the same host; writers that bypass it are not
//! covered.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fd_lock::{RwLock, RwLockWriteGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::domain::{ModelctlError, Result};

/// Advisory lock over one persisted resource.
pub struct ResourceLock {
    lock: RwLock<File>,
    path: PathBuf,
}

impl ResourceLock {
    /// Open (creating if needed) the lock file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = parent_dir(&path) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        Ok(Self {
            lock: RwLock::new(file),
            path,
        })
    }

    /// Block until the exclusive lock is held.
    pub fn exclusive(&mut self) -> Result<RwLockWriteGuard<'_, File>> {
        Ok(self.lock.write()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Run `f` while holding the exclusive lock at `lock_path`.
pub fn with_exclusive<T>(lock_path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let mut lock = ResourceLock::open(lock_path)?;
    let _guard = lock.exclusive()?;
    f()
}

/// Read a JSON snapshot, or `T::default()` if the file does not exist yet.
pub fn read_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(ModelctlError::Io(e)),
    }
}

/// Replace the file at `path` with pretty JSON, atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = parent_dir(path).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// Append one compact JSON record as a single line.
pub fn append_jsonl<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = parent_dir(path) {
        fs::create_dir_all(dir)?;
    }
    let mut line = serde_json::to_string(value)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Read every record of a JSONL file in order. A missing file is empty.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ModelctlError::Io(e)),
    };

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| ModelctlError::RecordCorrupt {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
