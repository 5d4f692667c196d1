// Concurrency and resource model (spec.md §5): a POSIX advisory `flock` on
// the data file itself -- shared for readers, exclusive for writers --
// acquired via a bounded, 100ms-polling retry loop. A `<path>.lock` sentinel
// file is additionally claimed on the writer side, mirroring the oracle's
// own existence-checked mutex; it is never itself the lock target. Oracle:
// pandacage.py::_get_fcntl_lock / _blocking_file_name.

use std::fs::{self, File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use nix::fcntl::{flock, FlockArg};

use crate::error::{coldb_err, Kind as EKind};
use submerge_base::Result;

/// How long a reader will wait for a shared lock before giving up.
pub const MAX_READ_BLOCK_WAIT: Duration = Duration::from_secs(30);
/// How long a writer will wait for an exclusive lock before giving up.
pub const MAX_WRITE_BLOCK_WAIT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Holds the open data-file descriptor the `flock` is held on; the lock is
/// released when this is dropped, and the sentinel (if this guard claimed
/// one) is deleted.
pub struct LockGuard {
    _file: File,
    sentinel: Option<PathBuf>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(sentinel) = &self.sentinel {
            let _ = fs::remove_file(sentinel);
        }
    }
}

/// `<path>.lock`, created alongside (never inside) the data file itself.
pub fn sentinel_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Acquire a shared (read) lock on `path` itself, polling every 100ms up to
/// `MAX_READ_BLOCK_WAIT`. `path` must already exist.
pub fn acquire_read(path: &Path) -> Result<LockGuard> {
    let file = OpenOptions::new().read(true).open(path).map_err(submerge_base::Error::from)?;
    acquire(path, file, None, FlockArg::LockSharedNonblock, MAX_READ_BLOCK_WAIT)
}

/// Acquire an exclusive (write) lock on `path` itself, polling every 100ms
/// up to `MAX_WRITE_BLOCK_WAIT`. Creates `path` if it doesn't exist yet, and
/// claims `path`'s sentinel file as the oracle's writer-side existence
/// mutex.
pub fn acquire_write(path: &Path) -> Result<LockGuard> {
    let sentinel = sentinel_path(path);
    OpenOptions::new()
        .create(true)
        .write(true)
        .open(&sentinel)
        .map_err(submerge_base::Error::from)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .map_err(submerge_base::Error::from)?;
    acquire(path, file, Some(sentinel), FlockArg::LockExclusiveNonblock, MAX_WRITE_BLOCK_WAIT)
}

fn acquire(path: &Path, file: File, sentinel: Option<PathBuf>, arg: FlockArg, timeout: Duration) -> Result<LockGuard> {
    let start = Instant::now();
    loop {
        match flock(file.as_raw_fd(), arg) {
            Ok(()) => return Ok(LockGuard { _file: file, sentinel }),
            Err(nix::errno::Errno::EWOULDBLOCK) | Err(nix::errno::Errno::EAGAIN) => {}
            Err(e) => return Err(submerge_base::Error::from(e)),
        }
        if start.elapsed() >= timeout {
            if let Some(sentinel) = &sentinel {
                let _ = fs::remove_file(sentinel);
            }
            return Err(coldb_err(
                EKind::CouldNotAcquireLock,
                format!("timed out after {:?} waiting for a lock on {}", timeout, path.display()),
            ));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn shared_locks_can_be_held_concurrently() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, b"").unwrap();
        let a = acquire_read(&path).unwrap();
        let b = acquire_read(&path).unwrap();
        drop(a);
        drop(b);
    }

    #[test]
    fn exclusive_lock_excludes_a_second_exclusive_attempt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let _held = acquire_write(&path).unwrap();

        // A second exclusive attempt on the data file itself should find it
        // already locked while the first guard is alive.
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        let result = flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock);
        assert!(result.is_err());
    }

    #[test]
    fn write_guard_removes_the_sentinel_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let guard = acquire_write(&path).unwrap();
        let sentinel = sentinel_path(&path);
        assert!(sentinel.exists());
        drop(guard);
        assert!(!sentinel.exists());
    }

    #[test]
    fn sentinel_path_appends_lock_suffix() {
        let p = Path::new("/tmp/thing.col");
        assert_eq!(sentinel_path(p), Path::new("/tmp/thing.col.lock"));
    }
}
