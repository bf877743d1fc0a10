//! The single-file façade.
//!
//! [`BasicFile`] ties the pieces together: it consults the metadata cache before
//! touching storage, asks the handle lifecycle for a live descriptor when I/O is
//! needed, and routes flushes through the flush coordinator.

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use tracing::{debug, trace, warn};

use super::buffered::BufferedStream;
use super::entry::DirEntry;
use super::flush::FlushCoordinator;
use super::handle::{AccessMode, HandleLifecycle};
use super::identity::FileIdentity;
use super::metadata::{MetadataCache, MetadataSnapshot};
use crate::core::{FileReader, FileWriter, MetadataProvider, PathOps, PlatformOps, Result, UnixOps};
use crate::error::{ErrorObserver, FileError};
use crate::options::FileOptions;

/// A lazily opened file with cached metadata and a lock-guarded flush.
///
/// Construction never touches storage: the descriptor is opened on first I/O and
/// released again by [`flush`](Self::flush), [`close`](Self::close),
/// [`remove`](UnixOps::remove) or [`rename`](PlatformOps::rename). Any later
/// operation reopens it transparently.
///
/// ### Example:
/// ```no_run
/// use file_kit::{BasicFile, FileReader, FileWriter};
///
/// let mut file = BasicFile::new("/tmp/a.txt").unwrap();
/// file.create().unwrap();
/// file.write_str("hello").unwrap();
/// file.flush().unwrap();
///
/// file.open().unwrap();
/// assert_eq!(file.read_to_end().unwrap(), b"hello");
/// ```
pub struct BasicFile {
    identity: FileIdentity,
    options: FileOptions,
    handle: HandleLifecycle,
    metadata: MetadataCache,
    flush: FlushCoordinator,
    observer: Option<Arc<dyn ErrorObserver>>,
    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
    unflushed: bool,
    /// Makes every sync attempt of `flush` fail with this kind.
    #[cfg(test)]
    sync_fault: Option<std::io::ErrorKind>,
}

impl BasicFile {
    /// Creates a handle for `name` with default options. Only resolves the path.
    pub fn new<P: AsRef<Path>>(name: P) -> Result<Self> {
        Self::with_options(name, FileOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(name: P, options: FileOptions) -> Result<Self> {
        Ok(Self {
            identity: FileIdentity::new(name)?,
            options,
            handle: HandleLifecycle::new(),
            metadata: MetadataCache::new(),
            flush: FlushCoordinator::new(),
            observer: None,
            read_deadline: None,
            write_deadline: None,
            unflushed: false,
            #[cfg(test)]
            sync_fault: None,
        })
    }

    /// Attaches an observer that sees every error this handle returns.
    pub fn with_observer(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(&self) -> &FileOptions {
        &self.options
    }

    /// Opens the existing file for reading, unless a usable descriptor is already held.
    pub fn open(&mut self) -> Result<()> {
        let result = self
            .handle
            .ensure_open(&self.identity, AccessMode::ReadOnly, &self.options)
            .map(|_| ());
        self.observed("open", result)
    }

    /// Creates the file, or truncates it if it exists, and keeps it open read-write.
    pub fn create(&mut self) -> Result<()> {
        let result = self
            .handle
            .create(&self.identity, &self.options)
            .map(|_| ());
        if result.is_ok() {
            self.metadata.clear();
            self.unflushed = false;
        }
        self.observed("create", result)
    }

    /// Creates the file and keeps it open read-write. Fails if it already exists.
    pub fn create_new(&mut self) -> Result<()> {
        let result = self
            .handle
            .create_new(&self.identity, &self.options)
            .map(|_| ());
        if result.is_ok() {
            self.metadata.clear();
            self.unflushed = false;
        }
        self.observed("create", result)
    }

    /// Releases the descriptor without syncing. Metadata is kept but marked dirty.
    pub fn close(&mut self) {
        if self.handle.close().is_some() {
            trace!(path = %self.identity.absolute().display(), "closed");
        }
        self.metadata.invalidate();
    }

    /// Syncs pending data, releases the descriptor and clears the metadata cache.
    ///
    /// Fails with [`FileError::Locked`] if another flush of this file is running and
    /// with [`FileError::Sync`] once the retry policy is exhausted. In the latter
    /// case the descriptor is kept so the flush can be retried.
    pub fn flush(&mut self) -> Result<()> {
        let result = self.flush_inner();
        self.observed("flush", result)
    }

    fn flush_inner(&mut self) -> Result<()> {
        let path = self.identity.absolute();
        let guard = self.flush.try_begin(path)?;

        if let Some(file) = self.handle.file() {
            let sync = || {
                #[cfg(test)]
                if let Some(kind) = self.sync_fault {
                    return Err(std::io::Error::from(kind));
                }
                file.sync_all()
            };
            if let Err(err) = guard.sync_with_retry(path, &self.options.retry, sync) {
                self.metadata.invalidate();
                return Err(err);
            }
        }

        // dropping the descriptor closes it; std gives no close error to log
        drop(self.handle.close());
        self.metadata.clear();
        self.unflushed = false;
        let at = guard.complete();
        debug!(path = %path.display(), ?at, "flushed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Time of the last successful flush.
    pub fn last_flushed(&self) -> Option<SystemTime> {
        self.flush.last_flush()
    }

    /// True when data was written since the last flush (or create).
    pub fn has_unflushed_writes(&self) -> bool {
        self.unflushed
    }

    /// Marks cached metadata untrusted; the next `stat` re-queries storage.
    pub fn invalidate(&mut self) {
        self.metadata.invalidate();
    }

    /// Marks the descriptor stale (forcing a reopen on next access) and invalidates
    /// cached metadata.
    pub fn mark_stale(&mut self) {
        self.handle.mark_stale();
        self.metadata.invalidate();
    }

    /// The last snapshot that was successfully queried, even if it is stale.
    pub fn cached_metadata(&self) -> Option<&MetadataSnapshot> {
        self.metadata.cached()
    }

    /// Buffered read-write stream over the live descriptor.
    ///
    /// The descriptor is marked stale, so the next direct operation after the stream
    /// is gone starts from a fresh descriptor at offset zero.
    pub fn buffered(&mut self) -> Result<BufferedStream<'_>> {
        self.metadata.invalidate();
        match self.handle.lend(&self.identity, &self.options) {
            Ok(file) => {
                self.unflushed = true;
                Ok(BufferedStream::new(
                    file,
                    self.identity.absolute(),
                    self.options.buffer_size,
                ))
            }
            Err(err) => {
                if let Some(observer) = &self.observer {
                    observer.observe("buffered", &err);
                }
                Err(err)
            }
        }
    }

    /// The underlying descriptor, opened read-only if none is held.
    pub fn raw_file(&mut self) -> Result<&File> {
        match self
            .handle
            .ensure_open(&self.identity, AccessMode::ReadOnly, &self.options)
        {
            Ok(file) => Ok(&*file),
            Err(err) => {
                if let Some(observer) = &self.observer {
                    observer.observe("raw_file", &err);
                }
                Err(err)
            }
        }
    }

    pub fn dir_entry(&mut self) -> Result<DirEntry> {
        Ok(DirEntry::new(self.stat()?))
    }

    /// One-line `ls`-like description: mode and name.
    pub fn describe(&mut self) -> Result<String> {
        let mode = self.mode()?;
        Ok(format!("{:>10} {:>15}", mode, self.name()))
    }

    /// The absolute path with every symlink resolved. The file must exist.
    pub fn real_path(&self) -> Result<PathBuf> {
        let path = self.identity.absolute();
        let result = std::fs::canonicalize(path).map_err(|source| FileError::Path {
            path: path.to_path_buf(),
            source,
        });
        self.observed("real_path", result)
    }

    fn observed<T>(&self, op: &'static str, result: Result<T>) -> Result<T> {
        if let (Err(err), Some(observer)) = (&result, &self.observer) {
            observer.observe(op, err);
        }
        result
    }

    fn io_err(&self, op: &'static str) -> impl FnOnce(std::io::Error) -> FileError + '_ {
        move |source| FileError::io(op, self.identity.absolute(), source)
    }
}

fn check_deadline(deadline: Option<Instant>, op: &'static str, path: &Path) -> Result<()> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(FileError::Timeout {
            op,
            path: path.to_path_buf(),
        }),
        _ => Ok(()),
    }
}

impl fmt::Debug for BasicFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicFile")
            .field("identity", &self.identity)
            .field("open", &self.handle.is_open())
            .field("unflushed", &self.unflushed)
            .finish_non_exhaustive()
    }
}

impl Drop for BasicFile {
    fn drop(&mut self) {
        if !self.unflushed {
            return;
        }
        if let Some(file) = self.handle.file() {
            if let Err(e) = file.sync_all() {
                warn!(
                    path = %self.identity.absolute().display(),
                    error = %e,
                    "sync on drop failed"
                );
            }
        }
    }
}

impl BasicFile {
    fn read_inner(&mut self, buf: &mut [u8]) -> Result<usize> {
        check_deadline(self.read_deadline, "read", self.identity.absolute())?;
        let file = self
            .handle
            .ensure_open(&self.identity, AccessMode::ReadOnly, &self.options)?;
        file.read(buf)
            .map_err(|source| FileError::io("read", self.identity.absolute(), source))
    }

    fn read_to_end_inner(&mut self) -> Result<Vec<u8>> {
        check_deadline(self.read_deadline, "read", self.identity.absolute())?;
        let file = self
            .handle
            .ensure_open(&self.identity, AccessMode::ReadOnly, &self.options)?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|source| FileError::io("read", self.identity.absolute(), source))?;
        Ok(content)
    }

    fn write_inner(&mut self, buf: &[u8]) -> Result<usize> {
        check_deadline(self.write_deadline, "write", self.identity.absolute())?;
        let file = self
            .handle
            .ensure_open(&self.identity, AccessMode::ReadWrite, &self.options)?;
        let n = file
            .write(buf)
            .map_err(|source| FileError::io("write", self.identity.absolute(), source))?;
        self.metadata.invalidate();
        self.unflushed = true;
        Ok(n)
    }
}

impl FileReader for BasicFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let result = self.read_inner(buf);
        self.observed("read", result)
    }

    fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let result = self.read_to_end_inner();
        self.observed("read", result)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let result = self
            .handle
            .ensure_open(&self.identity, AccessMode::ReadOnly, &self.options)
            .and_then(|file| {
                file.seek(pos)
                    .map_err(|source| FileError::io("seek", self.identity.absolute(), source))
            });
        self.observed("seek", result)
    }
}

impl FileWriter for BasicFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let result = self.write_inner(buf);
        self.observed("write", result)
    }

    fn sync(&mut self) -> Result<()> {
        let path = self.identity.absolute();
        let result = match self.handle.file() {
            Some(file) => file.sync_all().map_err(|source| FileError::Sync {
                path: path.to_path_buf(),
                attempts: 1,
                source,
            }),
            None => Ok(()),
        };
        self.metadata.invalidate();
        self.observed("sync", result)
    }
}

impl MetadataProvider for BasicFile {
    fn stat(&mut self) -> Result<MetadataSnapshot> {
        let result = self.metadata.stat(&self.identity, false);
        self.observed("stat", result)
    }

    fn refresh(&mut self) -> Result<MetadataSnapshot> {
        let result = self.metadata.stat(&self.identity, true);
        self.observed("stat", result)
    }
}

impl PathOps for BasicFile {
    fn identity(&self) -> &FileIdentity {
        &self.identity
    }
}

impl PlatformOps for BasicFile {
    fn chmod(&mut self, mode: u32) -> Result<()> {
        let path = self.identity.absolute();
        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            std::fs::Permissions::from_mode(mode)
        };
        #[cfg(not(unix))]
        let permissions = {
            let mut permissions = std::fs::metadata(path).map_err(self.io_err("chmod"))?.permissions();
            permissions.set_readonly(mode & 0o222 == 0);
            permissions
        };
        let result = std::fs::set_permissions(path, permissions).map_err(self.io_err("chmod"));
        self.metadata.invalidate();
        self.observed("chmod", result)
    }

    fn chown(&mut self, uid: u32, gid: u32) -> Result<()> {
        #[cfg(unix)]
        let result = std::os::unix::fs::chown(self.identity.absolute(), Some(uid), Some(gid))
            .map_err(self.io_err("chown"));
        #[cfg(not(unix))]
        let result = {
            let _ = (uid, gid);
            Err(FileError::NotImplemented("chown"))
        };
        self.metadata.invalidate();
        self.observed("chown", result)
    }

    fn rename<P: AsRef<Path>>(&mut self, new_path: P) -> Result<()> {
        drop(self.handle.close());
        self.metadata.clear();
        let from = self.identity.absolute();
        let to = new_path.as_ref();
        let result = std::fs::rename(from, to).map_err(self.io_err("rename"));
        if result.is_ok() {
            self.unflushed = false;
            debug!(from = %from.display(), to = %to.display(), "renamed");
        }
        self.observed("rename", result)
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) {
        self.read_deadline = deadline;
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) {
        self.write_deadline = deadline;
    }
}

impl UnixOps for BasicFile {
    fn fd(&mut self) -> Result<i32> {
        #[cfg(unix)]
        {
            use std::os::fd::AsRawFd;
            let result = self
                .handle
                .ensure_open(&self.identity, AccessMode::ReadOnly, &self.options)
                .map(|file| file.as_raw_fd());
            self.observed("fd", result)
        }
        #[cfg(not(unix))]
        {
            self.observed("fd", Err(FileError::NotImplemented("fd")))
        }
    }

    fn link<P: AsRef<Path>>(&self, new_name: P) -> Result<()> {
        let result =
            std::fs::hard_link(self.identity.absolute(), new_name).map_err(self.io_err("link"));
        self.observed("link", result)
    }

    fn readlink(&self) -> Result<PathBuf> {
        let result = std::fs::read_link(self.identity.absolute()).map_err(self.io_err("readlink"));
        self.observed("readlink", result)
    }

    fn symlink<P: AsRef<Path>>(&self, new_name: P) -> Result<()> {
        #[cfg(unix)]
        let result = std::os::unix::fs::symlink(self.identity.absolute(), new_name)
            .map_err(self.io_err("symlink"));
        #[cfg(not(unix))]
        let result = {
            let _ = new_name;
            Err(FileError::NotImplemented("symlink"))
        };
        self.observed("symlink", result)
    }

    fn remove(&mut self) -> Result<()> {
        drop(self.handle.close());
        self.metadata.clear();
        self.unflushed = false;

        let path = self.identity.absolute();
        let result = std::fs::symlink_metadata(path)
            .and_then(|meta| {
                if meta.is_dir() {
                    std::fs::remove_dir(path)
                } else {
                    std::fs::remove_file(path)
                }
            })
            .map_err(self.io_err("remove"));
        if result.is_ok() {
            debug!(path = %path.display(), "removed");
        }
        self.observed("remove", result)
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        let result = self
            .handle
            .ensure_open(&self.identity, AccessMode::ReadWrite, &self.options)
            .and_then(|file| {
                file.set_len(size)
                    .map_err(|source| FileError::io("truncate", self.identity.absolute(), source))
            });
        self.metadata.invalidate();
        if result.is_ok() {
            self.unflushed = true;
        }
        self.observed("truncate", result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::options::RetryPolicy;
    use tempdir::TempDir;

    /// Remembers every operation name it observes.
    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<&'static str>>,
    }

    impl ErrorObserver for RecordingObserver {
        fn observe(&self, op: &'static str, _err: &FileError) {
            self.seen.lock().unwrap().push(op);
        }
    }

    fn setup_test_env() -> TempDir {
        TempDir::new("basic_file_test").unwrap()
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn test_new_does_not_touch_storage() {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("never.txt");

            let file = BasicFile::new(&path).unwrap();

            assert!(!file.is_open());
            assert!(!path.exists());
            assert_eq!(file.abs(), path.as_path());
        }

        #[test]
        fn test_new_empty_name_fails() {
            assert!(matches!(BasicFile::new(""), Err(FileError::Path { .. })));
        }

        #[test]
        fn test_create_write_flush_reopen_read() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            let mut file = BasicFile::new(&path)?;

            file.create()?;
            file.write_str("hello")?;
            assert!(file.has_unflushed_writes());
            file.flush()?;

            assert!(!file.is_open());
            assert!(!file.has_unflushed_writes());
            assert!(file.last_flushed().is_some());

            file.open()?;
            assert_eq!(file.read_to_end()?, b"hello");
            Ok(())
        }

        #[test]
        fn test_read_reopens_transparently_after_flush() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            let mut file = BasicFile::new(&path)?;

            file.create()?;
            file.write(b"abc")?;
            file.flush()?;

            let mut buf = [0u8; 3];
            let n = file.read(&mut buf)?;
            assert_eq!(&buf[..n], b"abc");
            assert!(file.is_open());
            Ok(())
        }

        #[test]
        fn test_flush_twice_in_a_row() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let mut file = BasicFile::new(temp_dir.path().join("a.txt"))?;
            file.create()?;
            file.write(b"1")?;

            file.flush()?;
            let first = file.last_flushed();
            std::thread::sleep(Duration::from_millis(5));
            file.flush()?;

            assert!(file.last_flushed() > first);
            Ok(())
        }

        #[test]
        fn test_failed_sync_keeps_descriptor_and_releases_lock() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            let retry = RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(1),
            };
            let mut file = BasicFile::with_options(&path, FileOptions::default().with_retry(retry))?;
            file.create()?;
            file.write_str("hello")?;
            assert_eq!(file.size()?, 5);

            file.sync_fault = Some(std::io::ErrorKind::Other);
            let err = file.flush().unwrap_err();

            assert!(matches!(err, FileError::Sync { attempts: 2, .. }));
            assert!(file.is_open());
            assert!(file.has_unflushed_writes());
            assert!(file.last_flushed().is_none());

            // metadata was invalidated, so an external append is seen
            std::fs::OpenOptions::new()
                .append(true)
                .open(&path)?
                .write_all(b"!!")?;
            assert_eq!(file.size()?, 7);

            // the lock was released, so a retry goes through
            file.sync_fault = None;
            file.flush()?;
            assert!(!file.is_open());
            assert!(file.last_flushed().is_some());
            assert_eq!(std::fs::read(&path)?, b"hello!!");
            Ok(())
        }

        #[test]
        fn test_flush_without_descriptor_is_ok() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let mut file = BasicFile::new(temp_dir.path().join("never-opened.txt"))?;

            file.flush()?;
            assert!(file.last_flushed().is_some());
            Ok(())
        }

        #[test]
        fn test_open_missing_file_fails_closed() {
            let temp_dir = setup_test_env();
            let mut file = BasicFile::new(temp_dir.path().join("missing.txt")).unwrap();

            let err = file.open().unwrap_err();

            assert!(err.is_not_found());
            assert!(!file.is_open());
        }

        #[test]
        fn test_write_does_not_create_file() {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("missing.txt");
            let mut file = BasicFile::new(&path).unwrap();

            let err = file.write(b"data").unwrap_err();

            assert!(matches!(err, FileError::Open { .. }));
            assert!(!path.exists());
            assert!(!file.has_unflushed_writes());
        }

        #[test]
        fn test_write_after_open_upgrades_descriptor() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"0123456789")?;
            let mut file = BasicFile::new(&path)?;

            file.open()?;
            let mut buf = [0u8; 4];
            file.read(&mut buf)?;
            file.write(b"XY")?;
            file.flush()?;

            assert_eq!(std::fs::read(&path)?, b"0123XY6789");
            Ok(())
        }

        #[test]
        fn test_close_keeps_data_and_allows_reopen() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            let mut file = BasicFile::new(&path)?;
            file.create()?;
            file.write(b"kept")?;

            file.close();
            assert!(!file.is_open());

            assert_eq!(file.read_to_end()?, b"kept");
            Ok(())
        }

        #[test]
        fn test_seek_and_read() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"hello world")?;
            let mut file = BasicFile::new(&path)?;

            assert_eq!(file.seek(SeekFrom::Start(6))?, 6);
            assert_eq!(file.read_to_end()?, b"world");
            Ok(())
        }

        #[test]
        fn test_sync_on_closed_file_is_noop() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let mut file = BasicFile::new(temp_dir.path().join("a.txt"))?;
            file.sync()?;
            assert!(!file.is_open());
            Ok(())
        }

        #[test]
        fn test_drop_with_unflushed_writes_keeps_data() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            {
                let mut file = BasicFile::new(&path)?;
                file.create()?;
                file.write(b"not flushed")?;
            }
            assert_eq!(std::fs::read(&path)?, b"not flushed");
            Ok(())
        }
    }

    mod metadata {
        use super::*;

        #[test]
        fn test_stat_twice_is_identical() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"12345")?;
            let mut file = BasicFile::new(&path)?;

            let first = file.stat()?;
            let second = file.stat()?;

            assert_eq!(first, second);
            assert_eq!(first.size(), 5);
            assert_eq!(file.size()?, 5);
            assert!(file.is_regular()?);
            assert!(!file.is_dir()?);
            Ok(())
        }

        #[test]
        fn test_stat_does_not_see_external_change_until_invalidated() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"12345")?;
            let mut file = BasicFile::new(&path)?;

            let t0 = file.mod_time()?;
            assert_eq!(file.size()?, 5);

            // external tool rewrites the file
            std::fs::write(&path, b"1234567890")?;
            std::fs::File::options()
                .write(true)
                .open(&path)?
                .set_modified(t0 + Duration::from_secs(10))?;

            assert_eq!(file.size()?, 5); // still cached

            file.invalidate();
            assert_eq!(file.size()?, 10);
            assert!(file.mod_time()? > t0);
            Ok(())
        }

        #[test]
        fn test_write_invalidates_snapshot() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let mut file = BasicFile::new(temp_dir.path().join("a.txt"))?;
            file.create()?;
            assert_eq!(file.size()?, 0);

            file.write(b"grow")?;

            assert_eq!(file.size()?, 4);
            Ok(())
        }

        #[test]
        fn test_flush_clears_snapshot() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let mut file = BasicFile::new(temp_dir.path().join("a.txt"))?;
            file.create()?;
            file.stat()?;
            assert!(file.cached_metadata().is_some());

            file.flush()?;

            assert!(file.cached_metadata().is_none());
            Ok(())
        }

        #[test]
        fn test_failed_stat_keeps_stale_snapshot() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"abc")?;
            let mut file = BasicFile::new(&path)?;
            let before = file.stat()?;

            std::fs::remove_file(&path)?;
            let err = file.refresh().unwrap_err();

            assert!(err.is_not_found());
            assert_eq!(file.cached_metadata(), Some(&before));
            Ok(())
        }

        #[cfg(unix)]
        #[test]
        fn test_perm_mode_and_describe() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let mut file = BasicFile::new(temp_dir.path().join("a.txt"))?;
            file.create()?;

            file.chmod(0o640)?;

            assert_eq!(file.perm()?, 0o640);
            assert!(file.mode()?.is_regular());
            assert!(file.sys()?.is_some());
            let line = file.describe()?;
            assert!(line.contains("-rw-r-----"));
            assert!(line.ends_with("a.txt"));
            Ok(())
        }

        #[test]
        fn test_dir_entry() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let mut dir = BasicFile::new(temp_dir.path())?;

            let entry = dir.dir_entry()?;

            assert!(entry.is_dir());
            assert_eq!(entry.name(), dir.name());
            Ok(())
        }
    }

    mod paths {
        use super::*;

        #[test]
        fn test_path_ops() {
            let file = BasicFile::new("/var/data/../log/app.log").unwrap();

            assert_eq!(file.abs(), Path::new("/var/log/app.log"));
            assert_eq!(file.identity().provided(), Path::new("/var/data/../log/app.log"));
            assert_eq!(file.name(), "app.log");
            assert_eq!(file.base(), "app.log");
            assert_eq!(file.dir(), "/var/log");
            assert_eq!(file.ext(), ".log");
            assert_eq!(
                file.split(),
                ("/var/log/".to_string(), "app.log".to_string())
            );
        }

        #[cfg(unix)]
        #[test]
        fn test_real_path_follows_symlink() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let target = temp_dir.path().join("target.txt");
            std::fs::write(&target, b"x")?;
            let link = temp_dir.path().join("link.txt");
            std::os::unix::fs::symlink(&target, &link)?;

            let file = BasicFile::new(&link)?;

            assert_eq!(file.real_path()?, std::fs::canonicalize(&target)?);
            assert_eq!(file.readlink()?, target);
            Ok(())
        }
    }

    mod platform {
        use super::*;

        #[test]
        fn test_remove_open_file() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("b.txt");
            let mut file = BasicFile::new(&path)?;
            file.create()?;
            file.write(b"bye")?;
            file.stat()?;

            file.remove()?;

            assert!(!file.is_open());
            assert!(!path.exists());
            assert!(file.stat().unwrap_err().is_not_found());
            assert!(file.open().unwrap_err().is_not_found());
            Ok(())
        }

        #[test]
        fn test_remove_missing_file_fails() {
            let temp_dir = setup_test_env();
            let mut file = BasicFile::new(temp_dir.path().join("missing.txt")).unwrap();

            let err = file.remove().unwrap_err();
            assert!(matches!(err, FileError::Io { op: "remove", .. }));
        }

        #[test]
        fn test_remove_empty_directory() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("empty");
            std::fs::create_dir(&path)?;

            BasicFile::new(&path)?.remove()?;

            assert!(!path.exists());
            Ok(())
        }

        #[test]
        fn test_truncate() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"0123456789")?;
            let mut file = BasicFile::new(&path)?;
            assert_eq!(file.size()?, 10);

            file.truncate(4)?;

            assert_eq!(file.size()?, 4);
            file.flush()?;
            assert_eq!(std::fs::read(&path)?, b"0123");
            Ok(())
        }

        #[test]
        fn test_rename_moves_content_and_closes() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let from = temp_dir.path().join("from.txt");
            let to = temp_dir.path().join("to.txt");
            let mut file = BasicFile::new(&from)?;
            file.create()?;
            file.write(b"moving")?;

            file.rename(&to)?;

            assert!(!file.is_open());
            assert!(!from.exists());
            assert_eq!(std::fs::read(&to)?, b"moving");
            // identity stays on the old name
            assert!(file.stat().unwrap_err().is_not_found());
            Ok(())
        }

        #[test]
        fn test_link_creates_second_name() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"shared")?;
            let link = temp_dir.path().join("b.txt");

            BasicFile::new(&path)?.link(&link)?;

            assert_eq!(std::fs::read(&link)?, b"shared");
            Ok(())
        }

        #[cfg(unix)]
        #[test]
        fn test_symlink_and_fd() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"x")?;
            let link = temp_dir.path().join("a.link");
            let mut file = BasicFile::new(&path)?;

            file.symlink(&link)?;
            assert_eq!(std::fs::read_link(&link)?, path);

            let fd = file.fd()?;
            assert!(fd >= 0);
            assert!(file.is_open());
            Ok(())
        }

        #[test]
        fn test_expired_read_deadline_times_out_without_opening() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"x")?;
            let mut file = BasicFile::new(&path)?;

            file.set_read_deadline(Some(Instant::now()));
            let err = file.read_to_end().unwrap_err();

            assert!(err.is_timeout());
            assert!(!file.is_open());

            file.set_deadline(None);
            assert_eq!(file.read_to_end()?, b"x");
            Ok(())
        }

        #[test]
        fn test_write_deadline_in_future_allows_write() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let mut file = BasicFile::new(temp_dir.path().join("a.txt"))?;
            file.create()?;

            file.set_write_deadline(Some(Instant::now() + Duration::from_secs(60)));
            assert_eq!(file.write(b"in time")?, 7);

            file.set_write_deadline(Some(Instant::now()));
            assert!(file.write(b"late").unwrap_err().is_timeout());
            Ok(())
        }
    }

    mod buffered {
        use super::*;
        use std::io::Cursor;

        #[test]
        fn test_zero_buffer_size_option_still_streams() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"7 bytes")?;
            let mut options = FileOptions::default();
            options.buffer_size = 0;
            let mut file = BasicFile::with_options(&path, options)?;

            let mut sink = Vec::new();
            let n = file.buffered()?.write_all_to(&mut sink)?;

            assert_eq!(n, 7);
            assert_eq!(sink, b"7 bytes");
            Ok(())
        }

        #[test]
        fn test_buffered_round_trip() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            let options = FileOptions::default().with_buffer_size(8);
            let mut file = BasicFile::with_options(&path, options)?;
            file.create()?;

            {
                let mut stream = file.buffered()?;
                let n = stream.read_all_from(&mut Cursor::new(b"streamed content".to_vec()))?;
                assert_eq!(n, 16);
                stream.finish()?;
            }
            file.flush()?;

            let mut sink = Vec::new();
            let n = file.buffered()?.write_all_to(&mut sink)?;
            assert_eq!(n, 16);
            assert_eq!(sink, b"streamed content");
            Ok(())
        }

        #[test]
        fn test_buffered_marks_stale_and_dirty() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"abc")?;
            let mut file = BasicFile::new(&path)?;

            {
                let mut stream = file.buffered()?;
                stream.write_all(b"XYZW")?;
            }

            assert!(file.has_unflushed_writes());
            // the next direct read starts on a fresh descriptor
            assert_eq!(file.read_to_end()?, b"XYZW");
            Ok(())
        }
    }

    mod observer {
        use super::*;

        #[test]
        fn test_observer_sees_errors_and_caller_still_gets_them() {
            let temp_dir = setup_test_env();
            let observer = Arc::new(RecordingObserver::default());
            let mut file = BasicFile::new(temp_dir.path().join("missing.txt"))
                .unwrap()
                .with_observer(observer.clone());

            assert!(file.open().is_err());
            assert!(file.stat().is_err());
            assert!(file.read_to_end().is_err());

            assert_eq!(*observer.seen.lock().unwrap(), ["open", "stat", "read"]);
        }

        #[test]
        fn test_observer_quiet_on_success() -> anyhow::Result<()> {
            let temp_dir = setup_test_env();
            let observer = Arc::new(RecordingObserver::default());
            let mut file =
                BasicFile::new(temp_dir.path().join("a.txt"))?.with_observer(observer.clone());

            file.create()?;
            file.write(b"ok")?;
            file.flush()?;

            assert!(observer.seen.lock().unwrap().is_empty());
            Ok(())
        }

        #[test]
        fn test_tracing_observer_does_not_swallow_errors() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();

            let temp_dir = setup_test_env();
            let mut file = BasicFile::with_options(
                temp_dir.path().join("missing.txt"),
                FileOptions::default().with_retry(RetryPolicy::no_retry()),
            )
            .unwrap()
            .with_observer(Arc::new(crate::error::TracingObserver));

            assert!(file.open().unwrap_err().is_not_found());
        }
    }
}
