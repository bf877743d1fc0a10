//! Capability traits implemented by [`BasicFile`](crate::BasicFile).
//!
//! Instead of one wide interface, the surface is split into orthogonal groups:
//! reading, writing, metadata, path operations, platform operations and Unix
//! specific operations. Generic code can ask for exactly the capability it needs.

pub(crate) mod utils;

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use crate::error::FileError;
use crate::file::{FileIdentity, FileMode, MetadataSnapshot, SysInfo, identity};

pub type Result<T> = std::result::Result<T, FileError>;

/// Read access to the file content.
pub trait FileReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reads from the current position to the end of the file.
    fn read_to_end(&mut self) -> Result<Vec<u8>>;

    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;
}

/// Write access to the file content.
pub trait FileWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    fn write_str(&mut self, s: &str) -> Result<usize> {
        self.write(s.as_bytes())
    }

    /// Commits the current content of the open descriptor to stable storage.
    fn sync(&mut self) -> Result<()>;
}

/// Cached metadata access.
///
/// Every accessor goes through [`stat`](MetadataProvider::stat), so they all observe
/// the same coherent snapshot.
pub trait MetadataProvider {
    /// Returns the cached snapshot, querying storage only when needed.
    fn stat(&mut self) -> Result<MetadataSnapshot>;

    /// Queries storage unconditionally and replaces the cached snapshot.
    fn refresh(&mut self) -> Result<MetadataSnapshot>;

    fn size(&mut self) -> Result<u64> {
        Ok(self.stat()?.size())
    }

    fn mode(&mut self) -> Result<FileMode> {
        Ok(self.stat()?.mode())
    }

    fn mod_time(&mut self) -> Result<SystemTime> {
        Ok(self.stat()?.modified())
    }

    fn is_dir(&mut self) -> Result<bool> {
        Ok(self.stat()?.is_dir())
    }

    fn is_regular(&mut self) -> Result<bool> {
        Ok(self.stat()?.mode().is_regular())
    }

    fn perm(&mut self) -> Result<u32> {
        Ok(self.stat()?.mode().perm())
    }

    fn file_type(&mut self) -> Result<u32> {
        Ok(self.stat()?.mode().file_type())
    }

    fn sys(&mut self) -> Result<Option<SysInfo>> {
        Ok(self.stat()?.sys().cloned())
    }
}

/// Pure path decomposition of the file identity. Never touches storage.
pub trait PathOps {
    fn identity(&self) -> &FileIdentity;

    fn abs(&self) -> &Path {
        self.identity().absolute()
    }

    /// Base name of the absolute path.
    fn name(&self) -> String {
        self.base()
    }

    fn base(&self) -> String {
        identity::base(&self.identity().absolute_str()).to_string()
    }

    fn dir(&self) -> String {
        identity::dir(&self.identity().absolute_str())
    }

    fn ext(&self) -> String {
        identity::ext(&self.identity().absolute_str()).to_string()
    }

    fn split(&self) -> (String, String) {
        let abs = self.identity().absolute_str();
        let (dir, file) = identity::split(&abs);
        (dir.to_string(), file.to_string())
    }
}

/// Operations on the file as a platform object rather than as content.
pub trait PlatformOps {
    fn chmod(&mut self, mode: u32) -> Result<()>;

    fn chown(&mut self, uid: u32, gid: u32) -> Result<()>;

    /// Renames the file on storage. The identity of the handle does not follow.
    fn rename<P: AsRef<Path>>(&mut self, new_path: P) -> Result<()>;

    /// Sets both the read and write deadline.
    fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>);

    fn set_write_deadline(&mut self, deadline: Option<Instant>);
}

/// Unix flavored operations.
pub trait UnixOps {
    /// Raw descriptor of the live handle, opening it if necessary.
    fn fd(&mut self) -> Result<i32>;

    fn link<P: AsRef<Path>>(&self, new_name: P) -> Result<()>;

    fn readlink(&self) -> Result<PathBuf>;

    fn symlink<P: AsRef<Path>>(&self, new_name: P) -> Result<()>;

    /// Closes the handle and removes the file from storage.
    fn remove(&mut self) -> Result<()>;

    fn truncate(&mut self, size: u64) -> Result<()>;
}
