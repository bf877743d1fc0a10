//! Snapshot of file metadata and the cache that keeps it between queries.
//!
//! The cache trusts its snapshot only while its dirty flag is unset. Writes, flushes
//! and explicit invalidation raise the flag, so the next [`MetadataCache::stat`]
//! goes back to storage.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::trace;

use super::identity::{self, FileIdentity};
use super::mode::FileMode;
use crate::core::Result;
use crate::error::FileError;

/// System specific part of the metadata (the Unix `stat` fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysInfo {
    pub dev: u64,
    pub ino: u64,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub blocks: u64,
    pub blksize: u64,
}

impl SysInfo {
    #[cfg(unix)]
    fn from_metadata(meta: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: meta.dev(),
            ino: meta.ino(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            blocks: meta.blocks(),
            blksize: meta.blksize(),
        })
    }

    #[cfg(not(unix))]
    fn from_metadata(_meta: &Metadata) -> Option<Self> {
        None
    }
}

/// Point-in-time copy of file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSnapshot {
    name: String,
    size: u64,
    mode: FileMode,
    modified: SystemTime,
    is_dir: bool,
    sys: Option<SysInfo>,
}

impl MetadataSnapshot {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        mode: FileMode,
        modified: SystemTime,
        sys: Option<SysInfo>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            mode,
            modified,
            is_dir: mode.is_dir(),
            sys,
        }
    }

    pub fn from_metadata(path: &Path, meta: &Metadata) -> Self {
        let name = identity::base(&path.to_string_lossy()).to_string();
        Self {
            name,
            size: meta.len(),
            mode: FileMode::from_metadata(meta),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_dir: meta.is_dir(),
            sys: SysInfo::from_metadata(meta),
        }
    }

    /// Base name of the file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length in bytes for regular files; system dependent for others.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn sys(&self) -> Option<&SysInfo> {
        self.sys.as_ref()
    }
}

/// Where snapshots come from. The host filesystem in production, a double in tests.
pub trait MetadataSource {
    fn query(&self, path: &Path) -> io::Result<MetadataSnapshot>;
}

/// Queries the host filesystem, following symlinks.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostMetadata;

impl MetadataSource for HostMetadata {
    fn query(&self, path: &Path) -> io::Result<MetadataSnapshot> {
        let meta = std::fs::metadata(path)?;
        Ok(MetadataSnapshot::from_metadata(path, &meta))
    }
}

#[derive(Debug, Default)]
pub struct MetadataCache<S = HostMetadata> {
    source: S,
    /// Absolute path the snapshot was queried for, and the snapshot.
    entry: Option<(PathBuf, MetadataSnapshot)>,
    dirty: bool,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::with_source(HostMetadata)
    }
}

impl<S: MetadataSource> MetadataCache<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            entry: None,
            dirty: false,
        }
    }

    /// Returns the cached snapshot unless it is absent, dirty, taken for another
    /// identity or `force_refresh` is set; otherwise queries the source, stores the
    /// result and clears the dirty flag.
    ///
    /// On failure the previous snapshot stays in place (see [`cached`](Self::cached)).
    pub fn stat(&mut self, identity: &FileIdentity, force_refresh: bool) -> Result<MetadataSnapshot> {
        if !force_refresh && !self.dirty {
            let hit = self
                .entry
                .as_ref()
                .filter(|(key, _)| key.as_path() == identity.absolute());
            if let Some((_, snapshot)) = hit {
                trace!(path = %identity.absolute().display(), "metadata cache hit");
                return Ok(snapshot.clone());
            }
        }

        let path = identity.absolute();
        let snapshot = self.source.query(path).map_err(|source| FileError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        trace!(path = %path.display(), size = snapshot.size(), "metadata queried");
        self.entry = Some((path.to_path_buf(), snapshot.clone()));
        self.dirty = false;
        Ok(snapshot)
    }

    /// Marks the snapshot untrusted; the next `stat` re-queries.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Drops the snapshot altogether.
    pub fn clear(&mut self) {
        self.entry = None;
        self.dirty = false;
    }

    /// The last successfully queried snapshot, possibly stale.
    pub fn cached(&self) -> Option<&MetadataSnapshot> {
        self.entry.as_ref().map(|(_, snapshot)| snapshot)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
