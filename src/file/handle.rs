//! Lazy ownership of the OS-level descriptor.
//!
//! The lifecycle is a two-state machine, `Closed` or `Open`, plus a separate
//! `stale` bit. A stale descriptor is replaced on the next access; the bit is only
//! ever set explicitly, external changes are not detected.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, trace};

use super::identity::FileIdentity;
use crate::core::Result;
use crate::error::FileError;
use crate::options::FileOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    /// True when a descriptor opened with `self` can serve a request for `wanted`.
    fn satisfies(self, wanted: AccessMode) -> bool {
        self == AccessMode::ReadWrite || wanted == AccessMode::ReadOnly
    }

    fn widest(self, other: AccessMode) -> AccessMode {
        if self.satisfies(other) { self } else { other }
    }
}

#[derive(Debug, Default)]
enum HandleState {
    #[default]
    Closed,
    Open {
        file: File,
        access: AccessMode,
    },
}

#[derive(Debug, Default)]
pub struct HandleLifecycle {
    state: HandleState,
    stale: bool,
}

impl HandleLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, HandleState::Open { .. })
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Access mode of the held descriptor, if any.
    pub fn access(&self) -> Option<AccessMode> {
        match self.state {
            HandleState::Open { access, .. } => Some(access),
            HandleState::Closed => None,
        }
    }

    /// Forces a reopen on the next access.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// The held descriptor, without opening anything.
    pub fn file(&self) -> Option<&File> {
        match &self.state {
            HandleState::Open { file, .. } => Some(file),
            HandleState::Closed => None,
        }
    }

    /// Returns a live descriptor able to serve `wanted`.
    ///
    /// Opens one when none is held or the held one is stale. A read-only descriptor
    /// asked for read-write access is upgraded and keeps its stream position.
    /// Never creates the file; see [`create`](Self::create).
    pub fn ensure_open(
        &mut self,
        identity: &FileIdentity,
        wanted: AccessMode,
        options: &FileOptions,
    ) -> Result<&mut File> {
        let reusable = match &self.state {
            HandleState::Open { access, .. } => !self.stale && access.satisfies(wanted),
            HandleState::Closed => false,
        };

        if !reusable {
            let stale = self.stale;
            let (access, position) = match &mut self.state {
                // upgrade of a live read-only descriptor
                HandleState::Open { file, .. } if !stale => {
                    (AccessMode::ReadWrite, file.stream_position().ok())
                }
                HandleState::Open { access, .. } => (access.widest(wanted), None),
                HandleState::Closed => (wanted, None),
            };

            let path = identity.absolute();
            let mut file = open_file(path, access, options).map_err(|source| FileError::Open {
                path: path.to_path_buf(),
                source,
            })?;
            if let Some(pos) = position {
                file.seek(SeekFrom::Start(pos))
                    .map_err(|source| FileError::io("seek", path, source))?;
            }
            debug!(
                path = %path.display(),
                ?access,
                reopened = self.is_open(),
                "descriptor opened"
            );
            self.state = HandleState::Open { file, access };
            self.stale = false;
        }

        Ok(self.held_mut())
    }

    /// Opens read-write and lends the descriptor out for buffered access.
    ///
    /// The handle is marked stale, since buffered writes may not be visible to the
    /// held descriptor yet; the next direct access reopens.
    pub fn lend(&mut self, identity: &FileIdentity, options: &FileOptions) -> Result<&File> {
        self.ensure_open(identity, AccessMode::ReadWrite, options)?;
        self.stale = true;
        Ok(&*self.held_mut())
    }

    /// Opens read-write with create + truncate semantics, replacing any existing content
    /// and any held descriptor.
    pub fn create(&mut self, identity: &FileIdentity, options: &FileOptions) -> Result<&mut File> {
        self.create_with(identity, options, false)
    }

    /// Like [`create`](Self::create), but fails if the file already exists.
    pub fn create_new(&mut self, identity: &FileIdentity, options: &FileOptions) -> Result<&mut File> {
        self.create_with(identity, options, true)
    }

    fn create_with(
        &mut self,
        identity: &FileIdentity,
        options: &FileOptions,
        exclusive: bool,
    ) -> Result<&mut File> {
        let path = identity.absolute();
        let create_err = |source| FileError::Create {
            path: path.to_path_buf(),
            source,
        };

        if options.create_parents {
            if let Some(parent) = path.parent() {
                create_dir_all(parent, options.dir_mode).map_err(create_err)?;
            }
        }

        self.close();
        let mut open = OpenOptions::new();
        open.read(true).write(true);
        if exclusive {
            open.create_new(true);
        } else {
            open.create(true).truncate(true);
        }
        set_create_mode(&mut open, options.file_mode);
        let file = open.open(path).map_err(create_err)?;
        debug!(path = %path.display(), "file created");

        self.state = HandleState::Open {
            file,
            access: AccessMode::ReadWrite,
        };
        self.stale = false;
        Ok(self.held_mut())
    }

    /// Releases the descriptor, if one is held.
    pub fn close(&mut self) -> Option<File> {
        self.stale = false;
        match std::mem::take(&mut self.state) {
            HandleState::Open { file, .. } => {
                trace!("descriptor released");
                Some(file)
            }
            HandleState::Closed => None,
        }
    }

    fn held_mut(&mut self) -> &mut File {
        match &mut self.state {
            HandleState::Open { file, .. } => file,
            HandleState::Closed => unreachable!("descriptor is installed before it is handed out"),
        }
    }
}

fn open_file(path: &Path, access: AccessMode, options: &FileOptions) -> std::io::Result<File> {
    let mut open = OpenOptions::new();
    open.read(true);
    if access == AccessMode::ReadWrite {
        open.write(true);
    }
    set_create_mode(&mut open, options.file_mode);
    open.open(path)
}

#[cfg(unix)]
fn set_create_mode(open: &mut OpenOptions, mode: u32) {
    use std::os::unix::fs::OpenOptionsExt;
    open.mode(mode);
}

#[cfg(not(unix))]
fn set_create_mode(_open: &mut OpenOptions, _mode: u32) {}

#[cfg(unix)]
fn create_dir_all(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new().recursive(true).mode(mode).create(path)
}

#[cfg(not(unix))]
fn create_dir_all(path: &Path, _mode: u32) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}
