//! Path-level helpers that do not need a long-lived handle.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::Result;
use crate::error::FileError;
use crate::file::{BasicFile, FileMode, MetadataSnapshot};

/// Others-read permission bit.
const OTHERS_READ: u32 = 0o004;

/// Metadata of `path`, following symlinks.
pub fn stat<P: AsRef<Path>>(path: P) -> Result<MetadataSnapshot> {
    let path = path.as_ref();
    std::fs::metadata(path)
        .map(|meta| MetadataSnapshot::from_metadata(path, &meta))
        .map_err(|source| FileError::Stat {
            path: path.to_path_buf(),
            source,
        })
}

/// True when `path` can be stat'ed.
pub fn exists<P: AsRef<Path>>(path: P) -> bool {
    std::fs::metadata(path).is_ok()
}

/// True only when the OS reports that `path` does not exist.
///
/// Other failures, such as a permission error on a parent directory, make both
/// `exists` and `not_exists` false.
pub fn not_exists<P: AsRef<Path>>(path: P) -> bool {
    matches!(std::fs::metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound)
}

pub fn mode<P: AsRef<Path>>(path: P) -> Result<FileMode> {
    Ok(stat(path)?.mode())
}

/// Metadata of a readable regular file.
///
/// Symlinks are resolved first. Directories, non-regular files and files without
/// the others-read permission bit are rejected.
pub fn regular_file_info<P: AsRef<Path>>(path: P) -> Result<MetadataSnapshot> {
    let path = path.as_ref();
    let real = std::fs::canonicalize(path).map_err(|source| FileError::Path {
        path: path.to_path_buf(),
        source,
    })?;
    let info = stat(&real)?;

    let reject = |kind: io::ErrorKind, msg: &str| FileError::Stat {
        path: real.clone(),
        source: io::Error::new(kind, format!("{msg}: {}", real.display())),
    };
    if info.mode().perm() & OTHERS_READ == 0 {
        return Err(reject(io::ErrorKind::PermissionDenied, "insufficient permissions"));
    }
    if info.is_dir() {
        return Err(reject(io::ErrorKind::IsADirectory, "path refers to a directory"));
    }
    if !info.mode().is_regular() {
        return Err(reject(io::ErrorKind::InvalidInput, "not a regular file"));
    }
    Ok(info)
}

/// Current working directory.
pub fn pwd() -> Result<PathBuf> {
    std::env::current_dir().map_err(|source| FileError::Path {
        path: PathBuf::from("."),
        source,
    })
}

/// Opens an existing file for reading and returns the open handle.
pub fn open<P: AsRef<Path>>(path: P) -> Result<BasicFile> {
    let mut file = BasicFile::new(path)?;
    file.open()?;
    Ok(file)
}

/// Creates or truncates the file and returns it open read-write.
pub fn create<P: AsRef<Path>>(path: P) -> Result<BasicFile> {
    let mut file = BasicFile::new(path)?;
    file.create()?;
    Ok(file)
}

/// Creates the file and returns it open read-write. Fails if it already exists.
pub fn create_new<P: AsRef<Path>>(path: P) -> Result<BasicFile> {
    let mut file = BasicFile::new(path)?;
    file.create_new()?;
    Ok(file)
}

/// True when both paths name the same file on storage.
pub fn same_file<A: AsRef<Path>, B: AsRef<Path>>(a: A, b: B) -> Result<bool> {
    let (a, b) = (a.as_ref(), b.as_ref());
    let same = same_file_impl(a, b)?;
    debug!(a = %a.display(), b = %b.display(), same, "compared files");
    Ok(same)
}

#[cfg(unix)]
fn same_file_impl(a: &Path, b: &Path) -> Result<bool> {
    let (a, b) = (stat(a)?, stat(b)?);
    Ok(match (a.sys(), b.sys()) {
        (Some(a), Some(b)) => a.dev == b.dev && a.ino == b.ino,
        _ => false,
    })
}

#[cfg(not(unix))]
fn same_file_impl(a: &Path, b: &Path) -> Result<bool> {
    let canonical = |p: &Path| {
        std::fs::canonicalize(p).map_err(|source| FileError::Path {
            path: p.to_path_buf(),
            source,
        })
    };
    Ok(canonical(a)? == canonical(b)?)
}
