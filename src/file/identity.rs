//! Identity of a file: the name the caller provided plus its absolute form,
//! and the pure string helpers that decompose a path (`base`, `dir`, `ext`, `split`).
//!
//! All helpers work on `/`-separated paths and never touch the filesystem.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::{Result, utils};
use crate::error::FileError;

/// The provided path and its absolute, lexically cleaned form.
///
/// Immutable once built: every handle, cache entry and flush of a
/// [`BasicFile`](crate::BasicFile) refers to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    provided: PathBuf,
    absolute: PathBuf,
}

impl FileIdentity {
    pub fn new<P: AsRef<Path>>(name: P) -> Result<Self> {
        let provided = name.as_ref().to_path_buf();
        let absolute = resolve(&provided)?;
        Ok(Self { provided, absolute })
    }

    /// The name exactly as the caller supplied it.
    pub fn provided(&self) -> &Path {
        &self.provided
    }

    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    pub(crate) fn absolute_str(&self) -> Cow<'_, str> {
        self.absolute.to_string_lossy()
    }
}

/// Makes `name` absolute by joining it to the current working directory and
/// normalizing `.` and `..` components. Symlinks are not resolved.
pub fn resolve<P: AsRef<Path>>(name: P) -> Result<PathBuf> {
    let path = name.as_ref();
    if path.as_os_str().is_empty() {
        return Err(FileError::Path {
            path: PathBuf::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty path"),
        });
    }
    if path.is_absolute() {
        return Ok(utils::normalize(path));
    }
    let cwd = std::env::current_dir().map_err(|source| FileError::Path {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(utils::normalize(cwd.join(path)))
}

/// Splits `path` right after its final separator, so that `dir + file == path`.
/// Without a separator, `dir` is empty and `file` is the whole path.
pub fn split(path: &str) -> (&str, &str) {
    let at = path.rfind('/').map_or(0, |i| i + 1);
    path.split_at(at)
}

/// Last element of `path` after trailing separators are removed.
/// Empty path gives `"."`; a path made only of separators gives `"/"`.
pub fn base(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Everything but the last element of `path`, cleaned. Empty path gives `"."`.
pub fn dir(path: &str) -> String {
    let (dir, _) = split(path);
    utils::clean(dir)
}

/// Extension of the final element, starting at its last dot; empty when there is none.
pub fn ext(path: &str) -> &str {
    for (i, b) in path.bytes().enumerate().rev() {
        match b {
            b'/' => break,
            b'.' => return &path[i..],
            _ => {}
        }
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "/",
        "///",
        "/tmp",
        "/tmp/",
        "/tmp/a.txt",
        "/tmp/dir/",
        "relative/file.tar.gz",
        "file",
        "/a/b/c/",
    ];

    mod resolve {
        use super::*;

        #[test]
        fn test_resolve_absolute_is_normalized() {
            let abs = resolve("/tmp/./x/../a.txt").unwrap();
            assert_eq!(abs, PathBuf::from("/tmp/a.txt"));
        }

        #[test]
        fn test_resolve_relative_joins_cwd() {
            let cwd = std::env::current_dir().unwrap();
            let abs = resolve("some/file.txt").unwrap();
            assert_eq!(abs, cwd.join("some/file.txt"));
            assert!(abs.is_absolute());
        }

        #[test]
        fn test_resolve_empty_fails() {
            let err = resolve("").unwrap_err();
            assert!(matches!(err, FileError::Path { .. }));
        }

        #[test]
        fn test_resolve_is_deterministic() {
            assert_eq!(resolve("a/b").unwrap(), resolve("a/b").unwrap());
        }

        #[test]
        fn test_identity_keeps_provided_name() {
            let identity = FileIdentity::new("/tmp//data/../a.txt").unwrap();
            assert_eq!(identity.provided(), Path::new("/tmp//data/../a.txt"));
            assert_eq!(identity.absolute(), Path::new("/tmp/a.txt"));
        }
    }

    mod decompose {
        use super::*;

        #[test]
        fn test_base() {
            assert_eq!(base(""), ".");
            assert_eq!(base("/"), "/");
            assert_eq!(base("///"), "/");
            assert_eq!(base("/tmp/a.txt"), "a.txt");
            assert_eq!(base("/tmp/dir/"), "dir");
            assert_eq!(base("file"), "file");
        }

        #[test]
        fn test_dir() {
            assert_eq!(dir(""), ".");
            assert_eq!(dir("/"), "/");
            assert_eq!(dir("/tmp"), "/");
            assert_eq!(dir("/tmp/a.txt"), "/tmp");
            assert_eq!(dir("/tmp/dir/"), "/tmp/dir");
            assert_eq!(dir("file"), ".");
        }

        #[test]
        fn test_ext() {
            assert_eq!(ext("/tmp/a.txt"), ".txt");
            assert_eq!(ext("relative/file.tar.gz"), ".gz");
            assert_eq!(ext("/tmp.d/file"), "");
            assert_eq!(ext(""), "");
            assert_eq!(ext("/tmp/.hidden"), ".hidden");
        }

        #[test]
        fn test_split() {
            assert_eq!(split("/tmp/a.txt"), ("/tmp/", "a.txt"));
            assert_eq!(split("file"), ("", "file"));
            assert_eq!(split("/"), ("/", ""));
            assert_eq!(split(""), ("", ""));
        }

        #[test]
        fn test_split_recombines() {
            for path in SAMPLES {
                let (d, f) = split(path);
                assert_eq!(format!("{d}{f}"), *path, "split of {path:?}");
            }
        }

        #[test]
        fn test_base_of_dir_join_base() {
            for path in SAMPLES {
                let joined = format!("{}/{}", dir(path), base(path));
                assert_eq!(base(&joined), base(path), "base law for {path:?}");
            }
        }

        #[test]
        fn test_dir_join_base_reproduces_canonical() {
            for path in SAMPLES {
                let canonical = utils::clean(path);
                if canonical == "." {
                    continue;
                }
                let joined = format!("{}/{}", dir(&canonical), base(&canonical));
                assert_eq!(utils::clean(&joined), canonical, "recombination of {path:?}");
            }
        }
    }
}
