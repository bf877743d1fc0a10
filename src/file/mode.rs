use std::fmt;
use std::fs::Metadata;

const S_IFMT: u32 = 0o170_000;
const S_IFSOCK: u32 = 0o140_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFREG: u32 = 0o100_000;
const S_IFBLK: u32 = 0o060_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFCHR: u32 = 0o020_000;
const S_IFIFO: u32 = 0o010_000;

const PERM_MASK: u32 = 0o777;

/// Raw Unix mode word: file type bits plus permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileMode(u32);

impl FileMode {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn from_metadata(meta: &Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self(meta.mode())
        }
        #[cfg(not(unix))]
        {
            let ft = meta.file_type();
            let kind = if ft.is_dir() {
                S_IFDIR | 0o755
            } else if ft.is_symlink() {
                S_IFLNK | 0o777
            } else {
                S_IFREG | 0o644
            };
            if meta.permissions().readonly() {
                Self(kind & !0o222)
            } else {
                Self(kind)
            }
        }
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Permission bits (`mode & 0o777`).
    pub const fn perm(self) -> u32 {
        self.0 & PERM_MASK
    }

    /// Type bits (`mode & S_IFMT`).
    pub const fn file_type(self) -> u32 {
        self.0 & S_IFMT
    }

    pub const fn is_dir(self) -> bool {
        self.file_type() == S_IFDIR
    }

    pub const fn is_regular(self) -> bool {
        self.file_type() == S_IFREG
    }

    pub const fn is_symlink(self) -> bool {
        self.file_type() == S_IFLNK
    }

    fn type_char(self) -> char {
        match self.file_type() {
            S_IFDIR => 'd',
            S_IFLNK => 'l',
            S_IFSOCK => 's',
            S_IFBLK => 'b',
            S_IFCHR => 'c',
            S_IFIFO => 'p',
            _ => '-',
        }
    }
}

/// `ls`-style rendering, e.g. `-rw-r--r--` or `drwxr-xr-x`.
impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(10);
        out.push(self.type_char());
        for shift in [6u32, 3, 0] {
            let bits = (self.0 >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        f.pad(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_file_bits() {
        let mode = FileMode::from_raw(0o100_644);
        assert!(mode.is_regular());
        assert!(!mode.is_dir());
        assert_eq!(mode.perm(), 0o644);
        assert_eq!(mode.file_type(), S_IFREG);
        assert_eq!(mode.to_string(), "-rw-r--r--");
    }

    #[test]
    fn test_directory_bits() {
        let mode = FileMode::from_raw(0o040_755);
        assert!(mode.is_dir());
        assert!(!mode.is_regular());
        assert_eq!(mode.to_string(), "drwxr-xr-x");
    }

    #[test]
    fn test_symlink_bits() {
        let mode = FileMode::from_raw(0o120_777);
        assert!(mode.is_symlink());
        assert_eq!(mode.to_string(), "lrwxrwxrwx");
    }

    #[test]
    fn test_display_respects_width() {
        let mode = FileMode::from_raw(0o100_600);
        assert_eq!(format!("{mode:>12}"), "  -rw-------");
    }
}
