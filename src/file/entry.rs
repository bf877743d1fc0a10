use super::metadata::MetadataSnapshot;
use super::mode::FileMode;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
    Other,
}

impl From<FileMode> for EntryType {
    fn from(mode: FileMode) -> Self {
        if mode.is_dir() {
            EntryType::Directory
        } else if mode.is_regular() {
            EntryType::File
        } else if mode.is_symlink() {
            EntryType::Symlink
        } else {
            EntryType::Other
        }
    }
}

/// Directory-listing view of a single file, built from its metadata snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
    entry_type: EntryType,
    info: MetadataSnapshot,
}

impl DirEntry {
    pub fn new(info: MetadataSnapshot) -> DirEntry {
        DirEntry {
            entry_type: EntryType::from(info.mode()),
            info,
        }
    }

    /// Final element of the path only.
    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// The snapshot the entry was built from.
    pub fn info(&self) -> &MetadataSnapshot {
        &self.info
    }
}
