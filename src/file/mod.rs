mod basic_file;
mod buffered;
mod entry;
mod flush;
mod handle;
pub mod identity;
mod metadata;
mod mode;
mod text_file;

pub use basic_file::BasicFile;
pub use buffered::BufferedStream;
pub use entry::{DirEntry, EntryType};
pub use flush::{FlushCoordinator, FlushGuard};
pub use handle::{AccessMode, HandleLifecycle};
pub use identity::FileIdentity;
pub use metadata::{HostMetadata, MetadataCache, MetadataSnapshot, MetadataSource, SysInfo};
pub use mode::FileMode;
pub use text_file::{DEFAULT_LINE_SEP, DEFAULT_RECORD_SEP, DEFAULT_WORD_SEP, TextFile};
