//! A lazily opened, metadata-caching handle to a single file.
//!
//! ### Overview
//!
//! `file-kit` wraps one file on the host filesystem behind [`BasicFile`]. Creating the
//! handle only resolves the path; the descriptor is opened on first I/O and released
//! again by a flush. Metadata is cached between queries and re-read only after a
//! write, a flush or an explicit invalidation.
//!
//! **Key ideas**:
//! - **Laziness**: No descriptor is held until it is needed, and any operation after a flush reopens transparently.
//! - **Cached metadata**: Repeated `stat` calls return the same snapshot without touching storage.
//! - **Safe flushing**: A flush syncs with bounded retries and is guarded by a fail-fast lock.
//! - **Capabilities**: Reading, writing, metadata, path, platform and Unix operations live in separate traits.
//! - **Observability**: Errors are returned to the caller and can also be reported to an [`ErrorObserver`].
//!
//! ### Example:
//! ```no_run
//! use file_kit::{BasicFile, FileReader, FileWriter, MetadataProvider};
//!
//! let mut file = BasicFile::new("/tmp/notes.txt").unwrap();
//! file.create().unwrap();
//! file.write_str("hello").unwrap();
//! file.flush().unwrap();
//!
//! assert_eq!(file.size().unwrap(), 5);
//! assert_eq!(file.read_to_end().unwrap(), b"hello");
//! ```

mod core;
mod error;
mod file;
pub mod ops;
mod options;

pub use crate::core::{FileReader, FileWriter, MetadataProvider, PathOps, PlatformOps, Result, UnixOps};
pub use error::{ErrorObserver, FileError, TracingObserver};
pub use file::{
    AccessMode, BasicFile, BufferedStream, DEFAULT_LINE_SEP, DEFAULT_RECORD_SEP,
    DEFAULT_WORD_SEP, DirEntry, EntryType, FileIdentity, FileMode, FlushCoordinator, FlushGuard,
    HandleLifecycle, HostMetadata, MetadataCache, MetadataSnapshot, MetadataSource, SysInfo,
    TextFile, identity,
};
pub use options::{DEFAULT_BUFFER_SIZE, DIR_MODE, FileOptions, NORMAL_MODE, RetryPolicy};
