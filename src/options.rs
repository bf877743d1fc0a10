use std::time::Duration;

/// Permission bits for newly created files (before umask).
pub const NORMAL_MODE: u32 = 0o644;
/// Permission bits for newly created directories (before umask).
pub const DIR_MODE: u32 = 0o755;
/// Size of the intermediate buffer used by bulk transfers.
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 12;

/// Bounded retry schedule for syncing to stable storage.
///
/// The delay starts at `initial_backoff` and doubles after each failed attempt,
/// never exceeding `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1 << shift)
            .min(self.max_backoff)
    }
}

/// Settings of a [`BasicFile`](crate::BasicFile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOptions {
    pub file_mode: u32,
    pub dir_mode: u32,
    /// Create missing parent directories (with `dir_mode`) in `create()`.
    pub create_parents: bool,
    pub buffer_size: usize,
    pub retry: RetryPolicy,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            file_mode: NORMAL_MODE,
            dir_mode: DIR_MODE,
            create_parents: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl FileOptions {
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn with_create_parents(mut self, create: bool) -> Self {
        self.create_parents = create;
        self
    }

    /// Sets the bulk transfer buffer size. Zero is replaced by the default size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = if size == 0 { DEFAULT_BUFFER_SIZE } else { size };
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
