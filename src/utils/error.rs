//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! Every `ProfilerError` means the instrumented program broke the event
//! discipline or the collective channel failed. None of them are
//! recoverable; hosts hand them to [`fatal`].

use thiserror::Error;

/// Errors raised by the profiling session and its components
#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("unsupported interface version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u64 },

    #[error("Expected \"{expected}\" to end, got different kernel ID")]
    MismatchedEnd { expected: String },

    #[error("Program ended before \"{frame}\" ended")]
    UnterminatedFrame { frame: String },

    #[error("region pop with no open region")]
    PopAtRoot,

    #[error("allocation \"{name}\" of {size} bytes at {address:#x} is already live")]
    DuplicateAllocation {
        name: String,
        address: usize,
        size: u64,
    },

    #[error("deallocation of unknown allocation \"{name}\" of {size} bytes at {address:#x}")]
    UnknownAllocation {
        name: String,
        address: usize,
        size: u64,
    },

    #[error("allocation \"{name}\" of {size} bytes overflows the {total} bytes already live")]
    AllocationOverflow { name: String, size: u64, total: u64 },

    #[error("kernel ID {kernel_id} is already in use by \"{frame}\"")]
    DuplicateKernelId { kernel_id: u64, frame: String },

    #[error("unknown memory space \"{0}\"")]
    UnknownSpace(String),

    #[error("collective operation failed: {0}")]
    Collective(#[from] CollectiveError),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur in the collective transport
#[derive(Error, Debug)]
pub enum CollectiveError {
    #[error("process group state poisoned by a panicking rank")]
    Poisoned,

    #[error("MPI is already initialized or could not be started")]
    InitFailed,

    #[error("rank {rank} is outside a group of {size}")]
    RankOutOfRange { rank: usize, size: usize },

    #[error("malformed broadcast payload: {0}")]
    MalformedBroadcast(String),
}

/// Errors that can occur while loading event traces and configuration
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid trace format: {0}")]
    InvalidFormat(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Report a broken profiling invariant and terminate the process.
///
/// A profile built from a broken event stream cannot be trusted, so there is
/// no recovery path.
pub fn fatal(err: &ProfilerError) -> ! {
    log::error!("{}", err);
    eprintln!("space-time-stack: {}", err);
    std::process::abort()
}
