//! Error types surfaced to callers of the core.
//!
//! An unrecognised cartridge is not an error: it loads as
//! [`MapType::Invalid`](crate::cartridge::MapType::Invalid) so callers can
//! branch on the classification. Only I/O-level failures land here.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RomError {
    #[error("failed to read ROM file: {0}")]
    Io(#[from] io::Error),

    #[error("ROM image truncated: {len} bytes is smaller than one 32 KiB bank")]
    Truncated { len: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("region {start:06X}-{end:06X} overlaps an existing mapping")]
    Overlap { start: u32, end: u32 },
}

#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("save state I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("save state encoding failed: {0}")]
    Encode(#[from] bincode::Error),

    #[error("unsupported save state version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("{what} size mismatch: state has {found} bytes, machine has {expected}")]
    SizeMismatch {
        what: &'static str,
        found: usize,
        expected: usize,
    },
}
