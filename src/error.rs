//! Error taxonomy shared by every codec in the crate.
//!
//! Decoding and encoding are all-or-nothing: when any of these errors is
//! returned the caller must discard whatever was produced so far.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // ── Format errors ───────────────────────────────────────────────────────
    #[error("Invalid magic: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: &'static str, found: String },
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),
    #[error("Invalid experiment type: {0:?}")]
    InvalidExperimentType(String),
    #[error("Bad marker in scan {scan}: expected \"DATA\", found {found:?}")]
    BadScanMarker { scan: usize, found: String },

    // ── Stream errors ───────────────────────────────────────────────────────
    /// EOF inside a field the format requires.
    #[error("Truncated stream: unexpected end of data")]
    Truncated,

    // ── Encode-side validation ──────────────────────────────────────────────
    #[error("Value out of range for {field}: {value}")]
    ValueRange { field: &'static str, value: String },
    #[error("Size mismatch for {what}: declared {declared}, got {actual}")]
    SizeMismatch { what: &'static str, declared: usize, actual: usize },
    #[error("Unexpected header size {actual} bytes; expected {expected} before the intensity block")]
    HeaderSize { actual: usize, expected: usize },

    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated
        } else {
            Error::Io(e)
        }
    }
}

impl Error {
    pub(crate) fn value_range(field: &'static str, value: impl ToString) -> Self {
        Error::ValueRange { field, value: value.to_string() }
    }

    /// True for the format-level errors (bad magic, version, type or marker).
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidMagic { .. }
                | Error::UnsupportedVersion(_)
                | Error::InvalidExperimentType(_)
                | Error::BadScanMarker { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
