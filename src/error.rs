//! Error types for cidr2ip.
//!
//! Parsing, enumeration, input and output failures are reported through
//! [`Error`]. Only `main` turns them into a process exit status.

use std::io;
use std::net::AddrParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the expansion, input and report modules.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cidr2ip operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The expression is not a valid `address/prefix-length` pair.
    #[error("invalid CIDR address: {input}: {reason}")]
    InvalidCidrFormat {
        input: String,
        #[source]
        reason: CidrFormatError,
    },

    /// No CIDRs were supplied by the arguments or the input file.
    #[error("no CIDRs provided: {source_name}")]
    EmptyInputSource { source_name: String },

    /// The input file is missing or cannot be read.
    #[error("cannot read {}: {source}", path.display())]
    UnreadableInputSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The block holds more addresses than the configured limit allows.
    #[error("{cidr} holds {size} addresses, above the limit of {limit} (use --max-block-size 0 to lift it)")]
    BlockTooLarge {
        cidr: String,
        size: String,
        limit: u64,
    },

    /// An expansion task ended without delivering a result.
    #[error("expansion of {cidr} did not complete: {details}")]
    TaskFailed { cidr: String, details: String },

    /// One or more blocks failed under the strict error policy.
    #[error("{failed} of {total} CIDR blocks failed; first error: {first}")]
    BatchFailed {
        failed: usize,
        total: usize,
        first: Box<Error>,
    },

    /// Writing the address list failed.
    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Why a CIDR expression was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CidrFormatError {
    #[error("missing '/' prefix length")]
    MissingPrefix,

    #[error("bad address: {0}")]
    BadAddress(#[from] AddrParseError),

    #[error("prefix length {0:?} is not a decimal number")]
    BadPrefix(String),

    #[error("prefix length {prefix} exceeds {max}")]
    PrefixOutOfRange { prefix: u32, max: u8 },
}
