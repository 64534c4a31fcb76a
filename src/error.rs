//! Error types for the k-mer count database.

use thiserror::Error;

//-----------------------------------------------------------------------------

/// Errors from the k-mer count database.
///
/// Codec errors ([`Error::InvalidSymbol`], [`Error::InvalidLength`]) indicate invalid input.
/// [`Error::MalformedKey`], [`Error::MalformedRecord`], and [`Error::UnknownSample`] indicate a corrupted database.
/// They are surfaced to the caller and never repaired.
/// Store and registry errors are fatal for the current command.
#[derive(Debug, Error)]
pub enum Error {
    /// A k-mer contains a symbol outside the `ACGT` alphabet.
    #[error("invalid symbol {symbol:?} at offset {offset} in k-mer")]
    InvalidSymbol { symbol: char, offset: usize },

    /// A k-mer is not exactly [`crate::kmer::KMER_LENGTH`] symbols long.
    #[error("invalid k-mer length {len} (expected 32)")]
    InvalidLength { len: usize },

    /// A stored key is not exactly [`crate::kmer::KEY_LENGTH`] bytes long.
    #[error("malformed key of {len} bytes (expected 8)")]
    MalformedKey { len: usize },

    /// A stored count record is not a multiple of the observation width.
    #[error("malformed count record of {len} bytes (expected a multiple of 4)")]
    MalformedRecord { len: usize },

    /// A count record refers to a sample identifier with no registry entry.
    #[error("unknown sample identifier {id}")]
    UnknownSample { id: u16 },

    /// The sample identifier space is exhausted.
    #[error("cannot register a new sample: the identifier space is exhausted")]
    RegistryFull,

    /// Sample registration failed before any counts were written.
    #[error("sample registration failed: {reason}")]
    RegistryWrite { reason: String },

    /// An error from the underlying SQLite database.
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    /// An I/O error from reading an input file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database exists but its metadata is missing or unsupported.
    #[error("{reason}")]
    Database { reason: String },
}

/// A result type with the crate-wide error type.
pub type Result<T> = std::result::Result<T, Error>;

//-----------------------------------------------------------------------------
