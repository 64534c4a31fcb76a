//! # KmerBase: a k-mer count database in SQLite.
//!
//! This is a specialized index for k-mer occurrence counts.
//! For every fixed-length DNA substring (k-mer) observed across many samples, the database
//! records which samples contained it and with what count, and answers point lookups and
//! full-table dumps.
//!
//! ### Basic concepts
//!
//! A k-mer is a string of exactly 32 symbols over the alphabet `ACGT`.
//! It is never stored as a string: each symbol maps to a 2-bit code, and the codes are
//! packed into a 64-bit key, most-significant symbol first (see [`kmer`]).
//! Keys are persisted in a big-endian byte layout, so the bytewise order the store uses
//! for iteration equals the numeric order of the keys.
//!
//! Sample names are registered once and mapped to sequential 16-bit identifiers (see
//! [`KmerBase::register_sample`]).
//! The value stored for a key is a sequence of (sample identifier, count) observations
//! in insertion order (see [`record`]).
//! A run that sees the same k-mer twice for the same sample appends two observations
//! rather than summing the counts.
//!
//! Indexing is a read-modify-write per key: fetch the current record, append the new
//! observation, and stage the updated record in a bounded buffer that is flushed to the
//! database in transactions (see [`Indexer`]).
//! The database assumes a single writer in a single process; no operation is safe under
//! concurrent access.
//!
//! See [`KmerBase`] and [`CountsInterface`] for the database interface.

pub mod db;
pub mod error;
pub mod formats;
pub mod index;
pub mod kmer;
pub mod record;
pub mod utils;

pub use db::{CountsInterface, Dump, KmerBase};
pub use error::{Error, Result};
pub use index::{index_counts, IndexParams, IndexStats, Indexer};
pub use record::{CountRecord, Observation};
