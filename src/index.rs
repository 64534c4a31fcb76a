//! Indexing: merge-on-write of count observations with batched commits.
//!
//! The [`Indexer`] performs a read-modify-write per key: it fetches the current
//! record from the counts table, appends the new observation, and stages the
//! updated record in a bounded buffer.
//! When the buffer reaches capacity, it is flushed to the database as one transaction.
//! [`Indexer::finish`] flushes the remaining partial buffer at the end of the run;
//! without it, the tail of the input would be lost.

use crate::db::KmerBase;
use crate::error::Result;
use crate::kmer;
use crate::record::{CountRecord, Observation};

use rusqlite::OptionalExtension;


//-----------------------------------------------------------------------------

/// Indexing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexParams {
    /// Number of staged writes in a batch (database transaction).
    pub batch_size: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            batch_size: Indexer::BATCH_SIZE,
        }
    }
}

//-----------------------------------------------------------------------------

/// Statistics for an indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of observations staged.
    pub observations: usize,

    /// Number of observations whose key had no prior record in the database.
    pub new_kmers: usize,

    /// Number of batches flushed to the database.
    pub flushes: usize,
}

impl IndexStats {
    fn new() -> Self {
        Self {
            observations: 0,
            new_kmers: 0,
            flushes: 0,
        }
    }
}

//-----------------------------------------------------------------------------

/// Merge-on-write engine for one indexing run.
///
/// The indexer stages updated records for one sample and flushes them in batches.
/// The caller must consume the indexer with [`Indexer::finish`] so that the final
/// partial batch reaches the database.
///
/// # Examples
///
/// ```
/// use kmer_base::{kmer, utils, IndexParams, Indexer, KmerBase};
/// use std::fs;
///
/// let db_file = utils::temp_file_name("indexer");
/// KmerBase::create(&db_file).unwrap();
/// let mut database = KmerBase::open_read_write(&db_file).unwrap();
/// let sample = database.register_sample("alice").unwrap();
///
/// let params = IndexParams::default();
/// let mut indexer = Indexer::new(&database, sample, &params);
/// let key = kmer::encode_kmer("GATTACACACCAGATAACATTGAACCTTACAC").unwrap();
/// indexer.observe(key, 5).unwrap();
/// let statistics = indexer.finish().unwrap();
/// assert_eq!(statistics.observations, 1);
/// assert_eq!(statistics.flushes, 1);
///
/// drop(database);
/// fs::remove_file(&db_file).unwrap();
/// ```
pub struct Indexer<'a> {
    database: &'a KmerBase,
    sample: u16,
    batch_size: usize,
    buffer: Vec<(u64, Vec<u8>)>,
    statistics: IndexStats,
}

impl<'a> Indexer<'a> {
    /// Default batch size in staged writes.
    pub const BATCH_SIZE: usize = 10000;

    /// Creates a new indexer for the given sample.
    pub fn new(database: &'a KmerBase, sample: u16, params: &IndexParams) -> Self {
        Indexer {
            database,
            sample,
            batch_size: params.batch_size,
            buffer: Vec::with_capacity(params.batch_size),
            statistics: IndexStats::new(),
        }
    }

    /// Records one observation of the given encoded key with the given count.
    ///
    /// Fetches the current record from the database, appends the observation,
    /// and stages the updated record.
    /// The fetch reads the database only, never the staging buffer: if the same
    /// key is observed twice within one unflushed batch, the second fetch does
    /// not see the first staged update, and the later staged record wins at
    /// flush time.
    ///
    /// Counts beyond 65535 wrap to 16 bits.
    ///
    /// # Errors
    ///
    /// Passes through any database errors, including a failed flush.
    pub fn observe(&mut self, key: u64, count: u64) -> Result<()> {
        let mut get_record = self.database.connection.prepare_cached(
            "SELECT record FROM Counts WHERE key = ?1"
        )?;
        let existing: Option<Vec<u8>> = get_record.query_row(
            (&kmer::key_bytes(key)[..],), |row| row.get(0)
        ).optional()?;
        drop(get_record);

        if existing.is_none() {
            self.statistics.new_kmers += 1;
        }
        let observation = Observation::new(self.sample, count);
        let record = CountRecord::append(existing.as_deref(), observation)?;
        self.buffer.push((key, record));
        self.statistics.observations += 1;

        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    // Writes the staged records to the database as one transaction and clears the buffer.
    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let transaction = self.database.connection.unchecked_transaction()?;
        {
            let mut insert = transaction.prepare(
                "INSERT OR REPLACE INTO Counts(key, record) VALUES (?1, ?2)"
            )?;
            for (key, record) in self.buffer.iter() {
                insert.execute((&kmer::key_bytes(*key)[..], record.as_slice()))?;
            }
        }
        transaction.commit()?;

        self.buffer.clear();
        self.statistics.flushes += 1;
        Ok(())
    }

    /// Flushes any remaining staged records and returns the statistics for the run.
    ///
    /// # Errors
    ///
    /// Passes through any database errors.
    /// Batches committed before a failed flush remain durable.
    pub fn finish(mut self) -> Result<IndexStats> {
        self.flush()?;
        Ok(self.statistics)
    }
}

//-----------------------------------------------------------------------------

/// Indexes the (k-mer, count) pairs from the given input for one sample.
///
/// Registers the sample name, observes each pair through an [`Indexer`], and
/// flushes the final partial batch.
///
/// # Errors
///
/// Registration errors abort the run before any counts are written.
/// Codec errors for malformed k-mers and database errors abort the run;
/// batches committed before the failure remain durable.
pub fn index_counts<I>(
    database: &mut KmerBase, sample_name: &str, input: I, params: &IndexParams
) -> Result<IndexStats>
where
    I: IntoIterator<Item = Result<(String, u64)>>,
{
    let sample = database.register_sample(sample_name)?;
    let mut indexer = Indexer::new(database, sample, params);
    for pair in input {
        let (kmer, count) = pair?;
        let key = kmer::encode_kmer(&kmer)?;
        indexer.observe(key, count)?;
    }
    indexer.finish()
}

//-----------------------------------------------------------------------------
