//! KmerBase: an SQLite database storing k-mer occurrence counts across samples.

use crate::error::{Error, Result};
use crate::record::CountRecord;
use crate::{kmer, utils};

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Rows, Statement};

use rand::Rng;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// A database connection to a KmerBase database.
///
/// This structure stores a database connection and some header information.
/// The database is a single-writer, single-process store: one command opens it,
/// runs to completion, and closes it.
/// Count operations are supported through the [`CountsInterface`] structure.
///
/// The database contains three tables:
///
/// * `Counts`: encoded k-mer key to count record, iterated in numeric key order.
/// * `Samples`: sample identifier to sample name.
/// * `Tags`: metadata, including the database version, the k-mer length, and the
///   next sample identifier as a decimal string.
///
/// # Examples
///
/// ```
/// use kmer_base::{utils, KmerBase};
/// use std::fs;
///
/// // Create the database.
/// let db_file = utils::temp_file_name("kmer-base");
/// assert!(!KmerBase::exists(&db_file));
/// let result = KmerBase::create(&db_file);
/// assert!(result.is_ok());
///
/// // Open the database and register a sample.
/// let mut database = KmerBase::open_read_write(&db_file).unwrap();
/// assert_eq!(database.version(), KmerBase::VERSION);
/// assert_eq!(database.kmer_length(), 32);
/// let sample_id = database.register_sample("sample_a").unwrap();
/// assert_eq!(sample_id, 0);
/// assert_eq!(database.resolve_sample(sample_id).unwrap(), "sample_a");
///
/// // Clean up.
/// drop(database);
/// fs::remove_file(&db_file).unwrap();
/// ```
#[derive(Debug)]
pub struct KmerBase {
    pub(crate) connection: Connection,
    version: String,
    kmer_length: usize,
    samples: usize,
    kmers: usize,
}

/// Using the database.
impl KmerBase {
    // Key for database version.
    const KEY_VERSION: &'static str = "version";

    /// Current database version.
    pub const VERSION: &'static str = "KmerBase v0.1.0";

    // Key for k-mer length.
    const KEY_KMER_LENGTH: &'static str = "kmer_length";

    // Key for the next sample identifier, stored as a decimal string.
    // An absent key means that no samples have been registered.
    const KEY_NEXT_SAMPLE: &'static str = "next_sample_id";

    fn open_with_flags<P: AsRef<Path>>(filename: P, flags: OpenFlags) -> Result<Self> {
        let connection = Connection::open_with_flags(filename, flags)?;

        // Validate the header information.
        let mut get_tag = connection.prepare(
            "SELECT value FROM Tags WHERE key = ?1"
        )?;
        let version: Option<String> = get_tag.query_row(
            (Self::KEY_VERSION,), |row| row.get(0)
        ).optional()?;
        let version = version.ok_or(Error::Database {
            reason: String::from("The database does not contain a version tag")
        })?;
        if version != Self::VERSION {
            return Err(Error::Database {
                reason: format!("Unsupported database version: {} (expected {})", version, Self::VERSION)
            });
        }
        let kmer_length = get_numeric_value(&mut get_tag, Self::KEY_KMER_LENGTH)?;
        if kmer_length != kmer::KMER_LENGTH {
            return Err(Error::Database {
                reason: format!("Unsupported k-mer length: {} (expected {})", kmer_length, kmer::KMER_LENGTH)
            });
        }
        drop(get_tag);

        // Determine the number of rows in the tables.
        let samples: usize = connection.query_row(
            "SELECT COUNT(*) FROM Samples", (), |row| row.get(0)
        )?;
        let kmers: usize = connection.query_row(
            "SELECT COUNT(*) FROM Counts", (), |row| row.get(0)
        )?;

        Ok(KmerBase {
            connection,
            version, kmer_length,
            samples, kmers,
        })
    }

    /// Opens a read-only connection to the database in the given file.
    ///
    /// Validates the header information and passes through any database errors.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::open_with_flags(filename, flags)
    }

    /// Opens a read-write connection to the database in the given file.
    ///
    /// Validates the header information and passes through any database errors.
    pub fn open_read_write<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::open_with_flags(filename, flags)
    }

    /// Returns `true` if the database file exists.
    pub fn exists<P: AsRef<Path>>(filename: P) -> bool {
        utils::file_exists(filename)
    }

    /// Returns the filename of the database or [`None`] if there is no filename.
    pub fn filename(&self) -> Option<&str> {
        self.connection.path()
    }

    /// Returns the size of the database file in a human-readable format.
    pub fn file_size(&self) -> Option<String> {
        let filename = self.filename()?;
        utils::file_size(filename)
    }

    /// Returns the version of the database.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the k-mer length used in the database.
    pub fn kmer_length(&self) -> usize {
        self.kmer_length
    }

    /// Returns the number of registered samples when the database was opened.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Returns the number of distinct k-mers when the database was opened.
    pub fn kmers(&self) -> usize {
        self.kmers
    }
}

//-----------------------------------------------------------------------------

/// Creating the database.
impl KmerBase {
    /// Creates a new empty database in the given file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database already exists.
    /// Passes through any database errors.
    pub fn create<P: AsRef<Path>>(filename: P) -> Result<()> {
        eprintln!("Creating database {}", filename.as_ref().display());
        if utils::file_exists(&filename) {
            return Err(Error::Database {
                reason: format!("Database {} already exists", filename.as_ref().display())
            });
        }

        let mut connection = Connection::open(filename)?;
        connection.execute(
            "CREATE TABLE Tags (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            ) STRICT",
            (),
        )?;
        connection.execute(
            "CREATE TABLE Samples (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            ) STRICT",
            (),
        )?;
        // The key is the big-endian persisted form of the encoded k-mer.
        // Bytewise blob order over such keys equals numeric key order.
        connection.execute(
            "CREATE TABLE Counts (
                key BLOB PRIMARY KEY,
                record BLOB NOT NULL
            ) STRICT",
            (),
        )?;

        let transaction = connection.transaction()?;
        {
            let mut insert = transaction.prepare(
                "INSERT INTO Tags(key, value) VALUES (?1, ?2)"
            )?;
            insert.execute((Self::KEY_VERSION, Self::VERSION))?;
            insert.execute((Self::KEY_KMER_LENGTH, kmer::KMER_LENGTH.to_string()))?;
        }
        transaction.commit()?;

        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// Sample registry operations.
impl KmerBase {
    /// Registers a sample name and returns its identifier.
    ///
    /// Identifiers are assigned sequentially starting from 0.
    /// Registering an already-known name returns the existing identifier.
    /// The lookup, the insertion, and the counter update run in one transaction,
    /// so a failed registration leaves no partial state behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistryFull`] if the identifier space is exhausted.
    /// Returns [`Error::RegistryWrite`] if the registration could not be committed.
    pub fn register_sample(&mut self, name: &str) -> Result<u16> {
        let transaction = self.connection.transaction()?;

        let existing: Option<u16> = transaction.query_row(
            "SELECT id FROM Samples WHERE name = ?1",
            (name,), |row| row.get(0)
        ).optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let next: Option<String> = transaction.query_row(
            "SELECT value FROM Tags WHERE key = ?1",
            (Self::KEY_NEXT_SAMPLE,), |row| row.get(0)
        ).optional()?;
        let next: usize = match next {
            Some(value) => value.parse().map_err(|_| Error::Database {
                reason: format!("Invalid value for tag {}: {}", Self::KEY_NEXT_SAMPLE, value)
            })?,
            None => 0,
        };
        if next > u16::MAX as usize {
            return Err(Error::RegistryFull);
        }
        let id = next as u16;

        transaction.execute(
            "INSERT INTO Samples(id, name) VALUES (?1, ?2)",
            (id, name)
        ).map_err(|x| Error::RegistryWrite { reason: x.to_string() })?;
        transaction.execute(
            "INSERT OR REPLACE INTO Tags(key, value) VALUES (?1, ?2)",
            (Self::KEY_NEXT_SAMPLE, (next + 1).to_string())
        ).map_err(|x| Error::RegistryWrite { reason: x.to_string() })?;
        transaction.commit().map_err(|x| Error::RegistryWrite { reason: x.to_string() })?;

        self.samples += 1;
        Ok(id)
    }

    /// Returns the name of the sample with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSample`] if there is no registry entry for the identifier.
    /// That should not happen for identifiers produced by this database.
    pub fn resolve_sample(&self, id: u16) -> Result<String> {
        let name: Option<String> = self.connection.query_row(
            "SELECT name FROM Samples WHERE id = ?1",
            (id,), |row| row.get(0)
        ).optional()?;
        name.ok_or(Error::UnknownSample { id })
    }
}

//-----------------------------------------------------------------------------

/// Count query interface.
///
/// This structure stores prepared statements for reading the counts table.
///
/// # Examples
///
/// ```
/// use kmer_base::{index_counts, utils, CountsInterface, IndexParams, KmerBase};
/// use std::fs;
///
/// // Create the database and index some counts.
/// let db_file = utils::temp_file_name("counts-interface");
/// KmerBase::create(&db_file).unwrap();
/// let mut database = KmerBase::open_read_write(&db_file).unwrap();
/// let kmer = "GATTACACACCAGATAACATTGAACCTTACAC";
/// let input = vec![Ok((String::from(kmer), 5))];
/// let params = IndexParams::default();
/// let statistics = index_counts(&mut database, "alice", input, &params).unwrap();
/// assert_eq!(statistics.observations, 1);
/// drop(database);
///
/// // Open the database read-only and query the k-mer.
/// let database = KmerBase::open(&db_file).unwrap();
/// let mut interface = CountsInterface::new(&database).unwrap();
/// let result = interface.query(kmer).unwrap();
/// assert_eq!(result, vec![(String::from("alice"), 5)]);
///
/// // A k-mer that was never indexed has an empty result.
/// let absent = interface.query("ACGTACGTACGTACGTACGTACGTACGTACGT").unwrap();
/// assert!(absent.is_empty());
///
/// // Clean up.
/// drop(interface);
/// drop(database);
/// fs::remove_file(&db_file).unwrap();
/// ```
#[derive(Debug)]
pub struct CountsInterface<'a> {
    get_record: Statement<'a>,
    get_sample: Statement<'a>,
    all_samples: Statement<'a>,
    dump_counts: Statement<'a>,
}

impl<'a> CountsInterface<'a> {
    /// Returns a new interface to the given database.
    ///
    /// Passes through any database errors.
    pub fn new(database: &'a KmerBase) -> Result<Self> {
        let get_record = database.connection.prepare(
            "SELECT record FROM Counts WHERE key = ?1"
        )?;

        let get_sample = database.connection.prepare(
            "SELECT name FROM Samples WHERE id = ?1"
        )?;

        let all_samples = database.connection.prepare(
            "SELECT id, name FROM Samples"
        )?;

        let dump_counts = database.connection.prepare(
            "SELECT key, record FROM Counts ORDER BY key"
        )?;

        Ok(CountsInterface {
            get_record, get_sample,
            all_samples, dump_counts,
        })
    }

    /// Returns the stored record for the given encoded key, or [`None`] if the key is absent.
    pub fn get_record(&mut self, key: u64) -> Result<Option<Vec<u8>>> {
        let result = self.get_record.query_row(
            (&kmer::key_bytes(key)[..],), |row| row.get(0)
        ).optional()?;
        Ok(result)
    }

    fn resolve(&mut self, id: u16) -> Result<String> {
        let name: Option<String> = self.get_sample.query_row(
            (id,), |row| row.get(0)
        ).optional()?;
        name.ok_or(Error::UnknownSample { id })
    }

    fn expand_record(&mut self, bytes: &[u8]) -> Result<Vec<(String, u16)>> {
        let observations = CountRecord::decode(bytes)?;
        let mut result = Vec::with_capacity(observations.len());
        for observation in observations {
            let name = self.resolve(observation.sample)?;
            result.push((name, observation.count));
        }
        Ok(result)
    }

    /// Returns the expanded record for the given k-mer.
    ///
    /// Each entry is a (sample name, count) pair in insertion order.
    /// A k-mer that was never indexed has an empty result; absence is not an error.
    ///
    /// # Errors
    ///
    /// Passes through codec errors for the k-mer and corruption errors for the stored record.
    pub fn query(&mut self, kmer: &str) -> Result<Vec<(String, u16)>> {
        let key = kmer::encode_kmer(kmer)?;
        match self.get_record(key)? {
            Some(bytes) => self.expand_record(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Returns a lazy iterator over the entire counts table in ascending numeric key order.
    ///
    /// The iterator yields (k-mer, expanded record) pairs.
    /// Sample names are resolved through a map loaded when the iterator is created.
    /// The iterator is single-pass; a new pass requires a new call to this method.
    pub fn dump(&mut self) -> Result<Dump<'_>> {
        let mut samples: HashMap<u16, String> = HashMap::new();
        let mut rows = self.all_samples.query(())?;
        while let Some(row) = rows.next()? {
            let id: u16 = row.get(0)?;
            let name: String = row.get(1)?;
            samples.insert(id, name);
        }
        drop(rows);

        let rows = self.dump_counts.query(())?;
        Ok(Dump {
            rows,
            samples,
            previous: None,
        })
    }

    /// Runs `n` point lookups with randomly generated keys and returns the number of hits.
    ///
    /// This exercises the same lookup path as [`CountsInterface::query`].
    /// It is intended for benchmarking and has no correctness contract beyond
    /// not corrupting the database.
    pub fn random_queries(&mut self, n: usize, rng: &mut impl Rng) -> Result<usize> {
        let mut hits = 0;
        for _ in 0..n {
            let key: u64 = rng.gen();
            if self.get_record(key)?.is_some() {
                hits += 1;
            }
        }
        Ok(hits)
    }
}

//-----------------------------------------------------------------------------

/// A lazy single-pass iterator over the counts table in ascending numeric key order.
///
/// Created with [`CountsInterface::dump`].
/// Each item is a (k-mer, expanded record) pair or an error.
pub struct Dump<'a> {
    rows: Rows<'a>,
    samples: HashMap<u16, String>,
    previous: Option<u64>,
}

impl Dump<'_> {
    fn expand(&self, key_blob: &[u8], record_blob: &[u8]) -> Result<(String, Vec<(String, u16)>)> {
        let key = kmer::key_from_bytes(key_blob)?;
        let observations = CountRecord::decode(record_blob)?;
        let mut expanded = Vec::with_capacity(observations.len());
        for observation in observations {
            let name = self.samples.get(&observation.sample).ok_or(
                Error::UnknownSample { id: observation.sample }
            )?;
            expanded.push((name.clone(), observation.count));
        }
        Ok((kmer::decode_kmer(key), expanded))
    }
}

impl Iterator for Dump<'_> {
    type Item = Result<(String, Vec<(String, u16)>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(x) => return Some(Err(x.into())),
        };
        let key_blob: Vec<u8> = match row.get(0) {
            Ok(blob) => blob,
            Err(x) => return Some(Err(x.into())),
        };
        let record_blob: Vec<u8> = match row.get(1) {
            Ok(blob) => blob,
            Err(x) => return Some(Err(x.into())),
        };

        // The store iterates keys in bytewise order, which must equal numeric order.
        if let (Some(previous), Ok(key)) = (self.previous, kmer::key_from_bytes(&key_blob)) {
            debug_assert!(previous < key, "Keys are not in ascending numeric order");
        }
        if let Ok(key) = kmer::key_from_bytes(&key_blob) {
            self.previous = Some(key);
        }

        Some(self.expand(&key_blob, &record_blob))
    }
}

//-----------------------------------------------------------------------------

// Executes the statement, which is expected to return a single string value for the key.
// Then returns the value as an integer.
fn get_numeric_value(statement: &mut Statement, key: &str) -> Result<usize> {
    let value: Option<String> = statement.query_row(
        (key,), |row| row.get(0)
    ).optional()?;
    let value = value.ok_or(Error::Database {
        reason: format!("The database does not contain a {} tag", key)
    })?;
    value.parse::<usize>().map_err(|_| Error::Database {
        reason: format!("Invalid numeric value for key {}: {}", key, value)
    })
}

//-----------------------------------------------------------------------------
