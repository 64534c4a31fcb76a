use super::*;

use crate::record::Observation;

use std::fs;
use std::path::PathBuf;

//-----------------------------------------------------------------------------

fn create_database(name_part: &str) -> PathBuf {
    let db_file = utils::temp_file_name(name_part);
    assert!(!KmerBase::exists(&db_file), "Database {} already exists", db_file.display());
    let result = KmerBase::create(&db_file);
    assert!(result.is_ok(), "Failed to create database: {}", result.unwrap_err());
    db_file
}

fn open_database(filename: &PathBuf) -> KmerBase {
    let database = KmerBase::open(filename);
    assert!(database.is_ok(), "Failed to open database: {}", database.unwrap_err());
    database.unwrap()
}

fn open_database_read_write(filename: &PathBuf) -> KmerBase {
    let database = KmerBase::open_read_write(filename);
    assert!(database.is_ok(), "Failed to open database for writing: {}", database.unwrap_err());
    database.unwrap()
}

fn create_interface(database: &KmerBase) -> CountsInterface {
    let interface = CountsInterface::new(database);
    assert!(interface.is_ok(), "Failed to create counts interface: {}", interface.unwrap_err());
    interface.unwrap()
}

fn register(database: &mut KmerBase, name: &str) -> u16 {
    let id = database.register_sample(name);
    assert!(id.is_ok(), "Failed to register sample {}: {}", name, id.unwrap_err());
    id.unwrap()
}

// Inserts a raw record for the given key, bypassing the indexer.
fn insert_raw_record(database: &KmerBase, key: u64, record: &[u8]) {
    let result = database.connection.execute(
        "INSERT OR REPLACE INTO Counts(key, record) VALUES (?1, ?2)",
        (&kmer::key_bytes(key)[..], record),
    );
    assert!(result.is_ok(), "Failed to insert a raw record: {}", result.unwrap_err());
}

//-----------------------------------------------------------------------------

#[test]
fn create_and_open() {
    let db_file = create_database("create-and-open");
    let database = open_database(&db_file);

    assert_eq!(database.version(), KmerBase::VERSION, "Wrong database version");
    assert_eq!(database.kmer_length(), kmer::KMER_LENGTH, "Wrong k-mer length");
    assert_eq!(database.samples(), 0, "Samples in an empty database");
    assert_eq!(database.kmers(), 0, "K-mers in an empty database");
    assert!(database.filename().is_some(), "The database does not have a filename");
    assert!(database.file_size().is_some(), "The database does not have a file size");

    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn create_existing() {
    let db_file = create_database("create-existing");
    let result = KmerBase::create(&db_file);
    assert!(result.is_err(), "Created a database over an existing file");
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn open_missing() {
    let db_file = utils::temp_file_name("open-missing");
    let result = KmerBase::open(&db_file);
    assert!(result.is_err(), "Opened a nonexistent database");
}

#[test]
fn version_mismatch() {
    let db_file = create_database("version-mismatch");
    {
        let connection = Connection::open(&db_file).unwrap();
        connection.execute(
            "UPDATE Tags SET value = 'bogus' WHERE key = 'version'", ()
        ).unwrap();
    }

    let result = KmerBase::open(&db_file);
    assert!(
        matches!(result, Err(Error::Database { .. })),
        "Opened a database with an unsupported version"
    );
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn kmer_length_mismatch() {
    let db_file = create_database("kmer-length-mismatch");
    {
        let connection = Connection::open(&db_file).unwrap();
        connection.execute(
            "UPDATE Tags SET value = '21' WHERE key = 'kmer_length'", ()
        ).unwrap();
    }

    let result = KmerBase::open(&db_file);
    assert!(
        matches!(result, Err(Error::Database { .. })),
        "Opened a database with an unsupported k-mer length"
    );
    fs::remove_file(&db_file).unwrap();
}

//-----------------------------------------------------------------------------

#[test]
fn sequential_identifiers() {
    let db_file = create_database("sequential-identifiers");
    let mut database = open_database_read_write(&db_file);

    assert_eq!(register(&mut database, "s1"), 0, "Wrong identifier for the first sample");
    assert_eq!(register(&mut database, "s2"), 1, "Wrong identifier for the second sample");
    assert_eq!(register(&mut database, "s3"), 2, "Wrong identifier for the third sample");
    assert_eq!(database.samples(), 3, "Wrong number of samples");

    for (id, name) in [(0, "s1"), (1, "s2"), (2, "s3")] {
        let resolved = database.resolve_sample(id);
        assert!(resolved.is_ok(), "Failed to resolve sample {}: {}", id, resolved.unwrap_err());
        assert_eq!(resolved.unwrap(), name, "Wrong name for sample {}", id);
    }

    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn duplicate_registration() {
    let db_file = create_database("duplicate-registration");
    let mut database = open_database_read_write(&db_file);

    let first = register(&mut database, "alice");
    let second = register(&mut database, "alice");
    assert_eq!(first, second, "Duplicate registration assigned a new identifier");
    assert_eq!(register(&mut database, "bob"), 1, "Duplicate registration consumed an identifier");

    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn counter_persists_across_reopen() {
    let db_file = create_database("counter-persists");

    let mut database = open_database_read_write(&db_file);
    register(&mut database, "s1");
    register(&mut database, "s2");
    drop(database);

    let mut database = open_database_read_write(&db_file);
    assert_eq!(database.samples(), 2, "Wrong number of samples after reopening");
    assert_eq!(register(&mut database, "s3"), 2, "Wrong identifier after reopening");

    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn unknown_sample() {
    let db_file = create_database("unknown-sample");
    let database = open_database(&db_file);

    let result = database.resolve_sample(42);
    assert!(
        matches!(result, Err(Error::UnknownSample { id: 42 })),
        "Resolved a nonexistent sample identifier"
    );

    drop(database);
    fs::remove_file(&db_file).unwrap();
}

//-----------------------------------------------------------------------------

#[test]
fn query_absent_kmer() {
    let db_file = create_database("query-absent");
    let database = open_database(&db_file);
    let mut interface = create_interface(&database);

    let result = interface.query("GATTACACACCAGATAACATTGAACCTTACAC");
    assert!(result.is_ok(), "Querying an absent k-mer failed: {}", result.unwrap_err());
    assert!(result.unwrap().is_empty(), "Nonempty result for an absent k-mer");

    drop(interface);
    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn query_invalid_kmer() {
    let db_file = create_database("query-invalid");
    let database = open_database(&db_file);
    let mut interface = create_interface(&database);

    let result = interface.query("ACGT");
    assert!(matches!(result, Err(Error::InvalidLength { len: 4 })), "Accepted a short k-mer");
    let result = interface.query("NATTACACACCAGATAACATTGAACCTTACAC");
    assert!(matches!(result, Err(Error::InvalidSymbol { .. })), "Accepted an invalid symbol");

    drop(interface);
    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn query_expands_samples() {
    let db_file = create_database("query-expands");
    let mut database = open_database_read_write(&db_file);
    let alice = register(&mut database, "alice");
    let bob = register(&mut database, "bob");

    let key = 12345;
    let record = CountRecord::encode(&[
        Observation { sample: alice, count: 5 },
        Observation { sample: bob, count: 3 },
    ]);
    insert_raw_record(&database, key, &record);

    let mut interface = create_interface(&database);
    let result = interface.query(&kmer::decode_kmer(key)).unwrap();
    assert_eq!(
        result,
        vec![(String::from("alice"), 5), (String::from("bob"), 3)],
        "Wrong expanded record"
    );

    drop(interface);
    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn malformed_record_is_surfaced() {
    let db_file = create_database("malformed-record");
    let database = open_database_read_write(&db_file);
    let key = 7;
    insert_raw_record(&database, key, &[1, 2, 3]);

    let mut interface = create_interface(&database);
    let result = interface.query(&kmer::decode_kmer(key));
    assert!(
        matches!(result, Err(Error::MalformedRecord { len: 3 })),
        "A malformed record was not surfaced"
    );

    drop(interface);
    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn unknown_sample_in_record_is_surfaced() {
    let db_file = create_database("unknown-sample-record");
    let database = open_database_read_write(&db_file);
    let key = 7;
    let record = CountRecord::encode(&[Observation { sample: 9, count: 1 }]);
    insert_raw_record(&database, key, &record);

    let mut interface = create_interface(&database);
    let result = interface.query(&kmer::decode_kmer(key));
    assert!(
        matches!(result, Err(Error::UnknownSample { id: 9 })),
        "An unregistered sample identifier was not surfaced"
    );

    drop(interface);
    drop(database);
    fs::remove_file(&db_file).unwrap();
}

//-----------------------------------------------------------------------------

#[test]
fn dump_in_numeric_key_order() {
    let db_file = create_database("dump-order");
    let mut database = open_database_read_write(&db_file);
    let alice = register(&mut database, "alice");

    // Insert in an order that differs from the key order.
    for key in [5u64, 1, 3] {
        let record = CountRecord::encode(&[Observation { sample: alice, count: key as u16 }]);
        insert_raw_record(&database, key, &record);
    }

    let mut interface = create_interface(&database);
    let mut dumped: Vec<(String, Vec<(String, u16)>)> = Vec::new();
    for item in interface.dump().unwrap() {
        assert!(item.is_ok(), "Failed to dump a record: {}", item.unwrap_err());
        dumped.push(item.unwrap());
    }

    assert_eq!(dumped.len(), 3, "Wrong number of dumped records");
    for (index, key) in [1u64, 3, 5].iter().enumerate() {
        assert_eq!(dumped[index].0, kmer::decode_kmer(*key), "Wrong k-mer at offset {}", index);
        assert_eq!(
            dumped[index].1,
            vec![(String::from("alice"), *key as u16)],
            "Wrong expanded record at offset {}", index
        );
    }

    drop(interface);
    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn dump_empty_database() {
    let db_file = create_database("dump-empty");
    let database = open_database(&db_file);
    let mut interface = create_interface(&database);

    let mut dump = interface.dump().unwrap();
    assert!(dump.next().is_none(), "Dumped records from an empty database");

    drop(dump);
    drop(interface);
    drop(database);
    fs::remove_file(&db_file).unwrap();
}

#[test]
fn dump_is_restartable_with_a_new_call() {
    let db_file = create_database("dump-restart");
    let mut database = open_database_read_write(&db_file);
    let alice = register(&mut database, "alice");
    let record = CountRecord::encode(&[Observation { sample: alice, count: 1 }]);
    insert_raw_record(&database, 42, &record);

    let mut interface = create_interface(&database);
    for _ in 0..2 {
        let count = interface.dump().unwrap().count();
        assert_eq!(count, 1, "Wrong number of records in a dump pass");
    }

    drop(interface);
    drop(database);
    fs::remove_file(&db_file).unwrap();
}

//-----------------------------------------------------------------------------

#[test]
fn random_queries_count_hits() {
    let db_file = create_database("random-queries");
    let mut database = open_database_read_write(&db_file);
    let alice = register(&mut database, "alice");
    let record = CountRecord::encode(&[Observation { sample: alice, count: 1 }]);
    insert_raw_record(&database, 42, &record);

    let mut interface = create_interface(&database);
    let mut rng = rand::thread_rng();
    let hits = interface.random_queries(100, &mut rng);
    assert!(hits.is_ok(), "Random queries failed: {}", hits.unwrap_err());
    // A hit requires generating one specific key out of 2^64; expect none.
    assert_eq!(hits.unwrap(), 0, "Unexpected hits from random queries");

    drop(interface);
    drop(database);
    fs::remove_file(&db_file).unwrap();
}

//-----------------------------------------------------------------------------
