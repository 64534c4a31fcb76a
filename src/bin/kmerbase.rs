use std::io::{self, Write};
use std::time::Instant;
use std::{env, process};

use getopts::Options;

use kmer_base::formats::{self, CountReader};
use kmer_base::{index_counts, CountsInterface, IndexParams, KmerBase};

//-----------------------------------------------------------------------------

const DEFAULT_DB: &str = "kmer-base.db";

fn main() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
        process::exit(1);
    }

    match args[1].as_str() {
        "index" => index_command(&args),
        "query" => query_command(&args),
        "dump" => dump_command(&args),
        "random-query" => random_query_command(&args),
        command => {
            eprintln!("Unrecognized command: {}", command);
            usage(&args[0]);
            process::exit(1);
        }
    }
}

fn usage(program: &str) {
    eprintln!();
    eprintln!("Usage:   {} <command> <arguments>", program);
    eprintln!("Version: {}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  index         Index k-mer counts from a sample");
    eprintln!("  query         Query the counts for one k-mer");
    eprintln!("  dump          Dump the entire database");
    eprintln!("  random-query  Run random point queries");
    eprintln!();
}

//-----------------------------------------------------------------------------

fn index_command(args: &[String]) -> Result<(), String> {
    let start_time = Instant::now();
    let config = IndexConfig::new(args);

    if !KmerBase::exists(&config.db_file) {
        KmerBase::create(&config.db_file).map_err(|x| x.to_string())?;
    }
    let mut database = KmerBase::open_read_write(&config.db_file).map_err(|x| x.to_string())?;
    let reader = CountReader::open(&config.counts_file).map_err(|x| x.to_string())?;

    let params = IndexParams::default();
    let statistics = index_counts(&mut database, &config.sample_name, reader, &params)
        .map_err(|x| x.to_string())?;

    eprintln!(
        "Indexed {} k-mer counts ({} new k-mers) in {} batches",
        statistics.observations, statistics.new_kmers, statistics.flushes
    );
    eprintln!("Database size: {}", database.file_size().unwrap_or(String::from("unknown")));

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

struct IndexConfig {
    pub db_file: String,
    pub sample_name: String,
    pub counts_file: String,
}

impl IndexConfig {
    pub fn new(args: &[String]) -> IndexConfig {
        let program = format!("{} index", args[0]);
        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("d", "database", "database file (default: kmer-base.db)", "FILE");
        let matches = match opts.parse(&args[2..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] sample_name counts.tsv", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        let db_file = matches.opt_str("d").unwrap_or(String::from(DEFAULT_DB));
        if matches.free.len() < 2 {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        }

        IndexConfig {
            db_file,
            sample_name: matches.free[0].clone(),
            counts_file: matches.free[1].clone(),
        }
    }
}

//-----------------------------------------------------------------------------

fn query_command(args: &[String]) -> Result<(), String> {
    let config = QueryConfig::new(args);

    let database = KmerBase::open(&config.db_file).map_err(|x| x.to_string())?;
    let mut interface = CountsInterface::new(&database).map_err(|x| x.to_string())?;
    let result = interface.query(&config.kmer).map_err(|x| x.to_string())?;

    // An absent k-mer has an empty result and produces no output.
    if !result.is_empty() {
        let mut output = io::stdout();
        formats::write_count_line(&config.kmer, &result, &mut output).map_err(|x| x.to_string())?;
    }

    Ok(())
}

struct QueryConfig {
    pub db_file: String,
    pub kmer: String,
}

impl QueryConfig {
    pub fn new(args: &[String]) -> QueryConfig {
        let program = format!("{} query", args[0]);
        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("d", "database", "database file (default: kmer-base.db)", "FILE");
        let matches = match opts.parse(&args[2..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] kmer", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        let db_file = matches.opt_str("d").unwrap_or(String::from(DEFAULT_DB));
        let kmer = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        QueryConfig { db_file, kmer }
    }
}

//-----------------------------------------------------------------------------

fn dump_command(args: &[String]) -> Result<(), String> {
    let config = DumpConfig::new(args);

    let database = KmerBase::open(&config.db_file).map_err(|x| x.to_string())?;
    let mut interface = CountsInterface::new(&database).map_err(|x| x.to_string())?;

    let stdout = io::stdout();
    let mut output = stdout.lock();
    for item in interface.dump().map_err(|x| x.to_string())? {
        let (kmer, observations) = item.map_err(|x| x.to_string())?;
        formats::write_count_line(&kmer, &observations, &mut output).map_err(|x| x.to_string())?;
    }
    output.flush().map_err(|x| x.to_string())?;

    Ok(())
}

struct DumpConfig {
    pub db_file: String,
}

impl DumpConfig {
    pub fn new(args: &[String]) -> DumpConfig {
        let program = format!("{} dump", args[0]);
        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("d", "database", "database file (default: kmer-base.db)", "FILE");
        let matches = match opts.parse(&args[2..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        if matches.opt_present("h") {
            let header = format!("Usage: {} [options]", program);
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        let db_file = matches.opt_str("d").unwrap_or(String::from(DEFAULT_DB));

        DumpConfig { db_file }
    }
}

//-----------------------------------------------------------------------------

fn random_query_command(args: &[String]) -> Result<(), String> {
    let start_time = Instant::now();
    let config = RandomQueryConfig::new(args);

    let database = KmerBase::open(&config.db_file).map_err(|x| x.to_string())?;
    let mut interface = CountsInterface::new(&database).map_err(|x| x.to_string())?;

    let mut rng = rand::thread_rng();
    let hits = interface.random_queries(config.queries, &mut rng).map_err(|x| x.to_string())?;
    eprintln!("{} hits in {} random queries", hits, config.queries);

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

struct RandomQueryConfig {
    pub db_file: String,
    pub queries: usize,
}

impl RandomQueryConfig {
    pub fn new(args: &[String]) -> RandomQueryConfig {
        let program = format!("{} random-query", args[0]);
        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("d", "database", "database file (default: kmer-base.db)", "FILE");
        let matches = match opts.parse(&args[2..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] n", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        let db_file = matches.opt_str("d").unwrap_or(String::from(DEFAULT_DB));
        let queries = if let Some(s) = matches.free.first() {
            match s.parse::<usize>() {
                Ok(n) => n,
                Err(f) => {
                    eprintln!("Invalid number of queries: {}", f);
                    process::exit(1);
                }
            }
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        RandomQueryConfig { db_file, queries }
    }
}

//-----------------------------------------------------------------------------
