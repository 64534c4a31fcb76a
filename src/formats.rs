//! Reading k-mer count files and writing count lines.
//!
//! A count file is a line-oriented text file, possibly gzip-compressed.
//! Each line contains whitespace-separated fields, with the k-mer in the first field
//! and its count in the second.
//! Lines with fewer than two fields or with an unparseable count are skipped,
//! which also makes `kmer<TAB>count` header lines harmless.

use crate::error::Result;
use crate::utils;

use std::io::{self, BufRead, Write};
use std::path::Path;


//-----------------------------------------------------------------------------

/// A lazy reader over the (k-mer, count) pairs in a count file.
///
/// The reader yields one pair per qualifying line in input order.
/// Counts are parsed as [`u64`]; the storage layer truncates them to 16 bits.
/// I/O errors from the underlying reader terminate the run.
///
/// # Examples
///
/// ```
/// use kmer_base::formats::CountReader;
///
/// let input = b"GATTACACACCAGATAACATTGAACCTTACAC 5\nkmer count\nACGT 1\nACGTACGTACGTACGTACGTACGTACGTACGT 12\n" as &[u8];
/// let pairs: Vec<(String, u64)> = CountReader::new(input).map(|x| x.unwrap()).collect();
/// assert_eq!(pairs.len(), 3);
/// assert_eq!(pairs[0].1, 5);
/// assert_eq!(pairs[1], (String::from("ACGT"), 1));
/// assert_eq!(pairs[2].1, 12);
/// ```
#[derive(Debug)]
pub struct CountReader<R: BufRead> {
    reader: R,
}

impl CountReader<Box<dyn BufRead>> {
    /// Opens the given count file, which may be gzip-compressed.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let reader = utils::open_file(filename)?;
        Ok(CountReader { reader })
    }
}

impl<R: BufRead> CountReader<R> {
    /// Creates a new reader over the given input.
    pub fn new(reader: R) -> Self {
        CountReader { reader }
    }
}

impl<R: BufRead> Iterator for CountReader<R> {
    type Item = Result<(String, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => (),
                Err(x) => return Some(Err(x.into())),
            }
            let mut fields = line.split_ascii_whitespace();
            let kmer = match fields.next() {
                Some(field) => field,
                None => continue,
            };
            let count = match fields.next().and_then(|field| field.parse::<u64>().ok()) {
                Some(count) => count,
                None => continue,
            };
            return Some(Ok((kmer.to_string(), count)));
        }
    }
}

//-----------------------------------------------------------------------------

/// Writes one output line for a k-mer and its expanded record.
///
/// The line format is `kmer<TAB>name:count[,name:count...]`.
pub fn write_count_line<T: Write>(
    kmer: &str, observations: &[(String, u16)], output: &mut T
) -> io::Result<()> {
    let mut buffer: Vec<u8> = Vec::new();
    buffer.extend_from_slice(kmer.as_bytes());
    buffer.push(b'\t');
    for (index, (name, count)) in observations.iter().enumerate() {
        if index > 0 {
            buffer.push(b',');
        }
        buffer.extend_from_slice(name.as_bytes());
        buffer.push(b':');
        buffer.extend_from_slice(count.to_string().as_bytes());
    }
    buffer.push(b'\n');
    output.write_all(&buffer)
}

//-----------------------------------------------------------------------------
