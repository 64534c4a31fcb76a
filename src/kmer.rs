//! K-mer encoding: packing a fixed-length nucleotide string into a 64-bit key.
//!
//! A k-mer is a string of exactly [`KMER_LENGTH`] symbols over the alphabet `ACGT`.
//! Each symbol maps to a 2-bit code, and the codes are packed into a [`u64`] most-significant symbol first.
//! The mapping is a bijection, so [`decode_kmer`] inverts [`encode_kmer`] for all valid k-mers.
//!
//! Keys are persisted as 8-byte big-endian blobs ([`key_bytes`]).
//! With that layout, the bytewise blob order used by the store is the same as the numeric order of the keys.
//! [`compare_key_bytes`] defines that order explicitly over persisted key forms.
//! A database written with this layout must always be read with the same layout, or the keys are misread.

use crate::error::{Error, Result};

use std::cmp::Ordering;


//-----------------------------------------------------------------------------

/// Number of symbols in a k-mer.
pub const KMER_LENGTH: usize = 32;

/// Width of a persisted key in bytes.
pub const KEY_LENGTH: usize = 8;

// 2-bit codes in alphabetical order: A = 0, C = 1, G = 2, T = 3.
// Symbols outside the alphabet map to an out-of-range code.
const fn generate_encoding() -> [u8; 256] {
    let mut result = [4u8; 256];
    result[b'A' as usize] = 0;
    result[b'C' as usize] = 1;
    result[b'G' as usize] = 2;
    result[b'T' as usize] = 3;
    result
}

const ENCODE: [u8; 256] = generate_encoding();

const DECODE: [u8; 4] = [b'A', b'C', b'G', b'T'];

//-----------------------------------------------------------------------------

/// Encodes a k-mer into a 64-bit key, most-significant symbol first.
///
/// # Errors
///
/// Returns [`Error::InvalidLength`] if the input is not exactly [`KMER_LENGTH`] symbols long.
/// Returns [`Error::InvalidSymbol`] if the input contains a symbol outside `ACGT`.
///
/// # Examples
///
/// ```
/// use kmer_base::kmer;
///
/// let forward = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAGA";
/// let key = kmer::encode_kmer(forward).unwrap();
/// assert_eq!(key, 8);
/// assert_eq!(kmer::decode_kmer(key), forward);
/// ```
pub fn encode_kmer(kmer: &str) -> Result<u64> {
    let bytes = kmer.as_bytes();
    if bytes.len() != KMER_LENGTH {
        return Err(Error::InvalidLength { len: bytes.len() });
    }

    let mut key: u64 = 0;
    for (offset, byte) in bytes.iter().enumerate() {
        let code = ENCODE[*byte as usize];
        if code >= 4 {
            return Err(Error::InvalidSymbol { symbol: *byte as char, offset });
        }
        key = (key << 2) | (code as u64);
    }

    Ok(key)
}

/// Decodes a 64-bit key back into a k-mer, most-significant 2 bits first.
///
/// This is the inverse of [`encode_kmer`]: every [`u64`] value decodes to a valid k-mer.
pub fn decode_kmer(key: u64) -> String {
    let mut result = String::with_capacity(KMER_LENGTH);
    for symbol in (0..KMER_LENGTH).rev() {
        let code = ((key >> (2 * symbol)) & 3) as usize;
        result.push(DECODE[code] as char);
    }
    result
}

//-----------------------------------------------------------------------------

/// Returns the persisted form of a key: [`KEY_LENGTH`] bytes in big-endian order.
///
/// The big-endian layout makes the bytewise order of persisted keys equal to their numeric order.
pub fn key_bytes(key: u64) -> [u8; KEY_LENGTH] {
    key.to_be_bytes()
}

/// Decodes a persisted key.
///
/// # Errors
///
/// Returns [`Error::MalformedKey`] if the input is not exactly [`KEY_LENGTH`] bytes long.
/// That indicates a corrupted database.
pub fn key_from_bytes(bytes: &[u8]) -> Result<u64> {
    let array: [u8; KEY_LENGTH] = bytes.try_into().map_err(
        |_| Error::MalformedKey { len: bytes.len() }
    )?;
    Ok(u64::from_be_bytes(array))
}

/// Compares two persisted keys by their numeric values.
///
/// This is the total order in which the counts table is iterated.
/// It must agree with the bytewise order of the persisted forms; see [`key_bytes`].
///
/// # Errors
///
/// Returns [`Error::MalformedKey`] if either input has the wrong length.
pub fn compare_key_bytes(left: &[u8], right: &[u8]) -> Result<Ordering> {
    let left = key_from_bytes(left)?;
    let right = key_from_bytes(right)?;
    Ok(left.cmp(&right))
}

//-----------------------------------------------------------------------------
