//! Count records: the values stored for encoded k-mer keys.
//!
//! The value stored for one key is a sequence of [`Observation`] values in insertion order.
//! Each observation takes [`Observation::LENGTH`] bytes, so the length of a stored record
//! is always a multiple of the observation width.
//! The codec reads and writes the records explicitly; stored byte buffers are never
//! reinterpreted in place.

use crate::error::{Error, Result};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// One count observation: a sample identifier and an occurrence count.
///
/// An indexing run that sees the same k-mer twice for the same sample appends
/// two separate observations rather than summing the counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    /// Identifier of the sample in the registry.
    pub sample: u16,

    /// Occurrence count for the k-mer in the sample.
    pub count: u16,
}

impl Observation {
    /// Width of an encoded observation in bytes.
    pub const LENGTH: usize = 4;

    /// Creates a new observation.
    ///
    /// Counts beyond 65535 silently wrap to 16 bits.
    /// This is a documented limitation of the storage format.
    pub fn new(sample: u16, count: u64) -> Self {
        Observation { sample, count: count as u16 }
    }

    fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.sample.to_le_bytes());
        buffer.extend_from_slice(&self.count.to_le_bytes());
    }

    fn read_from(bytes: &[u8]) -> Self {
        let sample = u16::from_le_bytes([bytes[0], bytes[1]]);
        let count = u16::from_le_bytes([bytes[2], bytes[3]]);
        Observation { sample, count }
    }
}

//-----------------------------------------------------------------------------

/// Codec for the count records stored in the counts table.
#[derive(Debug)]
pub struct CountRecord;

impl CountRecord {
    /// Decodes a stored record into a sequence of observations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] if the length is not a multiple of
    /// [`Observation::LENGTH`]. That indicates a corrupted database.
    pub fn decode(bytes: &[u8]) -> Result<Vec<Observation>> {
        if bytes.len() % Observation::LENGTH != 0 {
            return Err(Error::MalformedRecord { len: bytes.len() });
        }
        let result = bytes.chunks_exact(Observation::LENGTH)
            .map(Observation::read_from)
            .collect();
        Ok(result)
    }

    /// Encodes a sequence of observations in sequence order.
    pub fn encode(observations: &[Observation]) -> Vec<u8> {
        let mut result = Vec::with_capacity(observations.len() * Observation::LENGTH);
        for observation in observations {
            observation.write_to(&mut result);
        }
        result
    }

    /// Appends an observation to a possibly absent stored record and returns the new record.
    ///
    /// An absent record means no prior observations for the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] if the existing record cannot be decoded.
    pub fn append(existing: Option<&[u8]>, observation: Observation) -> Result<Vec<u8>> {
        let mut observations = match existing {
            Some(bytes) => Self::decode(bytes)?,
            None => Vec::new(),
        };
        observations.push(observation);
        Ok(Self::encode(&observations))
    }
}

//-----------------------------------------------------------------------------
