use super::*;

//-----------------------------------------------------------------------------

#[test]
fn empty_record() {
    let encoded = CountRecord::encode(&[]);
    assert!(encoded.is_empty(), "Wrong length for an empty record");
    let decoded = CountRecord::decode(&encoded);
    assert!(decoded.is_ok(), "Failed to decode an empty record: {}", decoded.unwrap_err());
    assert!(decoded.unwrap().is_empty(), "Decoded observations from an empty record");
}

#[test]
fn round_trip() {
    let observations = vec![
        Observation::new(0, 5),
        Observation::new(1, 3),
        Observation::new(0, 7),
        Observation::new(42, 65535),
    ];
    let encoded = CountRecord::encode(&observations);
    assert_eq!(
        encoded.len(), observations.len() * Observation::LENGTH,
        "Wrong length for the encoded record"
    );
    let decoded = CountRecord::decode(&encoded);
    assert!(decoded.is_ok(), "Failed to decode the record: {}", decoded.unwrap_err());
    assert_eq!(decoded.unwrap(), observations, "Wrong observations after a round trip");
}

#[test]
fn insertion_order_is_preserved() {
    // Observations are stored in insertion order, not sorted by sample identifier.
    let observations = vec![
        Observation::new(9, 1),
        Observation::new(2, 2),
        Observation::new(5, 3),
    ];
    let encoded = CountRecord::encode(&observations);
    let decoded = CountRecord::decode(&encoded).unwrap();
    assert_eq!(decoded, observations, "Observations were reordered");
}

//-----------------------------------------------------------------------------

#[test]
fn append_to_absent() {
    let observation = Observation::new(3, 11);
    let record = CountRecord::append(None, observation);
    assert!(record.is_ok(), "Failed to append to an absent record: {}", record.unwrap_err());
    let decoded = CountRecord::decode(&record.unwrap()).unwrap();
    assert_eq!(decoded, vec![observation], "Wrong record after appending to an absent record");
}

#[test]
fn append_to_existing() {
    let first = Observation::new(0, 5);
    let second = Observation::new(1, 3);
    let record = CountRecord::append(None, first).unwrap();
    let record = CountRecord::append(Some(&record), second).unwrap();
    let decoded = CountRecord::decode(&record).unwrap();
    assert_eq!(decoded, vec![first, second], "Wrong record after two appends");
}

#[test]
fn malformed_record() {
    for len in [1, 2, 3, 5, 7, 9] {
        let bytes = vec![0u8; len];
        let result = CountRecord::decode(&bytes);
        assert!(
            matches!(result, Err(Error::MalformedRecord { len: l }) if l == len),
            "Accepted a record of {} bytes", len
        );
        let result = CountRecord::append(Some(&bytes), Observation::new(0, 1));
        assert!(result.is_err(), "Appended to a record of {} bytes", len);
    }
}

//-----------------------------------------------------------------------------

#[test]
fn count_wraps() {
    // Counts are truncated to 16 bits; values beyond 65535 wrap.
    assert_eq!(Observation::new(0, 65535).count, 65535);
    assert_eq!(Observation::new(0, 65536).count, 0);
    assert_eq!(Observation::new(0, 70000).count, 4464);
}

//-----------------------------------------------------------------------------
