#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;
use crate::error::SpoolError;

#[test]
fn test_compress_round_trip() {
    let payload = br#"{"id":"e-1","type":"task_completion","title":"done"}"#;
    let compressed = compress("e-1", payload).unwrap();
    let restored = decompress("e-1", &compressed).unwrap();
    assert_eq!(restored, payload.to_vec());
}

#[test]
fn test_large_payload_shrinks() {
    let payload = "x".repeat(16 * 1024).into_bytes();
    let compressed = compress("big", &payload).unwrap();
    assert!(compressed.len() < payload.len() / 4);
    assert_eq!(decompress("big", &compressed).unwrap(), payload);
}

#[test]
fn test_corruption_detected() {
    let payload = b"important event payload with enough length to matter".repeat(20);
    let mut compressed = compress("c-1", &payload).unwrap();

    // Flip a bit in the deflate stream, past the header.
    let mid = compressed.len() / 2;
    compressed[mid] ^= 0x40;

    let err = decompress("c-1", &compressed).unwrap_err();
    assert!(matches!(
        err,
        SpoolError::Integrity { .. } | SpoolError::Malformed { .. }
    ));
}

#[test]
fn test_missing_checksum_header() {
    use std::io::Write;

    // A gzip stream without a comment field.
    let mut encoder =
        flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"payload").unwrap();
    let bytes = encoder.finish().unwrap();

    let err = decompress("no-header", &bytes).unwrap_err();
    assert!(matches!(err, SpoolError::MissingChecksum { .. }));
}

#[test]
fn test_checksum_is_stable_hex() {
    let sum = checksum_hex(b"abc");
    assert_eq!(
        sum,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}
