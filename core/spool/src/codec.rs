//! On-disk record encoding: plain JSON or gzip with a checksum header.
//!
//! Records above the compression threshold are gzip-compressed; the
//! SHA-256 of the uncompressed bytes is stored hex-encoded in the gzip
//! header comment field. Decoding recomputes and verifies it, so a
//! truncated or bit-flipped record surfaces as an integrity failure
//! instead of silently feeding garbage downstream.

use std::io::Read;
use std::io::Write;

use flate2::Compression;
use flate2::GzBuilder;
use flate2::read::GzDecoder;
use sha2::Digest;
use sha2::Sha256;

use crate::error::Result;
use crate::error::spool_error;

/// File extension for plain records.
pub const PLAIN_EXT: &str = "json";
/// File extension for compressed records.
pub const COMPRESSED_EXT: &str = "json.gz";

/// Hex SHA-256 of `bytes`.
pub fn checksum_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Gzip-compress `bytes`, embedding their checksum in the header comment.
pub fn compress(name: &str, bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .comment(checksum_hex(bytes).into_bytes())
        .write(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .and_then(|()| encoder.finish())
        .map_err(|e| {
            spool_error::MalformedSnafu {
                name: name.to_string(),
                message: format!("compression failed: {e}"),
            }
            .build()
        })
}

/// Decompress a record produced by [`compress`], verifying its checksum.
pub fn decompress(name: &str, bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);

    // The header is only guaranteed parsed once decompression has run.
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| {
        spool_error::MalformedSnafu {
            name: name.to_string(),
            message: format!("decompression failed: {e}"),
        }
        .build()
    })?;

    let stored = decoder
        .header()
        .and_then(|h| h.comment())
        .map(|c| String::from_utf8_lossy(c).to_string())
        .ok_or_else(|| {
            spool_error::MissingChecksumSnafu {
                name: name.to_string(),
            }
            .build()
        })?;

    let computed = checksum_hex(&out);
    if computed != stored {
        return Err(spool_error::IntegritySnafu {
            name: name.to_string(),
            stored,
            computed,
        }
        .build());
    }
    Ok(out)
}

#[cfg(test)]
#[path = "codec.test.rs"]
mod tests;
