//! Codec Module
//!
//! Turns caller values into stored payloads and back: JSON serialization
//! wrapped in a gzip stream.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Upper bound on an inflated payload.
pub const MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

// == Encode ==
/// Serializes `value` and compresses the result.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let serialized =
        serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    compress(&serialized)
}

// == Decode ==
/// Decompresses and deserializes a stored payload.
///
/// Empty input decodes to `None`. Payloads that fail to inflate or parse are
/// retried as raw uncompressed JSON, which is how entries written before
/// compression was introduced are stored.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>> {
    if bytes.is_empty() {
        return Ok(None);
    }

    let compressed_attempt = decompress(bytes).and_then(|inflated| deserialize(&inflated));
    match compressed_attempt {
        Ok(value) => Ok(Some(value)),
        Err(first) => match deserialize(bytes) {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(first),
        },
    }
}

// == Compression ==
/// Gzip-compresses a byte payload.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Inflates a gzip stream, refusing output larger than `MAX_DECOMPRESSED_SIZE`.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = decoder
            .read(&mut buffer)
            .map_err(|e| CacheError::Deserialization(format!("inflate failed: {}", e)))?;

        if bytes_read == 0 {
            break;
        }

        if decompressed.len() + bytes_read > MAX_DECOMPRESSED_SIZE {
            return Err(CacheError::Deserialization(format!(
                "payload inflates beyond {} bytes",
                MAX_DECOMPRESSED_SIZE
            )));
        }

        decompressed.extend_from_slice(&buffer[..bytes_read]);
    }

    Ok(decompressed)
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
}
