//! Vector Codec
//!
//! Fixed-width byte encoding for embedding vectors.
//! Each value is stored as its 4-byte little-endian IEEE-754 bit pattern.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{RagError, Result};

/// Width of one encoded value
pub const FLOAT_WIDTH: usize = std::mem::size_of::<f32>();

/// Encode a vector to bytes
pub fn encode(vector: &[f32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(vector.len() * FLOAT_WIDTH);
    for value in vector {
        buf.put_f32_le(*value);
    }
    buf.freeze()
}

/// Decode bytes back into a vector.
///
/// Fails with [`RagError::MalformedVector`] when the length is not a
/// multiple of [`FLOAT_WIDTH`].
pub fn decode(mut bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % FLOAT_WIDTH != 0 {
        return Err(RagError::MalformedVector { len: bytes.len() });
    }

    let mut vector = Vec::with_capacity(bytes.len() / FLOAT_WIDTH);
    while bytes.has_remaining() {
        vector.push(bytes.get_f32_le());
    }
    Ok(vector)
}

/// Number of dimensions an encoded blob holds, if well-formed
pub fn dimension(bytes: &[u8]) -> Option<usize> {
    (bytes.len() % FLOAT_WIDTH == 0).then(|| bytes.len() / FLOAT_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(v: &[f32]) -> Vec<u32> {
        v.iter().map(|x| x.to_bits()).collect()
    }

    #[test]
    fn test_roundtrip_bit_exact() {
        let v = vec![
            0.0,
            -0.0,
            1.5,
            -3.25e-12,
            f32::MAX,
            f32::MIN_POSITIVE,
            f32::INFINITY,
            f32::from_bits(0x7fc0_0001), // NaN with payload
        ];
        let decoded = decode(&encode(&v)).unwrap();
        assert_eq!(bits(&decoded), bits(&v));
    }

    #[test]
    fn test_encoding_layout() {
        let encoded = encode(&[1.0]);
        assert_eq!(encoded.as_ref(), &1.0f32.to_le_bytes());
        assert_eq!(encode(&[1.0, 2.0, 3.0]).len(), 12);
    }

    #[test]
    fn test_empty_vector() {
        assert!(encode(&[]).is_empty());
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_length() {
        let err = decode(&[0u8; 7]).unwrap_err();
        assert!(matches!(err, RagError::MalformedVector { len: 7 }));
        assert_eq!(dimension(&[0u8; 7]), None);
        assert_eq!(dimension(&[0u8; 8]), Some(2));
    }
}
