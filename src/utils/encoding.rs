//! Bounds-checked primitives for reading snapshot buffers.
//!
//! Every reader takes the full buffer plus an absolute offset and returns the
//! decoded value together with the offset just past it. Nothing here panics on
//! malformed input; out-of-range reads surface as [`SnapshotError::CorruptData`].

use crate::error::{Result, SnapshotError};

/// Longest varint that can still fit in a u32 (5 × 7 bits)
const MAX_VARINT_LEN: usize = 5;

/// Encode a u32 as a variable-length integer
pub fn encode_varint(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Decode a variable-length integer starting at `offset`
/// Returns (value, next_offset)
pub fn read_varint_u32(buf: &[u8], offset: usize) -> Result<(u32, usize)> {
    let mut result: u32 = 0;
    let mut shift = 0;
    let mut pos = offset;

    loop {
        if pos - offset >= MAX_VARINT_LEN {
            return Err(SnapshotError::corrupt(format!(
                "varint at {} exceeds 32 bits",
                offset
            )));
        }

        let byte = *buf.get(pos).ok_or_else(|| {
            SnapshotError::corrupt(format!("truncated varint at {}", offset))
        })?;
        pos += 1;

        result |= ((byte & 0x7F) as u32) << shift;

        if byte & 0x80 == 0 {
            return Ok((result, pos));
        }

        shift += 7;
    }
}

/// Read a single byte
#[inline]
pub fn read_u8(buf: &[u8], offset: usize) -> Result<(u8, usize)> {
    buf.get(offset)
        .map(|&b| (b, offset + 1))
        .ok_or_else(|| SnapshotError::corrupt(format!("u8 read out of range at {}", offset)))
}

/// Read a u32 in little-endian format
#[inline]
pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<(u32, usize)> {
    let end = offset
        .checked_add(4)
        .ok_or_else(|| SnapshotError::corrupt("u32 offset overflow"))?;
    let bytes = buf
        .get(offset..end)
        .ok_or_else(|| SnapshotError::corrupt(format!("u32 read out of range at {}", offset)))?;
    Ok((u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), end))
}

/// Read a string prefixed by its 1-byte length
pub fn read_len_prefixed_str(buf: &[u8], offset: usize) -> Result<(&str, usize)> {
    let (len, start) = read_u8(buf, offset)?;
    let end = start + len as usize;
    let bytes = buf
        .get(start..end)
        .ok_or_else(|| SnapshotError::corrupt(format!("string at {} runs past end", offset)))?;
    let s = std::str::from_utf8(bytes)
        .map_err(|e| SnapshotError::corrupt(format!("invalid UTF-8 at {}: {}", offset, e)))?;
    Ok((s, end))
}

/// Write a u32 in little-endian format
pub fn write_u32_le(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let values = [0, 1, 127, 128, 16383, 16384, 2_097_151, 2_097_152, u32::MAX];
        for value in values {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            let (decoded, next) = read_varint_u32(&buf, 0).unwrap();
            assert_eq!(value, decoded);
            assert_eq!(next, buf.len());
        }
    }

    #[test]
    fn test_varint_roundtrip_every_bit_width() {
        for bits in 0..32 {
            let value = (1u32 << bits) | ((1u32 << bits) - 1);
            let mut buf = vec![0xAA];
            encode_varint(value, &mut buf);
            let (decoded, next) = read_varint_u32(&buf, 1).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(next, buf.len());
        }
    }

    #[test]
    fn test_varint_truncated() {
        assert!(matches!(
            read_varint_u32(&[0x80, 0x80], 0),
            Err(SnapshotError::CorruptData(_))
        ));
        assert!(read_varint_u32(&[], 0).is_err());
        assert!(read_varint_u32(&[0x01], 1).is_err());
    }

    #[test]
    fn test_varint_too_long() {
        let buf = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert!(read_varint_u32(&buf, 0).is_err());
    }

    #[test]
    fn test_fixed_reads() {
        let buf = [0x01, 0x00, 0x00, 0x00, 0x7F];
        assert_eq!(read_u32_le(&buf, 0).unwrap(), (1, 4));
        assert_eq!(read_u8(&buf, 4).unwrap(), (0x7F, 5));
        assert!(read_u32_le(&buf, 2).is_err());
        assert!(read_u8(&buf, 5).is_err());
        assert!(read_u32_le(&buf, usize::MAX - 1).is_err());
    }

    #[test]
    fn test_len_prefixed_str() {
        let mut buf = vec![3];
        buf.extend_from_slice(b"ana");
        assert_eq!(read_len_prefixed_str(&buf, 0).unwrap(), ("ana", 4));

        // Length claims more bytes than exist
        assert!(read_len_prefixed_str(&[5, b'a'], 0).is_err());

        // Invalid UTF-8 is corrupt data, not a panic
        let bad = [2, 0xC3, 0x28];
        assert!(matches!(
            read_len_prefixed_str(&bad, 0),
            Err(SnapshotError::CorruptData(_))
        ));
    }
}
