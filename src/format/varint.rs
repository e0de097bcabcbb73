//! Variable-length unsigned integer codec.
//!
//! Encodes u64 values in 1–10 bytes, most-significant group first. Each
//! byte carries 7 payload bits; the high bit is a continuation flag
//! (1 = more bytes follow, 0 = terminator).
//!
//! ```text
//! value range          bytes
//! 0 .. 2^7-1           1
//! 2^7 .. 2^14-1        2
//! ...                  ...
//! 2^63 .. 2^64-1       10
//! ```

use crate::error::{DocError, Result};
use crate::memfile::MemFile;

/// Longest possible encoding (10 × 7 bits covers 64).
pub const MAX_LEN: usize = 10;

const CONTINUATION: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7F;

/// Number of bytes `encode` produces for `value`.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    std::cmp::max(1, bits.div_ceil(7))
}

/// Encode into a fixed buffer; returns the buffer and the byte count.
pub fn encode(value: u64) -> ([u8; MAX_LEN], usize) {
    let mut buf = [0u8; MAX_LEN];
    let n = encoded_len(value);
    for (i, slot) in buf.iter_mut().enumerate().take(n) {
        let shift = 7 * (n - 1 - i);
        let group = ((value >> shift) as u8) & PAYLOAD_MASK;
        *slot = if i + 1 < n { CONTINUATION | group } else { group };
    }
    (buf, n)
}

/// Decode from the front of a byte slice; returns (value, bytes consumed).
pub fn decode(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if i == MAX_LEN {
            return Err(DocError::InvalidVarInt);
        }
        value = (value << 7) | u64::from(b & PAYLOAD_MASK);
        if b & CONTINUATION == 0 {
            return Ok((value, i + 1));
        }
    }
    if bytes.len() >= MAX_LEN {
        return Err(DocError::InvalidVarInt);
    }
    Err(DocError::OutOfBounds {
        position: 0,
        requested: bytes.len() + 1,
        size: bytes.len(),
    })
}

// ── MemFile helpers ────────────────────────────────────────────────

/// Read a varint at the cursor, advancing past it.
pub fn read(mem: &mut MemFile<'_>) -> Result<u64> {
    let avail = std::cmp::min(mem.remaining(), MAX_LEN);
    let (value, consumed) = {
        let bytes = mem.peek(avail)?;
        decode(bytes)?
    };
    mem.skip(consumed as i64)?;
    Ok(value)
}

/// Read a varint at the cursor without advancing.
pub fn peek(mem: &MemFile<'_>) -> Result<(u64, usize)> {
    let avail = std::cmp::min(mem.remaining(), MAX_LEN);
    decode(mem.peek(avail)?)
}

/// Write a varint at the cursor (overwriting), advancing past it.
pub fn write(mem: &mut MemFile<'_>, value: u64) -> Result<usize> {
    let (buf, n) = encode(value);
    mem.write(&buf[..n])?;
    Ok(n)
}

/// Replace the varint at the cursor with an encoding of `new_value`,
/// growing or shrinking the hole when the byte length differs. Returns
/// the signed byte delta. The cursor ends up past the new varint.
pub fn rewrite_in_place(mem: &mut MemFile<'_>, new_value: u64) -> Result<i64> {
    let (_, old_len) = peek(mem)?;
    let new_len = encoded_len(new_value);

    if new_len > old_len {
        mem.inplace_insert(new_len - old_len)?;
    } else if new_len < old_len {
        mem.inplace_remove(old_len - new_len)?;
    }
    write(mem, new_value)?;
    Ok(new_len as i64 - old_len as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfile::MemBlock;
    use proptest::prelude::*;

    #[test]
    fn test_boundary_encodings() {
        // Spec boundary vectors.
        assert_eq!(encode(127), ([0x7F, 0, 0, 0, 0, 0, 0, 0, 0, 0], 1));
        assert_eq!(encode(128).1, 2);
        assert_eq!(&encode(128).0[..2], &[0x81, 0x00]);
        assert_eq!(&encode(16383).0[..2], &[0xFF, 0x7F]);
        assert_eq!(encode(16384).1, 3);
        assert_eq!(&encode(16384).0[..3], &[0x81, 0x80, 0x00]);
    }

    #[test]
    fn test_zero_takes_one_byte() {
        let (buf, n) = encode(0);
        assert_eq!(n, 1);
        assert_eq!(buf[0], 0x00);
        assert_eq!(decode(&buf[..1]).unwrap(), (0, 1));
    }

    #[test]
    fn test_length_boundary_table() {
        let cases: &[(u64, usize)] = &[
            (0, 1),
            (127, 1),
            (128, 2),
            (16383, 2),
            (16384, 3),
            (u32::MAX as u64, 5),
            (1 << 62, 9),
            ((1 << 63) - 1, 9),
            (1 << 63, 10),
            (u64::MAX, 10),
        ];
        for &(value, len) in cases {
            assert_eq!(encoded_len(value), len, "encoded_len({value})");
            let (buf, n) = encode(value);
            assert_eq!(n, len, "encode({value})");
            assert_eq!(decode(&buf[..n]).unwrap(), (value, len));
        }
    }

    #[test]
    fn test_decode_truncated_fails() {
        let (buf, n) = encode(300);
        assert_eq!(n, 2);
        assert!(decode(&buf[..1]).is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_decode_unterminated_fails() {
        let bytes = [0xFFu8; 11];
        assert!(matches!(decode(&bytes), Err(DocError::InvalidVarInt)));
        assert!(matches!(decode(&bytes[..10]), Err(DocError::InvalidVarInt)));
    }

    #[test]
    fn test_memfile_roundtrip() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, 0).unwrap();
        write(&mut f, 300).unwrap();
        write(&mut f, u64::MAX).unwrap();

        f.seek(0).unwrap();
        assert_eq!(read(&mut f).unwrap(), 0);
        assert_eq!(read(&mut f).unwrap(), 300);
        assert_eq!(read(&mut f).unwrap(), u64::MAX);
        assert_eq!(f.remaining(), 0);
    }

    #[test]
    fn test_rewrite_same_length() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, 100).unwrap();
        f.write_byte(0xAA).unwrap();

        f.seek(0).unwrap();
        let delta = rewrite_in_place(&mut f, 99).unwrap();
        assert_eq!(delta, 0);
        f.seek(0).unwrap();
        assert_eq!(read(&mut f).unwrap(), 99);
        assert_eq!(f.read_byte().unwrap(), 0xAA);
    }

    #[test]
    fn test_rewrite_grows_and_shrinks() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, 100).unwrap();
        f.write_byte(0xAA).unwrap();

        f.seek(0).unwrap();
        assert_eq!(rewrite_in_place(&mut f, 100_000).unwrap(), 2);
        f.seek(0).unwrap();
        assert_eq!(read(&mut f).unwrap(), 100_000);
        assert_eq!(f.read_byte().unwrap(), 0xAA);

        f.seek(0).unwrap();
        assert_eq!(rewrite_in_place(&mut f, 5).unwrap(), -2);
        f.seek(0).unwrap();
        assert_eq!(read(&mut f).unwrap(), 5);
        assert_eq!(f.read_byte().unwrap(), 0xAA);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(value in any::<u64>()) {
            let (buf, n) = encode(value);
            let (decoded, consumed) = decode(&buf[..n]).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(consumed, n);
            prop_assert_eq!(n, encoded_len(value));
        }

        #[test]
        fn prop_length_matches_boundary_table(value in any::<u64>()) {
            let bits = 64 - value.leading_zeros() as usize;
            let expected = std::cmp::max(1, bits.div_ceil(7));
            prop_assert_eq!(encoded_len(value), expected);
        }
    }
}
