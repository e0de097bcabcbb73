//! Length-prefixed UTF-8 string codec.
//!
//! Payload is `<varuint length><bytes>`. The marker variant prefixes
//! the `s` tag; the no-marker variant is used where context fixes the
//! type (object keys, custom binary content types).

use crate::error::{DocError, Result};
use crate::format::marker::MSTRING;
use crate::format::varint;
use crate::memfile::MemFile;

/// Write `s` marker + payload at the cursor (overwriting).
pub fn write(mem: &mut MemFile<'_>, s: &str) -> Result<()> {
    mem.write_byte(MSTRING)?;
    write_nomarker(mem, s)
}

/// Write the bare payload at the cursor (overwriting).
pub fn write_nomarker(mem: &mut MemFile<'_>, s: &str) -> Result<()> {
    varint::write(mem, s.len() as u64)?;
    mem.write(s.as_bytes())
}

/// Bytes `write` would produce.
pub fn encoded_len(s: &str) -> usize {
    1 + encoded_len_nomarker(s)
}

/// Bytes `write_nomarker` would produce.
pub fn encoded_len_nomarker(s: &str) -> usize {
    varint::encoded_len(s.len() as u64) + s.len()
}

/// Read a marker-prefixed string at the cursor.
pub fn read<'m>(mem: &'m mut MemFile<'_>) -> Result<&'m str> {
    let tag = mem.read_byte()?;
    if tag != MSTRING {
        return Err(DocError::marker("string marker", tag));
    }
    read_nomarker(mem)
}

/// Read a bare payload at the cursor.
pub fn read_nomarker<'m>(mem: &'m mut MemFile<'_>) -> Result<&'m str> {
    let len = varint::read(mem)? as usize;
    let bytes = mem.read(len)?;
    std::str::from_utf8(bytes)
        .map_err(|_| DocError::IllegalArg("string payload is not valid UTF-8".into()))
}

/// Skip a marker-prefixed string.
pub fn skip(mem: &mut MemFile<'_>) -> Result<()> {
    let tag = mem.read_byte()?;
    if tag != MSTRING {
        return Err(DocError::marker("string marker", tag));
    }
    skip_nomarker(mem)
}

/// Skip a bare payload.
pub fn skip_nomarker(mem: &mut MemFile<'_>) -> Result<()> {
    let len = varint::read(mem)?;
    mem.skip(len as i64)
}

/// Excise a marker-prefixed string at the cursor. Returns bytes removed.
pub fn remove(mem: &mut MemFile<'_>) -> Result<usize> {
    let tag = mem.peek_byte()?;
    if tag != MSTRING {
        return Err(DocError::marker("string marker", tag));
    }
    let start = mem.tell();
    mem.skip(1)?;
    skip_nomarker(mem)?;
    let total = mem.tell() - start;
    mem.seek(start)?;
    mem.inplace_remove(total)?;
    Ok(total)
}

/// Replace the payload of the marker-prefixed string at the cursor,
/// shrinking or growing the hole in place. Returns the signed byte
/// delta. The cursor ends up past the new payload.
pub fn update_in_place(mem: &mut MemFile<'_>, new: &str) -> Result<i64> {
    let tag = mem.read_byte()?;
    if tag != MSTRING {
        return Err(DocError::marker("string marker", tag));
    }
    update_in_place_nomarker(mem, new)
}

/// Like `update_in_place` for a bare payload at the cursor.
pub fn update_in_place_nomarker(mem: &mut MemFile<'_>, new: &str) -> Result<i64> {
    let payload_start = mem.tell();
    skip_nomarker(mem)?;
    let old_len = mem.tell() - payload_start;

    mem.seek(payload_start)?;
    mem.inplace_remove(old_len)?;

    let new_len = encoded_len_nomarker(new);
    mem.inplace_insert(new_len)?;
    write_nomarker(mem, new)?;
    Ok(new_len as i64 - old_len as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfile::MemBlock;

    #[test]
    fn test_roundtrip_marker() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, "hello").unwrap();
        f.seek(0).unwrap();
        assert_eq!(read(&mut f).unwrap(), "hello");
        assert_eq!(f.remaining(), 0);
    }

    #[test]
    fn test_roundtrip_nomarker_unicode() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write_nomarker(&mut f, "дом 🏠").unwrap();
        f.seek(0).unwrap();
        assert_eq!(read_nomarker(&mut f).unwrap(), "дом 🏠");
    }

    #[test]
    fn test_empty_string() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, "").unwrap();
        assert_eq!(f.tell(), 2); // marker + zero length
        f.seek(0).unwrap();
        assert_eq!(read(&mut f).unwrap(), "");
    }

    #[test]
    fn test_read_wrong_marker_fails() {
        let mut b = MemBlock::from_vec(vec![b'n']);
        let mut f = MemFile::read_write(&mut b);
        assert!(matches!(
            read(&mut f),
            Err(DocError::MarkerMapping { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let mut b = MemBlock::from_vec(vec![b's', 2, 0xFF, 0xFE]);
        let mut f = MemFile::read_write(&mut b);
        assert!(read(&mut f).is_err());
    }

    #[test]
    fn test_update_grows_and_shifts_tail() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, "ab").unwrap();
        f.write_byte(0x77).unwrap();

        f.seek(0).unwrap();
        let delta = update_in_place(&mut f, "abcdef").unwrap();
        assert_eq!(delta, 4);
        // Tail byte survived the shift.
        assert_eq!(f.read_byte().unwrap(), 0x77);
        f.seek(0).unwrap();
        assert_eq!(read(&mut f).unwrap(), "abcdef");
    }

    #[test]
    fn test_update_shrinks() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, "abcdef").unwrap();
        f.write_byte(0x77).unwrap();

        f.seek(0).unwrap();
        let delta = update_in_place(&mut f, "a").unwrap();
        assert_eq!(delta, -5);
        assert_eq!(f.read_byte().unwrap(), 0x77);
        f.seek(0).unwrap();
        assert_eq!(read(&mut f).unwrap(), "a");
    }

    #[test]
    fn test_remove_excises_marker_and_payload() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, "abc").unwrap();
        f.write_byte(0x77).unwrap();

        f.seek(0).unwrap();
        let removed = remove(&mut f).unwrap();
        assert_eq!(removed, 5); // marker + len + 3 bytes
        assert_eq!(f.peek_byte().unwrap(), 0x77);
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn test_encoded_len_matches_write() {
        for s in ["", "a", "hello world", &"x".repeat(200)] {
            let mut b = MemBlock::new();
            let mut f = MemFile::read_write(&mut b);
            write(&mut f, s).unwrap();
            assert_eq!(f.tell(), encoded_len(s));
        }
    }
}
