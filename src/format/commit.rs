//! Commit section codec.
//!
//! Keyed records carry a 64-bit commit value (u64 LE) right after the
//! key section. Freshly created records get a unique id so identical
//! payloads in distinct records stay distinguishable; `revise::end`
//! replaces it with the FNV-1a 64 hash of the payload section.

use crate::error::{DocError, Result};
use crate::hash::fnv1a_64;
use crate::memfile::MemFile;
use crate::uid;

pub const COMMIT_SIZE: usize = 8;

/// Write the initial commit value (a fresh unique id) at the cursor.
pub fn init(mem: &mut MemFile<'_>) -> Result<u64> {
    let id = uid::next();
    mem.write_u64(id)?;
    Ok(id)
}

/// Read the commit value at the cursor, advancing past it.
pub fn read(mem: &mut MemFile<'_>) -> Result<u64> {
    mem.read_u64()
}

/// Read the commit value at the cursor without advancing.
pub fn peek(mem: &MemFile<'_>) -> Result<u64> {
    let b = mem.peek(COMMIT_SIZE)?;
    let mut buf = [0u8; COMMIT_SIZE];
    buf.copy_from_slice(b);
    Ok(u64::from_le_bytes(buf))
}

/// Skip the commit section.
pub fn skip(mem: &mut MemFile<'_>) -> Result<()> {
    mem.skip(COMMIT_SIZE as i64)
}

/// Hash the payload bytes and store the result at the cursor.
/// Returns the stored hash.
pub fn update(mem: &mut MemFile<'_>, payload: &[u8]) -> Result<u64> {
    let hash = compute(payload);
    mem.write_u64(hash)?;
    Ok(hash)
}

/// Commit hash of a payload section.
pub fn compute(payload: &[u8]) -> u64 {
    fnv1a_64(payload)
}

/// Render a commit value as 16 lowercase hex digits.
pub fn to_hex(commit: u64) -> String {
    format!("{commit:016x}")
}

/// Parse the 16-hex-digit form produced by `to_hex`.
pub fn from_hex(s: &str) -> Result<u64> {
    if s.len() != 16 {
        return Err(DocError::IllegalArg(format!(
            "commit string must be 16 hex digits, got {} chars",
            s.len()
        )));
    }
    if let Some(bad) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(DocError::TailingJunk(format!(
            "commit string (unexpected char {bad:?})"
        )));
    }
    u64::from_str_radix(s, 16)
        .map_err(|e| DocError::Internal(format!("commit hex parse: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfile::MemBlock;

    #[test]
    fn test_init_then_update() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        let initial = init(&mut f).unwrap();
        assert_ne!(initial, 0);

        f.seek(0).unwrap();
        assert_eq!(peek(&f).unwrap(), initial);

        let stored = update(&mut f, b"[1, 2]").unwrap();
        assert_eq!(stored, compute(b"[1, 2]"));
        f.seek(0).unwrap();
        assert_eq!(read(&mut f).unwrap(), stored);
    }

    #[test]
    fn test_compute_deterministic() {
        assert_eq!(compute(b"payload"), compute(b"payload"));
        assert_ne!(compute(b"payload"), compute(b"payloae"));
    }

    #[test]
    fn test_hex_roundtrip() {
        for v in [0u64, 1, 0xdead_beef, u64::MAX] {
            let s = to_hex(v);
            assert_eq!(s.len(), 16);
            assert_eq!(from_hex(&s).unwrap(), v);
        }
    }

    #[test]
    fn test_from_hex_wrong_length() {
        assert!(matches!(from_hex("abc"), Err(DocError::IllegalArg(_))));
        assert!(matches!(from_hex(""), Err(DocError::IllegalArg(_))));
    }

    #[test]
    fn test_from_hex_junk() {
        assert!(matches!(
            from_hex("00000000000000zz"),
            Err(DocError::TailingJunk(_))
        ));
    }

    #[test]
    fn test_skip() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        init(&mut f).unwrap();
        f.write_byte(0x5A).unwrap();

        f.seek(0).unwrap();
        skip(&mut f).unwrap();
        assert_eq!(f.read_byte().unwrap(), 0x5A);
    }
}
