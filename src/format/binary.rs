//! Typed binary blob codec and the mime registry.
//!
//! Registered binary (`b`): `<varuint mime-id><varuint length><bytes>`.
//! Custom binary (`x`): `<varuint type-length><type bytes><varuint
//! length><bytes>` for content types outside the registry.

use crate::error::{DocError, Result};
use crate::format::marker::{MBINARY, MBINARY_CUSTOM};
use crate::format::{string, varint};
use crate::memfile::MemFile;

// ── Mime registry ──────────────────────────────────────────────────

/// (extension, mime type), sorted by extension for binary search.
const MIME_REGISTER: &[(&str, &str)] = &[
    ("avi", "video/x-msvideo"),
    ("bin", "application/octet-stream"),
    ("bmp", "image/bmp"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("oga", "audio/ogg"),
    ("ogv", "video/ogg"),
    ("otf", "font/otf"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("tif", "image/tiff"),
    ("ttf", "font/ttf"),
    ("txt", "text/plain"),
    ("wav", "audio/wav"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

fn bin_fallback_id() -> u32 {
    // "bin" is guaranteed present in the register.
    mime_id_by_ext("bin")
}

/// Resolve a file extension to its registry id; unknown extensions map
/// to the "bin" (application/octet-stream) entry.
pub fn mime_id_by_ext(ext: &str) -> u32 {
    match MIME_REGISTER.binary_search_by(|(e, _)| e.cmp(&ext)) {
        Ok(idx) => idx as u32,
        Err(_) => MIME_REGISTER
            .binary_search_by(|(e, _)| e.cmp(&"bin"))
            .map(|idx| idx as u32)
            .unwrap_or(0),
    }
}

/// Mime type string for a registry id; out-of-range ids fall back to
/// application/octet-stream.
pub fn mime_type_by_id(id: u32) -> &'static str {
    MIME_REGISTER
        .get(id as usize)
        .or_else(|| MIME_REGISTER.get(bin_fallback_id() as usize))
        .map(|(_, t)| *t)
        .unwrap_or("application/octet-stream")
}

/// Extension string for a registry id.
pub fn mime_ext_by_id(id: u32) -> &'static str {
    MIME_REGISTER
        .get(id as usize)
        .map(|(e, _)| *e)
        .unwrap_or("bin")
}

// ── Binary value ───────────────────────────────────────────────────

/// Decoded binary field: content type plus borrowed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryValue<'a> {
    /// Mime type string (registry entry or custom).
    pub content_type: String,
    pub bytes: &'a [u8],
}

// ── Codec ──────────────────────────────────────────────────────────

/// Bytes `write` produces for a registered-mime blob.
pub fn encoded_len(bytes: &[u8], ext: Option<&str>) -> usize {
    let id = mime_id_by_ext(ext.unwrap_or("bin"));
    1 + varint::encoded_len(u64::from(id))
        + varint::encoded_len(bytes.len() as u64)
        + bytes.len()
}

/// Bytes `write_custom` produces.
pub fn encoded_len_custom(bytes: &[u8], content_type: &str) -> usize {
    1 + string::encoded_len_nomarker(content_type)
        + varint::encoded_len(bytes.len() as u64)
        + bytes.len()
}

/// Write `b` marker + mime id + payload at the cursor (overwriting).
pub fn write(mem: &mut MemFile<'_>, bytes: &[u8], ext: Option<&str>) -> Result<()> {
    let id = mime_id_by_ext(ext.unwrap_or("bin"));
    mem.write_byte(MBINARY)?;
    varint::write(mem, u64::from(id))?;
    varint::write(mem, bytes.len() as u64)?;
    mem.write(bytes)
}

/// Write `x` marker + content type string + payload at the cursor.
pub fn write_custom(mem: &mut MemFile<'_>, bytes: &[u8], content_type: &str) -> Result<()> {
    mem.write_byte(MBINARY_CUSTOM)?;
    string::write_nomarker(mem, content_type)?;
    varint::write(mem, bytes.len() as u64)?;
    mem.write(bytes)
}

/// Read either binary flavor at the cursor.
pub fn read<'m>(mem: &'m mut MemFile<'_>) -> Result<BinaryValue<'m>> {
    let tag = mem.read_byte()?;
    match tag {
        MBINARY => {
            let id = varint::read(mem)? as u32;
            let len = varint::read(mem)? as usize;
            let bytes = mem.read(len)?;
            Ok(BinaryValue {
                content_type: mime_type_by_id(id).to_string(),
                bytes,
            })
        }
        MBINARY_CUSTOM => {
            let content_type = {
                let s = string::read_nomarker(mem)?;
                s.to_string()
            };
            let len = varint::read(mem)? as usize;
            let bytes = mem.read(len)?;
            Ok(BinaryValue {
                content_type,
                bytes,
            })
        }
        other => Err(DocError::marker("binary marker", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfile::MemBlock;

    #[test]
    fn test_register_sorted_by_ext() {
        for w in MIME_REGISTER.windows(2) {
            assert!(w[0].0 < w[1].0, "{} !< {}", w[0].0, w[1].0);
        }
    }

    #[test]
    fn test_ext_lookup() {
        let id = mime_id_by_ext("png");
        assert_eq!(mime_type_by_id(id), "image/png");
        assert_eq!(mime_ext_by_id(id), "png");
    }

    #[test]
    fn test_unknown_ext_falls_back_to_bin() {
        let id = mime_id_by_ext("definitely-not-an-ext");
        assert_eq!(mime_type_by_id(id), "application/octet-stream");
        assert_eq!(mime_type_by_id(9999), "application/octet-stream");
    }

    #[test]
    fn test_roundtrip_registered() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, &[1, 2, 3, 4], Some("png")).unwrap();
        f.seek(0).unwrap();
        let v = read(&mut f).unwrap();
        assert_eq!(v.content_type, "image/png");
        assert_eq!(v.bytes, &[1, 2, 3, 4]);
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write_custom(&mut f, &[9, 9], "application/x-thing").unwrap();
        f.seek(0).unwrap();
        let v = read(&mut f).unwrap();
        assert_eq!(v.content_type, "application/x-thing");
        assert_eq!(v.bytes, &[9, 9]);
    }

    #[test]
    fn test_empty_payload() {
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, &[], None).unwrap();
        f.seek(0).unwrap();
        let v = read(&mut f).unwrap();
        assert_eq!(v.content_type, "application/octet-stream");
        assert!(v.bytes.is_empty());
    }

    #[test]
    fn test_encoded_len_matches_write() {
        let payload = [7u8; 300];
        let mut b = MemBlock::new();
        let mut f = MemFile::read_write(&mut b);
        write(&mut f, &payload, Some("json")).unwrap();
        assert_eq!(f.tell(), encoded_len(&payload, Some("json")));

        let mut b2 = MemBlock::new();
        let mut f2 = MemFile::read_write(&mut b2);
        write_custom(&mut f2, &payload, "a/b").unwrap();
        assert_eq!(f2.tell(), encoded_len_custom(&payload, "a/b"));
    }
}
