//! Record key codec.
//!
//! The key section opens every record: `<variant marker:u8><payload?>`.
//! Markers: 0x00 nokey (no payload), 0x01 autokey (u64 LE), 0x02 ukey
//! (varuint), 0x03 ikey (zig-zag varuint), 0x04 skey (varuint length +
//! UTF-8 bytes).

use serde::{Deserialize, Serialize};

use crate::error::{DocError, Result};
use crate::format::{string, varint};
use crate::memfile::MemFile;
use crate::uid;

pub const MKEY_NOKEY: u8 = 0x00;
pub const MKEY_AUTOKEY: u8 = 0x01;
pub const MKEY_UKEY: u8 = 0x02;
pub const MKEY_IKEY: u8 = 0x03;
pub const MKEY_SKEY: u8 = 0x04;

/// Key variant of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    NoKey,
    AutoKey,
    Unsigned,
    Signed,
    Text,
}

impl KeyType {
    pub fn marker(self) -> u8 {
        match self {
            Self::NoKey => MKEY_NOKEY,
            Self::AutoKey => MKEY_AUTOKEY,
            Self::Unsigned => MKEY_UKEY,
            Self::Signed => MKEY_IKEY,
            Self::Text => MKEY_SKEY,
        }
    }

    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            MKEY_NOKEY => Some(Self::NoKey),
            MKEY_AUTOKEY => Some(Self::AutoKey),
            MKEY_UKEY => Some(Self::Unsigned),
            MKEY_IKEY => Some(Self::Signed),
            MKEY_SKEY => Some(Self::Text),
            _ => None,
        }
    }

    /// Whether records of this variant carry a commit section.
    pub fn has_commit(self) -> bool {
        !matches!(self, Self::NoKey)
    }
}

/// Key requested at record creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySpec {
    NoKey,
    Auto,
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl KeySpec {
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::NoKey => KeyType::NoKey,
            Self::Auto => KeyType::AutoKey,
            Self::Unsigned(_) => KeyType::Unsigned,
            Self::Signed(_) => KeyType::Signed,
            Self::Text(_) => KeyType::Text,
        }
    }
}

/// Decoded key of an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    None,
    Auto(u64),
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

// ── Zig-zag ────────────────────────────────────────────────────────

pub(crate) fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

pub(crate) fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

// ── Codec ──────────────────────────────────────────────────────────

/// Write the key section for a fresh record at the cursor. Autokeys
/// draw a new unique id. Returns the decoded form of what was written.
pub fn write_initial(mem: &mut MemFile<'_>, spec: &KeySpec) -> Result<Key> {
    mem.write_byte(spec.key_type().marker())?;
    match spec {
        KeySpec::NoKey => Ok(Key::None),
        KeySpec::Auto => {
            let id = uid::next();
            mem.write_u64(id)?;
            Ok(Key::Auto(id))
        }
        KeySpec::Unsigned(v) => {
            varint::write(mem, *v)?;
            Ok(Key::Unsigned(*v))
        }
        KeySpec::Signed(v) => {
            varint::write(mem, zigzag_encode(*v))?;
            Ok(Key::Signed(*v))
        }
        KeySpec::Text(s) => {
            string::write_nomarker(mem, s)?;
            Ok(Key::Text(s.clone()))
        }
    }
}

/// Read the key section at the cursor, leaving the cursor past it.
pub fn read(mem: &mut MemFile<'_>) -> Result<Key> {
    let marker = mem.read_byte()?;
    let ty = KeyType::from_marker(marker).ok_or(DocError::marker("key marker", marker))?;
    match ty {
        KeyType::NoKey => Ok(Key::None),
        KeyType::AutoKey => Ok(Key::Auto(mem.read_u64()?)),
        KeyType::Unsigned => Ok(Key::Unsigned(varint::read(mem)?)),
        KeyType::Signed => Ok(Key::Signed(zigzag_decode(varint::read(mem)?))),
        KeyType::Text => Ok(Key::Text(string::read_nomarker(mem)?.to_string())),
    }
}

/// Read only the variant marker at the cursor, consuming it.
pub fn read_type(mem: &mut MemFile<'_>) -> Result<KeyType> {
    let marker = mem.read_byte()?;
    KeyType::from_marker(marker).ok_or(DocError::marker("key marker", marker))
}

/// Skip the key section at the cursor. Returns the variant.
pub fn skip(mem: &mut MemFile<'_>) -> Result<KeyType> {
    let ty = read_type(mem)?;
    match ty {
        KeyType::NoKey => {}
        KeyType::AutoKey => mem.skip(8)?,
        KeyType::Unsigned | KeyType::Signed => {
            varint::read(mem)?;
        }
        KeyType::Text => string::skip_nomarker(mem)?,
    }
    Ok(ty)
}

/// Rewrite the ukey payload in place (cursor at the key marker).
/// Returns the signed byte delta.
pub fn update_unsigned(mem: &mut MemFile<'_>, value: u64) -> Result<i64> {
    expect_marker(mem, MKEY_UKEY)?;
    varint::rewrite_in_place(mem, value)
}

/// Rewrite the ikey payload in place (cursor at the key marker).
pub fn update_signed(mem: &mut MemFile<'_>, value: i64) -> Result<i64> {
    expect_marker(mem, MKEY_IKEY)?;
    varint::rewrite_in_place(mem, zigzag_encode(value))
}

/// Rewrite the skey payload in place (cursor at the key marker).
pub fn update_text(mem: &mut MemFile<'_>, value: &str) -> Result<i64> {
    expect_marker(mem, MKEY_SKEY)?;
    string::update_in_place_nomarker(mem, value)
}

/// Rewrite the autokey payload (cursor at the key marker) with a fresh
/// unique id. Fixed width, so no byte delta.
pub fn update_auto(mem: &mut MemFile<'_>) -> Result<u64> {
    expect_marker(mem, MKEY_AUTOKEY)?;
    let id = uid::next();
    mem.write_u64(id)?;
    Ok(id)
}

fn expect_marker(mem: &mut MemFile<'_>, expected: u8) -> Result<()> {
    let marker = mem.read_byte()?;
    if marker != expected {
        return Err(DocError::marker("key marker", marker));
    }
    Ok(())
}
