//! Typed reads and in-place writes for a cached field.
//!
//! Shared by the array and object iterators, which differ only in how
//! they locate the field (bare element vs. keyed property).

use crate::error::{DocError, Result};
use crate::format::binary::{self, BinaryValue};
use crate::format::field::FieldType;
use crate::format::{marker, string};
use crate::iter::Field;
use crate::memfile::MemFile;

fn mismatch(expected: &'static str, f: Field) -> DocError {
    DocError::TypeMismatch {
        expected,
        found: f.ty.name(),
    }
}

// ── Reads ──────────────────────────────────────────────────────────

macro_rules! numeric_read {
    ($name:ident, $variant:ident, $ty:ty, $read:ident, $label:expr) => {
        pub(crate) fn $name(mem: &mut MemFile<'_>, f: Field) -> Result<$ty> {
            if f.ty != FieldType::$variant {
                return Err(mismatch($label, f));
            }
            mem.seek(f.payload)?;
            mem.$read()
        }
    };
}

numeric_read!(u8_value, U8, u8, read_byte, "number (u8)");
numeric_read!(u16_value, U16, u16, read_u16, "number (u16)");
numeric_read!(u32_value, U32, u32, read_u32, "number (u32)");
numeric_read!(u64_value, U64, u64, read_u64, "number (u64)");
numeric_read!(i8_value, I8, i8, read_i8, "number (i8)");
numeric_read!(i16_value, I16, i16, read_i16, "number (i16)");
numeric_read!(i32_value, I32, i32, read_i32, "number (i32)");
numeric_read!(i64_value, I64, i64, read_i64, "number (i64)");
numeric_read!(float_value, Float32, f32, read_f32, "number (float)");

/// Any unsigned integer width, widened to u64.
pub(crate) fn unsigned_value(mem: &mut MemFile<'_>, f: Field) -> Result<u64> {
    mem.seek(f.payload)?;
    match f.ty {
        FieldType::U8 => Ok(u64::from(mem.read_byte()?)),
        FieldType::U16 => Ok(u64::from(mem.read_u16()?)),
        FieldType::U32 => Ok(u64::from(mem.read_u32()?)),
        FieldType::U64 => mem.read_u64(),
        _ => Err(mismatch("unsigned number", f)),
    }
}

/// Any signed integer width, widened to i64.
pub(crate) fn signed_value(mem: &mut MemFile<'_>, f: Field) -> Result<i64> {
    mem.seek(f.payload)?;
    match f.ty {
        FieldType::I8 => Ok(i64::from(mem.read_i8()?)),
        FieldType::I16 => Ok(i64::from(mem.read_i16()?)),
        FieldType::I32 => Ok(i64::from(mem.read_i32()?)),
        FieldType::I64 => mem.read_i64(),
        _ => Err(mismatch("signed number", f)),
    }
}

pub(crate) fn bool_value(f: Field) -> Result<bool> {
    match f.ty {
        FieldType::True => Ok(true),
        FieldType::False => Ok(false),
        _ => Err(mismatch("boolean", f)),
    }
}

pub(crate) fn string_value<'m>(mem: &'m mut MemFile<'_>, f: Field) -> Result<&'m str> {
    if f.ty != FieldType::String {
        return Err(mismatch("string", f));
    }
    mem.seek(f.payload)?;
    string::read_nomarker(mem)
}

pub(crate) fn binary_value<'m>(mem: &'m mut MemFile<'_>, f: Field) -> Result<BinaryValue<'m>> {
    if !f.ty.is_binary() {
        return Err(mismatch("binary", f));
    }
    mem.seek(f.start)?;
    binary::read(mem)
}

// ── In-place updates ───────────────────────────────────────────────

macro_rules! numeric_update {
    ($name:ident, $variant:ident, $ty:ty, $write:ident, $label:expr) => {
        pub(crate) fn $name(mem: &mut MemFile<'_>, f: Field, value: $ty) -> Result<()> {
            if f.ty != FieldType::$variant {
                return Err(mismatch($label, f));
            }
            mem.seek(f.payload)?;
            mem.$write(value)
        }
    };
}

numeric_update!(update_u8, U8, u8, write_byte, "number (u8)");
numeric_update!(update_u16, U16, u16, write_u16, "number (u16)");
numeric_update!(update_u32, U32, u32, write_u32, "number (u32)");
numeric_update!(update_u64, U64, u64, write_u64, "number (u64)");
numeric_update!(update_i8, I8, i8, write_i8, "number (i8)");
numeric_update!(update_i16, I16, i16, write_i16, "number (i16)");
numeric_update!(update_i32, I32, i32, write_i32, "number (i32)");
numeric_update!(update_i64, I64, i64, write_i64, "number (i64)");
numeric_update!(update_float, Float32, f32, write_f32, "number (float)");

/// Replace a string payload in place. Returns the byte delta.
pub(crate) fn update_string(mem: &mut MemFile<'_>, f: Field, value: &str) -> Result<i64> {
    if f.ty != FieldType::String {
        return Err(mismatch("string", f));
    }
    mem.seek(f.payload)?;
    string::update_in_place_nomarker(mem, value)
}

/// Rewrite a constant field's marker (null/true/false are payload-free,
/// so this is a one-byte overwrite). Returns the new field type.
pub(crate) fn update_constant(
    mem: &mut MemFile<'_>,
    f: Field,
    new_marker: u8,
) -> Result<FieldType> {
    if !f.ty.is_constant() {
        return Err(mismatch("constant (null/true/false)", f));
    }
    mem.seek(f.start)?;
    mem.write_byte(new_marker)?;
    Ok(match new_marker {
        marker::MNULL => FieldType::Null,
        marker::MTRUE => FieldType::True,
        _ => FieldType::False,
    })
}
