//! Field tags and the structural skip.
//!
//! A field is a `<tag><payload>` pair. `FieldType` is the logical tag
//! decoded from the marker byte (plus the subtype byte for columns);
//! the predicates partition the tag space into the classes constant /
//! number / string / binary / container.

use std::fmt;

use crate::error::{DocError, Result};
use crate::format::marker::{self, ColumnType, ContainerKind, Derivation};
use crate::format::{string, varint};
use crate::memfile::MemFile;

/// Logical type of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Null,
    True,
    False,
    String,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float32,
    Binary,
    BinaryCustom,
    Array,
    Object,
    Column(ColumnType),
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::True => "boolean (true)",
            Self::False => "boolean (false)",
            Self::String => "string",
            Self::U8 => "number (u8)",
            Self::U16 => "number (u16)",
            Self::U32 => "number (u32)",
            Self::U64 => "number (u64)",
            Self::I8 => "number (i8)",
            Self::I16 => "number (i16)",
            Self::I32 => "number (i32)",
            Self::I64 => "number (i64)",
            Self::Float32 => "number (float)",
            Self::Binary | Self::BinaryCustom => "binary",
            Self::Array => "array",
            Self::Object => "object",
            Self::Column(_) => "column",
        }
    }

    pub fn is_constant(self) -> bool {
        matches!(self, Self::Null | Self::True | Self::False)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, Self::True | Self::False)
    }

    pub fn is_null(self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_integer(self) -> bool {
        self.is_unsigned() || self.is_signed()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32)
    }

    pub fn is_number(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_string(self) -> bool {
        matches!(self, Self::String)
    }

    pub fn is_binary(self) -> bool {
        matches!(self, Self::Binary | Self::BinaryCustom)
    }

    pub fn is_array(self) -> bool {
        matches!(self, Self::Array)
    }

    pub fn is_column(self) -> bool {
        matches!(self, Self::Column(_))
    }

    pub fn is_object(self) -> bool {
        matches!(self, Self::Object)
    }

    pub fn is_container(self) -> bool {
        self.is_array() || self.is_column() || self.is_object()
    }

    /// Whether sub-iterators can descend into the field.
    pub fn is_traversable(self) -> bool {
        self.is_container()
    }

    /// Byte width of the payload for fixed-width field types.
    pub(crate) fn fixed_payload_width(self) -> Option<usize> {
        match self {
            Self::Null | Self::True | Self::False => Some(0),
            Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 | Self::Float32 => Some(4),
            Self::U64 | Self::I64 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decode the field type at the cursor without consuming anything.
/// Columns read one byte past the marker for the subtype.
pub fn peek_type(mem: &MemFile<'_>) -> Result<FieldType> {
    let bytes = mem.peek(1)?;
    let tag = bytes[0];
    let ty = match tag {
        marker::MNULL => FieldType::Null,
        marker::MTRUE => FieldType::True,
        marker::MFALSE => FieldType::False,
        marker::MSTRING => FieldType::String,
        marker::MU8 => FieldType::U8,
        marker::MU16 => FieldType::U16,
        marker::MU32 => FieldType::U32,
        marker::MU64 => FieldType::U64,
        marker::MI8 => FieldType::I8,
        marker::MI16 => FieldType::I16,
        marker::MI32 => FieldType::I32,
        marker::MI64 => FieldType::I64,
        marker::MFLOAT32 => FieldType::Float32,
        marker::MBINARY => FieldType::Binary,
        marker::MBINARY_CUSTOM => FieldType::BinaryCustom,
        other => match marker::container_of_marker(other) {
            Some((ContainerKind::Array, _)) => FieldType::Array,
            Some((ContainerKind::Object, _)) => FieldType::Object,
            Some((ContainerKind::Column, _)) => {
                let sub = mem.peek(2)?[1];
                let cty = ColumnType::from_subtype(sub)
                    .ok_or(DocError::marker("column subtype", sub))?;
                FieldType::Column(cty)
            }
            None => return Err(DocError::marker("field marker", other)),
        },
    };
    Ok(ty)
}

/// Derivation of the container field at the cursor.
pub fn peek_derivation(mem: &MemFile<'_>) -> Result<Derivation> {
    let tag = mem.peek_byte()?;
    marker::container_of_marker(tag)
        .map(|(_, d)| d)
        .ok_or(DocError::marker("container marker", tag))
}

// ── Skipping ───────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Frame {
    Array,
    Object,
}

/// Skip exactly one `<tag><payload>` field starting at the cursor.
///
/// Nested arrays and objects are crossed with an explicit frame stack
/// (a depth counter, not recursion) so arbitrarily deep documents
/// cannot exhaust the call stack. Object keys are parsed structurally;
/// string payload bytes are never scanned as markers.
pub fn skip_field(mem: &mut MemFile<'_>) -> Result<()> {
    let mut stack: Vec<Frame> = Vec::new();
    skip_one(mem, &mut stack)?;

    while let Some(frame) = stack.last().copied() {
        match frame {
            Frame::Array => {
                if mem.peek_byte()? == marker::MARRAY_END {
                    mem.skip(1)?;
                    stack.pop();
                } else {
                    skip_one(mem, &mut stack)?;
                }
            }
            Frame::Object => {
                if mem.peek_byte()? == marker::MOBJECT_END {
                    mem.skip(1)?;
                    stack.pop();
                } else {
                    string::skip_nomarker(mem)?;
                    skip_one(mem, &mut stack)?;
                }
            }
        }
    }
    Ok(())
}

/// Consume one tag and its non-container payload; container begins
/// push a frame (columns are consumed whole — they cannot nest).
fn skip_one(mem: &mut MemFile<'_>, stack: &mut Vec<Frame>) -> Result<()> {
    let ty = peek_type(mem)?;
    mem.skip(1)?;

    if let Some(width) = ty.fixed_payload_width() {
        return mem.skip(width as i64);
    }
    match ty {
        FieldType::String => string::skip_nomarker(mem),
        FieldType::Binary => {
            varint::read(mem)?; // mime id
            let len = varint::read(mem)?;
            mem.skip(len as i64)
        }
        FieldType::BinaryCustom => {
            string::skip_nomarker(mem)?; // content type
            let len = varint::read(mem)?;
            mem.skip(len as i64)
        }
        FieldType::Array => {
            stack.push(Frame::Array);
            Ok(())
        }
        FieldType::Object => {
            stack.push(Frame::Object);
            Ok(())
        }
        FieldType::Column(cty) => {
            let capacity = varint::read(mem)?;
            let _count = varint::read(mem)?;
            mem.skip((capacity as usize * cty.width()) as i64)?;
            let end = mem.read_byte()?;
            if end != marker::MCOLUMN_END {
                return Err(DocError::marker("column end marker", end));
            }
            Ok(())
        }
        _ => Err(DocError::Internal(format!(
            "unhandled field type in skip: {ty}"
        ))),
    }
}
