//! Typed append API bound to an open iterator.
//!
//! One `Inserter` serves all three container kinds; the current
//! context decides which methods are legal (`insert_*` for arrays and
//! columns, `insert_prop_*` for objects). Container begins push a
//! context frame and write BOTH markers immediately, inserting between
//! them — the byte image is balanced after every call, so dropping an
//! inserter mid-way cannot corrupt the document. Mismatched or
//! unbalanced `end_*` calls are protocol errors caught by the frame
//! stack.

use crate::error::{DocError, Result};
use crate::format::marker::{self, ColumnType, ContainerKind, Derivation};
use crate::format::{binary, string, varint};
use crate::iter::column::{self, ColumnValue};
use crate::memfile::MemFile;

#[derive(Debug, Clone, Copy)]
enum Ctx {
    /// Insertion point inside an array body.
    Array { at: usize },
    /// Insertion point inside an object body.
    Object { at: usize },
    /// Bound to a column; appends go at `count`.
    Column { start: usize },
}

impl Ctx {
    fn advanced_to(self, end: usize) -> Self {
        match self {
            Self::Array { .. } => Self::Array { at: end },
            Self::Object { .. } => Self::Object { at: end },
            Self::Column { start } => Self::Column { start },
        }
    }
}

/// Append handle obtained from `insert_begin` on an iterator.
pub struct Inserter<'a> {
    mem: MemFile<'a>,
    ctx: Ctx,
    stack: Vec<Ctx>,
}

impl<'a> Inserter<'a> {
    pub(crate) fn new_array(mem: MemFile<'a>, at: usize) -> Result<Self> {
        Self::new(mem, Ctx::Array { at })
    }

    pub(crate) fn new_object(mem: MemFile<'a>, at: usize) -> Result<Self> {
        Self::new(mem, Ctx::Object { at })
    }

    pub(crate) fn new_column(mem: MemFile<'a>, start: usize) -> Result<Self> {
        Self::new(mem, Ctx::Column { start })
    }

    fn new(mem: MemFile<'a>, ctx: Ctx) -> Result<Self> {
        if !mem.is_read_write() {
            return Err(DocError::ReadOnlyMode);
        }
        Ok(Self {
            mem,
            ctx,
            stack: Vec::new(),
        })
    }

    /// Nesting depth of open container begins.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    // ── Core write paths ───────────────────────────────────────────

    /// Write one element of `len` bytes at the array insertion point.
    fn put_array(
        &mut self,
        len: usize,
        write: impl FnOnce(&mut MemFile<'_>) -> Result<()>,
    ) -> Result<()> {
        let Ctx::Array { at } = self.ctx else {
            return Err(self.wrong_ctx("insert_*", "an array"));
        };
        self.mem.seek(at)?;
        self.mem.inplace_insert(len)?;
        write(&mut self.mem)?;
        self.ctx = Ctx::Array { at: at + len };
        Ok(())
    }

    /// Write one key/value pair of `value_len` bytes at the object
    /// insertion point.
    fn put_prop(
        &mut self,
        key: &str,
        value_len: usize,
        write: impl FnOnce(&mut MemFile<'_>) -> Result<()>,
    ) -> Result<()> {
        let Ctx::Object { at } = self.ctx else {
            return Err(self.wrong_ctx("insert_prop_*", "an object"));
        };
        let key_len = string::encoded_len_nomarker(key);
        self.mem.seek(at)?;
        self.mem.inplace_insert(key_len + value_len)?;
        string::write_nomarker(&mut self.mem, key)?;
        write(&mut self.mem)?;
        self.ctx = Ctx::Object {
            at: at + key_len + value_len,
        };
        Ok(())
    }

    fn put_column(&mut self, value: ColumnValue) -> Result<()> {
        let Ctx::Column { start } = self.ctx else {
            return Err(self.wrong_ctx("column append", "a column"));
        };
        column::append_value(&mut self.mem, start, value)?;
        Ok(())
    }

    fn wrong_ctx(&self, op: &str, wanted: &str) -> DocError {
        let have = match self.ctx {
            Ctx::Array { .. } => "an array",
            Ctx::Object { .. } => "an object",
            Ctx::Column { .. } => "a column",
        };
        DocError::Protocol(format!("{op} requires {wanted} context, but inside {have}"))
    }

    // ── Scalar appends (array / column context) ────────────────────

    pub fn insert_null(&mut self) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::Null),
            _ => self.put_array(1, |m| m.write_byte(marker::MNULL)),
        }
    }

    pub fn insert_true(&mut self) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::Bool(true)),
            _ => self.put_array(1, |m| m.write_byte(marker::MTRUE)),
        }
    }

    pub fn insert_false(&mut self) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::Bool(false)),
            _ => self.put_array(1, |m| m.write_byte(marker::MFALSE)),
        }
    }

    pub fn insert_u8(&mut self, v: u8) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::U8(v)),
            _ => self.put_array(2, |m| {
                m.write_byte(marker::MU8)?;
                m.write_byte(v)
            }),
        }
    }

    pub fn insert_u16(&mut self, v: u16) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::U16(v)),
            _ => self.put_array(3, |m| {
                m.write_byte(marker::MU16)?;
                m.write_u16(v)
            }),
        }
    }

    pub fn insert_u32(&mut self, v: u32) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::U32(v)),
            _ => self.put_array(5, |m| {
                m.write_byte(marker::MU32)?;
                m.write_u32(v)
            }),
        }
    }

    pub fn insert_u64(&mut self, v: u64) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::U64(v)),
            _ => self.put_array(9, |m| {
                m.write_byte(marker::MU64)?;
                m.write_u64(v)
            }),
        }
    }

    pub fn insert_i8(&mut self, v: i8) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::I8(v)),
            _ => self.put_array(2, |m| {
                m.write_byte(marker::MI8)?;
                m.write_i8(v)
            }),
        }
    }

    pub fn insert_i16(&mut self, v: i16) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::I16(v)),
            _ => self.put_array(3, |m| {
                m.write_byte(marker::MI16)?;
                m.write_i16(v)
            }),
        }
    }

    pub fn insert_i32(&mut self, v: i32) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::I32(v)),
            _ => self.put_array(5, |m| {
                m.write_byte(marker::MI32)?;
                m.write_i32(v)
            }),
        }
    }

    pub fn insert_i64(&mut self, v: i64) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::I64(v)),
            _ => self.put_array(9, |m| {
                m.write_byte(marker::MI64)?;
                m.write_i64(v)
            }),
        }
    }

    pub fn insert_float(&mut self, v: f32) -> Result<()> {
        match self.ctx {
            Ctx::Column { .. } => self.put_column(ColumnValue::Float32(v)),
            _ => self.put_array(5, |m| {
                m.write_byte(marker::MFLOAT32)?;
                m.write_f32(v)
            }),
        }
    }

    pub fn insert_string(&mut self, s: &str) -> Result<()> {
        let len = string::encoded_len(s);
        self.put_array(len, |m| string::write(m, s))
    }

    /// Binary blob with a registered mime type (by file extension;
    /// unknown extensions fall back to application/octet-stream).
    pub fn insert_binary(&mut self, bytes: &[u8], ext: Option<&str>) -> Result<()> {
        let len = binary::encoded_len(bytes, ext);
        self.put_array(len, |m| binary::write(m, bytes, ext))
    }

    /// Binary blob with a free-form content type string.
    pub fn insert_binary_custom(&mut self, bytes: &[u8], content_type: &str) -> Result<()> {
        let len = binary::encoded_len_custom(bytes, content_type);
        self.put_array(len, |m| binary::write_custom(m, bytes, content_type))
    }

    // ── Property appends (object context) ──────────────────────────

    pub fn insert_prop_null(&mut self, key: &str) -> Result<()> {
        self.put_prop(key, 1, |m| m.write_byte(marker::MNULL))
    }

    pub fn insert_prop_true(&mut self, key: &str) -> Result<()> {
        self.put_prop(key, 1, |m| m.write_byte(marker::MTRUE))
    }

    pub fn insert_prop_false(&mut self, key: &str) -> Result<()> {
        self.put_prop(key, 1, |m| m.write_byte(marker::MFALSE))
    }

    pub fn insert_prop_u8(&mut self, key: &str, v: u8) -> Result<()> {
        self.put_prop(key, 2, |m| {
            m.write_byte(marker::MU8)?;
            m.write_byte(v)
        })
    }

    pub fn insert_prop_u16(&mut self, key: &str, v: u16) -> Result<()> {
        self.put_prop(key, 3, |m| {
            m.write_byte(marker::MU16)?;
            m.write_u16(v)
        })
    }

    pub fn insert_prop_u32(&mut self, key: &str, v: u32) -> Result<()> {
        self.put_prop(key, 5, |m| {
            m.write_byte(marker::MU32)?;
            m.write_u32(v)
        })
    }

    pub fn insert_prop_u64(&mut self, key: &str, v: u64) -> Result<()> {
        self.put_prop(key, 9, |m| {
            m.write_byte(marker::MU64)?;
            m.write_u64(v)
        })
    }

    pub fn insert_prop_i8(&mut self, key: &str, v: i8) -> Result<()> {
        self.put_prop(key, 2, |m| {
            m.write_byte(marker::MI8)?;
            m.write_i8(v)
        })
    }

    pub fn insert_prop_i16(&mut self, key: &str, v: i16) -> Result<()> {
        self.put_prop(key, 3, |m| {
            m.write_byte(marker::MI16)?;
            m.write_i16(v)
        })
    }

    pub fn insert_prop_i32(&mut self, key: &str, v: i32) -> Result<()> {
        self.put_prop(key, 5, |m| {
            m.write_byte(marker::MI32)?;
            m.write_i32(v)
        })
    }

    pub fn insert_prop_i64(&mut self, key: &str, v: i64) -> Result<()> {
        self.put_prop(key, 9, |m| {
            m.write_byte(marker::MI64)?;
            m.write_i64(v)
        })
    }

    pub fn insert_prop_float(&mut self, key: &str, v: f32) -> Result<()> {
        self.put_prop(key, 5, |m| {
            m.write_byte(marker::MFLOAT32)?;
            m.write_f32(v)
        })
    }

    pub fn insert_prop_string(&mut self, key: &str, s: &str) -> Result<()> {
        let len = string::encoded_len(s);
        self.put_prop(key, len, |m| string::write(m, s))
    }

    pub fn insert_prop_binary(&mut self, key: &str, bytes: &[u8], ext: Option<&str>) -> Result<()> {
        let len = binary::encoded_len(bytes, ext);
        self.put_prop(key, len, |m| binary::write(m, bytes, ext))
    }

    pub fn insert_prop_binary_custom(
        &mut self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<()> {
        let len = binary::encoded_len_custom(bytes, content_type);
        self.put_prop(key, len, |m| binary::write_custom(m, bytes, content_type))
    }

    // ── Nested containers ──────────────────────────────────────────

    /// Open a nested array element; subsequent `insert_*` calls land
    /// inside it until the matching `end_array`.
    pub fn begin_array(&mut self, derivation: Derivation) -> Result<()> {
        let Ctx::Array { at } = self.ctx else {
            return Err(self.wrong_ctx("begin_array", "an array"));
        };
        self.write_container_markers(at, ContainerKind::Array, derivation)?;
        self.stack.push(Ctx::Array { at });
        self.ctx = Ctx::Array { at: at + 1 };
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<()> {
        let Ctx::Array { at } = self.ctx else {
            return Err(self.wrong_ctx("end_array", "an array"));
        };
        let parent = self
            .stack
            .pop()
            .ok_or_else(|| DocError::Protocol("end_array without matching begin_array".into()))?;
        self.ctx = parent.advanced_to(at + 1);
        Ok(())
    }

    /// Open a nested object element.
    pub fn begin_object(&mut self, derivation: Derivation) -> Result<()> {
        let Ctx::Array { at } = self.ctx else {
            return Err(self.wrong_ctx("begin_object", "an array"));
        };
        self.write_container_markers(at, ContainerKind::Object, derivation)?;
        self.stack.push(Ctx::Array { at });
        self.ctx = Ctx::Object { at: at + 1 };
        Ok(())
    }

    pub fn end_object(&mut self) -> Result<()> {
        let Ctx::Object { at } = self.ctx else {
            return Err(self.wrong_ctx("end_object", "an object"));
        };
        let parent = self
            .stack
            .pop()
            .ok_or_else(|| DocError::Protocol("end_object without matching begin_object".into()))?;
        self.ctx = parent.advanced_to(at + 1);
        Ok(())
    }

    /// Open a nested column element with reserved `capacity` slots.
    pub fn begin_column(
        &mut self,
        ty: ColumnType,
        derivation: Derivation,
        capacity: u32,
    ) -> Result<()> {
        let Ctx::Array { at } = self.ctx else {
            return Err(self.wrong_ctx("begin_column", "an array"));
        };
        self.write_empty_column(at, ty, derivation, capacity)?;
        self.stack.push(Ctx::Array { at });
        self.ctx = Ctx::Column { start: at };
        Ok(())
    }

    pub fn end_column(&mut self) -> Result<()> {
        let Ctx::Column { start } = self.ctx else {
            return Err(self.wrong_ctx("end_column", "a column"));
        };
        let parent = self
            .stack
            .pop()
            .ok_or_else(|| DocError::Protocol("end_column without matching begin_column".into()))?;
        let h = column::parse_header(self.mem.block().as_slice(), start)?;
        self.ctx = parent.advanced_to(h.end_off() + 1);
        Ok(())
    }

    /// Open a nested array as an object property.
    pub fn begin_prop_array(&mut self, key: &str, derivation: Derivation) -> Result<()> {
        let Ctx::Object { at } = self.ctx else {
            return Err(self.wrong_ctx("begin_prop_array", "an object"));
        };
        let key_len = self.write_prop_key(at, key)?;
        self.write_container_markers(at + key_len, ContainerKind::Array, derivation)?;
        self.stack.push(Ctx::Object { at });
        self.ctx = Ctx::Array {
            at: at + key_len + 1,
        };
        Ok(())
    }

    /// Open a nested object as an object property.
    pub fn begin_prop_object(&mut self, key: &str, derivation: Derivation) -> Result<()> {
        let Ctx::Object { at } = self.ctx else {
            return Err(self.wrong_ctx("begin_prop_object", "an object"));
        };
        let key_len = self.write_prop_key(at, key)?;
        self.write_container_markers(at + key_len, ContainerKind::Object, derivation)?;
        self.stack.push(Ctx::Object { at });
        self.ctx = Ctx::Object {
            at: at + key_len + 1,
        };
        Ok(())
    }

    /// Open a nested column as an object property.
    pub fn begin_prop_column(
        &mut self,
        key: &str,
        ty: ColumnType,
        derivation: Derivation,
        capacity: u32,
    ) -> Result<()> {
        let Ctx::Object { at } = self.ctx else {
            return Err(self.wrong_ctx("begin_prop_column", "an object"));
        };
        let key_len = self.write_prop_key(at, key)?;
        self.write_empty_column(at + key_len, ty, derivation, capacity)?;
        self.stack.push(Ctx::Object { at });
        self.ctx = Ctx::Column {
            start: at + key_len,
        };
        Ok(())
    }

    // ── Internal Helpers ───────────────────────────────────────────

    /// Insert `<begin><end>` markers at `at`.
    fn write_container_markers(
        &mut self,
        at: usize,
        kind: ContainerKind,
        derivation: Derivation,
    ) -> Result<()> {
        self.mem.seek(at)?;
        self.mem.inplace_insert(2)?;
        self.mem.write_byte(kind.begin_marker(derivation))?;
        self.mem.write_byte(kind.end_marker())
    }

    /// Insert a bare key string at `at`; returns its encoded length.
    fn write_prop_key(&mut self, at: usize, key: &str) -> Result<usize> {
        let key_len = string::encoded_len_nomarker(key);
        self.mem.seek(at)?;
        self.mem.inplace_insert(key_len)?;
        string::write_nomarker(&mut self.mem, key)?;
        Ok(key_len)
    }

    /// Insert a complete empty column image at `at`: marker, subtype,
    /// capacity, count 0, sentinel-filled slots, end marker.
    fn write_empty_column(
        &mut self,
        at: usize,
        ty: ColumnType,
        derivation: Derivation,
        capacity: u32,
    ) -> Result<()> {
        let cap = capacity as usize;
        let width = ty.width();
        let total = 2
            + varint::encoded_len(cap as u64)
            + varint::encoded_len(0)
            + cap * width
            + 1;
        self.mem.seek(at)?;
        self.mem.inplace_insert(total)?;
        self.mem
            .write_byte(ContainerKind::Column.begin_marker(derivation))?;
        self.mem.write_byte(ty.subtype_marker())?;
        varint::write(&mut self.mem, cap as u64)?;
        varint::write(&mut self.mem, 0)?;
        let sentinel = ty.null_sentinel();
        for _ in 0..cap {
            self.mem.write(&sentinel[..width])?;
        }
        self.mem.write_byte(ContainerKind::Column.end_marker())
    }
}
