//! Read/write iterator over heterogeneous arrays.

use crate::error::{DocError, Result};
use crate::format::binary::BinaryValue;
use crate::format::field::{self, FieldType};
use crate::format::marker::{self, ContainerKind, Derivation};
use crate::iter::{access, ColumnIter, Field, Inserter, ObjectIter};
use crate::memfile::MemFile;

/// Forward/backward iterator over one array container.
pub struct ArrayIter<'a> {
    mem: MemFile<'a>,
    /// Offset of the array begin marker.
    start: usize,
    /// First byte after the begin marker.
    payload_start: usize,
    derivation: Derivation,
    /// Cached current element; `None` before the first `next`, after
    /// the end was reached, or after `remove`.
    field: Option<Field>,
    /// Where the next parse begins while no element is cached.
    pending: usize,
    /// Tag offsets of yielded elements; the top is the current one.
    history: Vec<usize>,
    /// Net byte delta applied through this iterator.
    mod_size: i64,
}

impl<'a> ArrayIter<'a> {
    /// Open an iterator over the array whose begin marker sits at the
    /// cursor of `mem`.
    pub(crate) fn open(mem: MemFile<'a>) -> Result<Self> {
        let start = mem.tell();
        let tag = mem.peek_byte()?;
        let derivation = match marker::container_of_marker(tag) {
            Some((ContainerKind::Array, d)) => d,
            _ => return Err(DocError::marker("array begin marker", tag)),
        };
        Ok(Self {
            mem,
            start,
            payload_start: start + 1,
            derivation,
            field: None,
            pending: start + 1,
            history: Vec::new(),
            mod_size: 0,
        })
    }

    // ── State ──────────────────────────────────────────────────────

    pub fn derivation(&self) -> Derivation {
        self.derivation
    }

    /// Net bytes added (positive) or removed (negative) through this
    /// iterator's mutations.
    pub fn mod_size(&self) -> i64 {
        self.mod_size
    }

    fn current(&self) -> Result<Field> {
        self.field
            .ok_or_else(|| DocError::IllegalArg("no element under the iterator".into()))
    }

    /// Offset where the element after the current one begins.
    fn next_start(&mut self) -> Result<usize> {
        match self.field {
            Some(f) => {
                self.mem.seek(f.start)?;
                field::skip_field(&mut self.mem)?;
                Ok(self.mem.tell())
            }
            None => Ok(self.pending),
        }
    }

    // ── Traversal ──────────────────────────────────────────────────

    /// Reset to the position before the first element.
    pub fn rewind(&mut self) {
        self.field = None;
        self.pending = self.payload_start;
        self.history.clear();
    }

    /// Advance to the next element. Returns its type, or `None` at the
    /// end of the array.
    pub fn next(&mut self) -> Result<Option<FieldType>> {
        let start = self.next_start()?;
        self.mem.seek(start)?;
        if self.mem.peek_byte()? == marker::MARRAY_END {
            self.field = None;
            self.pending = start;
            return Ok(None);
        }
        let ty = field::peek_type(&self.mem)?;
        self.field = Some(Field {
            ty,
            start,
            payload: start + 1,
        });
        self.history.push(start);
        Ok(Some(ty))
    }

    /// Whether `next` would yield another element.
    pub fn has_next(&mut self) -> Result<bool> {
        let start = self.next_start()?;
        self.mem.seek(start)?;
        Ok(self.mem.peek_byte()? != marker::MARRAY_END)
    }

    /// Step back to the previously yielded element. Returns `None`
    /// when there is no earlier element to return to.
    pub fn prev(&mut self) -> Result<Option<FieldType>> {
        if self.history.len() < 2 {
            return Ok(None);
        }
        self.history.pop();
        let start = match self.history.last() {
            Some(&s) => s,
            None => return Ok(None),
        };
        self.mem.seek(start)?;
        let ty = field::peek_type(&self.mem)?;
        self.field = Some(Field {
            ty,
            start,
            payload: start + 1,
        });
        Ok(Some(ty))
    }

    /// Type of the current element. Fails before the first successful
    /// `next` and after `remove`.
    pub fn field_type(&self) -> Result<FieldType> {
        Ok(self.current()?.ty)
    }

    /// Tag offset of the current element.
    pub fn field_offset(&self) -> Result<usize> {
        Ok(self.current()?.start)
    }

    // ── Value Accessors ────────────────────────────────────────────

    pub fn u8_value(&mut self) -> Result<u8> {
        let f = self.current()?;
        access::u8_value(&mut self.mem, f)
    }

    pub fn u16_value(&mut self) -> Result<u16> {
        let f = self.current()?;
        access::u16_value(&mut self.mem, f)
    }

    pub fn u32_value(&mut self) -> Result<u32> {
        let f = self.current()?;
        access::u32_value(&mut self.mem, f)
    }

    pub fn u64_value(&mut self) -> Result<u64> {
        let f = self.current()?;
        access::u64_value(&mut self.mem, f)
    }

    pub fn i8_value(&mut self) -> Result<i8> {
        let f = self.current()?;
        access::i8_value(&mut self.mem, f)
    }

    pub fn i16_value(&mut self) -> Result<i16> {
        let f = self.current()?;
        access::i16_value(&mut self.mem, f)
    }

    pub fn i32_value(&mut self) -> Result<i32> {
        let f = self.current()?;
        access::i32_value(&mut self.mem, f)
    }

    pub fn i64_value(&mut self) -> Result<i64> {
        let f = self.current()?;
        access::i64_value(&mut self.mem, f)
    }

    pub fn float_value(&mut self) -> Result<f32> {
        let f = self.current()?;
        access::float_value(&mut self.mem, f)
    }

    /// Any unsigned width, widened to u64.
    pub fn unsigned_value(&mut self) -> Result<u64> {
        let f = self.current()?;
        access::unsigned_value(&mut self.mem, f)
    }

    /// Any signed width, widened to i64.
    pub fn signed_value(&mut self) -> Result<i64> {
        let f = self.current()?;
        access::signed_value(&mut self.mem, f)
    }

    pub fn bool_value(&self) -> Result<bool> {
        access::bool_value(self.current()?)
    }

    pub fn is_null(&self) -> Result<bool> {
        Ok(self.current()?.ty.is_null())
    }

    pub fn string_value(&mut self) -> Result<&str> {
        let f = self.current()?;
        access::string_value(&mut self.mem, f)
    }

    pub fn binary_value(&mut self) -> Result<BinaryValue<'_>> {
        let f = self.current()?;
        access::binary_value(&mut self.mem, f)
    }

    /// Descend into the current array element. The parent iterator is
    /// frozen while the sub-iterator lives.
    pub fn array_value(&mut self) -> Result<ArrayIter<'_>> {
        let f = self.current()?;
        if !f.ty.is_array() {
            return Err(DocError::TypeMismatch {
                expected: "array",
                found: f.ty.name(),
            });
        }
        ArrayIter::open(self.mem.reborrow_at(f.start))
    }

    /// Descend into the current object element.
    pub fn object_value(&mut self) -> Result<ObjectIter<'_>> {
        let f = self.current()?;
        if !f.ty.is_object() {
            return Err(DocError::TypeMismatch {
                expected: "object",
                found: f.ty.name(),
            });
        }
        ObjectIter::open(self.mem.reborrow_at(f.start))
    }

    /// Descend into the current column element.
    pub fn column_value(&mut self) -> Result<ColumnIter<'_>> {
        let f = self.current()?;
        if !f.ty.is_column() {
            return Err(DocError::TypeMismatch {
                expected: "column",
                found: f.ty.name(),
            });
        }
        ColumnIter::open(self.mem.reborrow_at(f.start))
    }

    // ── In-place Updates ───────────────────────────────────────────

    pub fn update_u8(&mut self, value: u8) -> Result<()> {
        let f = self.current()?;
        access::update_u8(&mut self.mem, f, value)
    }

    pub fn update_u16(&mut self, value: u16) -> Result<()> {
        let f = self.current()?;
        access::update_u16(&mut self.mem, f, value)
    }

    pub fn update_u32(&mut self, value: u32) -> Result<()> {
        let f = self.current()?;
        access::update_u32(&mut self.mem, f, value)
    }

    pub fn update_u64(&mut self, value: u64) -> Result<()> {
        let f = self.current()?;
        access::update_u64(&mut self.mem, f, value)
    }

    pub fn update_i8(&mut self, value: i8) -> Result<()> {
        let f = self.current()?;
        access::update_i8(&mut self.mem, f, value)
    }

    pub fn update_i16(&mut self, value: i16) -> Result<()> {
        let f = self.current()?;
        access::update_i16(&mut self.mem, f, value)
    }

    pub fn update_i32(&mut self, value: i32) -> Result<()> {
        let f = self.current()?;
        access::update_i32(&mut self.mem, f, value)
    }

    pub fn update_i64(&mut self, value: i64) -> Result<()> {
        let f = self.current()?;
        access::update_i64(&mut self.mem, f, value)
    }

    pub fn update_float(&mut self, value: f32) -> Result<()> {
        let f = self.current()?;
        access::update_float(&mut self.mem, f, value)
    }

    /// Replace the current string element, growing or shrinking in
    /// place. Read-write mode only.
    pub fn update_string(&mut self, value: &str) -> Result<()> {
        let f = self.current()?;
        let delta = access::update_string(&mut self.mem, f, value)?;
        self.mod_size += delta;
        Ok(())
    }

    pub fn update_null(&mut self) -> Result<()> {
        self.update_constant(marker::MNULL)
    }

    pub fn update_true(&mut self) -> Result<()> {
        self.update_constant(marker::MTRUE)
    }

    pub fn update_false(&mut self) -> Result<()> {
        self.update_constant(marker::MFALSE)
    }

    fn update_constant(&mut self, new_marker: u8) -> Result<()> {
        let f = self.current()?;
        let ty = access::update_constant(&mut self.mem, f, new_marker)?;
        self.field = Some(Field { ty, ..f });
        Ok(())
    }

    /// Rewrite this array's own abstract-type marker.
    pub fn set_derivation(&mut self, derivation: Derivation) -> Result<()> {
        self.mem.seek(self.start)?;
        self.mem
            .write_byte(ContainerKind::Array.begin_marker(derivation))?;
        self.derivation = derivation;
        Ok(())
    }

    // ── Structural Mutations ───────────────────────────────────────

    /// Remove the current element. The following `next` yields what
    /// was the next element; accessors fail until then.
    pub fn remove(&mut self) -> Result<()> {
        let f = self.current()?;
        if !self.mem.is_read_write() {
            return Err(DocError::ReadOnlyMode);
        }
        self.mem.seek(f.start)?;
        field::skip_field(&mut self.mem)?;
        let len = self.mem.tell() - f.start;

        self.mem.seek(f.start)?;
        self.mem.inplace_remove(len)?;

        self.mod_size -= len as i64;
        self.history.pop();
        self.field = None;
        self.pending = f.start;
        Ok(())
    }

    /// Open an inserter at the cursor (after the current element, or
    /// before the end marker of an empty/consumed array).
    pub fn insert_begin(&mut self) -> Result<Inserter<'_>> {
        if !self.mem.is_read_write() {
            return Err(DocError::ReadOnlyMode);
        }
        let at = self.next_start()?;
        Inserter::new_array(self.mem.reborrow(), at)
    }
}
