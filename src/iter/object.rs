//! Read/write iterator over objects (key/value pairs).

use crate::error::{DocError, Result};
use crate::format::binary::BinaryValue;
use crate::format::field::{self, FieldType};
use crate::format::marker::{self, ContainerKind, Derivation};
use crate::format::string;
use crate::iter::{access, ArrayIter, ColumnIter, Field, Inserter};
use crate::memfile::MemFile;

/// Cached parse of the property under the cursor.
#[derive(Debug, Clone, Copy)]
struct Prop {
    /// Offset of the key length prefix.
    key_start: usize,
    /// Offset and length of the key bytes.
    name_off: usize,
    name_len: usize,
    /// The property value field.
    value: Field,
}

/// Forward/backward iterator over one object container.
pub struct ObjectIter<'a> {
    mem: MemFile<'a>,
    start: usize,
    payload_start: usize,
    derivation: Derivation,
    prop: Option<Prop>,
    pending: usize,
    history: Vec<usize>,
    mod_size: i64,
}

impl<'a> ObjectIter<'a> {
    /// Open an iterator over the object whose begin marker sits at the
    /// cursor of `mem`.
    pub(crate) fn open(mem: MemFile<'a>) -> Result<Self> {
        let start = mem.tell();
        let tag = mem.peek_byte()?;
        let derivation = match marker::container_of_marker(tag) {
            Some((ContainerKind::Object, d)) => d,
            _ => return Err(DocError::marker("object begin marker", tag)),
        };
        Ok(Self {
            mem,
            start,
            payload_start: start + 1,
            derivation,
            prop: None,
            pending: start + 1,
            history: Vec::new(),
            mod_size: 0,
        })
    }

    // ── State ──────────────────────────────────────────────────────

    pub fn derivation(&self) -> Derivation {
        self.derivation
    }

    pub fn mod_size(&self) -> i64 {
        self.mod_size
    }

    fn current(&self) -> Result<Prop> {
        self.prop
            .ok_or_else(|| DocError::IllegalArg("no property under the iterator".into()))
    }

    fn next_start(&mut self) -> Result<usize> {
        match self.prop {
            Some(p) => {
                self.mem.seek(p.key_start)?;
                string::skip_nomarker(&mut self.mem)?;
                field::skip_field(&mut self.mem)?;
                Ok(self.mem.tell())
            }
            None => Ok(self.pending),
        }
    }

    fn parse_at(&mut self, key_start: usize) -> Result<Prop> {
        self.mem.seek(key_start)?;
        let name_len = crate::format::varint::read(&mut self.mem)? as usize;
        let name_off = self.mem.tell();
        self.mem.skip(name_len as i64)?;
        let value_start = self.mem.tell();
        let ty = field::peek_type(&self.mem)?;
        Ok(Prop {
            key_start,
            name_off,
            name_len,
            value: Field {
                ty,
                start: value_start,
                payload: value_start + 1,
            },
        })
    }

    // ── Traversal ──────────────────────────────────────────────────

    pub fn rewind(&mut self) {
        self.prop = None;
        self.pending = self.payload_start;
        self.history.clear();
    }

    /// Advance to the next property. Returns its value type, or `None`
    /// at the end of the object.
    pub fn next(&mut self) -> Result<Option<FieldType>> {
        let start = self.next_start()?;
        self.mem.seek(start)?;
        if self.mem.peek_byte()? == marker::MOBJECT_END {
            self.prop = None;
            self.pending = start;
            return Ok(None);
        }
        let prop = self.parse_at(start)?;
        self.prop = Some(prop);
        self.history.push(start);
        Ok(Some(prop.value.ty))
    }

    pub fn has_next(&mut self) -> Result<bool> {
        let start = self.next_start()?;
        self.mem.seek(start)?;
        Ok(self.mem.peek_byte()? != marker::MOBJECT_END)
    }

    pub fn prev(&mut self) -> Result<Option<FieldType>> {
        if self.history.len() < 2 {
            return Ok(None);
        }
        self.history.pop();
        let start = match self.history.last() {
            Some(&s) => s,
            None => return Ok(None),
        };
        let prop = self.parse_at(start)?;
        self.prop = Some(prop);
        Ok(Some(prop.value.ty))
    }

    // ── Property Access ────────────────────────────────────────────

    /// Key of the current property.
    pub fn prop_name(&mut self) -> Result<&str> {
        let p = self.current()?;
        self.mem.seek(p.name_off)?;
        let bytes = self.mem.read(p.name_len)?;
        std::str::from_utf8(bytes)
            .map_err(|_| DocError::IllegalArg("object key is not valid UTF-8".into()))
    }

    /// Value type of the current property.
    pub fn prop_type(&self) -> Result<FieldType> {
        Ok(self.current()?.value.ty)
    }

    /// Offset of the current property's key length prefix.
    pub(crate) fn prop_key_offset(&self) -> Result<usize> {
        Ok(self.current()?.key_start)
    }

    /// Offset of the current property's value tag.
    pub(crate) fn prop_value_offset(&self) -> Result<usize> {
        Ok(self.current()?.value.start)
    }

    // ── Value Accessors ────────────────────────────────────────────

    pub fn u8_value(&mut self) -> Result<u8> {
        let p = self.current()?;
        access::u8_value(&mut self.mem, p.value)
    }

    pub fn u16_value(&mut self) -> Result<u16> {
        let p = self.current()?;
        access::u16_value(&mut self.mem, p.value)
    }

    pub fn u32_value(&mut self) -> Result<u32> {
        let p = self.current()?;
        access::u32_value(&mut self.mem, p.value)
    }

    pub fn u64_value(&mut self) -> Result<u64> {
        let p = self.current()?;
        access::u64_value(&mut self.mem, p.value)
    }

    pub fn i8_value(&mut self) -> Result<i8> {
        let p = self.current()?;
        access::i8_value(&mut self.mem, p.value)
    }

    pub fn i16_value(&mut self) -> Result<i16> {
        let p = self.current()?;
        access::i16_value(&mut self.mem, p.value)
    }

    pub fn i32_value(&mut self) -> Result<i32> {
        let p = self.current()?;
        access::i32_value(&mut self.mem, p.value)
    }

    pub fn i64_value(&mut self) -> Result<i64> {
        let p = self.current()?;
        access::i64_value(&mut self.mem, p.value)
    }

    pub fn float_value(&mut self) -> Result<f32> {
        let p = self.current()?;
        access::float_value(&mut self.mem, p.value)
    }

    pub fn unsigned_value(&mut self) -> Result<u64> {
        let p = self.current()?;
        access::unsigned_value(&mut self.mem, p.value)
    }

    pub fn signed_value(&mut self) -> Result<i64> {
        let p = self.current()?;
        access::signed_value(&mut self.mem, p.value)
    }

    pub fn bool_value(&self) -> Result<bool> {
        access::bool_value(self.current()?.value)
    }

    pub fn is_null(&self) -> Result<bool> {
        Ok(self.current()?.value.ty.is_null())
    }

    pub fn string_value(&mut self) -> Result<&str> {
        let p = self.current()?;
        access::string_value(&mut self.mem, p.value)
    }

    pub fn binary_value(&mut self) -> Result<BinaryValue<'_>> {
        let p = self.current()?;
        access::binary_value(&mut self.mem, p.value)
    }

    pub fn array_value(&mut self) -> Result<ArrayIter<'_>> {
        let p = self.current()?;
        if !p.value.ty.is_array() {
            return Err(DocError::TypeMismatch {
                expected: "array",
                found: p.value.ty.name(),
            });
        }
        ArrayIter::open(self.mem.reborrow_at(p.value.start))
    }

    pub fn object_value(&mut self) -> Result<ObjectIter<'_>> {
        let p = self.current()?;
        if !p.value.ty.is_object() {
            return Err(DocError::TypeMismatch {
                expected: "object",
                found: p.value.ty.name(),
            });
        }
        ObjectIter::open(self.mem.reborrow_at(p.value.start))
    }

    pub fn column_value(&mut self) -> Result<ColumnIter<'_>> {
        let p = self.current()?;
        if !p.value.ty.is_column() {
            return Err(DocError::TypeMismatch {
                expected: "column",
                found: p.value.ty.name(),
            });
        }
        ColumnIter::open(self.mem.reborrow_at(p.value.start))
    }

    // ── In-place Updates ───────────────────────────────────────────

    pub fn update_u8(&mut self, value: u8) -> Result<()> {
        let p = self.current()?;
        access::update_u8(&mut self.mem, p.value, value)
    }

    pub fn update_u16(&mut self, value: u16) -> Result<()> {
        let p = self.current()?;
        access::update_u16(&mut self.mem, p.value, value)
    }

    pub fn update_u32(&mut self, value: u32) -> Result<()> {
        let p = self.current()?;
        access::update_u32(&mut self.mem, p.value, value)
    }

    pub fn update_u64(&mut self, value: u64) -> Result<()> {
        let p = self.current()?;
        access::update_u64(&mut self.mem, p.value, value)
    }

    pub fn update_i8(&mut self, value: i8) -> Result<()> {
        let p = self.current()?;
        access::update_i8(&mut self.mem, p.value, value)
    }

    pub fn update_i16(&mut self, value: i16) -> Result<()> {
        let p = self.current()?;
        access::update_i16(&mut self.mem, p.value, value)
    }

    pub fn update_i32(&mut self, value: i32) -> Result<()> {
        let p = self.current()?;
        access::update_i32(&mut self.mem, p.value, value)
    }

    pub fn update_i64(&mut self, value: i64) -> Result<()> {
        let p = self.current()?;
        access::update_i64(&mut self.mem, p.value, value)
    }

    pub fn update_float(&mut self, value: f32) -> Result<()> {
        let p = self.current()?;
        access::update_float(&mut self.mem, p.value, value)
    }

    pub fn update_string(&mut self, value: &str) -> Result<()> {
        let p = self.current()?;
        let delta = access::update_string(&mut self.mem, p.value, value)?;
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
        let p = self.current()?;
        let ty = access::update_constant(&mut self.mem, p.value, new_marker)?;
        self.prop = Some(Prop {
            value: Field { ty, ..p.value },
            ..p
        });
        Ok(())
    }

    /// Rewrite this object's own abstract-type marker.
    pub fn set_derivation(&mut self, derivation: Derivation) -> Result<()> {
        self.mem.seek(self.start)?;
        self.mem
            .write_byte(ContainerKind::Object.begin_marker(derivation))?;
        self.derivation = derivation;
        Ok(())
    }

    // ── Structural Mutations ───────────────────────────────────────

    /// Remove the current property (key and value bytes).
    pub fn remove(&mut self) -> Result<()> {
        let p = self.current()?;
        if !self.mem.is_read_write() {
            return Err(DocError::ReadOnlyMode);
        }
        self.mem.seek(p.key_start)?;
        string::skip_nomarker(&mut self.mem)?;
        field::skip_field(&mut self.mem)?;
        let len = self.mem.tell() - p.key_start;

        self.mem.seek(p.key_start)?;
        self.mem.inplace_remove(len)?;

        self.mod_size -= len as i64;
        self.history.pop();
        self.prop = None;
        self.pending = p.key_start;
        Ok(())
    }

    /// Open an inserter at the cursor; appended values go through the
    /// `insert_prop_*` family.
    pub fn insert_begin(&mut self) -> Result<Inserter<'_>> {
        if !self.mem.is_read_write() {
            return Err(DocError::ReadOnlyMode);
        }
        let at = self.next_start()?;
        Inserter::new_object(self.mem.reborrow(), at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::KeySpec;
    use crate::record::Record;

    /// Record with root [{ "a": u8 1, "b": "x", "a": u8 2 }].
    fn sample_record() -> Record {
        let mut rec = Record::new(KeySpec::NoKey, Derivation::UnsortedMultiset).unwrap();
        {
            let mut it = rec.patch().unwrap();
            let mut ins = it.insert_begin().unwrap();
            ins.begin_object(Derivation::UnsortedMultiset).unwrap();
            ins.insert_prop_u8("a", 1).unwrap();
            ins.insert_prop_string("b", "x").unwrap();
            ins.insert_prop_u8("a", 2).unwrap();
            ins.end_object().unwrap();
        }
        rec
    }

    #[test]
    fn test_iterate_props() {
        let rec = sample_record();
        let mut root = rec.iter().unwrap();
        root.next().unwrap();
        let mut obj = root.object_value().unwrap();

        assert_eq!(obj.next().unwrap(), Some(FieldType::U8));
        assert_eq!(obj.prop_name().unwrap(), "a");
        assert_eq!(obj.u8_value().unwrap(), 1);

        assert_eq!(obj.next().unwrap(), Some(FieldType::String));
        assert_eq!(obj.prop_name().unwrap(), "b");
        assert_eq!(obj.string_value().unwrap(), "x");

        // Duplicate key is a separate property.
        assert_eq!(obj.next().unwrap(), Some(FieldType::U8));
        assert_eq!(obj.prop_name().unwrap(), "a");
        assert_eq!(obj.u8_value().unwrap(), 2);

        assert_eq!(obj.next().unwrap(), None);
    }

    #[test]
    fn test_prev_and_rewind() {
        let rec = sample_record();
        let mut root = rec.iter().unwrap();
        root.next().unwrap();
        let mut obj = root.object_value().unwrap();

        obj.next().unwrap();
        obj.next().unwrap();
        assert_eq!(obj.prev().unwrap(), Some(FieldType::U8));
        assert_eq!(obj.prop_name().unwrap(), "a");

        obj.rewind();
        obj.next().unwrap();
        assert_eq!(obj.prop_name().unwrap(), "a");
        assert_eq!(obj.u8_value().unwrap(), 1);
    }

    #[test]
    fn test_remove_prop() {
        let mut rec = sample_record();
        {
            let mut root = rec.patch().unwrap();
            root.next().unwrap();
            let mut obj = root.object_value().unwrap();
            obj.next().unwrap();
            obj.next().unwrap(); // "b"
            obj.remove().unwrap();
            assert!(obj.prop_type().is_err());
            // Following property is the duplicate "a".
            assert_eq!(obj.next().unwrap(), Some(FieldType::U8));
            assert_eq!(obj.u8_value().unwrap(), 2);
        }

        let mut root = rec.iter().unwrap();
        root.next().unwrap();
        let mut obj = root.object_value().unwrap();
        assert_eq!(obj.next().unwrap(), Some(FieldType::U8));
        assert_eq!(obj.next().unwrap(), Some(FieldType::U8));
        assert_eq!(obj.next().unwrap(), None);
    }

    #[test]
    fn test_update_string_prop_in_place() {
        let mut rec = sample_record();
        {
            let mut root = rec.patch().unwrap();
            root.next().unwrap();
            let mut obj = root.object_value().unwrap();
            obj.next().unwrap();
            obj.next().unwrap();
            obj.update_string("longer than before").unwrap();
            // Tail property still parses.
            assert_eq!(obj.next().unwrap(), Some(FieldType::U8));
            assert_eq!(obj.u8_value().unwrap(), 2);
        }
        Record::from_bytes(rec.as_bytes().to_vec()).unwrap();
    }

    #[test]
    fn test_empty_object() {
        let mut rec = Record::new(KeySpec::NoKey, Derivation::UnsortedMultiset).unwrap();
        {
            let mut it = rec.patch().unwrap();
            let mut ins = it.insert_begin().unwrap();
            ins.begin_object(Derivation::UnsortedMultiset).unwrap();
            ins.end_object().unwrap();
        }
        let mut root = rec.iter().unwrap();
        root.next().unwrap();
        let mut obj = root.object_value().unwrap();
        assert!(!obj.has_next().unwrap());
        assert_eq!(obj.next().unwrap(), None);
    }

    #[test]
    fn test_key_bytes_colliding_with_markers() {
        let mut rec = Record::new(KeySpec::NoKey, Derivation::UnsortedMultiset).unwrap();
        {
            let mut it = rec.patch().unwrap();
            let mut ins = it.insert_begin().unwrap();
            ins.begin_object(Derivation::UnsortedMultiset).unwrap();
            ins.insert_prop_string("]}", ")").unwrap();
            ins.insert_prop_u8("n", 1).unwrap();
            ins.end_object().unwrap();
        }
        let mut root = rec.iter().unwrap();
        root.next().unwrap();
        let mut obj = root.object_value().unwrap();
        assert_eq!(obj.next().unwrap(), Some(FieldType::String));
        assert_eq!(obj.prop_name().unwrap(), "]}");
        assert_eq!(obj.string_value().unwrap(), ")");
        assert_eq!(obj.next().unwrap(), Some(FieldType::U8));
        assert_eq!(obj.next().unwrap(), None);
    }
}
