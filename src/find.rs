//! Dot-path lookup façade: resolve once, read typed values.
//!
//! A `Find` borrows the record shared and keeps only the resolution
//! status and byte offsets, so any number of finds may coexist with
//! other readers. Container results hand out fresh read iterators
//! positioned at the resolved value.

use crate::error::{DocError, Result};
use crate::format::field::{self, FieldType};
use crate::format::{varint, ColumnType};
use crate::iter::{ArrayIter, ColumnIter, ColumnValue, ObjectIter};
use crate::memfile::{MemBlock, MemFile};
use crate::path::eval::{self, PathStatus, ResolvedLoc};
use crate::path::DotPath;
use crate::record::Record;

/// Result handle of a dot-path lookup.
pub struct Find<'a> {
    block: &'a MemBlock,
    status: PathStatus,
    loc: Option<ResolvedLoc>,
}

impl Record {
    /// Resolve a dot-path against this record.
    pub fn find(&self, path: &str) -> Result<Find<'_>> {
        let dot = DotPath::parse(path)?;
        self.find_path(&dot)
    }

    /// Resolve an already-parsed dot-path.
    pub fn find_path(&self, path: &DotPath) -> Result<Find<'_>> {
        let (status, loc) = eval::resolve(self.block(), self.payload_off(), path)?;
        Ok(Find {
            block: self.block(),
            status,
            loc,
        })
    }
}

impl<'a> Find<'a> {
    pub fn status(&self) -> PathStatus {
        self.status
    }

    /// Whether the path named an existing value.
    pub fn has_result(&self) -> bool {
        self.status == PathStatus::Resolved && self.loc.is_some()
    }

    fn loc(&self) -> Result<ResolvedLoc> {
        match self.loc {
            Some(loc) if self.status == PathStatus::Resolved => Ok(loc),
            _ => Err(DocError::IllegalArg(format!(
                "find has no result (status {:?})",
                self.status
            ))),
        }
    }

    /// Tag offset of the resolved value for array/object results.
    fn value_off(&self) -> Result<usize> {
        match self.loc()? {
            ResolvedLoc::ArrayElem { start } => Ok(start),
            ResolvedLoc::ObjectProp { value_start, .. } => Ok(value_start),
            ResolvedLoc::ColumnElem { .. } => Err(DocError::IllegalArg(
                "column elements have no field encoding".into(),
            )),
        }
    }

    fn mem_at(&self, off: usize) -> Result<MemFile<'a>> {
        let mut mem = MemFile::read_only(self.block);
        mem.seek(off)?;
        Ok(mem)
    }

    fn column_value(&self) -> Result<ColumnValue> {
        let ResolvedLoc::ColumnElem { start, idx } = self.loc()? else {
            return Err(DocError::IllegalArg("result is not a column element".into()));
        };
        let col = ColumnIter::open(self.mem_at(start)?)?;
        col.value_at(idx)
    }

    /// Logical type of the resolved value. Column elements report the
    /// type their decoded value carries.
    pub fn result_type(&self) -> Result<FieldType> {
        match self.loc()? {
            ResolvedLoc::ArrayElem { start } => field::peek_type(&self.mem_at(start)?),
            ResolvedLoc::ObjectProp { value_start, .. } => {
                field::peek_type(&self.mem_at(value_start)?)
            }
            ResolvedLoc::ColumnElem { .. } => Ok(match self.column_value()? {
                ColumnValue::Null => FieldType::Null,
                ColumnValue::Bool(true) => FieldType::True,
                ColumnValue::Bool(false) => FieldType::False,
                ColumnValue::U8(_) => FieldType::U8,
                ColumnValue::U16(_) => FieldType::U16,
                ColumnValue::U32(_) => FieldType::U32,
                ColumnValue::U64(_) => FieldType::U64,
                ColumnValue::I8(_) => FieldType::I8,
                ColumnValue::I16(_) => FieldType::I16,
                ColumnValue::I32(_) => FieldType::I32,
                ColumnValue::I64(_) => FieldType::I64,
                ColumnValue::Float32(_) => FieldType::Float32,
            }),
        }
    }

    // ── Scalar Accessors ───────────────────────────────────────────

    pub fn is_null(&self) -> Result<bool> {
        Ok(self.result_type()?.is_null())
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.result_type()? {
            FieldType::True => Ok(true),
            FieldType::False => Ok(false),
            other => Err(DocError::TypeMismatch {
                expected: "boolean",
                found: other.name(),
            }),
        }
    }

    /// Unsigned integer of any width, widened to u64.
    pub fn as_unsigned(&self) -> Result<u64> {
        if let Ok(ResolvedLoc::ColumnElem { .. }) = self.loc() {
            return match self.column_value()? {
                ColumnValue::U8(v) => Ok(u64::from(v)),
                ColumnValue::U16(v) => Ok(u64::from(v)),
                ColumnValue::U32(v) => Ok(u64::from(v)),
                ColumnValue::U64(v) => Ok(v),
                other => Err(column_mismatch("unsigned number", other)),
            };
        }
        let off = self.value_off()?;
        let mut mem = self.mem_at(off)?;
        let ty = field::peek_type(&mem)?;
        mem.skip(1)?;
        match ty {
            FieldType::U8 => Ok(u64::from(mem.read_byte()?)),
            FieldType::U16 => Ok(u64::from(mem.read_u16()?)),
            FieldType::U32 => Ok(u64::from(mem.read_u32()?)),
            FieldType::U64 => mem.read_u64(),
            other => Err(DocError::TypeMismatch {
                expected: "unsigned number",
                found: other.name(),
            }),
        }
    }

    /// Signed integer of any width, widened to i64.
    pub fn as_signed(&self) -> Result<i64> {
        if let Ok(ResolvedLoc::ColumnElem { .. }) = self.loc() {
            return match self.column_value()? {
                ColumnValue::I8(v) => Ok(i64::from(v)),
                ColumnValue::I16(v) => Ok(i64::from(v)),
                ColumnValue::I32(v) => Ok(i64::from(v)),
                ColumnValue::I64(v) => Ok(v),
                other => Err(column_mismatch("signed number", other)),
            };
        }
        let off = self.value_off()?;
        let mut mem = self.mem_at(off)?;
        let ty = field::peek_type(&mem)?;
        mem.skip(1)?;
        match ty {
            FieldType::I8 => Ok(i64::from(mem.read_i8()?)),
            FieldType::I16 => Ok(i64::from(mem.read_i16()?)),
            FieldType::I32 => Ok(i64::from(mem.read_i32()?)),
            FieldType::I64 => mem.read_i64(),
            other => Err(DocError::TypeMismatch {
                expected: "signed number",
                found: other.name(),
            }),
        }
    }

    pub fn as_float(&self) -> Result<f32> {
        if let Ok(ResolvedLoc::ColumnElem { .. }) = self.loc() {
            return match self.column_value()? {
                ColumnValue::Float32(v) => Ok(v),
                other => Err(column_mismatch("number (float)", other)),
            };
        }
        let off = self.value_off()?;
        let mut mem = self.mem_at(off)?;
        let ty = field::peek_type(&mem)?;
        if ty != FieldType::Float32 {
            return Err(DocError::TypeMismatch {
                expected: "number (float)",
                found: ty.name(),
            });
        }
        mem.skip(1)?;
        mem.read_f32()
    }

    /// Borrowed string value; the borrow lives as long as the record.
    pub fn as_str(&self) -> Result<&'a str> {
        let off = self.value_off()?;
        let bytes = self.block.as_slice();
        let ty = field::peek_type(&self.mem_at(off)?)?;
        if ty != FieldType::String {
            return Err(DocError::TypeMismatch {
                expected: "string",
                found: ty.name(),
            });
        }
        let (len, n) = varint::decode(&bytes[off + 1..])?;
        let start = off + 1 + n;
        let end = start + len as usize;
        std::str::from_utf8(&bytes[start..end])
            .map_err(|_| DocError::IllegalArg("string payload is not valid UTF-8".into()))
    }

    /// Borrowed binary value as (content type, payload bytes).
    pub fn as_binary(&self) -> Result<(String, &'a [u8])> {
        let off = self.value_off()?;
        let bytes = self.block.as_slice();
        let ty = field::peek_type(&self.mem_at(off)?)?;
        match ty {
            FieldType::Binary => {
                let (mime_id, n1) = varint::decode(&bytes[off + 1..])?;
                let (len, n2) = varint::decode(&bytes[off + 1 + n1..])?;
                let start = off + 1 + n1 + n2;
                Ok((
                    crate::format::binary::mime_type_by_id(mime_id as u32).to_string(),
                    &bytes[start..start + len as usize],
                ))
            }
            FieldType::BinaryCustom => {
                let (tlen, n1) = varint::decode(&bytes[off + 1..])?;
                let tstart = off + 1 + n1;
                let tend = tstart + tlen as usize;
                let content_type = std::str::from_utf8(&bytes[tstart..tend])
                    .map_err(|_| {
                        DocError::IllegalArg("binary content type is not valid UTF-8".into())
                    })?
                    .to_string();
                let (len, n2) = varint::decode(&bytes[tend..])?;
                let start = tend + n2;
                Ok((content_type, &bytes[start..start + len as usize]))
            }
            other => Err(DocError::TypeMismatch {
                expected: "binary",
                found: other.name(),
            }),
        }
    }

    /// Decoded column element (any element type).
    pub fn as_column_value(&self) -> Result<ColumnValue> {
        self.column_value()
    }

    // ── Container Accessors ────────────────────────────────────────

    /// Fresh read iterator over a resolved array value.
    pub fn array_iter(&self) -> Result<ArrayIter<'a>> {
        let off = self.value_off()?;
        ArrayIter::open(self.mem_at(off)?)
    }

    /// Fresh read iterator over a resolved object value.
    pub fn object_iter(&self) -> Result<ObjectIter<'a>> {
        let off = self.value_off()?;
        ObjectIter::open(self.mem_at(off)?)
    }

    /// Fresh read iterator over a resolved column value (the whole
    /// column, not one element).
    pub fn column_iter(&self) -> Result<ColumnIter<'a>> {
        match self.loc()? {
            ResolvedLoc::ColumnElem { start, .. } => ColumnIter::open(self.mem_at(start)?),
            _ => {
                let off = self.value_off()?;
                ColumnIter::open(self.mem_at(off)?)
            }
        }
    }

    /// Element type of a resolved column value.
    pub fn column_type(&self) -> Result<ColumnType> {
        self.column_iter()?.column_type()
    }
}

fn column_mismatch(expected: &'static str, found: ColumnValue) -> DocError {
    let found_name = match found {
        ColumnValue::Null => "null",
        ColumnValue::Bool(_) => "boolean",
        ColumnValue::U8(_) => "number (u8)",
        ColumnValue::U16(_) => "number (u16)",
        ColumnValue::U32(_) => "number (u32)",
        ColumnValue::U64(_) => "number (u64)",
        ColumnValue::I8(_) => "number (i8)",
        ColumnValue::I16(_) => "number (i16)",
        ColumnValue::I32(_) => "number (i32)",
        ColumnValue::I64(_) => "number (i64)",
        ColumnValue::Float32(_) => "number (float)",
    };
    DocError::TypeMismatch {
        expected,
        found: found_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Derivation, KeySpec};

    /// Root: [{ "a": column<u8>[1,2,3], "b": { "c": "d" }, "s": "str",
    ///          "f": 1.5, "t": true, "n": null, "bin": binary }]
    fn sample() -> Record {
        let mut rec = Record::new(KeySpec::NoKey, Derivation::UnsortedMultiset).unwrap();
        {
            let mut it = rec.patch().unwrap();
            let mut ins = it.insert_begin().unwrap();
            ins.begin_object(Derivation::UnsortedMultiset).unwrap();
            ins.begin_prop_column("a", ColumnType::U8, Derivation::UnsortedMultiset, 3)
                .unwrap();
            ins.insert_u8(1).unwrap();
            ins.insert_u8(2).unwrap();
            ins.insert_u8(3).unwrap();
            ins.end_column().unwrap();
            ins.begin_prop_object("b", Derivation::UnsortedMultiset).unwrap();
            ins.insert_prop_string("c", "d").unwrap();
            ins.end_object().unwrap();
            ins.insert_prop_string("s", "str").unwrap();
            ins.insert_prop_float("f", 1.5).unwrap();
            ins.insert_prop_true("t").unwrap();
            ins.insert_prop_null("n").unwrap();
            ins.insert_prop_binary("bin", &[0xAB, 0xCD], Some("png"))
                .unwrap();
            ins.end_object().unwrap();
        }
        rec
    }

    #[test]
    fn test_find_column_element() {
        let rec = sample();
        let find = rec.find("a[2]").unwrap();
        assert!(find.has_result());
        assert_eq!(find.status(), PathStatus::Resolved);
        assert_eq!(find.result_type().unwrap(), FieldType::U8);
        assert_eq!(find.as_unsigned().unwrap(), 3);
        assert_eq!(find.as_column_value().unwrap(), ColumnValue::U8(3));
    }

    #[test]
    fn test_find_string() {
        let rec = sample();
        let find = rec.find("b.c").unwrap();
        assert_eq!(find.as_str().unwrap(), "d");
        assert_eq!(find.result_type().unwrap(), FieldType::String);

        let find = rec.find("s").unwrap();
        assert_eq!(find.as_str().unwrap(), "str");
    }

    #[test]
    fn test_find_scalars() {
        let rec = sample();
        assert_eq!(rec.find("f").unwrap().as_float().unwrap(), 1.5);
        assert!(rec.find("t").unwrap().as_bool().unwrap());
        assert!(rec.find("n").unwrap().is_null().unwrap());
    }

    #[test]
    fn test_find_binary() {
        let rec = sample();
        let find = rec.find("bin").unwrap();
        let (mime, bytes) = find.as_binary().unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, &[0xAB, 0xCD]);
    }

    #[test]
    fn test_find_missing_key_is_not_an_error() {
        let rec = sample();
        let find = rec.find("b.x").unwrap();
        assert!(!find.has_result());
        assert_eq!(find.status(), PathStatus::NoSuchKey);
        // Accessors on a missing result fail.
        assert!(find.as_str().is_err());
    }

    #[test]
    fn test_find_container_results() {
        let rec = sample();
        let find = rec.find("b").unwrap();
        assert_eq!(find.result_type().unwrap(), FieldType::Object);
        let mut obj = find.object_iter().unwrap();
        assert_eq!(obj.next().unwrap(), Some(FieldType::String));
        assert_eq!(obj.prop_name().unwrap(), "c");

        let find = rec.find("a").unwrap();
        assert_eq!(find.column_type().unwrap(), ColumnType::U8);
        let col = find.column_iter().unwrap();
        assert_eq!(col.count().unwrap(), 3);
    }

    #[test]
    fn test_find_type_mismatch() {
        let rec = sample();
        let find = rec.find("s").unwrap();
        assert!(matches!(
            find.as_unsigned(),
            Err(DocError::TypeMismatch { .. })
        ));
        assert!(matches!(find.as_bool(), Err(DocError::TypeMismatch { .. })));
    }

    #[test]
    fn test_find_multiple_coexist() {
        let rec = sample();
        let f1 = rec.find("s").unwrap();
        let f2 = rec.find("b.c").unwrap();
        // Borrowed results from both are usable simultaneously.
        assert_eq!(f1.as_str().unwrap(), "str");
        assert_eq!(f2.as_str().unwrap(), "d");
    }

    #[test]
    fn test_find_bad_path_syntax_is_an_error() {
        let rec = sample();
        assert!(matches!(rec.find("a..b"), Err(DocError::IllegalArg(_))));
    }
}
