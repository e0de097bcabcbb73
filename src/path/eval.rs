//! Dot-path resolution against a record payload.
//!
//! The resolver walks node-by-node using throwaway read-only iterators
//! and returns offsets (`ResolvedLoc`), not live iterators, so the
//! result outlives the traversal and works for both read and revise
//! sessions.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::format::FieldType;
use crate::iter::{ArrayIter, ColumnIter, ObjectIter};
use crate::memfile::{MemBlock, MemFile};
use crate::path::{DotNode, DotPath};

/// Outcome of a path resolution. Lookup failures are values, not
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStatus {
    /// The path names an existing value.
    Resolved,
    /// The root array is empty.
    EmptyDoc,
    /// An index node ran past the end of an array or column.
    NoSuchIndex,
    /// A key node matched no property.
    NoSuchKey,
    /// A key node was applied to something that cannot hold keys.
    NotTraversable,
    /// An index node was applied to a non-indexable value.
    NoContainer,
    /// A key node was applied where no object is present.
    NotAnObject,
    /// The path descends below a column element (columns hold only
    /// primitives).
    NoNesting,
    /// Resolver invariant violated (malformed document).
    Internal,
}

/// Where a resolved path landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolvedLoc {
    /// Element of an array; `start` is its tag offset.
    ArrayElem { start: usize },
    /// Property of an object.
    ObjectProp { key_start: usize, value_start: usize },
    /// Element of a column.
    ColumnElem { start: usize, idx: u32 },
}

#[derive(Clone, Copy)]
enum Ctx {
    Array { off: usize },
    Object { off: usize },
    Column { off: usize },
}

fn ctx_for(ty: FieldType, off: usize) -> Option<Ctx> {
    match ty {
        FieldType::Array => Some(Ctx::Array { off }),
        FieldType::Object => Some(Ctx::Object { off }),
        FieldType::Column(_) => Some(Ctx::Column { off }),
        _ => None,
    }
}

fn array_at<'b>(block: &'b MemBlock, off: usize) -> Result<ArrayIter<'b>> {
    let mut mem = MemFile::read_only(block);
    mem.seek(off)?;
    ArrayIter::open(mem)
}

fn object_at<'b>(block: &'b MemBlock, off: usize) -> Result<ObjectIter<'b>> {
    let mut mem = MemFile::read_only(block);
    mem.seek(off)?;
    ObjectIter::open(mem)
}

fn column_at<'b>(block: &'b MemBlock, off: usize) -> Result<ColumnIter<'b>> {
    let mut mem = MemFile::read_only(block);
    mem.seek(off)?;
    ColumnIter::open(mem)
}

/// Resolve `path` against the root array at `payload_off`.
///
/// Hard failures (corrupt documents) propagate as errors; lookup
/// failures come back as a non-`Resolved` status with no location.
pub(crate) fn resolve(
    block: &MemBlock,
    payload_off: usize,
    path: &DotPath,
) -> Result<(PathStatus, Option<ResolvedLoc>)> {
    let nodes = path.nodes();
    let mut ctx = Ctx::Array { off: payload_off };
    let mut at_root = true;

    let mut i = 0;
    while i < nodes.len() {
        let last = i + 1 == nodes.len();
        match (&nodes[i], ctx) {
            // ── Index into an array ────────────────────────────────
            (DotNode::Idx(n), Ctx::Array { off }) => {
                let mut it = array_at(block, off)?;
                let mut ty = None;
                for _ in 0..=*n {
                    match it.next()? {
                        Some(t) => ty = Some(t),
                        None => return Ok((PathStatus::NoSuchIndex, None)),
                    }
                }
                let Some(ty) = ty else {
                    return Ok((PathStatus::Internal, None));
                };
                let start = it.field_offset()?;
                if last {
                    return Ok((
                        PathStatus::Resolved,
                        Some(ResolvedLoc::ArrayElem { start }),
                    ));
                }
                match ctx_for(ty, start) {
                    Some(next) => ctx = next,
                    None => return Ok((PathStatus::NoContainer, None)),
                }
            }

            // ── Index into a column ────────────────────────────────
            (DotNode::Idx(n), Ctx::Column { off }) => {
                let col = column_at(block, off)?;
                if *n >= col.count()? {
                    return Ok((PathStatus::NoSuchIndex, None));
                }
                if !last {
                    return Ok((PathStatus::NoNesting, None));
                }
                return Ok((
                    PathStatus::Resolved,
                    Some(ResolvedLoc::ColumnElem { start: off, idx: *n }),
                ));
            }

            // ── Index into an object ───────────────────────────────
            (DotNode::Idx(_), Ctx::Object { .. }) => {
                return Ok((PathStatus::NoContainer, None));
            }

            // ── Key into an object ─────────────────────────────────
            (DotNode::Key(k), Ctx::Object { off }) => {
                let mut it = object_at(block, off)?;
                loop {
                    match it.next()? {
                        None => return Ok((PathStatus::NoSuchKey, None)),
                        Some(ty) => {
                            if it.prop_name()? == k.as_str() {
                                let key_start = it.prop_key_offset()?;
                                let value_start = it.prop_value_offset()?;
                                if last {
                                    return Ok((
                                        PathStatus::Resolved,
                                        Some(ResolvedLoc::ObjectProp {
                                            key_start,
                                            value_start,
                                        }),
                                    ));
                                }
                                match ctx_for(ty, value_start) {
                                    Some(next) => ctx = next,
                                    None => return Ok((PathStatus::NoContainer, None)),
                                }
                                break;
                            }
                        }
                    }
                }
            }

            // ── Key into an array: auto-descend into a leading
            //    object element ──────────────────────────────────────
            (DotNode::Key(_), Ctx::Array { off }) => {
                let mut it = array_at(block, off)?;
                match it.next()? {
                    None if at_root => return Ok((PathStatus::EmptyDoc, None)),
                    None => return Ok((PathStatus::NotAnObject, None)),
                    Some(FieldType::Object) => {
                        let start = it.field_offset()?;
                        ctx = Ctx::Object { off: start };
                        // Re-process this node against the object.
                        at_root = false;
                        continue;
                    }
                    Some(_) => return Ok((PathStatus::NotAnObject, None)),
                }
            }

            // ── Key into a column ──────────────────────────────────
            (DotNode::Key(_), Ctx::Column { .. }) => {
                return Ok((PathStatus::NotTraversable, None));
            }
        }
        at_root = false;
        i += 1;
    }

    // Empty paths never get here (the parser rejects them).
    Ok((PathStatus::Internal, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Derivation, KeySpec};
    use crate::record::Record;

    /// Root: [{ "a": column<u8>[1,2,3], "b": { "c": "d" }, "e": [true, [null]] }]
    fn nested_record() -> Record {
        let mut rec = Record::new(KeySpec::NoKey, Derivation::UnsortedMultiset).unwrap();
        {
            let mut it = rec.patch().unwrap();
            let mut ins = it.insert_begin().unwrap();
            ins.begin_object(Derivation::UnsortedMultiset).unwrap();
            ins.begin_prop_column(
                "a",
                crate::format::ColumnType::U8,
                Derivation::UnsortedMultiset,
                3,
            )
            .unwrap();
            ins.insert_u8(1).unwrap();
            ins.insert_u8(2).unwrap();
            ins.insert_u8(3).unwrap();
            ins.end_column().unwrap();
            ins.begin_prop_object("b", Derivation::UnsortedMultiset).unwrap();
            ins.insert_prop_string("c", "d").unwrap();
            ins.end_object().unwrap();
            ins.begin_prop_array("e", Derivation::UnsortedMultiset).unwrap();
            ins.insert_true().unwrap();
            ins.begin_array(Derivation::UnsortedMultiset).unwrap();
            ins.insert_null().unwrap();
            ins.end_array().unwrap();
            ins.end_array().unwrap();
            ins.end_object().unwrap();
        }
        rec
    }

    fn status_of(rec: &Record, path: &str) -> PathStatus {
        let dot = DotPath::parse(path).unwrap();
        resolve(rec.block(), rec.payload_off(), &dot).unwrap().0
    }

    #[test]
    fn test_resolve_column_element() {
        let rec = nested_record();
        let dot = DotPath::parse("a[2]").unwrap();
        let (status, loc) = resolve(rec.block(), rec.payload_off(), &dot).unwrap();
        assert_eq!(status, PathStatus::Resolved);
        assert!(matches!(loc, Some(ResolvedLoc::ColumnElem { idx: 2, .. })));
    }

    #[test]
    fn test_resolve_object_prop() {
        let rec = nested_record();
        let dot = DotPath::parse("b.c").unwrap();
        let (status, loc) = resolve(rec.block(), rec.payload_off(), &dot).unwrap();
        assert_eq!(status, PathStatus::Resolved);
        assert!(matches!(loc, Some(ResolvedLoc::ObjectProp { .. })));
    }

    #[test]
    fn test_resolve_array_element() {
        let rec = nested_record();
        let dot = DotPath::parse("e[1][0]").unwrap();
        let (status, loc) = resolve(rec.block(), rec.payload_off(), &dot).unwrap();
        assert_eq!(status, PathStatus::Resolved);
        assert!(matches!(loc, Some(ResolvedLoc::ArrayElem { .. })));
    }

    #[test]
    fn test_no_such_key() {
        let rec = nested_record();
        assert_eq!(status_of(&rec, "b.x"), PathStatus::NoSuchKey);
        assert_eq!(status_of(&rec, "zzz"), PathStatus::NoSuchKey);
    }

    #[test]
    fn test_no_such_index() {
        let rec = nested_record();
        assert_eq!(status_of(&rec, "a[3]"), PathStatus::NoSuchIndex);
        assert_eq!(status_of(&rec, "e[9]"), PathStatus::NoSuchIndex);
        assert_eq!(status_of(&rec, "[1]"), PathStatus::NoSuchIndex);
    }

    #[test]
    fn test_empty_doc() {
        let rec = Record::new(KeySpec::NoKey, Derivation::UnsortedMultiset).unwrap();
        assert_eq!(status_of(&rec, "a"), PathStatus::EmptyDoc);
        assert_eq!(status_of(&rec, "[0]"), PathStatus::NoSuchIndex);
    }

    #[test]
    fn test_no_nesting_below_column() {
        let rec = nested_record();
        assert_eq!(status_of(&rec, "a[0][1]"), PathStatus::NoNesting);
        assert_eq!(status_of(&rec, "a[0].k"), PathStatus::NoNesting);
    }

    #[test]
    fn test_not_an_object() {
        // Root whose first element is a number: key lookup fails.
        let mut rec = Record::new(KeySpec::NoKey, Derivation::UnsortedMultiset).unwrap();
        {
            let mut it = rec.patch().unwrap();
            let mut ins = it.insert_begin().unwrap();
            ins.insert_u8(1).unwrap();
        }
        assert_eq!(status_of(&rec, "a"), PathStatus::NotAnObject);
    }

    #[test]
    fn test_key_into_column_not_traversable() {
        let rec = nested_record();
        assert_eq!(status_of(&rec, "a.k"), PathStatus::NotTraversable);
    }

    #[test]
    fn test_index_into_object_no_container() {
        let rec = nested_record();
        // "b" is an object; indexing it is not possible.
        assert_eq!(status_of(&rec, "b[0]"), PathStatus::NoContainer);
    }

    #[test]
    fn test_descend_into_primitive_no_container() {
        let rec = nested_record();
        // "b.c" is a string; going deeper fails.
        assert_eq!(status_of(&rec, "b.c.x"), PathStatus::NoContainer);
        assert_eq!(status_of(&rec, "e[0][0]"), PathStatus::NoContainer);
    }
}
