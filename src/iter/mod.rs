//! Container iterators and the typed append API.
//!
//! Array and object iterators share a re-parsing cursor model: the
//! start offset of the current element is remembered and "next" is
//! found by structurally skipping from that start. Because arrays and
//! objects are delimiter-terminated, in-place size changes inside the
//! current element (including through sub-iterators) are absorbed by
//! the next skip instead of invalidating the cursor.

mod access;
mod array;
mod column;
mod insert;
mod object;

pub use array::ArrayIter;
pub use column::{ColumnIter, ColumnValue};
pub use insert::Inserter;
pub use object::ObjectIter;

use crate::format::FieldType;

/// Cached parse of the element under an iterator's cursor.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Field {
    pub ty: FieldType,
    /// Offset of the tag byte.
    pub start: usize,
    /// Offset of the payload (tag + 1).
    pub payload: usize,
}
