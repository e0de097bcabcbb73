//! Marker byte alphabet of the document format.
//!
//! Every value and container boundary is introduced by a single marker
//! byte from a closed set. Container begin markers additionally encode
//! the container's abstract type (derivation).
//!
//! ```text
//! kind    unsorted-multiset  sorted-multiset  unsorted-set  sorted-set  end
//! array   [                  <                /             =           ]
//! column  (                  $                !             &           )
//! object  {                  *                %             #           }
//! ```

use serde::{Deserialize, Serialize};

// ── Primitive field markers ────────────────────────────────────────

pub const MNULL: u8 = b'n';
pub const MTRUE: u8 = b't';
pub const MFALSE: u8 = b'f';
pub const MSTRING: u8 = b's';
pub const MU8: u8 = b'c';
pub const MU16: u8 = b'd';
pub const MU32: u8 = b'i';
pub const MU64: u8 = b'l';
pub const MI8: u8 = b'C';
pub const MI16: u8 = b'D';
pub const MI32: u8 = b'I';
pub const MI64: u8 = b'L';
pub const MFLOAT32: u8 = b'r';
pub const MBINARY: u8 = b'b';
pub const MBINARY_CUSTOM: u8 = b'x';

// ── Container markers ──────────────────────────────────────────────

pub const MARRAY_UNSORTED_MULTISET: u8 = b'[';
pub const MARRAY_SORTED_MULTISET: u8 = b'<';
pub const MARRAY_UNSORTED_SET: u8 = b'/';
pub const MARRAY_SORTED_SET: u8 = b'=';
pub const MARRAY_END: u8 = b']';

pub const MCOLUMN_UNSORTED_MULTISET: u8 = b'(';
pub const MCOLUMN_SORTED_MULTISET: u8 = b'$';
pub const MCOLUMN_UNSORTED_SET: u8 = b'!';
pub const MCOLUMN_SORTED_SET: u8 = b'&';
pub const MCOLUMN_END: u8 = b')';

pub const MOBJECT_UNSORTED_MULTISET: u8 = b'{';
pub const MOBJECT_SORTED_MULTISET: u8 = b'*';
pub const MOBJECT_UNSORTED_SET: u8 = b'%';
pub const MOBJECT_SORTED_SET: u8 = b'#';
pub const MOBJECT_END: u8 = b'}';

// ── Column subtype bytes ───────────────────────────────────────────

pub const SUB_U8: u8 = b'c';
pub const SUB_U16: u8 = b'd';
pub const SUB_U32: u8 = b'i';
pub const SUB_U64: u8 = b'l';
pub const SUB_I8: u8 = b'C';
pub const SUB_I16: u8 = b'D';
pub const SUB_I32: u8 = b'I';
pub const SUB_I64: u8 = b'L';
pub const SUB_FLOAT32: u8 = b'r';
pub const SUB_BOOLEAN: u8 = b'B';

// ── Abstract container type ────────────────────────────────────────

/// Semantic variant attached to every container marker. Carried and
/// preserved; the library never validates reads against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Derivation {
    #[default]
    UnsortedMultiset,
    SortedMultiset,
    UnsortedSet,
    SortedSet,
}

/// The three container kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Array,
    Column,
    Object,
}

impl ContainerKind {
    /// Begin marker for this kind under the given derivation.
    pub fn begin_marker(self, derivation: Derivation) -> u8 {
        use Derivation::*;
        match (self, derivation) {
            (Self::Array, UnsortedMultiset) => MARRAY_UNSORTED_MULTISET,
            (Self::Array, SortedMultiset) => MARRAY_SORTED_MULTISET,
            (Self::Array, UnsortedSet) => MARRAY_UNSORTED_SET,
            (Self::Array, SortedSet) => MARRAY_SORTED_SET,
            (Self::Column, UnsortedMultiset) => MCOLUMN_UNSORTED_MULTISET,
            (Self::Column, SortedMultiset) => MCOLUMN_SORTED_MULTISET,
            (Self::Column, UnsortedSet) => MCOLUMN_UNSORTED_SET,
            (Self::Column, SortedSet) => MCOLUMN_SORTED_SET,
            (Self::Object, UnsortedMultiset) => MOBJECT_UNSORTED_MULTISET,
            (Self::Object, SortedMultiset) => MOBJECT_SORTED_MULTISET,
            (Self::Object, UnsortedSet) => MOBJECT_UNSORTED_SET,
            (Self::Object, SortedSet) => MOBJECT_SORTED_SET,
        }
    }

    pub fn end_marker(self) -> u8 {
        match self {
            Self::Array => MARRAY_END,
            Self::Column => MCOLUMN_END,
            Self::Object => MOBJECT_END,
        }
    }
}

/// Classify a container begin marker into (kind, derivation).
pub fn container_of_marker(marker: u8) -> Option<(ContainerKind, Derivation)> {
    use ContainerKind::*;
    use Derivation::*;
    match marker {
        MARRAY_UNSORTED_MULTISET => Some((Array, UnsortedMultiset)),
        MARRAY_SORTED_MULTISET => Some((Array, SortedMultiset)),
        MARRAY_UNSORTED_SET => Some((Array, UnsortedSet)),
        MARRAY_SORTED_SET => Some((Array, SortedSet)),
        MCOLUMN_UNSORTED_MULTISET => Some((Column, UnsortedMultiset)),
        MCOLUMN_SORTED_MULTISET => Some((Column, SortedMultiset)),
        MCOLUMN_UNSORTED_SET => Some((Column, UnsortedSet)),
        MCOLUMN_SORTED_SET => Some((Column, SortedSet)),
        MOBJECT_UNSORTED_MULTISET => Some((Object, UnsortedMultiset)),
        MOBJECT_SORTED_MULTISET => Some((Object, SortedMultiset)),
        MOBJECT_UNSORTED_SET => Some((Object, UnsortedSet)),
        MOBJECT_SORTED_SET => Some((Object, SortedSet)),
        _ => None,
    }
}

// ── Column element type ────────────────────────────────────────────

/// Element type of a column container. Fixed width per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float32,
    Boolean,
}

impl ColumnType {
    pub fn from_subtype(byte: u8) -> Option<Self> {
        match byte {
            SUB_U8 => Some(Self::U8),
            SUB_U16 => Some(Self::U16),
            SUB_U32 => Some(Self::U32),
            SUB_U64 => Some(Self::U64),
            SUB_I8 => Some(Self::I8),
            SUB_I16 => Some(Self::I16),
            SUB_I32 => Some(Self::I32),
            SUB_I64 => Some(Self::I64),
            SUB_FLOAT32 => Some(Self::Float32),
            SUB_BOOLEAN => Some(Self::Boolean),
            _ => None,
        }
    }

    pub fn subtype_marker(self) -> u8 {
        match self {
            Self::U8 => SUB_U8,
            Self::U16 => SUB_U16,
            Self::U32 => SUB_U32,
            Self::U64 => SUB_U64,
            Self::I8 => SUB_I8,
            Self::I16 => SUB_I16,
            Self::I32 => SUB_I32,
            Self::I64 => SUB_I64,
            Self::Float32 => SUB_FLOAT32,
            Self::Boolean => SUB_BOOLEAN,
        }
    }

    /// Slot width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 | Self::Boolean => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::Float32 => 4,
            Self::U64 | Self::I64 => 8,
        }
    }

    /// Little-endian byte image of the null sentinel for this type.
    pub fn null_sentinel(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        match self {
            Self::U8 => out[..1].copy_from_slice(&[0xFF]),
            Self::U16 => out[..2].copy_from_slice(&0xFFFFu16.to_le_bytes()),
            Self::U32 => out[..4].copy_from_slice(&u32::MAX.to_le_bytes()),
            Self::U64 => out.copy_from_slice(&u64::MAX.to_le_bytes()),
            Self::I8 => out[..1].copy_from_slice(&[i8::MIN as u8]),
            Self::I16 => out[..2].copy_from_slice(&i16::MIN.to_le_bytes()),
            Self::I32 => out[..4].copy_from_slice(&i32::MIN.to_le_bytes()),
            Self::I64 => out.copy_from_slice(&i64::MIN.to_le_bytes()),
            // NaN with every payload bit set.
            Self::Float32 => out[..4].copy_from_slice(&u32::MAX.to_le_bytes()),
            Self::Boolean => out[..1].copy_from_slice(&[BOOL_NULL]),
        }
        out
    }
}

// ── Boolean column slot values ─────────────────────────────────────

pub const BOOL_NULL: u8 = 0;
pub const BOOL_TRUE: u8 = 1;
pub const BOOL_FALSE: u8 = 2;
