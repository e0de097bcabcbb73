//! Byte-level codecs of the document format.
//!
//! Leaf building blocks: varints, marker alphabet, field tags and
//! structural skipping, string/binary payloads, record key and commit
//! sections.

pub mod binary;
pub mod commit;
pub mod field;
pub mod key;
pub mod marker;
pub mod string;
pub mod varint;

pub use field::FieldType;
pub use key::{Key, KeySpec, KeyType};
pub use marker::{ColumnType, ContainerKind, Derivation};
