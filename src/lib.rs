//! DocBin — a self-describing binary document format.
//!
//! Records store schema-less, JSON-compatible data in a compact byte
//! layout that supports in-place mutation: heterogeneous arrays,
//! homogeneous typed columns, and objects, all introduced by one-byte
//! markers. On top of the encoding sit iterators, a typed append API,
//! dot-path lookup, and two mutation disciplines — content-addressed
//! revisions (`Revise`) and hash-preserving patches (`Record::patch`).
//!
//! ```
//! use docbin::{KeySpec, Record, Revise};
//!
//! let rec = Record::from_json(
//!     r#"{"user": "ada", "scores": [1, 2, 3]}"#,
//!     KeySpec::Unsigned(42),
//! )?;
//! assert_eq!(rec.find("scores[2]")?.as_unsigned()?, 3);
//!
//! let mut ctx = Revise::begin(&rec);
//! ctx.remove("user")?;
//! let revised = ctx.end()?;
//! assert_ne!(revised.commit_hash(), rec.commit_hash());
//! # Ok::<(), docbin::DocError>(())
//! ```

pub mod error;
pub mod format;
pub mod iter;
pub mod memfile;
pub mod path;
pub mod uid;

mod find;
mod hash;
mod json;
mod patch;
mod record;
mod revise;
mod spin;

pub use error::{DocError, Result};
pub use find::Find;
pub use format::{ColumnType, ContainerKind, Derivation, FieldType, Key, KeySpec, KeyType};
pub use hash::fnv1a_64;
pub use iter::{ArrayIter, ColumnIter, ColumnValue, Inserter, ObjectIter};
pub use path::eval::PathStatus;
pub use path::{DotNode, DotPath};
pub use record::Record;
pub use revise::Revise;
