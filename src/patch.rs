//! Patch sessions: in-place mutation without a new revision.
//!
//! A patch opens the record's own buffer read-write and deliberately
//! never touches the commit section — patches are hash-preserving by
//! definition. The session is the lifetime of the iterator returned
//! by [`Record::patch`]; exclusivity comes from the `&mut` borrow.

use crate::error::Result;
use crate::find::Find;
use crate::record::Record;

impl Record {
    /// Dot-path lookup during a patch session. The handle is
    /// read-only; mutations go through [`Record::patch`].
    pub fn patch_find(&mut self, path: &str) -> Result<Find<'_>> {
        self.find(path)
    }
}
