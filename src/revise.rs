//! Revise sessions: derive a new record revision from an original.
//!
//! `begin` locks the original, clones its bytes, and hands out
//! read-write access to the clone. `end` recomputes the commit hash
//! over the final payload and releases the lock; `abort` (or just
//! dropping the context) discards the clone. The original record is
//! never modified.

use crate::error::{DocError, Result};
use crate::find::Find;
use crate::format::field::FieldType;
use crate::format::{commit, key, KeyType};
use crate::iter::{ArrayIter, ObjectIter};
use crate::memfile::MemFile;
use crate::path::eval::{self, PathStatus, ResolvedLoc};
use crate::path::DotPath;
use crate::record::Record;

/// An open revision of one record.
pub struct Revise<'a> {
    original: &'a Record,
    /// `Some` until `end` consumes it; `Drop` releases the lock when
    /// the session was not ended explicitly.
    revised: Option<Record>,
}

impl<'a> Revise<'a> {
    /// Open a revision, spinning until any concurrent revision of the
    /// same record finishes.
    pub fn begin(original: &'a Record) -> Self {
        original.lock.lock();
        Self {
            original,
            revised: Some(original.clone()),
        }
    }

    /// Open a revision without waiting. Returns `None` when another
    /// revision is active on the record.
    pub fn try_begin(original: &'a Record) -> Option<Self> {
        if !original.lock.try_lock() {
            return None;
        }
        Some(Self {
            original,
            revised: Some(original.clone()),
        })
    }

    fn rec(&self) -> Result<&Record> {
        self.revised
            .as_ref()
            .ok_or_else(|| DocError::Internal("revise context already closed".into()))
    }

    fn rec_mut(&mut self) -> Result<&mut Record> {
        self.revised
            .as_mut()
            .ok_or_else(|| DocError::Internal("revise context already closed".into()))
    }

    /// The record the revision started from.
    pub fn original(&self) -> &Record {
        self.original
    }

    /// Read access to the in-progress revision.
    pub fn record(&self) -> Result<&Record> {
        self.rec()
    }

    // ── Mutation Entry Points ──────────────────────────────────────

    /// Read-write iterator over the revision's root array.
    pub fn iterator(&mut self) -> Result<ArrayIter<'_>> {
        self.rec_mut()?.patch()
    }

    /// Dot-path lookup against the in-progress revision.
    pub fn find(&self, path: &str) -> Result<Find<'_>> {
        self.rec()?.find(path)
    }

    // ── Key Updates ────────────────────────────────────────────────

    /// Assign a fresh autokey id. Fails unless the record's key
    /// variant is autokey.
    pub fn key_generate(&mut self) -> Result<u64> {
        let rec = self.rec_mut()?;
        let mut mem = MemFile::read_write(rec.block_mut());
        key::update_auto(&mut mem)
    }

    pub fn key_set_unsigned(&mut self, value: u64) -> Result<()> {
        let rec = self.rec_mut()?;
        {
            let mut mem = MemFile::read_write(rec.block_mut());
            key::update_unsigned(&mut mem, value)?;
        }
        rec.refresh_payload_off()
    }

    pub fn key_set_signed(&mut self, value: i64) -> Result<()> {
        let rec = self.rec_mut()?;
        {
            let mut mem = MemFile::read_write(rec.block_mut());
            key::update_signed(&mut mem, value)?;
        }
        rec.refresh_payload_off()
    }

    pub fn key_set_text(&mut self, value: &str) -> Result<()> {
        let rec = self.rec_mut()?;
        {
            let mut mem = MemFile::read_write(rec.block_mut());
            key::update_text(&mut mem, value)?;
        }
        rec.refresh_payload_off()
    }

    // ── Path-level Removal ─────────────────────────────────────────

    /// Remove the value a dot-path resolves to. Returns `false` when
    /// the path names nothing.
    pub fn remove(&mut self, path: &str) -> Result<bool> {
        let dot = DotPath::parse(path)?;
        let rec = self.rec_mut()?;
        let (status, loc) = eval::resolve(rec.block(), rec.payload_off(), &dot)?;
        if status != PathStatus::Resolved {
            return Ok(false);
        }
        match loc {
            Some(ResolvedLoc::ArrayElem { start }) => {
                let mut mem = MemFile::read_write(rec.block_mut());
                mem.seek(start)?;
                crate::format::field::skip_field(&mut mem)?;
                let len = mem.tell() - start;
                mem.seek(start)?;
                mem.inplace_remove(len)?;
            }
            Some(ResolvedLoc::ObjectProp { key_start, .. }) => {
                let mut mem = MemFile::read_write(rec.block_mut());
                mem.seek(key_start)?;
                crate::format::string::skip_nomarker(&mut mem)?;
                crate::format::field::skip_field(&mut mem)?;
                let len = mem.tell() - key_start;
                mem.seek(key_start)?;
                mem.inplace_remove(len)?;
            }
            Some(ResolvedLoc::ColumnElem { start, idx }) => {
                let mut mem = MemFile::read_write(rec.block_mut());
                mem.seek(start)?;
                let mut col = crate::iter::ColumnIter::open(mem)?;
                col.remove(idx)?;
            }
            None => return Ok(false),
        }
        Ok(true)
    }

    // ── Compaction ─────────────────────────────────────────────────

    /// Compact every column's reserved capacity down to its count.
    pub fn pack(&mut self) -> Result<()> {
        let mut it = self.iterator()?;
        pack_array(&mut it)
    }

    /// Trim buffer allocation beyond the logical record size.
    pub fn shrink(&mut self) -> Result<()> {
        self.rec_mut()?.block_mut().shrink_to_fit();
        Ok(())
    }

    // ── Session End ────────────────────────────────────────────────

    /// Close the revision: hash the payload into the commit section
    /// (keyed records only) and release the original's lock.
    pub fn end(mut self) -> Result<Record> {
        let mut revised = self
            .revised
            .take()
            .ok_or_else(|| DocError::Internal("revise context already closed".into()))?;

        if revised.key_type() != KeyType::NoKey {
            if let Some(commit_off) = revised.commit_off() {
                let hash = commit::compute(revised.payload_bytes());
                let mut mem = MemFile::read_write(revised.block_mut());
                mem.seek(commit_off)?;
                mem.write_u64(hash)?;
            }
        }

        self.original.lock.unlock();
        Ok(revised)
    }

    /// Discard the revision and release the lock. Equivalent to
    /// dropping the context.
    pub fn abort(mut self) {
        if self.revised.take().is_some() {
            tracing::debug!("revision aborted");
            self.original.lock.unlock();
        }
    }
}

impl Drop for Revise<'_> {
    fn drop(&mut self) {
        if self.revised.take().is_some() {
            self.original.lock.unlock();
        }
    }
}

fn pack_array(it: &mut ArrayIter<'_>) -> Result<()> {
    while let Some(ty) = it.next()? {
        match ty {
            FieldType::Array => pack_array(&mut it.array_value()?)?,
            FieldType::Object => pack_object(&mut it.object_value()?)?,
            FieldType::Column(_) => it.column_value()?.pack()?,
            _ => {}
        }
    }
    Ok(())
}

fn pack_object(it: &mut ObjectIter<'_>) -> Result<()> {
    while let Some(ty) = it.next()? {
        match ty {
            FieldType::Array => pack_array(&mut it.array_value()?)?,
            FieldType::Object => pack_object(&mut it.object_value()?)?,
            FieldType::Column(_) => it.column_value()?.pack()?,
            _ => {}
        }
    }
    Ok(())
}
