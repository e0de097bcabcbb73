//! The record: key section + optional commit section + root array.
//!
//! A record exclusively owns its backing buffer. Read iterators borrow
//! it shared; patch sessions borrow it exclusively; revise sessions
//! clone it and guard the original with its spinlock.

use std::io::Write;

use crate::error::{DocError, Result};
use crate::format::marker::{ContainerKind, Derivation};
use crate::format::{commit, field, key, Key, KeySpec, KeyType};
use crate::iter::ArrayIter;
use crate::memfile::{MemBlock, MemFile};
use crate::spin::SpinLock;

/// One self-describing binary document.
#[derive(Debug)]
pub struct Record {
    block: MemBlock,
    key_type: KeyType,
    /// Offset of the root array begin marker.
    payload_off: usize,
    /// Guards exclusive-writer (revise) sessions.
    pub(crate) lock: SpinLock,
}

impl Record {
    // ── Constructors ───────────────────────────────────────────────

    /// Create an empty record with the given key and root derivation.
    pub fn new(key_spec: KeySpec, derivation: Derivation) -> Result<Self> {
        let mut block = MemBlock::new();
        let key_type = key_spec.key_type();
        {
            let mut mem = MemFile::read_write(&mut block);
            key::write_initial(&mut mem, &key_spec)?;
            if key_type.has_commit() {
                commit::init(&mut mem)?;
            }
            mem.write_byte(ContainerKind::Array.begin_marker(derivation))?;
            mem.write_byte(ContainerKind::Array.end_marker())?;
        }
        Self::from_block(block)
    }

    /// Adopt and validate raw record bytes.
    ///
    /// The whole image is walked structurally; trailing bytes after the
    /// root array are rejected.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_block(MemBlock::from_vec(bytes))
    }

    pub(crate) fn from_block(block: MemBlock) -> Result<Self> {
        let (key_type, payload_off) = {
            let mut mem = MemFile::read_only(&block);
            let key_type = key::skip(&mut mem)?;
            if key_type.has_commit() {
                commit::skip(&mut mem)?;
            }
            let payload_off = mem.tell();

            let ty = field::peek_type(&mem)?;
            if !ty.is_array() {
                return Err(DocError::marker("root array marker", mem.peek_byte()?));
            }
            field::skip_field(&mut mem)?;
            if mem.remaining() != 0 {
                return Err(DocError::TailingJunk(format!(
                    "root array ({} trailing bytes)",
                    mem.remaining()
                )));
            }
            (key_type, payload_off)
        };

        Ok(Self {
            block,
            key_type,
            payload_off,
            lock: SpinLock::new(),
        })
    }

    // ── Byte Access ────────────────────────────────────────────────

    /// The full record image.
    pub fn as_bytes(&self) -> &[u8] {
        self.block.as_slice()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.block.into_vec()
    }

    /// Write the record image to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.as_bytes())?;
        Ok(())
    }

    /// The payload section (root array bytes) — the input of the
    /// commit hash.
    pub fn payload_bytes(&self) -> &[u8] {
        &self.block.as_slice()[self.payload_off..]
    }

    pub(crate) fn block(&self) -> &MemBlock {
        &self.block
    }

    pub(crate) fn block_mut(&mut self) -> &mut MemBlock {
        &mut self.block
    }

    pub(crate) fn payload_off(&self) -> usize {
        self.payload_off
    }

    /// Re-derive the payload offset after an in-place key rewrite.
    pub(crate) fn refresh_payload_off(&mut self) -> Result<()> {
        let mut mem = MemFile::read_only(&self.block);
        key::skip(&mut mem)?;
        if self.key_type.has_commit() {
            commit::skip(&mut mem)?;
        }
        self.payload_off = mem.tell();
        Ok(())
    }

    // ── Key & Commit ───────────────────────────────────────────────

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Decode the record key.
    pub fn key(&self) -> Result<Key> {
        let mut mem = MemFile::read_only(&self.block);
        key::read(&mut mem)
    }

    /// The current commit value. `None` for nokey records, which carry
    /// no commit section.
    pub fn commit_hash(&self) -> Option<u64> {
        if !self.key_type.has_commit() {
            return None;
        }
        let mut mem = MemFile::read_only(&self.block);
        key::skip(&mut mem).ok()?;
        commit::read(&mut mem).ok()
    }

    /// Offset of the commit section, if present.
    pub(crate) fn commit_off(&self) -> Option<usize> {
        self.key_type
            .has_commit()
            .then(|| self.payload_off - commit::COMMIT_SIZE)
    }

    // ── Root Access ────────────────────────────────────────────────

    /// Abstract type of the root array.
    pub fn root_derivation(&self) -> Result<Derivation> {
        let mut mem = MemFile::read_only(&self.block);
        mem.seek(self.payload_off)?;
        field::peek_derivation(&mem)
    }

    /// Open a read-only iterator over the root array.
    pub fn iter(&self) -> Result<ArrayIter<'_>> {
        let mut mem = MemFile::read_only(&self.block);
        mem.seek(self.payload_off)?;
        ArrayIter::open(mem)
    }

    /// Open a read-write iterator for a patch session: in-place
    /// mutations that deliberately leave the commit hash untouched.
    /// Dropping the iterator ends the session.
    pub fn patch(&mut self) -> Result<ArrayIter<'_>> {
        let payload_off = self.payload_off;
        let mut mem = MemFile::read_write(&mut self.block);
        mem.seek(payload_off)?;
        ArrayIter::open(mem)
    }
}

impl Clone for Record {
    fn clone(&self) -> Self {
        Self {
            block: self.block.clone(),
            key_type: self.key_type,
            payload_off: self.payload_off,
            lock: SpinLock::new(),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.block == other.block
    }
}

impl Eq for Record {}
