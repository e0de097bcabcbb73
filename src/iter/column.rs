//! Random-access iterator over homogeneous typed columns.
//!
//! Column layout: begin marker, subtype byte, `capacity` varuint,
//! `count` varuint, `capacity` fixed-width slots, end marker. The
//! header is re-parsed on demand so mutations (which may resize the
//! varuints) never leave stale cached state.

use crate::error::{DocError, Result};
use crate::format::marker::{self, ColumnType, ContainerKind, Derivation};
use crate::format::varint;
use crate::memfile::MemFile;

/// One decoded column slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float32(f32),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub derivation: Derivation,
    pub ty: ColumnType,
    pub cap_off: usize,
    pub count_off: usize,
    pub slots_off: usize,
    pub capacity: usize,
    pub count: usize,
}

impl Header {
    /// Offset of the end marker.
    pub fn end_off(&self) -> usize {
        self.slots_off + self.capacity * self.ty.width()
    }
}

fn oob(position: usize, size: usize) -> DocError {
    DocError::OutOfBounds {
        position,
        requested: 1,
        size,
    }
}

pub(crate) fn parse_header(block: &[u8], start: usize) -> Result<Header> {
    let tag = *block.get(start).ok_or_else(|| oob(start, block.len()))?;
    let derivation = match marker::container_of_marker(tag) {
        Some((ContainerKind::Column, d)) => d,
        _ => return Err(DocError::marker("column begin marker", tag)),
    };
    let sub = *block
        .get(start + 1)
        .ok_or_else(|| oob(start + 1, block.len()))?;
    let ty = ColumnType::from_subtype(sub).ok_or(DocError::marker("column subtype", sub))?;

    let cap_off = start + 2;
    let (capacity, n1) = varint::decode(
        block
            .get(cap_off..)
            .ok_or_else(|| oob(cap_off, block.len()))?,
    )?;
    let count_off = cap_off + n1;
    let (count, n2) = varint::decode(
        block
            .get(count_off..)
            .ok_or_else(|| oob(count_off, block.len()))?,
    )?;
    let slots_off = count_off + n2;

    let header = Header {
        derivation,
        ty,
        cap_off,
        count_off,
        slots_off,
        capacity: capacity as usize,
        count: count as usize,
    };
    if header.count > header.capacity {
        return Err(DocError::Internal(format!(
            "column count {} exceeds capacity {}",
            header.count, header.capacity
        )));
    }
    if header.end_off() >= block.len() {
        return Err(oob(header.end_off(), block.len()));
    }
    Ok(header)
}

fn decode_slot(bytes: &[u8], ty: ColumnType) -> Result<ColumnValue> {
    let sentinel = ty.null_sentinel();
    if bytes == &sentinel[..ty.width()] {
        return Ok(ColumnValue::Null);
    }
    Ok(match ty {
        ColumnType::U8 => ColumnValue::U8(bytes[0]),
        ColumnType::U16 => ColumnValue::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
        ColumnType::U32 => {
            ColumnValue::U32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        ColumnType::U64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(bytes);
            ColumnValue::U64(u64::from_le_bytes(b))
        }
        ColumnType::I8 => ColumnValue::I8(bytes[0] as i8),
        ColumnType::I16 => ColumnValue::I16(i16::from_le_bytes([bytes[0], bytes[1]])),
        ColumnType::I32 => {
            ColumnValue::I32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        ColumnType::I64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(bytes);
            ColumnValue::I64(i64::from_le_bytes(b))
        }
        ColumnType::Float32 => {
            ColumnValue::Float32(f32::from_bits(u32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])))
        }
        ColumnType::Boolean => match bytes[0] {
            marker::BOOL_TRUE => ColumnValue::Bool(true),
            marker::BOOL_FALSE => ColumnValue::Bool(false),
            other => {
                return Err(DocError::Internal(format!(
                    "boolean column slot holds {other}"
                )))
            }
        },
    })
}

/// Byte image of `value` for a column of type `ty`. `Null` encodes as
/// the type's sentinel.
fn encode_slot(ty: ColumnType, value: ColumnValue) -> Result<[u8; 8]> {
    let mut out = [0u8; 8];
    match (ty, value) {
        (_, ColumnValue::Null) => return Ok(ty.null_sentinel()),
        (ColumnType::U8, ColumnValue::U8(v)) => out[0] = v,
        (ColumnType::U16, ColumnValue::U16(v)) => out[..2].copy_from_slice(&v.to_le_bytes()),
        (ColumnType::U32, ColumnValue::U32(v)) => out[..4].copy_from_slice(&v.to_le_bytes()),
        (ColumnType::U64, ColumnValue::U64(v)) => out.copy_from_slice(&v.to_le_bytes()),
        (ColumnType::I8, ColumnValue::I8(v)) => out[0] = v as u8,
        (ColumnType::I16, ColumnValue::I16(v)) => out[..2].copy_from_slice(&v.to_le_bytes()),
        (ColumnType::I32, ColumnValue::I32(v)) => out[..4].copy_from_slice(&v.to_le_bytes()),
        (ColumnType::I64, ColumnValue::I64(v)) => out.copy_from_slice(&v.to_le_bytes()),
        (ColumnType::Float32, ColumnValue::Float32(v)) => {
            out[..4].copy_from_slice(&v.to_bits().to_le_bytes())
        }
        (ColumnType::Boolean, ColumnValue::Bool(true)) => out[0] = marker::BOOL_TRUE,
        (ColumnType::Boolean, ColumnValue::Bool(false)) => out[0] = marker::BOOL_FALSE,
        (ty, value) => {
            return Err(DocError::TypeMismatch {
                expected: column_label(ty),
                found: value_label(value),
            })
        }
    }
    Ok(out)
}

fn column_label(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::U8 => "column (u8)",
        ColumnType::U16 => "column (u16)",
        ColumnType::U32 => "column (u32)",
        ColumnType::U64 => "column (u64)",
        ColumnType::I8 => "column (i8)",
        ColumnType::I16 => "column (i16)",
        ColumnType::I32 => "column (i32)",
        ColumnType::I64 => "column (i64)",
        ColumnType::Float32 => "column (float)",
        ColumnType::Boolean => "column (boolean)",
    }
}

fn value_label(value: ColumnValue) -> &'static str {
    match value {
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
    }
}

/// Append `value` at `count`, growing capacity if exhausted. Returns
/// the net byte delta. Used by the inserter.
pub(crate) fn append_value(
    mem: &mut MemFile<'_>,
    start: usize,
    value: ColumnValue,
) -> Result<i64> {
    let mut h = parse_header(mem.block().as_slice(), start)?;
    let slot = encode_slot(h.ty, value)?;
    let width = h.ty.width();
    let mut delta = 0i64;

    if h.count == h.capacity {
        let new_cap = std::cmp::max(h.capacity * 2, h.capacity + 1);
        tracing::debug!(
            capacity = h.capacity,
            new_capacity = new_cap,
            "column capacity grown"
        );
        // Grow the slot region first; the capacity varuint is rewritten
        // afterwards so the header stays parseable at every step.
        let grow_slots = new_cap - h.capacity;
        mem.seek(h.end_off())?;
        mem.inplace_insert(grow_slots * width)?;
        let sentinel = h.ty.null_sentinel();
        for _ in 0..grow_slots {
            mem.write(&sentinel[..width])?;
        }
        delta += (grow_slots * width) as i64;

        mem.seek(h.cap_off)?;
        delta += varint::rewrite_in_place(mem, new_cap as u64)?;
        h = parse_header(mem.block().as_slice(), start)?;
    }

    mem.seek(h.slots_off + h.count * width)?;
    mem.write(&slot[..width])?;

    mem.seek(h.count_off)?;
    delta += varint::rewrite_in_place(mem, (h.count + 1) as u64)?;
    Ok(delta)
}

/// Random-access iterator over one column container.
pub struct ColumnIter<'a> {
    mem: MemFile<'a>,
    /// Offset of the column begin marker.
    start: usize,
    mod_size: i64,
}

impl<'a> ColumnIter<'a> {
    /// Open an iterator over the column whose begin marker sits at the
    /// cursor of `mem`.
    pub(crate) fn open(mem: MemFile<'a>) -> Result<Self> {
        let start = mem.tell();
        parse_header(mem.block().as_slice(), start)?;
        Ok(Self {
            mem,
            start,
            mod_size: 0,
        })
    }

    fn header(&self) -> Result<Header> {
        parse_header(self.mem.block().as_slice(), self.start)
    }

    // ── Introspection ──────────────────────────────────────────────

    pub fn column_type(&self) -> Result<ColumnType> {
        Ok(self.header()?.ty)
    }

    pub fn derivation(&self) -> Result<Derivation> {
        Ok(self.header()?.derivation)
    }

    pub fn capacity(&self) -> Result<u32> {
        Ok(self.header()?.capacity as u32)
    }

    pub fn count(&self) -> Result<u32> {
        Ok(self.header()?.count as u32)
    }

    pub fn mod_size(&self) -> i64 {
        self.mod_size
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Borrow the valid slot region: element type, count, and exactly
    /// `count × width` little-endian bytes.
    pub fn values(&self) -> Result<(ColumnType, u32, &[u8])> {
        let h = self.header()?;
        let bytes =
            &self.mem.block().as_slice()[h.slots_off..h.slots_off + h.count * h.ty.width()];
        Ok((h.ty, h.count as u32, bytes))
    }

    fn slot_bytes(&self, h: &Header, idx: u32) -> Result<&[u8]> {
        if idx as usize >= h.count {
            return Err(DocError::NoSuchIndex(idx));
        }
        let w = h.ty.width();
        let off = h.slots_off + idx as usize * w;
        Ok(&self.mem.block().as_slice()[off..off + w])
    }

    /// Decode the slot at `idx` (must be `< count`).
    pub fn value_at(&self, idx: u32) -> Result<ColumnValue> {
        let h = self.header()?;
        decode_slot(self.slot_bytes(&h, idx)?, h.ty)
    }

    /// Whether the slot at `idx` holds the null sentinel.
    pub fn is_null(&self, idx: u32) -> Result<bool> {
        Ok(matches!(self.value_at(idx)?, ColumnValue::Null))
    }

    // ── In-place Updates ───────────────────────────────────────────

    fn set_value(&mut self, idx: u32, value: ColumnValue) -> Result<()> {
        let h = self.header()?;
        if idx as usize >= h.count {
            return Err(DocError::NoSuchIndex(idx));
        }
        let slot = encode_slot(h.ty, value)?;
        let w = h.ty.width();
        self.mem.seek(h.slots_off + idx as usize * w)?;
        self.mem.write(&slot[..w])
    }

    pub fn set_u8(&mut self, idx: u32, v: u8) -> Result<()> {
        self.set_value(idx, ColumnValue::U8(v))
    }

    pub fn set_u16(&mut self, idx: u32, v: u16) -> Result<()> {
        self.set_value(idx, ColumnValue::U16(v))
    }

    pub fn set_u32(&mut self, idx: u32, v: u32) -> Result<()> {
        self.set_value(idx, ColumnValue::U32(v))
    }

    pub fn set_u64(&mut self, idx: u32, v: u64) -> Result<()> {
        self.set_value(idx, ColumnValue::U64(v))
    }

    pub fn set_i8(&mut self, idx: u32, v: i8) -> Result<()> {
        self.set_value(idx, ColumnValue::I8(v))
    }

    pub fn set_i16(&mut self, idx: u32, v: i16) -> Result<()> {
        self.set_value(idx, ColumnValue::I16(v))
    }

    pub fn set_i32(&mut self, idx: u32, v: i32) -> Result<()> {
        self.set_value(idx, ColumnValue::I32(v))
    }

    pub fn set_i64(&mut self, idx: u32, v: i64) -> Result<()> {
        self.set_value(idx, ColumnValue::I64(v))
    }

    pub fn set_float(&mut self, idx: u32, v: f32) -> Result<()> {
        self.set_value(idx, ColumnValue::Float32(v))
    }

    pub fn set_true(&mut self, idx: u32) -> Result<()> {
        self.set_value(idx, ColumnValue::Bool(true))
    }

    pub fn set_false(&mut self, idx: u32) -> Result<()> {
        self.set_value(idx, ColumnValue::Bool(false))
    }

    /// Write the null sentinel of the column's element type at `idx`.
    pub fn set_null(&mut self, idx: u32) -> Result<()> {
        self.set_value(idx, ColumnValue::Null)
    }

    /// Rewrite this column's abstract-type marker.
    pub fn set_derivation(&mut self, derivation: Derivation) -> Result<()> {
        self.mem.seek(self.start)?;
        self.mem
            .write_byte(ContainerKind::Column.begin_marker(derivation))?;
        Ok(())
    }

    // ── Structural Mutations ───────────────────────────────────────

    /// Remove the slot at `idx`: slots above shift down one position,
    /// the vacated tail slot is cleared to the sentinel, and `count`
    /// drops by one. Capacity is unchanged.
    pub fn remove(&mut self, idx: u32) -> Result<()> {
        let h = self.header()?;
        if idx as usize >= h.count {
            return Err(DocError::NoSuchIndex(idx));
        }
        if !self.mem.is_read_write() {
            return Err(DocError::ReadOnlyMode);
        }
        let w = h.ty.width();
        let from = h.slots_off + (idx as usize + 1) * w;
        let to_end = h.slots_off + h.count * w;
        let tail = self.mem.block().as_slice()[from..to_end].to_vec();

        self.mem.seek(h.slots_off + idx as usize * w)?;
        self.mem.write(&tail)?;
        let sentinel = h.ty.null_sentinel();
        self.mem.write(&sentinel[..w])?;

        self.mem.seek(h.count_off)?;
        let delta = varint::rewrite_in_place(&mut self.mem, (h.count - 1) as u64)?;
        self.mod_size += delta;
        Ok(())
    }

    /// Open an inserter that appends at `count`.
    pub fn insert_begin(&mut self) -> Result<crate::iter::Inserter<'_>> {
        if !self.mem.is_read_write() {
            return Err(DocError::ReadOnlyMode);
        }
        let start = self.start;
        crate::iter::Inserter::new_column(self.mem.reborrow(), start)
    }

    /// Compact reserved capacity down to `count`.
    pub fn pack(&mut self) -> Result<()> {
        let h = self.header()?;
        if !self.mem.is_read_write() {
            return Err(DocError::ReadOnlyMode);
        }
        let spare = h.capacity - h.count;
        if spare == 0 {
            return Ok(());
        }
        let w = h.ty.width();
        self.mem.seek(h.slots_off + h.count * w)?;
        self.mem.inplace_remove(spare * w)?;
        self.mod_size -= (spare * w) as i64;

        self.mem.seek(h.cap_off)?;
        let delta = varint::rewrite_in_place(&mut self.mem, h.count as u64)?;
        self.mod_size += delta;
        Ok(())
    }
}
