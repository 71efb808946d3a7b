//! Fixed-capacity circular buffers laid out as a header followed by a flat
//! array of fixed-stride rows.
//!
//! Physical order is never rewritten. Cursor-carrying buffers record the slot
//! of the most recent write; logical order is rebuilt from `(rows, cursor)`
//! on every read.

use std::iter::Chain;
use std::marker::PhantomData;
use std::ops::Range;

use crate::codec::{
    decode_row, strip_discriminator, ByteReader, FixedRecord, Rows, BUFFER_DISCRIMINATOR,
    DISCRIMINATOR_SIZE,
};
use crate::errors::{LibraryError, LibraryResult};
use crate::math::safe_math::{Cast, SafeMath};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingHeader {
    /// `BUFFERxx` tag only (crank rows, queue members).
    Tagged,
    /// `BUFFERxx` tag followed by a little-endian `u32` insert cursor (history).
    Cursor,
}

impl RingHeader {
    pub const fn size(self) -> usize {
        match self {
            RingHeader::Tagged => DISCRIMINATOR_SIZE,
            RingHeader::Cursor => DISCRIMINATOR_SIZE + 4,
        }
    }
}

pub fn capacity(byte_len: usize, stride: usize, header: RingHeader) -> usize {
    if stride == 0 {
        return 0;
    }
    byte_len.saturating_sub(header.size()) / stride
}

pub fn account_size(capacity: usize, stride: usize, header: RingHeader) -> LibraryResult<usize> {
    capacity.safe_mul(stride)?.safe_add(header.size())
}

/// Read-only view over an encoded buffer account.
#[derive(Clone, Copy, Debug)]
pub struct RingBuffer<'a, T> {
    rows: &'a [u8],
    header: RingHeader,
    cursor: u32,
    _record: PhantomData<T>,
}

impl<'a, T: FixedRecord> RingBuffer<'a, T> {
    pub fn new(data: &'a [u8], header: RingHeader) -> LibraryResult<Self> {
        let body = strip_discriminator(data, &BUFFER_DISCRIMINATOR)?;
        let cursor = match header {
            RingHeader::Tagged => 0,
            RingHeader::Cursor => ByteReader::new(body).read_u32()?,
        };
        let rows = &data[header.size()..];

        Ok(Self {
            rows,
            header,
            cursor,
            _record: PhantomData,
        })
    }

    pub fn capacity(&self) -> usize {
        self.rows.len() / T::STRIDE
    }

    pub fn cursor(&self) -> Option<u32> {
        match self.header {
            RingHeader::Tagged => None,
            RingHeader::Cursor => Some(self.cursor),
        }
    }

    /// Rows in physical order up to the first sentinel.
    pub fn physical(&self) -> Rows<'a, T> {
        Rows::new(self.rows)
    }

    /// Number of initialised rows ahead of the first sentinel.
    pub fn len(&self) -> LibraryResult<usize> {
        self.physical().try_fold(0, |n, row| row.map(|_| n + 1))
    }

    pub fn is_empty(&self) -> LibraryResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Rows in logical order. Tagged buffers keep physical order; cursor
    /// buffers yield oldest to newest. Each call restarts from the bytes.
    pub fn iter(&self) -> LibraryResult<RingIter<'a, T>> {
        let len = self.len()?;
        let order = match self.cursor() {
            Some(cursor) if (cursor as usize) < len => {
                let newest = cursor as usize;
                (newest + 1..len).chain(0..newest + 1)
            }
            _ => (0..len).chain(0..0),
        };

        Ok(RingIter {
            rows: self.rows,
            order,
            _record: PhantomData,
        })
    }

    pub fn decode(&self) -> LibraryResult<Vec<T>> {
        self.iter()?.collect()
    }
}

pub struct RingIter<'a, T> {
    rows: &'a [u8],
    order: Chain<Range<usize>, Range<usize>>,
    _record: PhantomData<T>,
}

impl<T: FixedRecord> Iterator for RingIter<'_, T> {
    type Item = LibraryResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.order.next()?;
        Some(decode_row(self.rows, index * T::STRIDE))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

/// Owned arena of rows plus an explicit insert cursor, encoding to the same
/// bytes a cursor-carrying [`RingBuffer`] reads.
///
/// The first write lands in slot 0; every later write lands one past the
/// cursor, wrapping at capacity.
#[derive(Clone, Debug)]
pub struct RingWriter<T> {
    rows: Vec<T>,
    capacity: usize,
    cursor: Option<usize>,
}

impl<T: FixedRecord + Clone> RingWriter<T> {
    pub fn with_capacity(capacity: usize) -> LibraryResult<Self> {
        if capacity == 0 {
            return Err(LibraryError::ZeroCapacity);
        }
        Ok(Self {
            rows: Vec::with_capacity(capacity),
            capacity,
            cursor: None,
        })
    }

    /// Fails with `CursorOutOfRange` when the stored cursor names a slot past
    /// the written rows.
    pub fn from_bytes(data: &[u8]) -> LibraryResult<Self> {
        let buffer = RingBuffer::<T>::new(data, RingHeader::Cursor)?;
        let mut writer = Self::with_capacity(buffer.capacity())?;
        writer.rows = buffer.physical().collect::<LibraryResult<Vec<T>>>()?;
        if !writer.rows.is_empty() {
            let cursor = buffer.cursor.cast::<usize>()?;
            if cursor >= writer.rows.len() {
                return Err(LibraryError::CursorOutOfRange {
                    cursor,
                    rows: writer.rows.len(),
                });
            }
            writer.cursor = Some(cursor);
        }
        Ok(writer)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Slot of the most recent write.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Slot the next write will land in.
    pub fn next_slot(&self) -> usize {
        match self.cursor {
            None => 0,
            Some(cursor) => (cursor + 1) % self.capacity,
        }
    }

    /// Writes `row` over the oldest slot, returning the evicted row once full.
    pub fn push(&mut self, row: T) -> Option<T> {
        let slot = self.next_slot();
        self.cursor = Some(slot);
        if slot < self.rows.len() {
            Some(std::mem::replace(&mut self.rows[slot], row))
        } else {
            self.rows.push(row);
            None
        }
    }

    /// Rows oldest to newest.
    pub fn to_vec(&self) -> Vec<T> {
        match self.cursor {
            None => vec![],
            Some(newest) => self.rows[newest + 1..]
                .iter()
                .chain(&self.rows[..=newest])
                .cloned()
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> LibraryResult<Vec<u8>> {
        let size = account_size(self.capacity, T::STRIDE, RingHeader::Cursor)?;
        let cursor: u32 = self.cursor.unwrap_or(0).cast()?;

        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(&BUFFER_DISCRIMINATOR);
        out.extend_from_slice(&cursor.to_le_bytes());
        for row in &self.rows {
            row.encode(&mut out);
        }
        out.resize(size, 0);
        Ok(out)
    }
}
