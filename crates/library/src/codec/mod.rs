//! Little-endian fixed-layout records as they appear inside ledger buffers.

mod records;

pub use records::*;

use std::marker::PhantomData;

use solana_program::pubkey::Pubkey;

use crate::errors::{LibraryError, LibraryResult};
use crate::math::decimal::Decimal;

/// Length of the tag every ledger account starts with.
pub const DISCRIMINATOR_SIZE: usize = 8;

/// Tag shared by every raw buffer account (crank rows, queue members, history).
pub const BUFFER_DISCRIMINATOR: [u8; DISCRIMINATOR_SIZE] = *b"BUFFERxx";

/// Forward-only cursor over a byte slice. Every read is bounds-checked.
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn read_bytes<const N: usize>(&mut self) -> LibraryResult<[u8; N]> {
        let end = self
            .offset
            .checked_add(N)
            .filter(|end| *end <= self.data.len())
            .ok_or(LibraryError::MalformedBuffer {
                offset: self.offset,
                needed: N,
                available: self.remaining(),
            })?;

        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..end]);
        self.offset = end;
        Ok(out)
    }

    pub fn read_pubkey(&mut self) -> LibraryResult<Pubkey> {
        Ok(Pubkey::new_from_array(self.read_bytes()?))
    }

    pub fn read_u32(&mut self) -> LibraryResult<u32> {
        Ok(u32::from_le_bytes(self.read_bytes()?))
    }

    pub fn read_i64(&mut self) -> LibraryResult<i64> {
        Ok(i64::from_le_bytes(self.read_bytes()?))
    }

    pub fn read_i128(&mut self) -> LibraryResult<i128> {
        Ok(i128::from_le_bytes(self.read_bytes()?))
    }

    pub fn read_decimal(&mut self) -> LibraryResult<Decimal> {
        let mantissa = self.read_i128()?;
        let scale = self.read_u32()?;
        Ok(Decimal::new(mantissa, scale))
    }
}

pub fn write_decimal(out: &mut Vec<u8>, value: &Decimal) {
    out.extend_from_slice(&value.mantissa.to_le_bytes());
    out.extend_from_slice(&value.scale.to_le_bytes());
}

/// Splits off the leading account tag and checks it against `expected`.
pub fn strip_discriminator<'a>(
    data: &'a [u8],
    expected: &[u8; DISCRIMINATOR_SIZE],
) -> LibraryResult<&'a [u8]> {
    let found: [u8; DISCRIMINATOR_SIZE] = ByteReader::new(data).read_bytes()?;
    if &found != expected {
        return Err(LibraryError::DiscriminatorMismatch {
            expected: *expected,
            found,
        });
    }
    Ok(&data[DISCRIMINATOR_SIZE..])
}

/// A fixed-stride row type stored back to back inside a buffer account.
pub trait FixedRecord: Sized {
    const STRIDE: usize;

    fn decode(reader: &mut ByteReader<'_>) -> LibraryResult<Self>;

    fn encode(&self, out: &mut Vec<u8>);

    /// An uninitialised slot. Scanning stops at the first one.
    fn is_sentinel(&self) -> bool;
}

/// Decodes the record starting at `offset`.
pub fn decode_row<T: FixedRecord>(buf: &[u8], offset: usize) -> LibraryResult<T> {
    let available = buf.len().saturating_sub(offset);
    if available < T::STRIDE {
        return Err(LibraryError::MalformedBuffer {
            offset,
            needed: T::STRIDE,
            available,
        });
    }
    T::decode(&mut ByteReader::at(buf, offset))
}

/// Lazy physical-order scan over a row region.
///
/// Ends at the first sentinel row or at trailing bytes shorter than one
/// stride. A region whose very first row is truncated yields an error.
pub struct Rows<'a, T> {
    region: &'a [u8],
    offset: usize,
    done: bool,
    _record: PhantomData<T>,
}

impl<'a, T: FixedRecord> Rows<'a, T> {
    pub fn new(region: &'a [u8]) -> Self {
        Self {
            region,
            offset: 0,
            done: false,
            _record: PhantomData,
        }
    }
}

impl<T: FixedRecord> Iterator for Rows<'_, T> {
    type Item = LibraryResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let available = self.region.len().saturating_sub(self.offset);
        if available < T::STRIDE {
            self.done = true;
            if self.offset == 0 && available > 0 {
                return Some(Err(LibraryError::MalformedBuffer {
                    offset: 0,
                    needed: T::STRIDE,
                    available,
                }));
            }
            return None;
        }

        match decode_row::<T>(self.region, self.offset) {
            Ok(row) if row.is_sentinel() => {
                self.done = true;
                None
            }
            Ok(row) => {
                self.offset += T::STRIDE;
                Some(Ok(row))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

pub fn decode_rows<T: FixedRecord>(region: &[u8]) -> LibraryResult<Vec<T>> {
    Rows::new(region).collect()
}

pub fn encode_rows<T: FixedRecord>(rows: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rows.len() * T::STRIDE);
    for row in rows {
        row.encode(&mut out);
    }
    out
}
