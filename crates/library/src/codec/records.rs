use solana_program::pubkey::Pubkey;

use super::{write_decimal, ByteReader, FixedRecord};
use crate::errors::LibraryResult;
use crate::math::decimal::{Decimal, DECIMAL_SIZE};

/// One scheduled feed on a crank and the earliest time it may be updated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrankRow {
    pub pubkey: Pubkey,
    pub next_timestamp: i64,
}

impl CrankRow {
    pub fn new(pubkey: Pubkey, next_timestamp: i64) -> Self {
        Self {
            pubkey,
            next_timestamp,
        }
    }
}

impl FixedRecord for CrankRow {
    const STRIDE: usize = 32 + 8;

    fn decode(reader: &mut ByteReader<'_>) -> LibraryResult<Self> {
        Ok(Self {
            pubkey: reader.read_pubkey()?,
            next_timestamp: reader.read_i64()?,
        })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.pubkey.as_ref());
        out.extend_from_slice(&self.next_timestamp.to_le_bytes());
    }

    fn is_sentinel(&self) -> bool {
        self.pubkey == Pubkey::default()
    }
}

/// One oracle in a queue's membership buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueMember(pub Pubkey);

impl FixedRecord for QueueMember {
    const STRIDE: usize = 32;

    fn decode(reader: &mut ByteReader<'_>) -> LibraryResult<Self> {
        Ok(Self(reader.read_pubkey()?))
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.as_ref());
    }

    fn is_sentinel(&self) -> bool {
        self.0 == Pubkey::default()
    }
}

/// A confirmed feed result kept in the history ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistorySample {
    pub timestamp: i64,
    pub value: Decimal,
}

impl HistorySample {
    pub fn new(timestamp: i64, value: Decimal) -> Self {
        Self { timestamp, value }
    }
}

impl FixedRecord for HistorySample {
    const STRIDE: usize = 8 + DECIMAL_SIZE;

    fn decode(reader: &mut ByteReader<'_>) -> LibraryResult<Self> {
        Ok(Self {
            timestamp: reader.read_i64()?,
            value: reader.read_decimal()?,
        })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        write_decimal(out, &self.value);
    }

    fn is_sentinel(&self) -> bool {
        self.timestamp == 0
    }
}
