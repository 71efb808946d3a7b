//! Confirmed-result history kept in a cursor-carrying ring.

use library::codec::{FixedRecord, HistorySample};
use library::ring::{self, RingBuffer, RingHeader, RingWriter};

use crate::errors::OracleResult;

/// Decodes a history account oldest to newest without taking ownership.
pub fn decode_history(data: &[u8]) -> OracleResult<Vec<HistorySample>> {
    Ok(RingBuffer::<HistorySample>::new(data, RingHeader::Cursor)?.decode()?)
}

/// Newest sample at or before `timestamp` in a chronological slice.
pub fn lower_bound(samples: &[HistorySample], timestamp: i64) -> Option<HistorySample> {
    let idx = samples.partition_point(|s| s.timestamp <= timestamp);
    idx.checked_sub(1).map(|i| samples[i])
}

#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    ring: RingWriter<HistorySample>,
}

impl HistoryBuffer {
    pub fn with_capacity(capacity: usize) -> OracleResult<Self> {
        Ok(Self {
            ring: RingWriter::with_capacity(capacity)?,
        })
    }

    pub fn from_account_data(data: &[u8]) -> OracleResult<Self> {
        Ok(Self {
            ring: RingWriter::from_bytes(data)?,
        })
    }

    pub fn to_account_data(&self) -> OracleResult<Vec<u8>> {
        Ok(self.ring.to_bytes()?)
    }

    pub fn account_size(capacity: usize) -> OracleResult<usize> {
        Ok(ring::account_size(
            capacity,
            HistorySample::STRIDE,
            RingHeader::Cursor,
        )?)
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Appends over the oldest slot once full, returning the evicted sample.
    pub fn push(&mut self, sample: HistorySample) -> Option<HistorySample> {
        self.ring.push(sample)
    }

    pub fn samples(&self) -> Vec<HistorySample> {
        self.ring.to_vec()
    }

    pub fn latest(&self) -> Option<HistorySample> {
        self.samples().last().copied()
    }

    pub fn lower_bound(&self, timestamp: i64) -> Option<HistorySample> {
        lower_bound(&self.samples(), timestamp)
    }
}
