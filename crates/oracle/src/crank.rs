//! Round-robin update schedule of a queue's feeds.
//!
//! The crank's rows live in a tagged ring buffer kept in physical insertion
//! order; the ledger reorders it on every pop. Readiness is always computed at
//! read time against a caller-supplied clock.

use std::collections::HashSet;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use library::codec::{CrankRow, QueueMember};
use library::ring::{RingBuffer, RingHeader};

use crate::errors::{OracleError, OracleResult};
use crate::instructions::{
    crank_pop, crank_push, CrankPopAccounts, CrankPopParams, CrankPushAccounts, CrankPushParams,
};
use crate::pda::{self, FeedCompanions};
use crate::state::{CrankAccountData, OracleQueueAccountData};

/// Decodes the crank buffer, stopping at the first empty slot.
pub fn decode_crank(buffer: &[u8]) -> OracleResult<Vec<CrankRow>> {
    Ok(RingBuffer::<CrankRow>::new(buffer, RingHeader::Tagged)?.decode()?)
}

/// Addresses every crank instruction names besides the feeds themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrankContext {
    pub program_id: Pubkey,
    pub crank: Pubkey,
    pub crank_data_buffer: Pubkey,
    pub queue: Pubkey,
    pub queue_authority: Pubkey,
    pub queue_data_buffer: Pubkey,
    pub mint: Pubkey,
}

impl CrankContext {
    pub fn new(
        program_id: Pubkey,
        crank: Pubkey,
        crank_data: &CrankAccountData,
        queue_data: &OracleQueueAccountData,
    ) -> Self {
        Self {
            program_id,
            crank,
            crank_data_buffer: crank_data.data_buffer,
            queue: crank_data.queue_pubkey,
            queue_authority: queue_data.authority,
            queue_data_buffer: queue_data.data_buffer,
            mint: queue_data.get_mint(),
        }
    }

    pub fn companions(&self, feed: &Pubkey) -> FeedCompanions {
        FeedCompanions::derive(
            &self.program_id,
            &self.queue,
            &self.queue_authority,
            feed,
            &self.mint,
        )
    }
}

#[derive(Clone, Debug)]
pub struct CrankScheduler {
    context: CrankContext,
}

impl CrankScheduler {
    pub fn new(context: CrankContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &CrankContext {
        &self.context
    }

    /// Rows due at `now`, in physical scan order, at most `limit` of them.
    pub fn peek_ready(buffer: &[u8], now: i64, limit: usize) -> OracleResult<Vec<CrankRow>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let ring = RingBuffer::<CrankRow>::new(buffer, RingHeader::Tagged)?;
        let mut ready = Vec::with_capacity(limit);
        for row in ring.physical() {
            let row = row?;
            if row.next_timestamp <= now {
                ready.push(row);
                if ready.len() == limit {
                    break;
                }
            }
        }
        Ok(ready)
    }

    /// The first `limit` rows regardless of time.
    pub fn peek_next(buffer: &[u8], limit: usize) -> OracleResult<Vec<CrankRow>> {
        let ring = RingBuffer::<CrankRow>::new(buffer, RingHeader::Tagged)?;
        Ok(ring.physical().take(limit).collect::<std::result::Result<_, _>>()?)
    }

    pub fn is_on_crank(buffer: &[u8], feed: &Pubkey) -> OracleResult<bool> {
        let ring = RingBuffer::<CrankRow>::new(buffer, RingHeader::Tagged)?;
        for row in ring.physical() {
            if row?.pubkey == *feed {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Companions of each distinct ready feed, in first-seen order.
    pub fn pop_companions(&self, ready: &[Pubkey]) -> Vec<FeedCompanions> {
        let mut seen = HashSet::with_capacity(ready.len());
        ready
            .iter()
            .filter(|feed| seen.insert(**feed))
            .map(|feed| self.context.companions(feed))
            .collect()
    }

    /// Builds the pop for `ready`. Trailing operands are sorted by raw bytes;
    /// bumps follow the order of `ready`.
    pub fn pop_instruction(
        &self,
        ready: &[Pubkey],
        payout_wallet: &Pubkey,
        nonce: Option<u32>,
    ) -> OracleResult<Instruction> {
        if ready.is_empty() {
            return Err(OracleError::CrankEmpty);
        }

        let companions = self.pop_companions(ready);
        let mut remaining: Vec<Pubkey> = companions
            .iter()
            .flat_map(FeedCompanions::pop_operands)
            .collect();
        remaining.sort_by(|a, b| a.to_bytes().cmp(&b.to_bytes()));

        let (program_state, state_bump) = pda::program_state(&self.context.program_id);
        let params = CrankPopParams {
            state_bump,
            lease_bumps: companions.iter().map(|c| c.lease_bump).collect(),
            permission_bumps: companions.iter().map(|c| c.permission_bump).collect(),
            nonce,
            fail_open_on_account_mismatch: None,
        };
        let accounts = CrankPopAccounts {
            crank: self.context.crank,
            oracle_queue: self.context.queue,
            queue_authority: self.context.queue_authority,
            program_state,
            payout_wallet: *payout_wallet,
            crank_data_buffer: self.context.crank_data_buffer,
            queue_data_buffer: self.context.queue_data_buffer,
            mint: self.context.mint,
        };

        tracing::debug!(
            crank = %self.context.crank,
            feeds = companions.len(),
            "built crank pop"
        );
        crank_pop(&self.context.program_id, &accounts, &params, &remaining)
    }

    /// Builds the push adding `feed` to the crank. Capacity is enforced by the
    /// ledger.
    pub fn push_instruction(&self, feed: &Pubkey) -> OracleResult<Instruction> {
        let companions = self.context.companions(feed);
        let (program_state, state_bump) = pda::program_state(&self.context.program_id);

        let accounts = CrankPushAccounts {
            crank: self.context.crank,
            aggregator: *feed,
            oracle_queue: self.context.queue,
            queue_authority: self.context.queue_authority,
            permission: companions.permission,
            lease: companions.lease,
            escrow: companions.escrow,
            program_state,
            crank_data_buffer: self.context.crank_data_buffer,
        };
        let params = CrankPushParams {
            state_bump,
            permission_bump: companions.permission_bump,
            notifi_ref: None,
        };
        crank_push(&self.context.program_id, &accounts, &params)
    }
}

/// The oracle at the queue's garbage-collection index, if that slot is filled.
pub fn gc_candidate(
    queue: &OracleQueueAccountData,
    members_buffer: &[u8],
) -> OracleResult<Option<Pubkey>> {
    let ring = RingBuffer::<QueueMember>::new(members_buffer, RingHeader::Tagged)?;
    let size = (queue.size as usize).min(ring.capacity());
    let idx = queue.gc_idx as usize;
    if idx >= size {
        return Ok(None);
    }
    match ring.physical().nth(idx) {
        Some(member) => Ok(Some(member?.0)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEVNET_PROGRAM_ID;

    fn crank_buffer(rows: &[CrankRow], capacity: usize) -> Vec<u8> {
        let mut data = library::codec::BUFFER_DISCRIMINATOR.to_vec();
        data.extend(library::codec::encode_rows(rows));
        data.resize(8 + capacity * 40, 0);
        data
    }

    fn scheduler() -> CrankScheduler {
        CrankScheduler::new(CrankContext {
            program_id: DEVNET_PROGRAM_ID,
            crank: Pubkey::new_unique(),
            crank_data_buffer: Pubkey::new_unique(),
            queue: Pubkey::new_unique(),
            queue_authority: Pubkey::new_unique(),
            queue_data_buffer: Pubkey::new_unique(),
            mint: spl_token::native_mint::ID,
        })
    }

    #[test]
    fn test_peek_ready_filters_in_scan_order() {
        let (a, b, c) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let buffer = crank_buffer(
            &[CrankRow::new(a, 100), CrankRow::new(b, 200), CrankRow::new(c, 50)],
            4,
        );

        let ready = CrankScheduler::peek_ready(&buffer, 150, 10).unwrap();
        assert_eq!(ready, vec![CrankRow::new(a, 100), CrankRow::new(c, 50)]);

        let ready = CrankScheduler::peek_ready(&buffer, 500, 2).unwrap();
        assert_eq!(ready.iter().map(|r| r.pubkey).collect::<Vec<_>>(), vec![a, b]);

        assert!(CrankScheduler::peek_ready(&buffer, 500, 0).unwrap().is_empty());
        assert!(CrankScheduler::peek_ready(&buffer, 49, 10).unwrap().is_empty());
    }

    #[test]
    fn test_empty_buffer_is_not_an_error() {
        let buffer = crank_buffer(&[], 3);
        assert!(CrankScheduler::peek_ready(&buffer, i64::MAX, 5).unwrap().is_empty());
        assert!(CrankScheduler::peek_next(&buffer, 5).unwrap().is_empty());
        assert!(!CrankScheduler::is_on_crank(&buffer, &Pubkey::new_unique()).unwrap());
    }

    #[test]
    fn test_peek_next_and_membership() {
        let feeds: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        let rows: Vec<CrankRow> = feeds.iter().map(|f| CrankRow::new(*f, 1_000)).collect();
        let buffer = crank_buffer(&rows, 3);

        assert_eq!(CrankScheduler::peek_next(&buffer, 2).unwrap(), rows[..2].to_vec());
        assert!(CrankScheduler::is_on_crank(&buffer, &feeds[2]).unwrap());
        assert!(!CrankScheduler::is_on_crank(&buffer, &Pubkey::new_unique()).unwrap());
    }

    #[test]
    fn test_pop_requires_ready_feeds() {
        assert_eq!(
            scheduler()
                .pop_instruction(&[], &Pubkey::new_unique(), None)
                .unwrap_err(),
            OracleError::CrankEmpty
        );
    }

    #[test]
    fn test_pop_operands_sorted_and_deduplicated() {
        let scheduler = scheduler();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let ix = scheduler
            .pop_instruction(&[b, a, b], &Pubkey::new_unique(), Some(3))
            .unwrap();

        let trailing: Vec<Pubkey> = ix.accounts[9..].iter().map(|m| m.pubkey).collect();
        assert_eq!(trailing.len(), 8);
        assert!(trailing.windows(2).all(|w| w[0].to_bytes() < w[1].to_bytes()));
        assert!(ix.accounts[9..].iter().all(|m| m.is_writable && !m.is_signer));

        let expected: HashSet<Pubkey> = [a, b]
            .iter()
            .flat_map(|feed| scheduler.context().companions(feed).pop_operands())
            .collect();
        assert_eq!(trailing.iter().copied().collect::<HashSet<_>>(), expected);

        let params = CrankPopParams::deserialize(&mut &ix.data[8..]).unwrap();
        let (cb, ca) = (
            scheduler.context().companions(&b),
            scheduler.context().companions(&a),
        );
        assert_eq!(params.lease_bumps, vec![cb.lease_bump, ca.lease_bump]);
        assert_eq!(params.permission_bumps, vec![cb.permission_bump, ca.permission_bump]);
        assert_eq!(params.state_bump, pda::program_state(&DEVNET_PROGRAM_ID).1);
        assert_eq!(params.nonce, Some(3));
    }

    #[test]
    fn test_push_names_feed_companions() {
        let scheduler = scheduler();
        let feed = Pubkey::new_unique();
        let ix = scheduler.push_instruction(&feed).unwrap();
        let companions = scheduler.context().companions(&feed);

        let keys: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();
        assert_eq!(keys[0], scheduler.context().crank);
        assert_eq!(keys[1], feed);
        assert_eq!(keys[4], companions.permission);
        assert_eq!(keys[5], companions.lease);
        assert_eq!(keys[6], companions.escrow);
        assert!(ix.accounts.iter().all(|m| !m.is_signer));

        let params = CrankPushParams::deserialize(&mut &ix.data[8..]).unwrap();
        assert_eq!(params.permission_bump, companions.permission_bump);
    }

    #[test]
    fn test_gc_candidate_reads_queue_index() {
        let members: Vec<QueueMember> = (0..3).map(|_| QueueMember(Pubkey::new_unique())).collect();
        let mut buffer = library::codec::BUFFER_DISCRIMINATOR.to_vec();
        buffer.extend(library::codec::encode_rows(&members));
        buffer.resize(8 + 5 * 32, 0);

        let mut queue = OracleQueueAccountData {
            size: 3,
            gc_idx: 2,
            ..Default::default()
        };
        assert_eq!(gc_candidate(&queue, &buffer).unwrap(), Some(members[2].0));

        queue.gc_idx = 3;
        assert_eq!(gc_candidate(&queue, &buffer).unwrap(), None);
    }
}
