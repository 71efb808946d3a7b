//! Companion-address derivation.
//!
//! Every address here is a program-derived address over fixed seeds, so it is
//! computed locally and never looked up. The seeds must match the ledger program
//! byte for byte or every instruction naming them is rejected.

use anchor_lang::prelude::*;
use spl_associated_token_account::get_associated_token_address;

use crate::constants::{LEASE_SEED, ORACLE_SEED, PERMISSION_SEED, SLIDING_RESULT_SEED, STATE_SEED};

pub fn program_state(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STATE_SEED], program_id)
}

pub fn permission(
    program_id: &Pubkey,
    authority: &Pubkey,
    granter: &Pubkey,
    grantee: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            PERMISSION_SEED,
            authority.as_ref(),
            granter.as_ref(),
            grantee.as_ref(),
        ],
        program_id,
    )
}

pub fn lease(program_id: &Pubkey, queue: &Pubkey, aggregator: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LEASE_SEED, queue.as_ref(), aggregator.as_ref()], program_id)
}

pub fn lease_escrow(lease: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(lease, mint)
}

pub fn oracle(program_id: &Pubkey, queue: &Pubkey, wallet: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[ORACLE_SEED, queue.as_ref(), wallet.as_ref()], program_id)
}

pub fn sliding_window(program_id: &Pubkey, aggregator: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SLIDING_RESULT_SEED, aggregator.as_ref()], program_id)
}

/// The records a feed needs on a queue before the crank will service it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedCompanions {
    pub aggregator: Pubkey,
    pub permission: Pubkey,
    pub permission_bump: u8,
    pub lease: Pubkey,
    pub lease_bump: u8,
    pub escrow: Pubkey,
}

impl FeedCompanions {
    /// Queue-usage permission is granted by the queue, under its authority.
    pub fn derive(
        program_id: &Pubkey,
        queue: &Pubkey,
        queue_authority: &Pubkey,
        aggregator: &Pubkey,
        mint: &Pubkey,
    ) -> Self {
        let (permission, permission_bump) = permission(program_id, queue_authority, queue, aggregator);
        let (lease, lease_bump) = lease(program_id, queue, aggregator);
        let escrow = lease_escrow(&lease, mint);

        Self {
            aggregator: *aggregator,
            permission,
            permission_bump,
            lease,
            lease_bump,
            escrow,
        }
    }

    /// Trailing operands one feed contributes to a crank pop.
    pub fn pop_operands(&self) -> [Pubkey; 4] {
        [self.aggregator, self.lease, self.escrow, self.permission]
    }
}
