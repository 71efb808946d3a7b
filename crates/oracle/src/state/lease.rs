use anchor_lang::prelude::*;

use super::{AccountKind, AccountLayout};

/// Funds a feed's updates on one queue. Escrow is the lease's token account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct LeaseAccountData {
    pub escrow: Pubkey,
    pub queue: Pubkey,
    pub aggregator: Pubkey,
    pub token_program: Pubkey,
    pub is_active: bool,
    pub crank_row_count: u32,
    pub created_at: i64,
    pub update_count: u128,
    pub withdraw_authority: Pubkey,
    pub _ebuf: [u8; 256],
}

impl Default for LeaseAccountData {
    fn default() -> Self {
        Self {
            escrow: Pubkey::default(),
            queue: Pubkey::default(),
            aggregator: Pubkey::default(),
            token_program: Pubkey::default(),
            is_active: false,
            crank_row_count: 0,
            created_at: 0,
            update_count: 0,
            withdraw_authority: Pubkey::default(),
            _ebuf: [0; 256],
        }
    }
}

impl AccountLayout for LeaseAccountData {
    const KIND: AccountKind = AccountKind::Lease;
}
