use anchor_lang::prelude::*;

use super::{AccountKind, AccountLayout};

/// Crank header. The rows themselves live in `data_buffer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct CrankAccountData {
    pub name: [u8; 32],
    pub metadata: [u8; 64],
    pub queue_pubkey: Pubkey,
    /// Rows currently held.
    pub pq_size: u32,
    pub max_rows: u32,
    pub jitter_modifier: u8,
    pub _ebuf: [u8; 255],
    pub data_buffer: Pubkey,
}

impl Default for CrankAccountData {
    fn default() -> Self {
        Self {
            name: [0; 32],
            metadata: [0; 64],
            queue_pubkey: Pubkey::default(),
            pq_size: 0,
            max_rows: 0,
            jitter_modifier: 0,
            _ebuf: [0; 255],
            data_buffer: Pubkey::default(),
        }
    }
}

impl AccountLayout for CrankAccountData {
    const KIND: AccountKind = AccountKind::Crank;
}
