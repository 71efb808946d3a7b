use anchor_lang::prelude::*;
use library::Decimal;

use super::{AccountKind, AccountLayout};

#[derive(Clone, Copy, Debug, PartialEq, AnchorSerialize, AnchorDeserialize)]
pub struct OracleQueueAccountData {
    pub name: [u8; 32],
    pub metadata: [u8; 64],
    pub authority: Pubkey,
    pub oracle_timeout: u32,
    pub reward: u64,
    pub min_stake: u64,
    pub slashing_enabled: bool,
    pub variance_tolerance_multiplier: Decimal,
    pub feed_probation_period: u32,
    pub curr_idx: u32,
    /// Oracles currently in the membership buffer.
    pub size: u32,
    /// Rotating pointer into the membership buffer; the oracle there is the next eviction candidate.
    pub gc_idx: u32,
    pub consecutive_feed_failure_limit: u64,
    pub consecutive_oracle_failure_limit: u64,
    pub unpermissioned_feeds_enabled: bool,
    pub unpermissioned_vrf_enabled: bool,
    pub curator_reward_cut: Decimal,
    pub lock_lease_funding: bool,
    pub mint: Pubkey,
    pub enable_buffer_relayers: bool,
    pub _ebuf: [u8; 968],
    pub max_size: u32,
    pub data_buffer: Pubkey,
}

impl Default for OracleQueueAccountData {
    fn default() -> Self {
        Self {
            name: [0; 32],
            metadata: [0; 64],
            authority: Pubkey::default(),
            oracle_timeout: 0,
            reward: 0,
            min_stake: 0,
            slashing_enabled: false,
            variance_tolerance_multiplier: Decimal::ZERO,
            feed_probation_period: 0,
            curr_idx: 0,
            size: 0,
            gc_idx: 0,
            consecutive_feed_failure_limit: 0,
            consecutive_oracle_failure_limit: 0,
            unpermissioned_feeds_enabled: false,
            unpermissioned_vrf_enabled: false,
            curator_reward_cut: Decimal::ZERO,
            lock_lease_funding: false,
            mint: Pubkey::default(),
            enable_buffer_relayers: false,
            _ebuf: [0; 968],
            max_size: 0,
            data_buffer: Pubkey::default(),
        }
    }
}

impl AccountLayout for OracleQueueAccountData {
    const KIND: AccountKind = AccountKind::OracleQueue;
}

impl OracleQueueAccountData {
    /// Reward mint; queues created before custom mints use wrapped SOL.
    pub fn get_mint(&self) -> Pubkey {
        if self.mint == Pubkey::default() {
            spl_token::native_mint::ID
        } else {
            self.mint
        }
    }

    pub fn max_round_rewards(&self, batch_size: u32) -> u64 {
        self.reward.saturating_mul(u64::from(batch_size) + 1)
    }
}
