use anchor_lang::prelude::*;
use library::Decimal;

use super::{AccountKind, AccountLayout};
use crate::constants::{MAX_BATCH_SIZE, MAX_JOBS};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct JobHash {
    pub data: [u8; 32],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub enum AggregatorResolutionMode {
    #[default]
    ModeRoundResolution,
    ModeSlidingResolution,
}

/// One update cycle as the ledger records it. Slot `i` of every per-oracle
/// array belongs to `oracle_pubkeys_data[i]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, AnchorSerialize, AnchorDeserialize)]
pub struct AggregatorRound {
    pub num_success: u32,
    pub num_error: u32,
    pub is_closed: bool,
    pub round_open_slot: u64,
    pub round_open_timestamp: i64,
    pub result: Decimal,
    pub std_deviation: Decimal,
    pub min_response: Decimal,
    pub max_response: Decimal,
    pub oracle_pubkeys_data: [Pubkey; MAX_BATCH_SIZE],
    pub medians_data: [Decimal; MAX_BATCH_SIZE],
    pub current_payout: [i64; MAX_BATCH_SIZE],
    pub medians_fulfilled: [bool; MAX_BATCH_SIZE],
    pub errors_fulfilled: [bool; MAX_BATCH_SIZE],
}

#[derive(Clone, Copy, Debug, PartialEq, AnchorSerialize, AnchorDeserialize)]
pub struct AggregatorAccountData {
    pub name: [u8; 32],
    pub metadata: [u8; 128],
    pub _reserved1: [u8; 32],
    pub queue_pubkey: Pubkey,
    pub oracle_request_batch_size: u32,
    pub min_oracle_results: u32,
    pub min_job_results: u32,
    pub min_update_delay_seconds: u32,
    pub start_after: i64,
    /// Percentage change from the previous result that forces a report.
    pub variance_threshold: Decimal,
    /// Seconds after which a result is reported regardless of variance. Zero disables.
    pub force_report_period: i64,
    pub expiration: i64,
    pub consecutive_failure_count: u64,
    pub next_allowed_update_time: i64,
    pub is_locked: bool,
    pub crank_pubkey: Pubkey,
    pub latest_confirmed_round: AggregatorRound,
    pub current_round: AggregatorRound,
    pub job_pubkeys_data: [Pubkey; MAX_JOBS],
    pub job_hashes: [JobHash; MAX_JOBS],
    pub job_pubkeys_size: u32,
    pub jobs_checksum: [u8; 32],
    pub authority: Pubkey,
    pub history_buffer: Pubkey,
    pub previous_confirmed_round_result: Decimal,
    pub previous_confirmed_round_slot: u64,
    pub disable_crank: bool,
    pub job_weights: [u8; MAX_JOBS],
    pub creation_timestamp: i64,
    pub resolution_mode: AggregatorResolutionMode,
    pub _ebuf: [u8; 138],
}

impl Default for AggregatorAccountData {
    fn default() -> Self {
        Self {
            name: [0; 32],
            metadata: [0; 128],
            _reserved1: [0; 32],
            queue_pubkey: Pubkey::default(),
            oracle_request_batch_size: 0,
            min_oracle_results: 0,
            min_job_results: 0,
            min_update_delay_seconds: 0,
            start_after: 0,
            variance_threshold: Decimal::ZERO,
            force_report_period: 0,
            expiration: 0,
            consecutive_failure_count: 0,
            next_allowed_update_time: 0,
            is_locked: false,
            crank_pubkey: Pubkey::default(),
            latest_confirmed_round: AggregatorRound::default(),
            current_round: AggregatorRound::default(),
            job_pubkeys_data: [Pubkey::default(); MAX_JOBS],
            job_hashes: [JobHash::default(); MAX_JOBS],
            job_pubkeys_size: 0,
            jobs_checksum: [0; 32],
            authority: Pubkey::default(),
            history_buffer: Pubkey::default(),
            previous_confirmed_round_result: Decimal::ZERO,
            previous_confirmed_round_slot: 0,
            disable_crank: false,
            job_weights: [0; MAX_JOBS],
            creation_timestamp: 0,
            resolution_mode: AggregatorResolutionMode::default(),
            _ebuf: [0; 138],
        }
    }
}

impl AccountLayout for AggregatorAccountData {
    const KIND: AccountKind = AccountKind::Aggregator;
}

impl AggregatorAccountData {
    pub fn history_buffer(&self) -> Option<Pubkey> {
        (self.history_buffer != Pubkey::default()).then_some(self.history_buffer)
    }

    pub fn crank(&self) -> Option<Pubkey> {
        (self.crank_pubkey != Pubkey::default()).then_some(self.crank_pubkey)
    }

    pub fn job_count(&self) -> u32 {
        self.job_pubkeys_size
    }

    /// Latest confirmed value, absent until a round has confirmed.
    pub fn latest_value(&self) -> Option<Decimal> {
        (self.latest_confirmed_round.num_success > 0)
            .then_some(self.latest_confirmed_round.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_size_matches_ledger_layout() {
        let data = AggregatorAccountData::default().encode().unwrap();
        assert_eq!(data.len(), 8 + 3843);
    }

    #[test]
    fn test_optional_references() {
        let mut aggregator = AggregatorAccountData::default();
        assert_eq!(aggregator.history_buffer(), None);
        assert_eq!(aggregator.crank(), None);
        assert_eq!(aggregator.latest_value(), None);

        aggregator.history_buffer = Pubkey::new_unique();
        aggregator.latest_confirmed_round.num_success = 1;
        aggregator.latest_confirmed_round.result = Decimal::new(42, 0);
        assert!(aggregator.history_buffer().is_some());
        assert_eq!(aggregator.latest_value(), Some(Decimal::new(42, 0)));
    }
}
