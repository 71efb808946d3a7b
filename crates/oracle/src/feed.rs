use anchor_lang::prelude::*;
use library::Decimal;

use crate::constants::{MAX_BATCH_SIZE, MIN_UPDATE_DELAY_SECONDS};
use crate::errors::{OracleError, OracleResult};
use crate::state::AggregatorAccountData;

/// Update cadence and quorum rules of one feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedConfig {
    pub address: Pubkey,
    pub queue: Pubkey,
    pub authority: Pubkey,
    pub batch_size: u32,
    pub min_oracle_results: u32,
    pub min_job_results: u32,
    pub min_update_delay_seconds: u32,
    pub variance_threshold: Decimal,
    pub force_report_period: i64,
    pub is_locked: bool,
    pub job_count: u32,
    pub crank: Option<Pubkey>,
    pub history_buffer: Option<Pubkey>,
}

impl FeedConfig {
    pub fn from_account(address: Pubkey, data: &AggregatorAccountData) -> Self {
        Self {
            address,
            queue: data.queue_pubkey,
            authority: data.authority,
            batch_size: data.oracle_request_batch_size,
            min_oracle_results: data.min_oracle_results,
            min_job_results: data.min_job_results,
            min_update_delay_seconds: data.min_update_delay_seconds,
            variance_threshold: data.variance_threshold,
            force_report_period: data.force_report_period,
            is_locked: data.is_locked,
            job_count: data.job_count(),
            crank: data.crank(),
            history_buffer: data.history_buffer(),
        }
    }

    /// Checks the config against the queue it will draw oracles from.
    pub fn verify(&self, queue_size: u32) -> OracleResult {
        if self.min_update_delay_seconds < MIN_UPDATE_DELAY_SECONDS {
            return Err(config_error(
                "min_update_delay_seconds",
                format!(
                    "must be at least {MIN_UPDATE_DELAY_SECONDS}, got {}",
                    self.min_update_delay_seconds
                ),
            ));
        }
        if self.min_job_results > self.job_count {
            return Err(config_error(
                "min_job_results",
                format!(
                    "{} exceeds the {} configured jobs",
                    self.min_job_results, self.job_count
                ),
            ));
        }
        if self.batch_size as usize > MAX_BATCH_SIZE {
            return Err(config_error(
                "oracle_request_batch_size",
                format!("{} exceeds the maximum of {MAX_BATCH_SIZE}", self.batch_size),
            ));
        }
        if self.batch_size > queue_size {
            return Err(config_error(
                "oracle_request_batch_size",
                format!(
                    "{} exceeds the queue size of {queue_size}",
                    self.batch_size
                ),
            ));
        }
        if self.min_oracle_results > self.batch_size {
            return Err(config_error(
                "min_oracle_results",
                format!(
                    "{} exceeds the batch size of {}",
                    self.min_oracle_results, self.batch_size
                ),
            ));
        }
        Ok(())
    }
}

fn config_error(property: &'static str, message: String) -> OracleError {
    OracleError::AggregatorConfig { property, message }
}
