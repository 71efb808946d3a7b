//! Update-round life cycle of one feed: open, per-oracle submission and
//! confirmation.
//!
//! A `RoundConsensus` is a snapshot. Callers either mutate it through
//! [`RoundConsensus::open`] / [`RoundConsensus::submit`] or derive the next
//! snapshot with [`RoundConsensus::apply`]. Every call validates all of its
//! preconditions before touching any state.

use std::collections::HashSet;

use anchor_lang::prelude::*;
use library::codec::HistorySample;
use library::math::median::{weighted_median, WeightedValue};
use library::math::safe_math::{Cast, SafeMath};
use library::Decimal;

use crate::errors::{OracleError, OracleResult};
use crate::feed::FeedConfig;
use crate::history::HistoryBuffer;
use crate::state::{AggregatorAccountData, AggregatorRound};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Open,
    Confirmed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OracleResponse {
    Pending,
    Value {
        value: Decimal,
        min_response: Decimal,
        max_response: Decimal,
    },
    Error,
}

/// One oracle seat in a round. Weight feeds the median; the queue's rotation
/// decides who sits here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OracleAssignment {
    pub oracle: Pubkey,
    pub weight: u64,
}

impl From<Pubkey> for OracleAssignment {
    fn from(oracle: Pubkey) -> Self {
        Self { oracle, weight: 1 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssignedOracle {
    pub oracle: Pubkey,
    pub weight: u64,
    pub response: OracleResponse,
}

impl AssignedOracle {
    pub fn is_pending(&self) -> bool {
        self.response == OracleResponse::Pending
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub open_slot: u64,
    pub open_timestamp: i64,
    pub oracles: Vec<AssignedOracle>,
    pub num_success: u32,
    pub num_error: u32,
    pub is_closed: bool,
    pub result: Option<Decimal>,
}

impl Round {
    fn successes(&self) -> Vec<WeightedValue> {
        self.oracles
            .iter()
            .filter_map(|seat| match seat.response {
                OracleResponse::Value { value, .. } => Some(WeightedValue::new(value, seat.weight)),
                _ => None,
            })
            .collect()
    }

    /// Smallest and largest successful value.
    pub fn response_range(&self) -> Option<(Decimal, Decimal)> {
        let values = self.successes();
        let min = values.iter().map(|v| v.value).min()?;
        let max = values.iter().map(|v| v.value).max()?;
        Some((min, max))
    }

    pub fn pending(&self) -> usize {
        self.oracles.iter().filter(|seat| seat.is_pending()).count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmedRound {
    pub result: Decimal,
    pub open_slot: u64,
    pub open_timestamp: i64,
    pub num_success: u32,
    pub num_error: u32,
    pub min_response: Decimal,
    pub max_response: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundAction {
    Open {
        assignment: Vec<OracleAssignment>,
        now: i64,
        slot: u64,
    },
    Submit {
        oracle_idx: u32,
        value: Decimal,
        min_response: Decimal,
        max_response: Decimal,
        is_error: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundEvent {
    Opened {
        open_timestamp: i64,
        open_slot: u64,
        batch_size: u32,
    },
    Accepted {
        oracle_idx: u32,
        num_success: u32,
        num_error: u32,
    },
    Confirmed(ConfirmedRound),
}

#[derive(Clone, Debug)]
pub struct RoundConsensus {
    config: FeedConfig,
    next_allowed_update_time: i64,
    current: Option<Round>,
    latest_confirmed: Option<ConfirmedRound>,
    previous_confirmed: Option<ConfirmedRound>,
    history: Option<HistoryBuffer>,
}

impl RoundConsensus {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            next_allowed_update_time: 0,
            current: None,
            latest_confirmed: None,
            previous_confirmed: None,
            history: None,
        }
    }

    pub fn with_history(mut self, history: HistoryBuffer) -> Self {
        self.history = Some(history);
        self
    }

    /// Rebuilds a snapshot from decoded ledger state.
    ///
    /// The ledger keeps only the result and slot of the round before the latest
    /// confirmed one; the other fields of `previous_confirmed` are left zeroed.
    pub fn from_account(
        address: Pubkey,
        data: &AggregatorAccountData,
        history: Option<&[u8]>,
    ) -> OracleResult<Self> {
        let config = FeedConfig::from_account(address, data);
        let history = history.map(HistoryBuffer::from_account_data).transpose()?;

        let current = (data.current_round.round_open_slot != 0
            || data.current_round.round_open_timestamp != 0)
            .then(|| round_from_account(&data.current_round, config.batch_size))
            .transpose()?;

        let latest = &data.latest_confirmed_round;
        let latest_confirmed = (latest.num_success > 0).then(|| ConfirmedRound {
            result: latest.result,
            open_slot: latest.round_open_slot,
            open_timestamp: latest.round_open_timestamp,
            num_success: latest.num_success,
            num_error: latest.num_error,
            min_response: latest.min_response,
            max_response: latest.max_response,
        });

        let previous_confirmed = (data.previous_confirmed_round_slot != 0).then(|| ConfirmedRound {
            result: data.previous_confirmed_round_result,
            open_slot: data.previous_confirmed_round_slot,
            open_timestamp: 0,
            num_success: 0,
            num_error: 0,
            min_response: Decimal::ZERO,
            max_response: Decimal::ZERO,
        });

        Ok(Self {
            config,
            next_allowed_update_time: data.next_allowed_update_time,
            current,
            latest_confirmed,
            previous_confirmed,
            history,
        })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn next_allowed_update_time(&self) -> i64 {
        self.next_allowed_update_time
    }

    pub fn current(&self) -> Option<&Round> {
        self.current.as_ref()
    }

    pub fn latest_confirmed(&self) -> Option<&ConfirmedRound> {
        self.latest_confirmed.as_ref()
    }

    pub fn previous_confirmed(&self) -> Option<&ConfirmedRound> {
        self.previous_confirmed.as_ref()
    }

    pub fn history(&self) -> Option<&HistoryBuffer> {
        self.history.as_ref()
    }

    pub fn phase(&self) -> RoundPhase {
        match &self.current {
            None => RoundPhase::Idle,
            Some(round) if round.is_closed => RoundPhase::Confirmed,
            Some(_) => RoundPhase::Open,
        }
    }

    pub fn verify_config(&self, queue_size: u32) -> OracleResult {
        self.config.verify(queue_size)
    }

    pub fn latest_value(&self) -> Option<Decimal> {
        self.latest_confirmed.map(|round| round.result)
    }

    /// Latest confirmed result, provided it met the feed's quorum.
    pub fn get_result(&self) -> OracleResult<Decimal> {
        let num_success = self.latest_confirmed.map_or(0, |round| round.num_success);
        match self.latest_confirmed {
            Some(round) if num_success >= self.config.min_oracle_results && num_success > 0 => {
                Ok(round.result)
            }
            _ => Err(OracleError::InvalidAggregatorRound {
                num_success,
                min_oracle_results: self.config.min_oracle_results,
            }),
        }
    }

    pub fn check_staleness(&self, now: i64, max_age: i64) -> OracleResult {
        let opened = self
            .latest_confirmed
            .map_or(0, |round| round.open_timestamp);
        let age = now.safe_sub(opened)?;
        if self.latest_confirmed.is_none() || age > max_age {
            return Err(OracleError::StaleFeed { age, max_age });
        }
        Ok(())
    }

    pub fn apply(&self, action: RoundAction) -> OracleResult<(RoundConsensus, RoundEvent)> {
        let mut next = self.clone();
        let event = match action {
            RoundAction::Open {
                assignment,
                now,
                slot,
            } => next.open(&assignment, now, slot)?,
            RoundAction::Submit {
                oracle_idx,
                value,
                min_response,
                max_response,
                is_error,
            } => next.submit(oracle_idx, value, min_response, max_response, is_error)?,
        };
        Ok((next, event))
    }

    /// Opens a new round, superseding any round still in flight.
    pub fn open(
        &mut self,
        assignment: &[OracleAssignment],
        now: i64,
        slot: u64,
    ) -> OracleResult<RoundEvent> {
        if self.config.is_locked {
            return Err(OracleError::AggregatorLocked);
        }
        if now < self.next_allowed_update_time {
            return Err(OracleError::IllegalOpenCall {
                now,
                next_allowed: self.next_allowed_update_time,
            });
        }

        let batch_size = self.config.batch_size;
        if assignment.len() != batch_size as usize {
            return Err(OracleError::InvalidAssignment(format!(
                "expected {batch_size} oracles, got {}",
                assignment.len()
            )));
        }
        let mut seen = HashSet::with_capacity(assignment.len());
        if let Some(dup) = assignment.iter().find(|seat| !seen.insert(seat.oracle)) {
            return Err(OracleError::InvalidAssignment(format!(
                "oracle {} assigned twice",
                dup.oracle
            )));
        }
        let next_allowed = now.safe_add(i64::from(self.config.min_update_delay_seconds))?;

        self.current = Some(Round {
            open_slot: slot,
            open_timestamp: now,
            oracles: assignment
                .iter()
                .map(|seat| AssignedOracle {
                    oracle: seat.oracle,
                    weight: seat.weight,
                    response: OracleResponse::Pending,
                })
                .collect(),
            num_success: 0,
            num_error: 0,
            is_closed: false,
            result: None,
        });
        self.next_allowed_update_time = next_allowed;

        Ok(RoundEvent::Opened {
            open_timestamp: now,
            open_slot: slot,
            batch_size,
        })
    }

    pub fn submit(
        &mut self,
        oracle_idx: u32,
        value: Decimal,
        min_response: Decimal,
        max_response: Decimal,
        is_error: bool,
    ) -> OracleResult<RoundEvent> {
        let round = self.current.as_ref().ok_or(OracleError::RoundNotOpen)?;
        if round.is_closed {
            return Err(OracleError::AggregatorCurrentRoundClosed);
        }

        let idx: usize = oracle_idx.cast()?;
        let seat = round
            .oracles
            .get(idx)
            .ok_or(OracleError::OracleIndexOutOfRange {
                index: oracle_idx,
                batch_size: round.oracles.len().cast()?,
            })?;
        if !seat.is_pending() {
            return Err(OracleError::OracleAlreadyResponded(oracle_idx));
        }

        let mut next = round.clone();
        if is_error {
            next.oracles[idx].response = OracleResponse::Error;
            next.num_error = next.num_error.safe_add(1)?;
        } else {
            next.oracles[idx].response = OracleResponse::Value {
                value,
                min_response,
                max_response,
            };
            next.num_success = next.num_success.safe_add(1)?;
        }

        let Some(confirmed) = self.evaluate(&next)? else {
            let event = RoundEvent::Accepted {
                oracle_idx,
                num_success: next.num_success,
                num_error: next.num_error,
            };
            self.current = Some(next);
            return Ok(event);
        };

        next.is_closed = true;
        next.result = Some(confirmed.result);
        self.current = Some(next);
        self.previous_confirmed = self.latest_confirmed.replace(confirmed);
        if let Some(history) = self.history.as_mut() {
            history.push(HistorySample::new(confirmed.open_timestamp, confirmed.result));
        }

        tracing::debug!(
            feed = %self.config.address,
            result = %confirmed.result,
            num_success = confirmed.num_success,
            "round confirmed"
        );
        Ok(RoundEvent::Confirmed(confirmed))
    }

    /// The confirmed round `round` would produce, if it is ready to close.
    fn evaluate(&self, round: &Round) -> OracleResult<Option<ConfirmedRound>> {
        if round.num_success < self.config.min_oracle_results {
            return Ok(None);
        }
        let Some(candidate) = weighted_median(&round.successes())? else {
            return Ok(None);
        };
        if !self.accepts(&candidate, round.open_timestamp)? {
            return Ok(None);
        }

        let (min_response, max_response) = round.response_range().unwrap_or((candidate, candidate));
        Ok(Some(ConfirmedRound {
            result: candidate,
            open_slot: round.open_slot,
            open_timestamp: round.open_timestamp,
            num_success: round.num_success,
            num_error: round.num_error,
            min_response,
            max_response,
        }))
    }

    /// Variance gate against the latest confirmed result, bypassed once the
    /// force-report period has elapsed.
    fn accepts(&self, candidate: &Decimal, open_timestamp: i64) -> OracleResult<bool> {
        let Some(latest) = self.latest_confirmed else {
            return Ok(true);
        };

        let period = self.config.force_report_period;
        if period > 0 && open_timestamp.safe_sub(latest.open_timestamp)? >= period {
            return Ok(true);
        }

        within_variance(&latest.result, candidate, &self.config.variance_threshold)
    }
}

/// `|candidate - previous| / |previous| * 100 <= threshold`, computed exactly.
/// A zero threshold or zero previous value always passes.
pub fn within_variance(
    previous: &Decimal,
    candidate: &Decimal,
    threshold: &Decimal,
) -> OracleResult<bool> {
    if threshold.is_zero() || previous.is_zero() {
        return Ok(true);
    }
    let change = candidate
        .checked_sub(previous)?
        .checked_abs()?
        .checked_mul(&Decimal::from_integer(100))?;
    let allowed = threshold.checked_mul(&previous.checked_abs()?)?;
    Ok(change <= allowed)
}

fn round_from_account(round: &AggregatorRound, batch_size: u32) -> OracleResult<Round> {
    let seats: usize = batch_size.cast::<usize>()?.min(round.oracle_pubkeys_data.len());
    let oracles = (0..seats)
        .map(|i| {
            let response = if round.medians_fulfilled[i] {
                OracleResponse::Value {
                    value: round.medians_data[i],
                    min_response: round.medians_data[i],
                    max_response: round.medians_data[i],
                }
            } else if round.errors_fulfilled[i] {
                OracleResponse::Error
            } else {
                OracleResponse::Pending
            };
            AssignedOracle {
                oracle: round.oracle_pubkeys_data[i],
                weight: 1,
                response,
            }
        })
        .collect();

    Ok(Round {
        open_slot: round.round_open_slot,
        open_timestamp: round.round_open_timestamp,
        oracles,
        num_success: round.num_success,
        num_error: round.num_error,
        is_closed: round.is_closed,
        result: round.is_closed.then_some(round.result),
    })
}
