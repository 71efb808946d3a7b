//! Crank workflows: read the schedule, pop what is due, push new feeds and
//! follow a feed's rounds.
//!
//! Every workflow re-reads ledger state; nothing decoded is cached between
//! calls.

use std::time::Duration;

use chrono::{DateTime, Utc};
use oracle::crank::{CrankContext, CrankScheduler};
use oracle::errors::OracleError;
use oracle::round::{ConfirmedRound, RoundConsensus};
use oracle::state::{AccountLayout, AggregatorAccountData, CrankAccountData, OracleQueueAccountData};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use tokio::time::Instant;

use crate::config::KeeperConfig;
use crate::errors::{KeeperError, Result};
use crate::ledger::Ledger;
use crate::transactions::{pack_instructions, OperationBatch};

/// Decoded crank state at one point in time.
#[derive(Clone, Debug)]
pub struct CrankSnapshot {
    pub scheduler: CrankScheduler,
    pub crank: CrankAccountData,
    pub queue: OracleQueueAccountData,
    pub buffer: Vec<u8>,
}

/// Outcome of one keeper tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Ledger time the tick ran at.
    pub now: i64,
    pub popped: Vec<Pubkey>,
    pub signatures: Vec<Signature>,
}

impl TickReport {
    pub fn at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.now, 0)
    }

    pub fn is_idle(&self) -> bool {
        self.popped.is_empty()
    }
}

pub struct CrankKeeper<L> {
    ledger: L,
    config: KeeperConfig,
    payer: Keypair,
}

impl<L: Ledger> CrankKeeper<L> {
    pub fn new(ledger: L, config: KeeperConfig, payer: Keypair) -> Self {
        Self {
            ledger,
            config,
            payer,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    async fn read_required(&self, address: &Pubkey) -> Result<Vec<u8>> {
        self.ledger
            .read_account(address)
            .await?
            .ok_or(KeeperError::AccountNotFound(*address))
    }

    /// Reads and decodes the crank, its queue and its row buffer.
    pub async fn load(&self) -> Result<CrankSnapshot> {
        let crank_data = CrankAccountData::decode(&self.read_required(&self.config.crank).await?)?;

        let addresses = [crank_data.queue_pubkey, crank_data.data_buffer];
        let mut accounts = self.ledger.read_accounts(&addresses).await?.into_iter();
        let queue = accounts
            .next()
            .flatten()
            .ok_or(KeeperError::AccountNotFound(addresses[0]))?;
        let buffer = accounts
            .next()
            .flatten()
            .ok_or(KeeperError::AccountNotFound(addresses[1]))?;
        let queue_data = OracleQueueAccountData::decode(&queue)?;

        let context = CrankContext::new(
            self.config.program_id,
            self.config.crank,
            &crank_data,
            &queue_data,
        );
        tracing::debug!(
            crank = %self.config.crank,
            queue = %context.queue,
            rows = crank_data.pq_size,
            "loaded crank"
        );

        Ok(CrankSnapshot {
            scheduler: CrankScheduler::new(context),
            crank: crank_data,
            queue: queue_data,
            buffer,
        })
    }

    pub async fn ready_feeds(&self, now: i64) -> Result<Vec<Pubkey>> {
        let snapshot = self.load().await?;
        let rows = CrankScheduler::peek_ready(&snapshot.buffer, now, self.config.pop_limit)?;
        Ok(rows.into_iter().map(|row| row.pubkey).collect())
    }

    pub fn payout_wallet(&self, mint: &Pubkey) -> Pubkey {
        self.config
            .payout_wallet
            .unwrap_or_else(|| get_associated_token_address(&self.payer.pubkey(), mint))
    }

    /// Fails with `AccountNotFound` on the first lease, escrow or permission
    /// missing from the ledger.
    async fn ensure_companions(&self, context: &CrankContext, feeds: &[Pubkey]) -> Result<()> {
        let addresses: Vec<Pubkey> = feeds
            .iter()
            .flat_map(|feed| {
                let companions = context.companions(feed);
                [companions.lease, companions.escrow, companions.permission]
            })
            .collect();

        let accounts = self.ledger.read_accounts(&addresses).await?;
        for (address, account) in addresses.iter().zip(accounts) {
            if account.is_none() {
                tracing::warn!(%address, "missing feed companion account");
                return Err(KeeperError::AccountNotFound(*address));
            }
        }
        Ok(())
    }

    async fn plan_pop(&self, now: i64) -> Result<(Vec<Pubkey>, Vec<OperationBatch>)> {
        let snapshot = self.load().await?;
        let ready: Vec<Pubkey> =
            CrankScheduler::peek_ready(&snapshot.buffer, now, self.config.pop_limit)?
                .into_iter()
                .map(|row| row.pubkey)
                .collect();
        if ready.is_empty() {
            return Err(OracleError::CrankEmpty.into());
        }

        let scheduler = &snapshot.scheduler;
        self.ensure_companions(scheduler.context(), &ready).await?;

        let mint = scheduler.context().mint;
        let payout_wallet = self.payout_wallet(&mint);
        let nonce = Utc::now().timestamp_subsec_micros();
        let ix = scheduler.pop_instruction(&ready, &payout_wallet, Some(nonce))?;
        let mut batches = pack_instructions(self.payer.pubkey(), vec![ix])?;

        // A configured wallet is the operator's to fund; the derived one is ours.
        if self.config.payout_wallet.is_none()
            && self.ledger.read_account(&payout_wallet).await?.is_none()
        {
            tracing::info!(wallet = %payout_wallet, "creating payout token account");
            let payer = self.payer.pubkey();
            let create =
                create_associated_token_account_idempotent(&payer, &payer, &mint, &spl_token::ID);
            if let Some(first) = batches.first_mut() {
                first.unshift(vec![create], &[])?;
            }
        }
        Ok((ready, batches))
    }

    /// Batches popping every feed due at `now`.
    pub async fn pop_batches(&self, now: i64) -> Result<Vec<OperationBatch>> {
        Ok(self.plan_pop(now).await?.1)
    }

    /// Batch adding `feed` to the crank.
    pub async fn push_batch(&self, feed: &Pubkey) -> Result<OperationBatch> {
        let snapshot = self.load().await?;
        if CrankScheduler::is_on_crank(&snapshot.buffer, feed)? {
            return Err(KeeperError::AlreadyOnCrank(*feed));
        }

        let scheduler = &snapshot.scheduler;
        self.ensure_companions(scheduler.context(), std::slice::from_ref(feed))
            .await?;

        let ix = scheduler.push_instruction(feed)?;
        OperationBatch::new(self.payer.pubkey(), vec![ix], vec![])
    }

    /// Pops whatever is due on the ledger clock and submits it.
    pub async fn tick(&self) -> Result<TickReport> {
        let now = self.ledger.unix_timestamp().await?;
        let (popped, batches) = match self.plan_pop(now).await {
            Ok(plan) => plan,
            Err(KeeperError::Oracle(OracleError::CrankEmpty)) => {
                tracing::debug!(now, "nothing ready");
                return Ok(TickReport {
                    now,
                    ..Default::default()
                });
            }
            Err(err) => return Err(err),
        };

        let mut signatures = Vec::with_capacity(batches.len());
        for batch in &batches {
            signatures.push(self.ledger.submit(batch, &[&self.payer]).await?);
        }

        tracing::info!(now, feeds = popped.len(), batches = signatures.len(), "crank turned");
        Ok(TickReport {
            now,
            popped,
            signatures,
        })
    }

    /// Waits for `feed` to confirm a round newer than the one on the ledger
    /// now. Timing out stops the wait only; a submitted round may still land.
    pub async fn await_round(&self, feed: &Pubkey, timeout: Duration) -> Result<ConfirmedRound> {
        let mut updates = self.ledger.subscribe(feed).await?;
        let baseline = self.latest_round(feed, &self.read_required(feed).await?)?;
        let deadline = Instant::now() + timeout;

        loop {
            let update = match tokio::time::timeout_at(deadline, updates.recv()).await {
                Ok(Some(update)) => update,
                Ok(None) => {
                    return Err(KeeperError::Rpc(format!("subscription to {feed} closed")));
                }
                Err(_) => return Err(KeeperError::Timeout(timeout)),
            };

            let latest = match self.latest_round(feed, &update.data) {
                Ok(latest) => latest,
                Err(err) => {
                    tracing::warn!(%feed, error = %err, "undecodable feed update");
                    continue;
                }
            };
            if let Some(round) = latest {
                if is_newer(&round, baseline.as_ref()) {
                    tracing::info!(%feed, result = %round.result, slot = update.slot, "round confirmed");
                    return Ok(round);
                }
            }
        }
    }

    fn latest_round(&self, feed: &Pubkey, data: &[u8]) -> Result<Option<ConfirmedRound>> {
        let aggregator = AggregatorAccountData::decode(data)?;
        let consensus = RoundConsensus::from_account(*feed, &aggregator, None)?;
        Ok(consensus.latest_confirmed().copied())
    }
}

fn is_newer(round: &ConfirmedRound, baseline: Option<&ConfirmedRound>) -> bool {
    match baseline {
        None => true,
        Some(base) => (round.open_slot, round.open_timestamp) > (base.open_slot, base.open_timestamp),
    }
}
