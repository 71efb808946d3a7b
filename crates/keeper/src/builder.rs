use std::time::Duration;

use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use tokio::runtime::Runtime;

use crate::{
    config::KeeperConfig,
    errors::{KeeperError, Result, ResultExt},
    keeper::CrankKeeper,
    ledger::Ledger,
    rpc::RpcLedger,
};

/// Builder for a crank keeper
#[derive(Debug, Clone)]
pub struct KeeperBuilder {
    config: KeeperConfig,
    verify_crank: bool,
}

impl KeeperBuilder {
    /// Keeper for `crank` with default settings.
    pub fn new(crank: Pubkey) -> Self {
        Self::from_config(KeeperConfig::new(crank))
    }

    pub fn from_config(config: KeeperConfig) -> Self {
        Self {
            config,
            verify_crank: true,
        }
    }

    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.config.program_id = program_id;
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.config.rpc_url = rpc_url.into();
        self
    }

    pub fn with_payout_wallet(mut self, wallet: Pubkey) -> Self {
        self.config.payout_wallet = Some(wallet);
        self
    }

    pub fn with_pop_limit(mut self, pop_limit: usize) -> Self {
        self.config.pop_limit = pop_limit;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn with_round_timeout(mut self, timeout: Duration) -> Self {
        self.config.round_timeout = timeout;
        self
    }

    /// Load the crank once while building (defaults to true).
    pub fn verify_crank(mut self, verify: bool) -> Self {
        self.verify_crank = verify;
        self
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    /// Build a keeper against the configured RPC endpoint.
    pub async fn build(self, payer: Keypair) -> Result<CrankKeeper<RpcLedger>> {
        let ledger = RpcLedger::new(&self.config.rpc_url, self.config.poll_interval);
        self.build_with_ledger(ledger, payer).await
    }

    /// Build a keeper over any ledger.
    pub async fn build_with_ledger<L: Ledger>(
        self,
        ledger: L,
        payer: Keypair,
    ) -> Result<CrankKeeper<L>> {
        if self.config.pop_limit == 0 {
            return Err(KeeperError::InvalidConfig("pop limit must be positive".to_string()));
        }

        let verify = self.verify_crank;
        let keeper = CrankKeeper::new(ledger, self.config, payer);
        if verify {
            let snapshot = keeper.load().await?;
            tracing::info!(
                crank = %keeper.config().crank,
                queue = %snapshot.scheduler.context().queue,
                max_rows = snapshot.crank.max_rows,
                "keeper ready"
            );
        }
        Ok(keeper)
    }

    /// Blocking helper for callers without a runtime.
    pub fn build_blocking(self, payer: Keypair) -> Result<CrankKeeper<RpcLedger>> {
        Runtime::new()
            .context("Failed to create runtime")?
            .block_on(self.build(payer))
    }
}
