use std::sync::Arc;
use std::time::Duration;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    clock::Clock,
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    sysvar,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::errors::{KeeperError, Result};
use crate::ledger::{AccountUpdate, Ledger};
use crate::transactions::OperationBatch;

/// Ledger backed by a JSON-RPC node. Subscriptions poll at `poll_interval`.
pub struct RpcLedger {
    client: Arc<RpcClient>,
    poll_interval: Duration,
}

impl RpcLedger {
    pub fn new(rpc_url: &str, poll_interval: Duration) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            )),
            poll_interval,
        }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Clock sysvar as the cluster reports it.
    pub async fn clock(&self) -> Result<Clock> {
        let account = self
            .client
            .get_account(&sysvar::clock::id())
            .await
            .map_err(|e| KeeperError::Rpc(e.to_string()))?;
        let clock: Clock = bincode::deserialize(&account.data)?;
        Ok(clock)
    }
}

impl Ledger for RpcLedger {
    async fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn read_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>> {
        let accounts = self.client.get_multiple_accounts(addresses).await?;
        Ok(accounts
            .into_iter()
            .map(|account| account.map(|a| a.data))
            .collect())
    }

    async fn submit(&self, batch: &OperationBatch, signers: &[&Keypair]) -> Result<Signature> {
        let blockhash = self.client.get_latest_blockhash().await?;
        let transaction = batch.sign(blockhash, signers)?;
        let signature = self.client.send_and_confirm_transaction(&transaction).await?;

        tracing::info!(%signature, instructions = batch.len(), "batch confirmed");
        Ok(signature)
    }

    async fn subscribe(&self, address: &Pubkey) -> Result<UnboundedReceiver<AccountUpdate>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::clone(&self.client);
        let poll_interval = self.poll_interval;
        let address = *address;

        tokio::spawn(async move {
            let mut last: Option<Vec<u8>> = None;
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let response = match client
                    .get_account_with_commitment(&address, client.commitment())
                    .await
                {
                    Ok(response) => response,
                    Err(err) => {
                        tracing::warn!(%address, error = %err, "subscription poll failed");
                        continue;
                    }
                };
                let Some(account) = response.value else {
                    continue;
                };
                if last.as_ref() == Some(&account.data) {
                    continue;
                }

                last = Some(account.data.clone());
                let update = AccountUpdate {
                    address,
                    data: account.data,
                    slot: response.context.slot,
                };
                if tx.send(update).is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn unix_timestamp(&self) -> Result<i64> {
        Ok(self.clock().await?.unix_timestamp)
    }
}
