//! In-process ledger backed by a concurrent map.
//!
//! Submitted batches are signed and recorded but never executed; callers apply
//! their effects with [`MemoryLedger::set_account`], which also notifies
//! subscribers.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::errors::{KeeperError, Result};
use crate::ledger::{AccountUpdate, Ledger};
use crate::transactions::OperationBatch;

#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: DashMap<Pubkey, Vec<u8>>,
    subscribers: DashMap<Pubkey, Vec<UnboundedSender<AccountUpdate>>>,
    submitted: Mutex<Vec<OperationBatch>>,
    slot: AtomicU64,
    unix_timestamp: AtomicI64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp(self, unix_timestamp: i64) -> Self {
        self.unix_timestamp.store(unix_timestamp, Ordering::SeqCst);
        self
    }

    pub fn set_timestamp(&self, unix_timestamp: i64) {
        self.unix_timestamp.store(unix_timestamp, Ordering::SeqCst);
    }

    pub fn warp(&self, seconds: i64) {
        self.unix_timestamp.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Writes an account, bumps the slot and notifies live subscribers.
    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        let slot = self.slot.fetch_add(1, Ordering::SeqCst) + 1;
        self.accounts.insert(address, data.clone());

        if let Some(mut senders) = self.subscribers.get_mut(&address) {
            senders.retain(|tx| {
                tx.send(AccountUpdate {
                    address,
                    data: data.clone(),
                    slot,
                })
                .is_ok()
            });
        }
    }

    pub fn remove_account(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.accounts.remove(address).map(|(_, data)| data)
    }

    pub fn get(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.accounts.get(address).map(|entry| entry.value().clone())
    }

    /// Batches submitted so far, oldest first.
    pub fn submitted(&self) -> Vec<OperationBatch> {
        self.submitted
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

impl Ledger for MemoryLedger {
    async fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.get(address))
    }

    async fn read_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>> {
        Ok(addresses.iter().map(|address| self.get(address)).collect())
    }

    async fn submit(&self, batch: &OperationBatch, signers: &[&Keypair]) -> Result<Signature> {
        let transaction = batch.sign(Hash::new_unique(), signers)?;
        self.submitted
            .lock()
            .map_err(|e| KeeperError::Custom(format!("submission log poisoned: {e}")))?
            .push(batch.clone());
        Ok(transaction.signatures[0])
    }

    async fn subscribe(&self, address: &Pubkey) -> Result<UnboundedReceiver<AccountUpdate>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.entry(*address).or_default().push(tx);
        Ok(rx)
    }

    async fn unix_timestamp(&self) -> Result<i64> {
        Ok(self.unix_timestamp.load(Ordering::SeqCst))
    }
}
