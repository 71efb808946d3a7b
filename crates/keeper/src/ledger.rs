use std::future::Future;

use solana_sdk::{pubkey::Pubkey, signature::Keypair, signature::Signature};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::errors::Result;
use crate::transactions::OperationBatch;

/// Raw bytes of one account as of `slot`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountUpdate {
    pub address: Pubkey,
    pub data: Vec<u8>,
    pub slot: u64,
}

/// The ledger the keeper reads from and submits to. Submitted batches are
/// irrevocable and re-validated by the ledger, which may still reject them.
pub trait Ledger: Send + Sync {
    /// `None` when the account does not exist.
    fn read_account(&self, address: &Pubkey) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Order-preserving batched read.
    fn read_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> impl Future<Output = Result<Vec<Option<Vec<u8>>>>> + Send;

    fn submit(
        &self,
        batch: &OperationBatch,
        signers: &[&Keypair],
    ) -> impl Future<Output = Result<Signature>> + Send;

    /// Pushes every change to `address` until the receiver is dropped.
    fn subscribe(
        &self,
        address: &Pubkey,
    ) -> impl Future<Output = Result<UnboundedReceiver<AccountUpdate>>> + Send;

    /// The ledger's clock, in unix seconds.
    fn unix_timestamp(&self) -> impl Future<Output = Result<i64>> + Send;
}
