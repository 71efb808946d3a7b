use std::time::Duration;

use library::LibraryError;
use oracle::{ErrorKind, OracleError};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeeperError>;

/// Keeper error types
#[derive(Error, Debug)]
pub enum KeeperError {
    #[error("payer is the default address; the keeper is read-only")]
    ReadOnlyPayer,

    #[error("batch holds {0} instructions, more than the limit of 10")]
    InstructionOverflow(usize),

    #[error("batch serializes to {0} bytes, more than the packet limit")]
    SerializationOverflow(usize),

    #[error("batch is missing required signers: {0:?}")]
    MissingSigners(Vec<Pubkey>),

    #[error("cannot combine batches paid by {left} and {right}")]
    PayerMismatch { left: Pubkey, right: Pubkey },

    #[error("no batches to pack")]
    NothingToPack,

    #[error("instruction cannot be packed: {0}")]
    InstructionsPacking(String),

    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("feed {0} is already on the crank")]
    AlreadyOnCrank(Pubkey),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("Deserialization failed: {0}")]
    DeserializeFailed(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl KeeperError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeeperError::ReadOnlyPayer
            | KeeperError::PayerMismatch { .. }
            | KeeperError::AlreadyOnCrank(_)
            | KeeperError::InvalidConfig(_) => ErrorKind::ProtocolPrecondition,
            KeeperError::InstructionOverflow(_)
            | KeeperError::SerializationOverflow(_)
            | KeeperError::NothingToPack
            | KeeperError::InstructionsPacking(_) => ErrorKind::ResourceBounds,
            KeeperError::MissingSigners(_) | KeeperError::Signing(_) => ErrorKind::SignerCoverage,
            KeeperError::AccountNotFound(_) => ErrorKind::AddressResolution,
            KeeperError::DeserializeFailed(_) => ErrorKind::Codec,
            KeeperError::Rpc(_)
            | KeeperError::Timeout(_)
            | KeeperError::IoError(_)
            | KeeperError::Custom(_) => ErrorKind::Transport,
            KeeperError::Oracle(err) => err.kind(),
        }
    }
}

impl From<LibraryError> for KeeperError {
    fn from(err: LibraryError) -> Self {
        KeeperError::Oracle(err.into())
    }
}

impl From<solana_client::client_error::ClientError> for KeeperError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        KeeperError::Rpc(err.to_string())
    }
}

impl From<bincode::Error> for KeeperError {
    fn from(err: bincode::Error) -> Self {
        KeeperError::DeserializeFailed(err.to_string())
    }
}

impl From<serde_json::Error> for KeeperError {
    fn from(err: serde_json::Error) -> Self {
        KeeperError::InvalidConfig(err.to_string())
    }
}

impl From<solana_sdk::signer::SignerError> for KeeperError {
    fn from(err: solana_sdk::signer::SignerError) -> Self {
        KeeperError::Signing(err.to_string())
    }
}

/// Wraps a foreign error as `KeeperError::Custom`, prefixed with `msg`.
pub trait ResultExt<T> {
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| KeeperError::Custom(format!("{}: {}", msg, e)))
    }
}
