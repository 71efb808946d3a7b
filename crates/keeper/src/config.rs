use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use oracle::constants::{DEFAULT_POP_LIMIT, DEVNET_PROGRAM_ID};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::errors::{KeeperError, Result};

pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_ROUND_TIMEOUT_SECS: u64 = 60;

/// RPC endpoint from `ORACLE_RPC_URL` (or `.env`), falling back to devnet.
pub fn oracle_rpc_url() -> String {
    dotenv::var("ORACLE_RPC_URL").unwrap_or_else(|_| DEVNET_RPC_URL.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeeperConfig {
    pub program_id: Pubkey,
    pub rpc_url: String,
    pub crank: Pubkey,
    /// Token account receiving pop rewards. Defaults to the payer's associated
    /// account for the queue mint.
    pub payout_wallet: Option<Pubkey>,
    pub pop_limit: usize,
    pub poll_interval: Duration,
    pub round_timeout: Duration,
}

impl KeeperConfig {
    pub fn new(crank: Pubkey) -> Self {
        Self {
            program_id: DEVNET_PROGRAM_ID,
            rpc_url: oracle_rpc_url(),
            crank,
            payout_wallet: None,
            pop_limit: DEFAULT_POP_LIMIT,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            round_timeout: Duration::from_secs(DEFAULT_ROUND_TIMEOUT_SECS),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: KeeperFile = serde_json::from_str(json)?;
        file.try_into()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let file: KeeperFile = serde_json::from_reader(file)?;
        file.try_into()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&KeeperFile::from(self))?)
    }
}

/// On-disk form. Addresses are base58 strings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeeperFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    program_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rpc_url: Option<String>,
    crank: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payout_wallet: Option<String>,
    #[serde(default = "default_pop_limit")]
    pop_limit: usize,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "default_round_timeout_secs")]
    round_timeout_secs: u64,
}

fn default_pop_limit() -> usize {
    DEFAULT_POP_LIMIT
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_round_timeout_secs() -> u64 {
    DEFAULT_ROUND_TIMEOUT_SECS
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|e| KeeperError::InvalidConfig(format!("{field}: {e}")))
}

impl TryFrom<KeeperFile> for KeeperConfig {
    type Error = KeeperError;

    fn try_from(file: KeeperFile) -> Result<Self> {
        if file.pop_limit == 0 {
            return Err(KeeperError::InvalidConfig("popLimit must be positive".to_string()));
        }

        Ok(Self {
            program_id: match &file.program_id {
                Some(id) => parse_pubkey("programId", id)?,
                None => DEVNET_PROGRAM_ID,
            },
            rpc_url: file.rpc_url.unwrap_or_else(oracle_rpc_url),
            crank: parse_pubkey("crank", &file.crank)?,
            payout_wallet: file
                .payout_wallet
                .as_deref()
                .map(|wallet| parse_pubkey("payoutWallet", wallet))
                .transpose()?,
            pop_limit: file.pop_limit,
            poll_interval: Duration::from_millis(file.poll_interval_ms),
            round_timeout: Duration::from_secs(file.round_timeout_secs),
        })
    }
}

impl From<&KeeperConfig> for KeeperFile {
    fn from(config: &KeeperConfig) -> Self {
        Self {
            program_id: Some(config.program_id.to_string()),
            rpc_url: Some(config.rpc_url.clone()),
            crank: config.crank.to_string(),
            payout_wallet: config.payout_wallet.map(|wallet| wallet.to_string()),
            pop_limit: config.pop_limit,
            poll_interval_ms: config.poll_interval.as_millis() as u64,
            round_timeout_secs: config.round_timeout.as_secs(),
        }
    }
}
