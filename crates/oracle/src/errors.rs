use library::LibraryError;
use thiserror::Error;

pub type OracleResult<T = ()> = std::result::Result<T, OracleError>;

/// Coarse classification shared by every error in the workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Locally detectable protocol rule; nothing was mutated.
    ProtocolPrecondition,
    /// Operation count, byte size or capacity ceiling exceeded.
    ResourceBounds,
    /// A companion account expected on the ledger is missing.
    AddressResolution,
    /// A must-sign address is not covered by the batch.
    SignerCoverage,
    /// Malformed bytes or arithmetic overflow while decoding.
    Codec,
    /// RPC failure or a caller-side timeout.
    Transport,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("round cannot open before {next_allowed} (now {now})")]
    IllegalOpenCall { now: i64, next_allowed: i64 },

    #[error("aggregator is locked")]
    AggregatorLocked,

    #[error("oracle {0} already responded this round")]
    OracleAlreadyResponded(u32),

    #[error("current round is closed")]
    AggregatorCurrentRoundClosed,

    #[error("no round is open")]
    RoundNotOpen,

    #[error("oracle index {index} out of range for a batch of {batch_size}")]
    OracleIndexOutOfRange { index: u32, batch_size: u32 },

    #[error("invalid oracle assignment: {0}")]
    InvalidAssignment(String),

    #[error("no crank rows are ready")]
    CrankEmpty,

    #[error("round has {num_success} results, {min_oracle_results} required")]
    InvalidAggregatorRound {
        num_success: u32,
        min_oracle_results: u32,
    },

    #[error("feed result is {age}s old, max {max_age}s")]
    StaleFeed { age: i64, max_age: i64 },

    #[error("invalid aggregator config {property}: {message}")]
    AggregatorConfig {
        property: &'static str,
        message: String,
    },

    #[error("unknown account discriminator {0:?}")]
    UnknownAccount([u8; 8]),

    #[error("expected a {expected} account, found {found}")]
    UnexpectedAccountKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("account deserialization failed: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl OracleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OracleError::IllegalOpenCall { .. }
            | OracleError::AggregatorLocked
            | OracleError::OracleAlreadyResponded(_)
            | OracleError::AggregatorCurrentRoundClosed
            | OracleError::RoundNotOpen
            | OracleError::OracleIndexOutOfRange { .. }
            | OracleError::InvalidAssignment(_)
            | OracleError::CrankEmpty
            | OracleError::InvalidAggregatorRound { .. }
            | OracleError::StaleFeed { .. }
            | OracleError::AggregatorConfig { .. } => ErrorKind::ProtocolPrecondition,
            OracleError::UnknownAccount(_)
            | OracleError::UnexpectedAccountKind { .. }
            | OracleError::Deserialize(_)
            | OracleError::Library(_) => ErrorKind::Codec,
        }
    }
}

impl From<std::io::Error> for OracleError {
    fn from(err: std::io::Error) -> Self {
        OracleError::Deserialize(err.to_string())
    }
}
