pub mod constants;
pub mod crank;
pub mod errors;
pub mod feed;
pub mod history;
pub mod instructions;
pub mod pda;
pub mod round;
pub mod state;

pub use errors::{ErrorKind, OracleError, OracleResult};

pub mod prelude {
    pub use crate::constants::*;
    pub use crate::crank::{CrankContext, CrankScheduler};
    pub use crate::errors::{ErrorKind, OracleError, OracleResult};
    pub use crate::feed::FeedConfig;
    pub use crate::history::HistoryBuffer;
    pub use crate::pda::FeedCompanions;
    pub use crate::round::{
        ConfirmedRound, OracleResponse, RoundAction, RoundConsensus, RoundEvent, RoundPhase,
    };
    pub use crate::state::{AccountKind, AccountLayout, LedgerAccount};

    pub use library::codec::{CrankRow, HistorySample, QueueMember};
    pub use library::Decimal;
}
