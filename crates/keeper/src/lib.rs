pub mod builder;
pub mod config;
pub mod errors;
pub mod keeper;
pub mod ledger;
pub mod memory;
pub mod rpc;
pub mod transactions;

pub mod prelude {
    pub use crate::builder::KeeperBuilder;
    pub use crate::config::{oracle_rpc_url, KeeperConfig};
    pub use crate::errors::*;
    pub use crate::keeper::{CrankKeeper, CrankSnapshot, TickReport};
    pub use crate::ledger::{AccountUpdate, Ledger};
    pub use crate::memory::MemoryLedger;
    pub use crate::rpc::RpcLedger;
    pub use crate::transactions::{pack, pack_instructions, OperationBatch};

    pub use oracle::prelude::*;

    pub use solana_sdk::{
        pubkey::Pubkey,
        signature::{Keypair, Signer},
    };
}

pub use builder::KeeperBuilder;
pub use config::{oracle_rpc_url, KeeperConfig};
pub use errors::{KeeperError, Result};
pub use keeper::{CrankKeeper, TickReport};
pub use ledger::{AccountUpdate, Ledger};
pub use memory::MemoryLedger;
pub use rpc::RpcLedger;
