use anchor_lang::prelude::*;

pub const MAINNET_PROGRAM_ID: Pubkey = pubkey!("SW1TCH7qEPTdLsDHRgPuMQjbQxKdH2aBStViMFnt64f");
pub const DEVNET_PROGRAM_ID: Pubkey = pubkey!("2TfB33aLaneQb5TNVwyDz3jSZXS6jdW2ARw1Dgf84XCG");

pub const STATE_SEED: &[u8] = b"STATE";
pub const PERMISSION_SEED: &[u8] = b"PermissionAccountData";
pub const LEASE_SEED: &[u8] = b"LeaseAccountData";
pub const ORACLE_SEED: &[u8] = b"OracleAccountData";
pub const SLIDING_RESULT_SEED: &[u8] = b"SlidingResultAccountData";

/// Upper bound on oracles assigned to one round.
pub const MAX_BATCH_SIZE: usize = 16;
pub const MAX_JOBS: usize = 16;

pub const MIN_UPDATE_DELAY_SECONDS: u32 = 5;

/// Rows the ledger itself inspects per pop.
pub const DEFAULT_POP_LIMIT: usize = 5;
