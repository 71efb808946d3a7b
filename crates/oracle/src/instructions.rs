//! Instruction builders for the ledger program.
//!
//! Each instruction is an 8-byte selector followed by its borsh-encoded params.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use library::Decimal;

use crate::errors::OracleResult;

pub mod discriminator {
    pub const CRANK_POP: [u8; 8] = [66, 57, 216, 251, 165, 107, 128, 98];
    pub const CRANK_PUSH: [u8; 8] = [155, 175, 160, 18, 7, 147, 249, 16];
    pub const AGGREGATOR_OPEN_ROUND: [u8; 8] = [239, 69, 229, 179, 156, 246, 118, 191];
    pub const AGGREGATOR_SAVE_RESULT: [u8; 8] = [21, 67, 5, 0, 74, 168, 51, 192];
    pub const AGGREGATOR_LOCK: [u8; 8] = [228, 238, 67, 53, 69, 176, 185, 227];
    pub const AGGREGATOR_SET_HISTORY_BUFFER: [u8; 8] = [88, 49, 214, 242, 229, 44, 171, 52];
}

#[derive(Clone, Debug, Default, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct CrankPopParams {
    pub state_bump: u8,
    pub lease_bumps: Vec<u8>,
    pub permission_bumps: Vec<u8>,
    pub nonce: Option<u32>,
    pub fail_open_on_account_mismatch: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct CrankPushParams {
    pub state_bump: u8,
    pub permission_bump: u8,
    pub notifi_ref: Option<[u8; 64]>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct AggregatorOpenRoundParams {
    pub state_bump: u8,
    pub lease_bump: u8,
    pub permission_bump: u8,
    pub jitter: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct AggregatorSaveResultParams {
    pub oracle_idx: u32,
    pub error: bool,
    pub value: Decimal,
    pub jobs_checksum: [u8; 32],
    pub min_response: Decimal,
    pub max_response: Decimal,
    pub feed_permission_bump: u8,
    pub oracle_permission_bump: u8,
    pub lease_bump: u8,
    pub state_bump: u8,
}

fn instruction_data<T: AnchorSerialize>(selector: [u8; 8], params: &T) -> OracleResult<Vec<u8>> {
    let mut data = selector.to_vec();
    params.serialize(&mut data)?;
    Ok(data)
}

pub struct CrankPopAccounts {
    pub crank: Pubkey,
    pub oracle_queue: Pubkey,
    pub queue_authority: Pubkey,
    pub program_state: Pubkey,
    pub payout_wallet: Pubkey,
    pub crank_data_buffer: Pubkey,
    pub queue_data_buffer: Pubkey,
    pub mint: Pubkey,
}

/// `remaining` must already be in the order the ledger expects.
pub fn crank_pop(
    program_id: &Pubkey,
    accounts: &CrankPopAccounts,
    params: &CrankPopParams,
    remaining: &[Pubkey],
) -> OracleResult<Instruction> {
    let mut metas = vec![
        AccountMeta::new(accounts.crank, false),
        AccountMeta::new(accounts.oracle_queue, false),
        AccountMeta::new_readonly(accounts.queue_authority, false),
        AccountMeta::new_readonly(accounts.program_state, false),
        AccountMeta::new(accounts.payout_wallet, false),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new(accounts.crank_data_buffer, false),
        AccountMeta::new_readonly(accounts.queue_data_buffer, false),
        AccountMeta::new_readonly(accounts.mint, false),
    ];
    metas.extend(remaining.iter().map(|key| AccountMeta::new(*key, false)));

    Ok(Instruction {
        program_id: *program_id,
        accounts: metas,
        data: instruction_data(discriminator::CRANK_POP, params)?,
    })
}

pub struct CrankPushAccounts {
    pub crank: Pubkey,
    pub aggregator: Pubkey,
    pub oracle_queue: Pubkey,
    pub queue_authority: Pubkey,
    pub permission: Pubkey,
    pub lease: Pubkey,
    pub escrow: Pubkey,
    pub program_state: Pubkey,
    pub crank_data_buffer: Pubkey,
}

pub fn crank_push(
    program_id: &Pubkey,
    accounts: &CrankPushAccounts,
    params: &CrankPushParams,
) -> OracleResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.crank, false),
            AccountMeta::new(accounts.aggregator, false),
            AccountMeta::new(accounts.oracle_queue, false),
            AccountMeta::new_readonly(accounts.queue_authority, false),
            AccountMeta::new_readonly(accounts.permission, false),
            AccountMeta::new(accounts.lease, false),
            AccountMeta::new(accounts.escrow, false),
            AccountMeta::new_readonly(accounts.program_state, false),
            AccountMeta::new(accounts.crank_data_buffer, false),
        ],
        data: instruction_data(discriminator::CRANK_PUSH, params)?,
    })
}

pub struct AggregatorOpenRoundAccounts {
    pub aggregator: Pubkey,
    pub lease: Pubkey,
    pub oracle_queue: Pubkey,
    pub queue_authority: Pubkey,
    pub permission: Pubkey,
    pub escrow: Pubkey,
    pub program_state: Pubkey,
    pub payout_wallet: Pubkey,
    pub queue_data_buffer: Pubkey,
    pub mint: Pubkey,
}

pub fn aggregator_open_round(
    program_id: &Pubkey,
    accounts: &AggregatorOpenRoundAccounts,
    params: &AggregatorOpenRoundParams,
) -> OracleResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.aggregator, false),
            AccountMeta::new(accounts.lease, false),
            AccountMeta::new(accounts.oracle_queue, false),
            AccountMeta::new_readonly(accounts.queue_authority, false),
            AccountMeta::new(accounts.permission, false),
            AccountMeta::new(accounts.escrow, false),
            AccountMeta::new_readonly(accounts.program_state, false),
            AccountMeta::new(accounts.payout_wallet, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(accounts.queue_data_buffer, false),
            AccountMeta::new_readonly(accounts.mint, false),
        ],
        data: instruction_data(discriminator::AGGREGATOR_OPEN_ROUND, params)?,
    })
}

pub struct AggregatorSaveResultAccounts {
    pub aggregator: Pubkey,
    pub oracle: Pubkey,
    pub oracle_authority: Pubkey,
    pub oracle_queue: Pubkey,
    pub queue_authority: Pubkey,
    pub feed_permission: Pubkey,
    pub oracle_permission: Pubkey,
    pub lease: Pubkey,
    pub escrow: Pubkey,
    pub program_state: Pubkey,
    pub history_buffer: Pubkey,
    pub mint: Pubkey,
}

pub fn aggregator_save_result(
    program_id: &Pubkey,
    accounts: &AggregatorSaveResultAccounts,
    params: &AggregatorSaveResultParams,
) -> OracleResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.aggregator, false),
            AccountMeta::new(accounts.oracle, false),
            AccountMeta::new_readonly(accounts.oracle_authority, true),
            AccountMeta::new_readonly(accounts.oracle_queue, false),
            AccountMeta::new_readonly(accounts.queue_authority, false),
            AccountMeta::new(accounts.feed_permission, false),
            AccountMeta::new_readonly(accounts.oracle_permission, false),
            AccountMeta::new(accounts.lease, false),
            AccountMeta::new(accounts.escrow, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(accounts.program_state, false),
            AccountMeta::new(accounts.history_buffer, false),
            AccountMeta::new_readonly(accounts.mint, false),
        ],
        data: instruction_data(discriminator::AGGREGATOR_SAVE_RESULT, params)?,
    })
}

pub fn aggregator_lock(
    program_id: &Pubkey,
    aggregator: &Pubkey,
    authority: &Pubkey,
) -> OracleResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*aggregator, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data: discriminator::AGGREGATOR_LOCK.to_vec(),
    })
}

/// Attaches (or replaces) the history ring a feed appends confirmed results to.
pub fn aggregator_set_history_buffer(
    program_id: &Pubkey,
    aggregator: &Pubkey,
    authority: &Pubkey,
    buffer: &Pubkey,
) -> OracleResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*aggregator, false),
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*buffer, false),
        ],
        data: discriminator::AGGREGATOR_SET_HISTORY_BUFFER.to_vec(),
    })
}
