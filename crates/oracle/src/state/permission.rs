use anchor_lang::prelude::*;

use super::{AccountKind, AccountLayout};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SwitchboardPermission {
    PermitOracleHeartbeat = 1 << 0,
    PermitOracleQueueUsage = 1 << 1,
    PermitVrfRequests = 1 << 2,
}

/// Grant issued by `granter` (a queue) to `grantee` (a feed or oracle).
#[derive(Clone, Copy, Debug, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct PermissionAccountData {
    pub authority: Pubkey,
    pub permissions: u32,
    pub granter: Pubkey,
    pub grantee: Pubkey,
    pub expiration: i64,
    pub _ebuf: [u8; 256],
}

impl Default for PermissionAccountData {
    fn default() -> Self {
        Self {
            authority: Pubkey::default(),
            permissions: 0,
            granter: Pubkey::default(),
            grantee: Pubkey::default(),
            expiration: 0,
            _ebuf: [0; 256],
        }
    }
}

impl AccountLayout for PermissionAccountData {
    const KIND: AccountKind = AccountKind::Permission;
}

impl PermissionAccountData {
    pub fn has(&self, permission: SwitchboardPermission) -> bool {
        self.permissions & permission as u32 != 0
    }
}
