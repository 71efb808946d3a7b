//! Ledger account layouts.
//!
//! Every account starts with an 8-byte tag naming its kind, followed by the
//! packed little-endian body. Bodies are fixed-size, so borsh reads them as is.

mod aggregator;
mod crank;
mod lease;
mod permission;
mod queue;

pub use aggregator::*;
pub use crank::*;
pub use lease::*;
pub use permission::*;
pub use queue::*;

use anchor_lang::{AnchorDeserialize, AnchorSerialize};
use library::codec::{strip_discriminator, ByteReader, BUFFER_DISCRIMINATOR, DISCRIMINATOR_SIZE};

use crate::errors::{OracleError, OracleResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccountKind {
    Aggregator,
    Crank,
    OracleQueue,
    Oracle,
    Lease,
    Permission,
    Job,
    ProgramState,
    Buffer,
}

impl AccountKind {
    pub const ALL: [AccountKind; 9] = [
        AccountKind::Aggregator,
        AccountKind::Crank,
        AccountKind::OracleQueue,
        AccountKind::Oracle,
        AccountKind::Lease,
        AccountKind::Permission,
        AccountKind::Job,
        AccountKind::ProgramState,
        AccountKind::Buffer,
    ];

    pub const fn discriminator(self) -> [u8; DISCRIMINATOR_SIZE] {
        match self {
            AccountKind::Aggregator => [217, 230, 65, 101, 201, 162, 27, 125],
            AccountKind::Crank => [111, 81, 146, 73, 172, 180, 134, 209],
            AccountKind::OracleQueue => [164, 207, 200, 51, 199, 113, 35, 109],
            AccountKind::Oracle => [128, 30, 16, 241, 170, 73, 55, 54],
            AccountKind::Lease => [55, 254, 208, 251, 164, 44, 150, 50],
            AccountKind::Permission => [77, 37, 177, 164, 38, 39, 34, 109],
            AccountKind::Job => [124, 69, 101, 195, 229, 218, 144, 63],
            AccountKind::ProgramState => [159, 42, 192, 191, 139, 62, 168, 28],
            AccountKind::Buffer => BUFFER_DISCRIMINATOR,
        }
    }

    pub fn from_discriminator(tag: &[u8; DISCRIMINATOR_SIZE]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| &kind.discriminator() == tag)
    }

    pub const fn name(self) -> &'static str {
        match self {
            AccountKind::Aggregator => "AggregatorAccountData",
            AccountKind::Crank => "CrankAccountData",
            AccountKind::OracleQueue => "OracleQueueAccountData",
            AccountKind::Oracle => "OracleAccountData",
            AccountKind::Lease => "LeaseAccountData",
            AccountKind::Permission => "PermissionAccountData",
            AccountKind::Job => "JobAccountData",
            AccountKind::ProgramState => "SbState",
            AccountKind::Buffer => "Buffer",
        }
    }
}

/// A borsh-encoded account body behind a known tag.
pub trait AccountLayout: AnchorSerialize + AnchorDeserialize {
    const KIND: AccountKind;

    fn decode(data: &[u8]) -> OracleResult<Self> {
        let found: [u8; DISCRIMINATOR_SIZE] = ByteReader::new(data).read_bytes()?;
        if found != Self::KIND.discriminator() {
            let found = AccountKind::from_discriminator(&found)
                .map(AccountKind::name)
                .unwrap_or("unknown account");
            return Err(OracleError::UnexpectedAccountKind {
                expected: Self::KIND.name(),
                found,
            });
        }

        let mut body = strip_discriminator(data, &Self::KIND.discriminator())?;
        Ok(Self::deserialize(&mut body)?)
    }

    fn encode(&self) -> OracleResult<Vec<u8>> {
        let mut out = Self::KIND.discriminator().to_vec();
        self.serialize(&mut out)?;
        Ok(out)
    }
}

/// Closed set of decoded accounts, dispatched once on the leading tag.
#[derive(Clone, Debug)]
pub enum LedgerAccount {
    Aggregator(Box<AggregatorAccountData>),
    Crank(Box<CrankAccountData>),
    OracleQueue(Box<OracleQueueAccountData>),
    Lease(Box<LeaseAccountData>),
    Permission(PermissionAccountData),
    /// Raw buffer account; the owner decides which row type it carries.
    Buffer(Vec<u8>),
    /// Recognised but not decoded by this layer.
    Other(AccountKind),
}

impl LedgerAccount {
    pub fn decode(data: &[u8]) -> OracleResult<Self> {
        let tag: [u8; DISCRIMINATOR_SIZE] = ByteReader::new(data).read_bytes()?;
        let kind = AccountKind::from_discriminator(&tag).ok_or(OracleError::UnknownAccount(tag))?;

        Ok(match kind {
            AccountKind::Aggregator => {
                LedgerAccount::Aggregator(Box::new(AggregatorAccountData::decode(data)?))
            }
            AccountKind::Crank => LedgerAccount::Crank(Box::new(CrankAccountData::decode(data)?)),
            AccountKind::OracleQueue => {
                LedgerAccount::OracleQueue(Box::new(OracleQueueAccountData::decode(data)?))
            }
            AccountKind::Lease => LedgerAccount::Lease(Box::new(LeaseAccountData::decode(data)?)),
            AccountKind::Permission => {
                LedgerAccount::Permission(PermissionAccountData::decode(data)?)
            }
            AccountKind::Buffer => LedgerAccount::Buffer(data.to_vec()),
            other => LedgerAccount::Other(other),
        })
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            LedgerAccount::Aggregator(_) => AccountKind::Aggregator,
            LedgerAccount::Crank(_) => AccountKind::Crank,
            LedgerAccount::OracleQueue(_) => AccountKind::OracleQueue,
            LedgerAccount::Lease(_) => AccountKind::Lease,
            LedgerAccount::Permission(_) => AccountKind::Permission,
            LedgerAccount::Buffer(_) => AccountKind::Buffer,
            LedgerAccount::Other(kind) => *kind,
        }
    }
}
