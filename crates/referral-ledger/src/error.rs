use std::fmt;

use thiserror::Error;
use value_ledger::{AccountId, Amount, TransferError};

/// Identity-equality roles checked at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Confirmer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => f.write_str("owner"),
            Role::Confirmer => f.write_str("confirmer"),
        }
    }
}

/// Rejection of a single ledger call. Every variant leaves state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewardError {
    /// Circuit breaker engaged.
    #[error("Contract is paused!")]
    Paused,

    #[error("{}", not_authorized_message(.role))]
    NotAuthorized { caller: AccountId, role: Role },

    #[error("referral {referred} is already registered")]
    AlreadyRegistered { referred: AccountId },

    #[error("referral {referred} is not registered")]
    NotRegistered { referred: AccountId },

    #[error("referral {referred} was already rewarded")]
    AlreadyRewarded { referred: AccountId },

    #[error("invalid referrer {referrer:?} for {referred}")]
    InvalidReferrer {
        referred: AccountId,
        referrer: AccountId,
    },

    #[error("reward amount must be greater than zero")]
    ZeroReward,

    #[error("insufficient reward pool: requested {requested}, available {available}")]
    InsufficientPool { requested: Amount, available: Amount },

    /// Value held at the ledger's address moves only through a reward payout.
    #[error("funds at {account} are custodied and leave only through a reward trigger")]
    CustodyLocked { account: AccountId },

    #[error("value transfer failed: {0}")]
    ExternalTransferFailure(#[from] TransferError),
}

fn not_authorized_message(role: &Role) -> &'static str {
    match role {
        Role::Confirmer => "Reward not triggered by Confirmer!",
        Role::Owner => "Caller is not the owner!",
    }
}

/// A persisted ledger state that violates the referral lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("referral {referred} has status {status} but no referrer")]
    MissingReferrer { referred: AccountId, status: String },

    #[error("owner and confirmer must be non-empty identities")]
    EmptyRole,

    #[error("ledger address must be non-empty")]
    EmptyAddress,
}
