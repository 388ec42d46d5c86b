use thiserror::Error;

use crate::{AccountId, Amount};

/// Why the value type refused a transfer. Nothing moves when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        account: AccountId,
        available: Amount,
        requested: Amount,
    },

    /// The recipient's receive hook refused the deposit.
    #[error("recipient {account} does not accept deposits")]
    RecipientRejected { account: AccountId },

    #[error("balance overflow in account {account}")]
    Overflow { account: AccountId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("merkle root mismatch: expected {expected}, computed {computed}")]
    RootMismatch { expected: String, computed: String },

    #[error("balances sum to {held}, total supply says {total_supply}")]
    SupplyMismatch { held: Amount, total_supply: Amount },
}
