//! Value transfer primitives for the referral reward stack.
//!
//! The reward ledger never touches balances directly. Everything it needs
//! from the fungible value type is captured by [`ValueTransfer`]:
//!
//! * [`ValueTransfer::transfer`]: move `amount` from one account to another,
//!   all-or-nothing.
//! * [`ValueTransfer::balance_of`]: the ground-truth balance of an account.
//!
//! [`TokenLedger`] is the in-memory implementation used by the CLI and the
//! tests. It mints its whole initial supply to the deploying identity and can
//! model recipients whose receive hook refuses inbound value.

mod error;
mod ledger;
mod merkle;

pub use error::{SnapshotError, TransferError};
pub use ledger::{TokenEvent, TokenLedger, TokenLedgerSnapshot};
pub use merkle::balances_root;

/// `#[serde(with = "value_ledger::amount_serde")]` renders an [`Amount`] as a
/// decimal string; JSON consumers cannot hold 18-decimal amounts as numbers.
pub mod amount_serde {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::Amount;

    pub fn serialize<S>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}

pub type AccountId = String;
pub type Amount = u128;

/// Decimal places of the value type. Amounts are always in the smallest unit.
pub const DECIMALS: u32 = 18;

/// Scale a whole-token count to base units (`tokens * 10^18`).
pub fn to_base_units(tokens: u64) -> Amount {
    Amount::from(tokens) * 10u128.pow(DECIMALS)
}

/// Boundary contract toward the external fungible value type.
pub trait ValueTransfer {
    /// Move `amount` from `from` to `to`. On error nothing has moved.
    fn transfer(&mut self, to: &AccountId, amount: Amount, from: &AccountId)
        -> Result<(), TransferError>;

    /// Balance currently held by `account`; unknown accounts hold zero.
    fn balance_of(&self, account: &AccountId) -> Amount;
}

impl<T: ValueTransfer + ?Sized> ValueTransfer for Box<T> {
    fn transfer(
        &mut self,
        to: &AccountId,
        amount: Amount,
        from: &AccountId,
    ) -> Result<(), TransferError> {
        (**self).transfer(to, amount, from)
    }

    fn balance_of(&self, account: &AccountId) -> Amount {
        (**self).balance_of(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_units_use_eighteen_decimals() {
        assert_eq!(to_base_units(0), 0);
        assert_eq!(to_base_units(1), 1_000_000_000_000_000_000);
        assert_eq!(to_base_units(250), 250 * 10u128.pow(18));
    }

    #[test]
    fn boxed_service_delegates() {
        let mut boxed: Box<dyn ValueTransfer> =
            Box::new(TokenLedger::with_initial_supply(&"owner".to_string(), 10));
        boxed
            .transfer(&"alice".to_string(), 4, &"owner".to_string())
            .unwrap();
        assert_eq!(boxed.balance_of(&"alice".to_string()), 4);
        assert_eq!(boxed.balance_of(&"owner".to_string()), 6);
    }
}
