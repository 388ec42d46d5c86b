use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{SnapshotError, TransferError},
    merkle::balances_root,
    AccountId, Amount, ValueTransfer,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenEvent {
    Minted {
        to: AccountId,
        #[serde(with = "crate::amount_serde")]
        amount: Amount,
    },
    Transferred {
        from: AccountId,
        to: AccountId,
        #[serde(with = "crate::amount_serde")]
        amount: Amount,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenLedgerSnapshot {
    pub balances: BTreeMap<AccountId, Amount>,
    #[serde(default)]
    pub rejecting: BTreeSet<AccountId>,
    #[serde(with = "crate::amount_serde")]
    pub total_supply: Amount,
    #[serde(default)]
    pub events: Vec<TokenEvent>,
    #[serde(with = "hex_root")]
    pub merkle_root: [u8; 32],
}

/// In-memory fungible token ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: BTreeMap<AccountId, Amount>,
    rejecting: BTreeSet<AccountId>,
    total_supply: Amount,
    events: Vec<TokenEvent>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a token whose entire supply is held by `holder`.
    pub fn with_initial_supply(holder: &AccountId, supply: Amount) -> Self {
        let mut ledger = Self::new();
        // a fresh ledger cannot overflow on its first mint
        ledger.balances.insert(holder.clone(), supply);
        ledger.total_supply = supply;
        ledger.events.push(TokenEvent::Minted {
            to: holder.clone(),
            amount: supply,
        });
        ledger
    }

    pub fn mint(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let total_supply =
            self.total_supply
                .checked_add(amount)
                .ok_or_else(|| TransferError::Overflow {
                    account: to.clone(),
                })?;
        self.credit_account(to, amount)?;
        self.total_supply = total_supply;
        self.events.push(TokenEvent::Minted {
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter().filter(|(_, amount)| **amount > 0)
    }

    pub fn events(&self) -> &[TokenEvent] {
        &self.events
    }

    /// Make `account` refuse every inbound transfer from now on.
    pub fn reject_deposits(&mut self, account: &AccountId) {
        self.rejecting.insert(account.clone());
    }

    pub fn accept_deposits(&mut self, account: &AccountId) {
        self.rejecting.remove(account);
    }

    pub fn accepts_deposits(&self, account: &AccountId) -> bool {
        !self.rejecting.contains(account)
    }

    fn credit_account(&mut self, account: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let balance = self.balances.entry(account.clone()).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow {
                account: account.clone(),
            })?;
        Ok(())
    }

    fn debit_account(&mut self, account: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: account.clone(),
                available,
                requested: amount,
            });
        }
        if let Some(balance) = self.balances.get_mut(account) {
            *balance -= amount;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> TokenLedgerSnapshot {
        TokenLedgerSnapshot {
            balances: self.balances.clone(),
            rejecting: self.rejecting.clone(),
            total_supply: self.total_supply,
            events: self.events.clone(),
            merkle_root: balances_root(&self.balances, &self.rejecting),
        }
    }

    pub fn restore(snapshot: TokenLedgerSnapshot) -> Result<Self, SnapshotError> {
        let computed = balances_root(&snapshot.balances, &snapshot.rejecting);
        if computed != snapshot.merkle_root {
            return Err(SnapshotError::RootMismatch {
                expected: hex::encode(snapshot.merkle_root),
                computed: hex::encode(computed),
            });
        }
        let held = snapshot
            .balances
            .values()
            .try_fold(0u128, |acc, amount| acc.checked_add(*amount));
        if held != Some(snapshot.total_supply) {
            return Err(SnapshotError::SupplyMismatch {
                held: held.unwrap_or(Amount::MAX),
                total_supply: snapshot.total_supply,
            });
        }
        Ok(Self {
            balances: snapshot.balances,
            rejecting: snapshot.rejecting,
            total_supply: snapshot.total_supply,
            events: snapshot.events,
        })
    }
}

impl ValueTransfer for TokenLedger {
    fn transfer(
        &mut self,
        to: &AccountId,
        amount: Amount,
        from: &AccountId,
    ) -> Result<(), TransferError> {
        if !self.accepts_deposits(to) {
            warn!(%from, %to, %amount, "transfer refused by recipient");
            return Err(TransferError::RecipientRejected {
                account: to.clone(),
            });
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: from.clone(),
                available,
                requested: amount,
            });
        }
        if from != to {
            // overflow is checked before either side moves
            if self.balance_of(to).checked_add(amount).is_none() {
                return Err(TransferError::Overflow {
                    account: to.clone(),
                });
            }
            self.debit_account(from, amount)?;
            self.credit_account(to, amount)?;
        }
        self.events.push(TokenEvent::Transferred {
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        debug!(%from, %to, %amount, "transfer applied");
        Ok(())
    }

    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }
}

mod hex_root {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("merkle root must be 32 bytes"))
    }
}
