use serde::{Deserialize, Serialize};
use value_ledger::AccountId;

use crate::error::{RewardError, Role, StateError};

/// Owner and confirmer, fixed at construction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessControl {
    owner: AccountId,
    confirmer: AccountId,
}

impl AccessControl {
    pub fn new(owner: AccountId, confirmer: AccountId) -> Result<Self, StateError> {
        if owner.is_empty() || confirmer.is_empty() {
            return Err(StateError::EmptyRole);
        }
        Ok(Self { owner, confirmer })
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn confirmer(&self) -> &AccountId {
        &self.confirmer
    }

    pub fn ensure_owner(&self, caller: &AccountId) -> Result<(), RewardError> {
        self.ensure(caller, Role::Owner)
    }

    pub fn ensure_confirmer(&self, caller: &AccountId) -> Result<(), RewardError> {
        self.ensure(caller, Role::Confirmer)
    }

    fn ensure(&self, caller: &AccountId, role: Role) -> Result<(), RewardError> {
        let expected = match role {
            Role::Owner => &self.owner,
            Role::Confirmer => &self.confirmer,
        };
        if caller != expected {
            return Err(RewardError::NotAuthorized {
                caller: caller.clone(),
                role,
            });
        }
        Ok(())
    }
}
