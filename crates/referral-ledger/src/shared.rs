use std::sync::Arc;

use parking_lot::Mutex;
use value_ledger::{AccountId, Amount, ValueTransfer};

use crate::{
    error::RewardError,
    registry::Referral,
    service::{RewardLedger, RewardLedgerState},
};

/// Cloneable handle that serializes every call on one [`RewardLedger`].
///
/// Each method holds the lock for the whole operation, so no two calls
/// interleave: a reward's payout and its status change are one critical
/// section, and two triggers for the same referral cannot both pay.
pub struct SharedRewardLedger<T> {
    inner: Arc<Mutex<RewardLedger<T>>>,
}

impl<T> Clone for SharedRewardLedger<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ValueTransfer> SharedRewardLedger<T> {
    pub fn new(ledger: RewardLedger<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn register_referral(&self, caller: &AccountId, referrer: &AccountId) -> Result<(), RewardError> {
        self.inner.lock().register_referral(caller, referrer)
    }

    pub fn trigger_reward(
        &self,
        caller: &AccountId,
        referred: &AccountId,
        amount: Amount,
    ) -> Result<AccountId, RewardError> {
        self.inner.lock().trigger_reward(caller, referred, amount)
    }

    pub fn set_paused(&self, caller: &AccountId, paused: bool) -> Result<(), RewardError> {
        self.inner.lock().set_paused(caller, paused)
    }

    pub fn fund_pool(&self, from: &AccountId, amount: Amount) -> Result<Amount, RewardError> {
        self.inner.lock().fund_pool(from, amount)
    }

    pub fn external_transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), RewardError> {
        self.inner.lock().external_transfer(from, to, amount)
    }

    pub fn get_referral(&self, referred: &AccountId) -> Referral {
        self.inner.lock().get_referral(referred)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().is_paused()
    }

    pub fn pool_balance(&self) -> Amount {
        self.inner.lock().pool_balance()
    }

    pub fn state(&self) -> RewardLedgerState {
        self.inner.lock().state()
    }

    /// Run `f` with exclusive access, for reads that must see one consistent view.
    pub fn with<R>(&self, f: impl FnOnce(&mut RewardLedger<T>) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    /// Recover the ledger once every other handle has been dropped.
    pub fn try_unwrap(self) -> Result<RewardLedger<T>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
