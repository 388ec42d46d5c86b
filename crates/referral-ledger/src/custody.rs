use tracing::{debug, info};
use value_ledger::{AccountId, Amount, ValueTransfer};

use crate::error::RewardError;

/// Pool accounting for value held at the ledger's own address.
///
/// The pool is never cached: every read goes to [`ValueTransfer::balance_of`],
/// so it cannot drift from what the value type actually holds.
#[derive(Debug)]
pub struct Custody<T> {
    address: AccountId,
    service: T,
}

impl<T: ValueTransfer> Custody<T> {
    pub fn new(address: AccountId, service: T) -> Self {
        Self { address, service }
    }

    pub fn address(&self) -> &AccountId {
        &self.address
    }

    pub fn pool_balance(&self) -> Amount {
        self.service.balance_of(&self.address)
    }

    /// Inbound funding: `from` transfers `amount` to the ledger's address.
    pub fn fund(&mut self, from: &AccountId, amount: Amount) -> Result<Amount, RewardError> {
        self.service.transfer(&self.address, amount, from)?;
        let pool = self.pool_balance();
        info!(%from, %amount, %pool, "reward pool funded");
        Ok(pool)
    }

    /// Fails with `InsufficientPool` unless the pool covers `amount`.
    pub fn ensure_covered(&self, amount: Amount) -> Result<(), RewardError> {
        let available = self.pool_balance();
        debug!(%amount, %available, "checking reward pool");
        if amount > available {
            return Err(RewardError::InsufficientPool {
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    /// Sole outbound path for custodied value.
    pub fn pay_out(&mut self, to: &AccountId, amount: Amount) -> Result<(), RewardError> {
        self.ensure_covered(amount)?;
        self.service.transfer(to, amount, &self.address)?;
        Ok(())
    }

    pub fn service(&self) -> &T {
        &self.service
    }

    pub(crate) fn service_mut(&mut self) -> &mut T {
        &mut self.service
    }

    pub fn into_service(self) -> T {
        self.service
    }
}
