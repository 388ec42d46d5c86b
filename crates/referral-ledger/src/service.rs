use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use value_ledger::{AccountId, Amount, ValueTransfer};

use crate::{
    access::AccessControl,
    custody::Custody,
    error::{RewardError, StateError},
    events::{EventLog, LedgerEvent},
    pause::CircuitBreaker,
    registry::{Referral, ReferralRegistry},
};

/// Everything the ledger owns apart from the value itself, which lives in the
/// external value type and is read back through [`ValueTransfer`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardLedgerState {
    pub address: AccountId,
    pub owner: AccountId,
    pub confirmer: AccountId,
    pub paused: bool,
    pub referrals: ReferralRegistry,
    pub events: EventLog,
}

/// The referral reward ledger.
///
/// Every mutating call validates first and commits last. A call that returns
/// an error has emitted no event and changed no state. Callers that share one
/// ledger between threads go through [`crate::SharedRewardLedger`].
#[derive(Debug)]
pub struct RewardLedger<T> {
    access: AccessControl,
    breaker: CircuitBreaker,
    registry: ReferralRegistry,
    custody: Custody<T>,
    events: EventLog,
}

impl<T: ValueTransfer> RewardLedger<T> {
    pub fn new(
        owner: AccountId,
        confirmer: AccountId,
        address: AccountId,
        service: T,
    ) -> Result<Self, StateError> {
        if address.is_empty() {
            return Err(StateError::EmptyAddress);
        }
        let access = AccessControl::new(owner, confirmer)?;
        info!(
            owner = %access.owner(),
            confirmer = %access.confirmer(),
            %address,
            "reward ledger created"
        );
        Ok(Self {
            access,
            breaker: CircuitBreaker::default(),
            registry: ReferralRegistry::new(),
            custody: Custody::new(address, service),
            events: EventLog::new(),
        })
    }

    pub fn from_state(state: RewardLedgerState, service: T) -> Result<Self, StateError> {
        if state.address.is_empty() {
            return Err(StateError::EmptyAddress);
        }
        let access = AccessControl::new(state.owner, state.confirmer)?;
        state.referrals.validate()?;
        let mut breaker = CircuitBreaker::default();
        breaker.set(state.paused);
        Ok(Self {
            access,
            breaker,
            registry: state.referrals,
            custody: Custody::new(state.address, service),
            events: state.events,
        })
    }

    pub fn state(&self) -> RewardLedgerState {
        RewardLedgerState {
            address: self.custody.address().clone(),
            owner: self.access.owner().clone(),
            confirmer: self.access.confirmer().clone(),
            paused: self.breaker.is_paused(),
            referrals: self.registry.clone(),
            events: self.events.clone(),
        }
    }

    /// `caller` is the referred identity registering under `referrer`.
    pub fn register_referral(
        &mut self,
        caller: &AccountId,
        referrer: &AccountId,
    ) -> Result<(), RewardError> {
        self.try_register(caller, referrer).map_err(|err| {
            warn!(%caller, %referrer, %err, "registration rejected");
            err
        })
    }

    fn try_register(&mut self, caller: &AccountId, referrer: &AccountId) -> Result<(), RewardError> {
        self.breaker.ensure_active()?;
        if referrer.is_empty() || referrer == caller {
            return Err(RewardError::InvalidReferrer {
                referred: caller.clone(),
                referrer: referrer.clone(),
            });
        }
        self.registry.register(caller, referrer)?;
        self.events.emit(LedgerEvent::ReferralRegistered {
            referrer: referrer.clone(),
            referred: caller.clone(),
        });
        info!(referred = %caller, %referrer, "referral registered");
        Ok(())
    }

    /// Pay `amount` to the referrer of `referred` and mark it rewarded.
    ///
    /// Check order: paused, confirmer, amount, referral status, pool, then the
    /// external transfer. The status only changes after the transfer succeeded,
    /// and nothing fallible runs after it.
    pub fn trigger_reward(
        &mut self,
        caller: &AccountId,
        referred: &AccountId,
        amount: Amount,
    ) -> Result<AccountId, RewardError> {
        self.try_trigger(caller, referred, amount).map_err(|err| {
            warn!(%caller, %referred, %amount, %err, "reward trigger rejected");
            err
        })
    }

    fn try_trigger(
        &mut self,
        caller: &AccountId,
        referred: &AccountId,
        amount: Amount,
    ) -> Result<AccountId, RewardError> {
        self.breaker.ensure_active()?;
        self.access.ensure_confirmer(caller)?;
        if amount == 0 {
            return Err(RewardError::ZeroReward);
        }
        let referrer = self.registry.ensure_rewardable(referred)?;
        self.custody.pay_out(&referrer, amount)?;

        self.registry.complete_reward(referred);
        self.events.emit(LedgerEvent::RewardTriggered {
            referred: referred.clone(),
            referrer: referrer.clone(),
            amount,
        });
        info!(
            %referred,
            %referrer,
            %amount,
            pool = %self.custody.pool_balance(),
            "reward paid"
        );
        Ok(referrer)
    }

    /// Owner only. Not itself gated by the breaker, so the owner can unpause.
    pub fn set_paused(&mut self, caller: &AccountId, paused: bool) -> Result<(), RewardError> {
        if let Err(err) = self.access.ensure_owner(caller) {
            warn!(%caller, %paused, %err, "pause change rejected");
            return Err(err);
        }
        self.breaker.set(paused);
        self.events.emit(LedgerEvent::PausedSet { paused });
        info!(%paused, "circuit breaker set");
        Ok(())
    }

    /// Inbound transfer from `from` to the ledger's address; returns the new pool.
    pub fn fund_pool(&mut self, from: &AccountId, amount: Amount) -> Result<Amount, RewardError> {
        self.custody.fund(from, amount).map_err(|err| {
            warn!(%from, %amount, %err, "funding rejected");
            err
        })
    }

    pub fn get_referral(&self, referred: &AccountId) -> Referral {
        self.registry.get(referred)
    }

    pub fn referrals(&self) -> &ReferralRegistry {
        &self.registry
    }

    pub fn is_paused(&self) -> bool {
        self.breaker.is_paused()
    }

    pub fn pool_balance(&self) -> Amount {
        self.custody.pool_balance()
    }

    pub fn owner(&self) -> &AccountId {
        self.access.owner()
    }

    pub fn confirmer(&self) -> &AccountId {
        self.access.confirmer()
    }

    pub fn address(&self) -> &AccountId {
        self.custody.address()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn value_service(&self) -> &T {
        self.custody.service()
    }

    /// Transfer between outside accounts through the same value type.
    /// Refuses to move anything out of the ledger's own address.
    pub fn external_transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), RewardError> {
        if from == self.custody.address() {
            warn!(%from, %to, %amount, "withdrawal from custody refused");
            return Err(RewardError::CustodyLocked {
                account: from.clone(),
            });
        }
        self.custody
            .service_mut()
            .transfer(to, amount, from)
            .map_err(|err| {
                warn!(%from, %to, %amount, %err, "external transfer rejected");
                RewardError::from(err)
            })
    }

    pub fn into_parts(self) -> (RewardLedgerState, T) {
        let state = self.state();
        (state, self.custody.into_service())
    }
}

#[cfg(test)]
mod tests {
    use value_ledger::{TokenLedger, TransferError};

    use super::*;
    use crate::{error::Role, registry::ReferralStatus};

    fn id(name: &str) -> AccountId {
        name.to_string()
    }

    fn ledger() -> RewardLedger<TokenLedger> {
        let token = TokenLedger::with_initial_supply(&id("owner"), 1_000);
        let mut ledger =
            RewardLedger::new(id("owner"), id("confirmer"), id("ledger"), token).unwrap();
        ledger.fund_pool(&id("owner"), 250).unwrap();
        ledger
    }

    #[test]
    fn self_referral_is_rejected() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.register_referral(&id("r1"), &id("r1")),
            Err(RewardError::InvalidReferrer {
                referred: id("r1"),
                referrer: id("r1"),
            })
        );
        assert!(ledger.register_referral(&id("r1"), &id("")).is_err());
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn paused_check_precedes_authorization() {
        let mut ledger = ledger();
        ledger.register_referral(&id("r1"), &id("r2")).unwrap();
        ledger.set_paused(&id("owner"), true).unwrap();
        assert_eq!(
            ledger.trigger_reward(&id("mallory"), &id("r1"), 100),
            Err(RewardError::Paused)
        );
    }

    #[test]
    fn authorization_precedes_lifecycle_checks() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.trigger_reward(&id("mallory"), &id("ghost"), 100),
            Err(RewardError::NotAuthorized {
                caller: id("mallory"),
                role: Role::Confirmer,
            })
        );
    }

    #[test]
    fn zero_reward_keeps_slot() {
        let mut ledger = ledger();
        ledger.register_referral(&id("r1"), &id("r2")).unwrap();
        assert_eq!(
            ledger.trigger_reward(&id("confirmer"), &id("r1"), 0),
            Err(RewardError::ZeroReward)
        );
        assert_eq!(ledger.get_referral(&id("r1")).status, ReferralStatus::Registered);
    }

    #[test]
    fn only_owner_toggles_pause() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.set_paused(&id("confirmer"), true),
            Err(RewardError::NotAuthorized {
                caller: id("confirmer"),
                role: Role::Owner,
            })
        );
        assert!(!ledger.is_paused());
        ledger.set_paused(&id("owner"), true).unwrap();
        ledger.set_paused(&id("owner"), false).unwrap();
        assert!(!ledger.is_paused());
        assert_eq!(ledger.events().len(), 2);
    }

    #[test]
    fn funding_ignores_breaker() {
        let mut ledger = ledger();
        ledger.set_paused(&id("owner"), true).unwrap();
        assert_eq!(ledger.fund_pool(&id("owner"), 50).unwrap(), 300);
    }

    #[test]
    fn failed_funding_is_reported() {
        let mut ledger = ledger();
        let err = ledger.fund_pool(&id("nobody"), 1).unwrap_err();
        assert!(matches!(
            err,
            RewardError::ExternalTransferFailure(TransferError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.pool_balance(), 250);
    }

    #[test]
    fn state_round_trips() {
        let mut ledger = ledger();
        ledger.register_referral(&id("r1"), &id("r2")).unwrap();
        ledger.trigger_reward(&id("confirmer"), &id("r1"), 100).unwrap();
        ledger.set_paused(&id("owner"), true).unwrap();

        let (state, token) = ledger.into_parts();
        let json = serde_json::to_string(&state).unwrap();
        let decoded: RewardLedgerState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, state);

        let restored = RewardLedger::from_state(decoded, token).unwrap();
        assert!(restored.is_paused());
        assert_eq!(restored.pool_balance(), 150);
        assert_eq!(restored.get_referral(&id("r1")).status, ReferralStatus::Rewarded);
        let kinds: Vec<_> = restored
            .events()
            .entries()
            .iter()
            .map(|record| match &record.event {
                LedgerEvent::ReferralRegistered { .. } => "registered",
                LedgerEvent::RewardTriggered { .. } => "rewarded",
                LedgerEvent::PausedSet { .. } => "paused",
            })
            .collect();
        // funding emits nothing of its own
        assert_eq!(kinds, ["registered", "rewarded", "paused"]);
    }

    #[test]
    fn custodied_funds_cannot_be_moved_directly() {
        let mut ledger = ledger();
        ledger.register_referral(&id("r1"), &id("r2")).unwrap();
        assert_eq!(
            ledger.external_transfer(&id("ledger"), &id("mallory"), 250),
            Err(RewardError::CustodyLocked {
                account: id("ledger")
            })
        );
        assert_eq!(ledger.pool_balance(), 250);
        assert_eq!(ledger.value_service().balance_of(&id("mallory")), 0);
        assert_eq!(ledger.events().len(), 1);
        ledger.trigger_reward(&id("confirmer"), &id("r1"), 250).unwrap();
    }

    #[test]
    fn outside_accounts_transfer_freely() {
        let mut ledger = ledger();
        ledger.external_transfer(&id("owner"), &id("r1"), 10).unwrap();
        assert_eq!(ledger.value_service().balance_of(&id("r1")), 10);
        assert!(matches!(
            ledger.external_transfer(&id("r1"), &id("r2"), 11),
            Err(RewardError::ExternalTransferFailure(
                TransferError::InsufficientBalance { .. }
            ))
        ));
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn corrupt_state_is_rejected() {
        let mut state = ledger().state();
        state.owner.clear();
        assert_eq!(
            RewardLedger::from_state(state, TokenLedger::new()).err(),
            Some(StateError::EmptyRole)
        );
    }
}
