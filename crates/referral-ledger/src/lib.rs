//! Referral reward ledger.
//!
//! Records who referred whom, lets a single confirmer identity pay each
//! referrer exactly once, and custodies the pool those rewards come from.
//!
//! * [`registry`]: one [`Referral`] per referred identity, moving
//!   `Unregistered -> Registered -> Rewarded` and never back.
//! * [`access`]: owner and confirmer, compared by identity at call time.
//! * [`custody`]: pool accounting read live from the external value type.
//! * [`pause`]: the owner's circuit breaker.
//! * [`events`]: append-only log of committed mutations.
//!
//! [`RewardLedger`] ties these together with check-then-commit ordering;
//! [`SharedRewardLedger`] serializes it for concurrent callers.

pub mod access;
pub mod custody;
pub mod events;
pub mod pause;
pub mod registry;

mod error;
mod service;
mod shared;

pub use error::{RewardError, Role, StateError};
pub use events::{EventLog, EventRecord, LedgerEvent};
pub use registry::{Referral, ReferralRegistry, ReferralStatus};
pub use service::{RewardLedger, RewardLedgerState};
pub use shared::SharedRewardLedger;

pub use value_ledger::{AccountId, Amount, ValueTransfer};
