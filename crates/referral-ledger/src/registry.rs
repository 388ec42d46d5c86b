use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use value_ledger::AccountId;

use crate::error::{RewardError, StateError};

/// Lifecycle of a referred identity. Only moves forward, one step at a time.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferralStatus {
    #[default]
    #[serde(rename = "0-unregistered")]
    Unregistered,
    #[serde(rename = "1-registered")]
    Registered,
    #[serde(rename = "2-rewarded")]
    Rewarded,
}

impl ReferralStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReferralStatus::Unregistered => "0-unregistered",
            ReferralStatus::Registered => "1-registered",
            ReferralStatus::Rewarded => "2-rewarded",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Referral {
    pub referrer: Option<AccountId>,
    pub status: ReferralStatus,
}

/// One record per referred identity. Records are never removed.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ReferralRegistry {
    records: BTreeMap<AccountId, Referral>,
}

impl ReferralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `referred`, or the unregistered default.
    pub fn get(&self, referred: &AccountId) -> Referral {
        self.records.get(referred).cloned().unwrap_or_default()
    }

    pub fn status(&self, referred: &AccountId) -> ReferralStatus {
        self.records
            .get(referred)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Referral)> {
        self.records.iter()
    }

    /// Every identity that registered with `referrer`.
    pub fn referrals_of<'a>(&'a self, referrer: &'a AccountId) -> impl Iterator<Item = &'a AccountId> {
        self.records
            .iter()
            .filter(move |(_, r)| r.referrer.as_ref() == Some(referrer))
            .map(|(referred, _)| referred)
    }

    /// Fails unless `referred` is still unregistered.
    pub fn ensure_registrable(&self, referred: &AccountId) -> Result<(), RewardError> {
        match self.status(referred) {
            ReferralStatus::Unregistered => Ok(()),
            ReferralStatus::Registered | ReferralStatus::Rewarded => {
                Err(RewardError::AlreadyRegistered {
                    referred: referred.clone(),
                })
            }
        }
    }

    /// Fails unless `referred` is registered and not yet rewarded; returns its referrer.
    pub fn ensure_rewardable(&self, referred: &AccountId) -> Result<AccountId, RewardError> {
        let record = self.get(referred);
        match (record.status, record.referrer) {
            (ReferralStatus::Registered, Some(referrer)) => Ok(referrer),
            (ReferralStatus::Rewarded, _) => Err(RewardError::AlreadyRewarded {
                referred: referred.clone(),
            }),
            _ => Err(RewardError::NotRegistered {
                referred: referred.clone(),
            }),
        }
    }

    /// Unregistered -> Registered.
    pub fn register(&mut self, referred: &AccountId, referrer: &AccountId) -> Result<(), RewardError> {
        self.ensure_registrable(referred)?;
        self.records.insert(
            referred.clone(),
            Referral {
                referrer: Some(referrer.clone()),
                status: ReferralStatus::Registered,
            },
        );
        Ok(())
    }

    /// Registered -> Rewarded.
    pub fn mark_rewarded(&mut self, referred: &AccountId) -> Result<(), RewardError> {
        self.ensure_rewardable(referred)?;
        self.complete_reward(referred);
        Ok(())
    }

    /// Status write only; callers have already run `ensure_rewardable` under
    /// the same exclusive borrow.
    pub(crate) fn complete_reward(&mut self, referred: &AccountId) {
        if let Some(record) = self.records.get_mut(referred) {
            record.status = ReferralStatus::Rewarded;
        }
    }

    /// Rejects records past `Unregistered` that have lost their referrer.
    pub fn validate(&self) -> Result<(), StateError> {
        for (referred, record) in &self.records {
            if record.status != ReferralStatus::Unregistered && record.referrer.is_none() {
                return Err(StateError::MissingReferrer {
                    referred: referred.clone(),
                    status: record.status.to_string(),
                });
            }
        }
        Ok(())
    }
}
