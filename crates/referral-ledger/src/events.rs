use serde::{Deserialize, Serialize};
use value_ledger::{AccountId, Amount};

/// Observability hook for external collaborators. The ledger never reads
/// its own events back to make a decision.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    ReferralRegistered {
        referrer: AccountId,
        referred: AccountId,
    },
    RewardTriggered {
        referred: AccountId,
        referrer: AccountId,
        #[serde(with = "value_ledger::amount_serde")]
        amount: Amount,
    },
    PausedSet {
        paused: bool,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub sequence: u64,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Append-only log of committed mutations.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EventLog {
    entries: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: LedgerEvent) -> u64 {
        let sequence = self
            .entries
            .last()
            .map(|record| record.sequence + 1)
            .unwrap_or(0);
        self.entries.push(EventRecord { sequence, event });
        sequence
    }

    pub fn entries(&self) -> &[EventRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with a sequence number at or after `sequence`.
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = self.entries.partition_point(|record| record.sequence < sequence);
        &self.entries[start..]
    }

    /// Every `RewardTriggered` recorded for `referred`.
    pub fn rewards_for<'a>(&'a self, referred: &'a AccountId) -> impl Iterator<Item = &'a EventRecord> {
        self.entries.iter().filter(move |record| {
            matches!(&record.event, LedgerEvent::RewardTriggered { referred: r, .. } if r == referred)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_monotonic() {
        let mut log = EventLog::new();
        assert_eq!(log.emit(LedgerEvent::PausedSet { paused: true }), 0);
        assert_eq!(log.emit(LedgerEvent::PausedSet { paused: false }), 1);
        assert_eq!(log.since(1).len(), 1);
        assert_eq!(log.since(5).len(), 0);
    }

    #[test]
    fn rewards_are_filtered_by_referral() {
        let mut log = EventLog::new();
        log.emit(LedgerEvent::ReferralRegistered {
            referrer: "r2".into(),
            referred: "r1".into(),
        });
        log.emit(LedgerEvent::RewardTriggered {
            referred: "r1".into(),
            referrer: "r2".into(),
            amount: 100,
        });
        log.emit(LedgerEvent::RewardTriggered {
            referred: "r3".into(),
            referrer: "r2".into(),
            amount: 100,
        });
        let r1 = "r1".to_string();
        assert_eq!(log.rewards_for(&r1).count(), 1);
    }

    #[test]
    fn records_serialize_flat_and_tagged() {
        let mut log = EventLog::new();
        log.emit(LedgerEvent::PausedSet { paused: true });
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "sequence": 0, "type": "paused_set", "paused": true }])
        );
        let decoded: EventLog = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, log);
    }
}
