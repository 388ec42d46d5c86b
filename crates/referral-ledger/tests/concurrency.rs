use std::{sync::Barrier, thread};

use referral_ledger::{ReferralStatus, RewardError, RewardLedger, SharedRewardLedger};
use value_ledger::{AccountId, TokenLedger, ValueTransfer};

fn id(name: &str) -> AccountId {
    name.to_string()
}

fn shared(pool: u128) -> SharedRewardLedger<TokenLedger> {
    let token = TokenLedger::with_initial_supply(&id("owner"), 1_000_000);
    let ledger = RewardLedger::new(id("owner"), id("confirmer"), id("ledger"), token).unwrap();
    let shared = SharedRewardLedger::new(ledger);
    shared.fund_pool(&id("owner"), pool).unwrap();
    shared
}

#[test]
fn racing_triggers_pay_exactly_once() {
    let ledger = shared(10_000);
    ledger.register_referral(&id("r1"), &id("r2")).unwrap();

    let threads = 8;
    let barrier = Barrier::new(threads);
    let results: Vec<Result<AccountId, RewardError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let ledger = ledger.clone();
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    ledger.trigger_reward(&id("confirmer"), &id("r1"), 100)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| matches!(err, RewardError::AlreadyRewarded { .. })));

    assert_eq!(ledger.pool_balance(), 9_900);
    assert_eq!(ledger.get_referral(&id("r1")).status, ReferralStatus::Rewarded);
    let rewards = ledger.with(|l| l.events().rewards_for(&id("r1")).count());
    assert_eq!(rewards, 1);
}

#[test]
fn concurrent_payouts_never_overdraw_pool() {
    // pool covers three of the ten rewards
    let ledger = shared(300);
    for n in 0..10 {
        ledger
            .register_referral(&format!("referred-{n}"), &format!("referrer-{n}"))
            .unwrap();
    }

    thread::scope(|scope| {
        for n in 0..10 {
            let ledger = ledger.clone();
            scope.spawn(move || {
                let _ = ledger.trigger_reward(&id("confirmer"), &format!("referred-{n}"), 100);
            });
        }
    });

    let state = ledger.state();
    let rewarded = state
        .referrals
        .iter()
        .filter(|(_, r)| r.status == ReferralStatus::Rewarded)
        .count();
    assert_eq!(rewarded, 3);
    assert_eq!(ledger.pool_balance(), 0);

    let ledger = ledger.try_unwrap().ok().unwrap();
    let paid: u128 = (0..10)
        .map(|n| ledger.value_service().balance_of(&format!("referrer-{n}")))
        .sum();
    assert_eq!(paid, 300);
}

#[test]
fn pause_from_another_thread_blocks_registration() {
    let ledger = shared(0);
    let owner_handle = ledger.clone();
    thread::spawn(move || owner_handle.set_paused(&id("owner"), true).unwrap())
        .join()
        .unwrap();
    assert!(ledger.is_paused());
    assert_eq!(
        ledger.register_referral(&id("r1"), &id("r2")),
        Err(RewardError::Paused)
    );
}
