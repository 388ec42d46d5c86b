use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use crate::{AccountId, Amount};

/// Deterministic commitment over every balance and the set of accounts that
/// refuse deposits.
pub fn balances_root(
    balances: &BTreeMap<AccountId, Amount>,
    rejecting: &BTreeSet<AccountId>,
) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::with_capacity(balances.len() + rejecting.len());
    for (account, amount) in balances {
        let mut hasher = Sha256::new();
        hasher.update(b"acct");
        hasher.update((account.len() as u64).to_le_bytes());
        hasher.update(account.as_bytes());
        hasher.update(amount.to_le_bytes());
        leaves.push(hasher.finalize().into());
    }
    for account in rejecting {
        let mut hasher = Sha256::new();
        hasher.update(b"reject");
        hasher.update((account.len() as u64).to_le_bytes());
        hasher.update(account.as_bytes());
        leaves.push(hasher.finalize().into());
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"value-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity(leaves.len().div_ceil(2));
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            // odd node is paired with itself
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ledger_has_fixed_root() {
        let root = balances_root(&BTreeMap::new(), &BTreeSet::new());
        let expected: [u8; 32] = Sha256::digest(b"value-ledger-empty").into();
        assert_eq!(root, expected);
    }

    #[test]
    fn root_changes_with_any_balance() {
        let mut balances = BTreeMap::new();
        balances.insert("alice".to_string(), 100);
        balances.insert("bob".to_string(), 50);
        let before = balances_root(&balances, &BTreeSet::new());
        balances.insert("bob".to_string(), 51);
        let after = balances_root(&balances, &BTreeSet::new());
        assert_ne!(before, after);
    }

    #[test]
    fn rejecting_accounts_are_committed() {
        let mut balances = BTreeMap::new();
        balances.insert("alice".to_string(), 100);
        let plain = balances_root(&balances, &BTreeSet::new());
        let rejecting: BTreeSet<_> = ["alice".to_string()].into_iter().collect();
        assert_ne!(plain, balances_root(&balances, &rejecting));
    }
}
