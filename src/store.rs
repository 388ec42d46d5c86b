use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use referral_ledger::{RewardLedger, RewardLedgerState};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use value_ledger::{TokenLedger, TokenLedgerSnapshot};

pub const STATE_VERSION: u8 = 1;

/// On-disk form of one deployed ledger and the token it custodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u8,
    pub token: TokenLedgerSnapshot,
    pub rewards: RewardLedgerState,
    pub state_root: String,
}

impl StateFile {
    pub fn capture(ledger: &RewardLedger<TokenLedger>) -> Result<Self> {
        let token = ledger.value_service().snapshot();
        let rewards = ledger.state();
        let state_root = hex::encode(state_root(&token, &rewards)?);
        Ok(Self {
            version: STATE_VERSION,
            token,
            rewards,
            state_root,
        })
    }

    /// Recomputes the root and compares it with the stored one.
    pub fn verify(&self) -> Result<()> {
        if self.version != STATE_VERSION {
            bail!("unsupported state version {}", self.version);
        }
        let computed = hex::encode(state_root(&self.token, &self.rewards)?);
        if computed != self.state_root {
            bail!(
                "state root mismatch: stored {}, computed {}",
                self.state_root,
                computed
            );
        }
        Ok(())
    }

    pub fn into_ledger(self) -> Result<RewardLedger<TokenLedger>> {
        self.verify()?;
        let token = TokenLedger::restore(self.token).context("token ledger snapshot rejected")?;
        RewardLedger::from_state(self.rewards, token).context("reward ledger state rejected")
    }
}

fn state_root(token: &TokenLedgerSnapshot, rewards: &RewardLedgerState) -> Result<[u8; 32]> {
    let rewards_json = serde_json::to_vec(rewards).context("encode reward state")?;
    let mut hasher = Sha256::new();
    hasher.update(b"referral-state-v1");
    hasher.update(token.merkle_root);
    hasher.update((rewards_json.len() as u64).to_le_bytes());
    hasher.update(&rewards_json);
    Ok(hasher.finalize().into())
}

pub fn read_state(path: &Path) -> Result<StateFile> {
    let bytes = fs::read(path).with_context(|| {
        format!(
            "failed to read state file {} (run `referral init` first)",
            path.display()
        )
    })?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse state file {}", path.display()))
}

pub fn load(path: &Path) -> Result<RewardLedger<TokenLedger>> {
    read_state(path)?
        .into_ledger()
        .with_context(|| format!("state file {} failed verification", path.display()))
}

/// Sibling `<state>.lock` file guarding load-modify-save cycles.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Run `op` while holding an exclusive advisory lock on the state's lock file.
/// Blocks until any other holder, in this or another process, releases it.
pub fn locked<R>(path: &Path, op: impl FnOnce() -> Result<R>) -> Result<R> {
    let lock_path = lock_path(path);
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("failed to open lock file {}", lock_path.display()))?;
    let mut lock = fd_lock::RwLock::new(file);
    let _guard = lock
        .write()
        .with_context(|| format!("failed to lock {}", lock_path.display()))?;
    debug!(lock = %lock_path.display(), "state lock held");
    op()
}

/// Load, apply `op`, and persist only if `op` succeeded, all under the lock.
pub fn mutate<R>(
    path: &Path,
    op: impl FnOnce(&mut RewardLedger<TokenLedger>) -> Result<R>,
) -> Result<R> {
    locked(path, || {
        let mut ledger = load(path)?;
        let out = op(&mut ledger)?;
        save(path, &ledger)?;
        Ok(out)
    })
}

/// Write through a temp file in the same directory, then rename over `path`.
pub fn save(path: &Path, ledger: &RewardLedger<TokenLedger>) -> Result<()> {
    let state = StateFile::capture(ledger)?;
    let json = serde_json::to_vec_pretty(&state).context("encode state file")?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(&json).context("write state file")?;
    tmp.as_file().sync_all().context("sync state file")?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace state file {}", path.display()))?;
    debug!(path = %path.display(), root = %state.state_root, "state saved");
    Ok(())
}
