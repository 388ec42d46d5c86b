use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use value_ledger::AccountId;

/// Identity of a key holder: hex of the Ed25519 verifying key.
pub fn identity_of(sk: &SigningKey) -> AccountId {
    hex::encode(sk.verifying_key().as_bytes())
}

/// Parse a 32-byte Ed25519 secret key given as 64 hex characters.
pub fn parse_sk_hex(sk_hex: &str) -> Result<SigningKey> {
    let sk_bytes = hex::decode(sk_hex.trim()).context("sk-hex is not valid hex")?;
    let Ok(arr) = <[u8; 32]>::try_from(sk_bytes.as_slice()) else {
        bail!("sk-hex must be 32 bytes (64 hex chars), got {}", sk_bytes.len());
    };
    Ok(SigningKey::from_bytes(&arr))
}

/// Caller identity for a mutating command.
pub fn caller_from_sk_hex(sk_hex: &str) -> Result<AccountId> {
    Ok(identity_of(&parse_sk_hex(sk_hex)?))
}

pub struct GeneratedKey {
    pub identity: AccountId,
}

/// Write `sk.hex` and `pk.hex` into `out_dir`.
pub fn generate(out_dir: &Path) -> Result<GeneratedKey> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let sk = SigningKey::generate(&mut OsRng);
    let identity = identity_of(&sk);
    let sk_hex = hex::encode(sk.to_bytes());

    fs::write(out_dir.join("sk.hex"), &sk_hex).context("write sk.hex")?;
    fs::write(out_dir.join("pk.hex"), &identity).context("write pk.hex")?;
    Ok(GeneratedKey { identity })
}
