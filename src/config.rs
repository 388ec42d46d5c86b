use std::{env, fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use value_ledger::AccountId;

pub const DEFAULT_LEDGER_ADDRESS: &str = "referral-ledger";

/// Deployment parameters, read once by `init`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentConfig {
    /// Administrative identity; receives the initial token supply
    pub owner: AccountId,
    /// Identity allowed to trigger rewards (defaults to the owner)
    #[serde(default)]
    pub confirmer: Option<AccountId>,
    /// Address that custodies the reward pool
    #[serde(default = "default_ledger_address")]
    pub ledger_address: AccountId,
    /// Whole tokens minted to the owner at deployment
    #[serde(default)]
    pub initial_supply_tokens: u64,
}

fn default_ledger_address() -> AccountId {
    DEFAULT_LEDGER_ADDRESS.to_string()
}

impl DeploymentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read deployment config {}", path.display()))?;
        let mut config: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse deployment config {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// `REFERRAL_OWNER`, `REFERRAL_CONFIRMER` and `REFERRAL_LEDGER_ADDRESS`
    /// replace the file values when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(owner) = lookup("REFERRAL_OWNER") {
            self.owner = owner;
        }
        if let Some(confirmer) = lookup("REFERRAL_CONFIRMER") {
            self.confirmer = Some(confirmer);
        }
        if let Some(address) = lookup("REFERRAL_LEDGER_ADDRESS") {
            self.ledger_address = address;
        }
    }

    pub fn confirmer(&self) -> &AccountId {
        self.confirmer.as_ref().unwrap_or(&self.owner)
    }

    pub fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() {
            bail!("owner must be a non-empty identity");
        }
        if self.confirmer().trim().is_empty() {
            bail!("confirmer must be a non-empty identity");
        }
        if self.ledger_address.trim().is_empty() {
            bail!("ledger_address must be non-empty");
        }
        if self.ledger_address == self.owner || &self.ledger_address == self.confirmer() {
            bail!(
                "ledger_address {} must differ from the owner and confirmer",
                self.ledger_address
            );
        }
        if is_key_identity(&self.ledger_address) {
            bail!(
                "ledger_address {} has the shape of a key identity; a key holder could spend the pool",
                self.ledger_address
            );
        }
        Ok(())
    }
}

/// Identities derived from keys are 32-byte verifying keys in hex.
fn is_key_identity(address: &str) -> bool {
    address.len() == 64 && address.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployment.json");
        fs::write(&path, r#"{ "owner": "aa11", "initial_supply_tokens": 1000 }"#).unwrap();
        let config = DeploymentConfig::load(&path).unwrap();
        assert_eq!(config.ledger_address, DEFAULT_LEDGER_ADDRESS);
        assert_eq!(config.confirmer(), "aa11");
        assert_eq!(config.initial_supply_tokens, 1000);
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = DeploymentConfig {
            owner: "owner".into(),
            confirmer: None,
            ledger_address: DEFAULT_LEDGER_ADDRESS.into(),
            initial_supply_tokens: 0,
        };
        let vars: HashMap<&str, &str> =
            [("REFERRAL_CONFIRMER", "checker"), ("REFERRAL_LEDGER_ADDRESS", "vault")]
                .into_iter()
                .collect();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.owner, "owner");
        assert_eq!(config.confirmer(), "checker");
        assert_eq!(config.ledger_address, "vault");
    }

    #[test]
    fn ledger_address_must_not_alias_a_role() {
        let config = DeploymentConfig {
            owner: "owner".into(),
            confirmer: None,
            ledger_address: "owner".into(),
            initial_supply_tokens: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn ledger_address_must_not_be_signable() {
        let mut config = DeploymentConfig {
            owner: "owner".into(),
            confirmer: None,
            ledger_address: "ab".repeat(32),
            initial_supply_tokens: 0,
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("key identity"));

        config.ledger_address = "AB".repeat(32);
        assert!(config.validate().is_err());
        config.ledger_address = "ab".repeat(31);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unreadable_config_reports_path() {
        let err = DeploymentConfig::load(Path::new("/nonexistent/deployment.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/deployment.json"));
    }
}
