//! referral - operator CLI for the referral reward ledger
//!
//! Every command loads the state file, applies at most one ledger operation
//! and writes the file back only when that operation succeeded. Mutating
//! commands hold the state's lock file for the whole cycle.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use referral_ledger::RewardLedger;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use value_ledger::{to_base_units, AccountId, Amount, TokenLedger, ValueTransfer};

mod config;
mod keys;
mod store;

use config::DeploymentConfig;
use store::mutate;

#[derive(Parser, Debug)]
#[command(name = "referral")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the ledger state file
    #[arg(long, env = "REFERRAL_STATE", default_value = "referral-state.json")]
    state: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 identity (sk.hex, pk.hex)
    Keygen {
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Deploy a fresh ledger from a deployment config
    Init {
        #[arg(long)]
        config: PathBuf,
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Move value between two accounts
    Transfer {
        #[arg(long, env = "REFERRAL_SK_HEX", hide_env_values = true)]
        sk_hex: String,
        #[arg(long)]
        to: AccountId,
        /// Amount in base units
        #[arg(long)]
        amount: Amount,
    },

    /// Send value to the ledger's reward pool
    Fund {
        #[arg(long, env = "REFERRAL_SK_HEX", hide_env_values = true)]
        sk_hex: String,
        /// Amount in base units
        #[arg(long)]
        amount: Amount,
    },

    /// Register the caller as referred by `referrer`
    Register {
        #[arg(long, env = "REFERRAL_SK_HEX", hide_env_values = true)]
        sk_hex: String,
        #[arg(long)]
        referrer: AccountId,
    },

    /// Pay the referrer of `referral` (confirmer only)
    Trigger {
        #[arg(long, env = "REFERRAL_SK_HEX", hide_env_values = true)]
        sk_hex: String,
        #[arg(long)]
        referral: AccountId,
        /// Amount in base units
        #[arg(long)]
        amount: Amount,
    },

    /// Engage the circuit breaker (owner only)
    Pause {
        #[arg(long, env = "REFERRAL_SK_HEX", hide_env_values = true)]
        sk_hex: String,
    },

    /// Release the circuit breaker (owner only)
    Unpause {
        #[arg(long, env = "REFERRAL_SK_HEX", hide_env_values = true)]
        sk_hex: String,
    },

    /// Show one referral record
    Show {
        #[arg(long)]
        referral: AccountId,
    },

    /// Roles, pause flag and pool balance
    Status,

    /// Balance of any account
    Balance {
        #[arg(long)]
        account: AccountId,
    },

    /// Ledger events, optionally only rewards for one referral
    Events {
        #[arg(long)]
        referral: Option<AccountId>,
    },

    /// Check the state file's roots without changing it
    Verify,
}

#[derive(Serialize)]
struct StatusView<'a> {
    address: &'a AccountId,
    owner: &'a AccountId,
    confirmer: &'a AccountId,
    paused: bool,
    #[serde(with = "value_ledger::amount_serde")]
    pool_balance: Amount,
    referrals: usize,
    events: usize,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let state = cli.state.as_path();
    match cli.command {
        Commands::Keygen { out_dir } => {
            let key = keys::generate(&out_dir)?;
            println!("identity {} → {}", key.identity, out_dir.display());
        }
        Commands::Init { config, force } => init_cmd(state, &config, force)?,
        Commands::Transfer { sk_hex, to, amount } => {
            let from = keys::caller_from_sk_hex(&sk_hex)?;
            mutate(state, |ledger| Ok(ledger.external_transfer(&from, &to, amount)?))?;
            println!("transferred {amount} from {from} to {to}");
        }
        Commands::Fund { sk_hex, amount } => {
            let from = keys::caller_from_sk_hex(&sk_hex)?;
            let pool = mutate(state, |ledger| Ok(ledger.fund_pool(&from, amount)?))?;
            println!("pool funded by {amount}, balance {pool}");
        }
        Commands::Register { sk_hex, referrer } => {
            let caller = keys::caller_from_sk_hex(&sk_hex)?;
            mutate(state, |ledger| Ok(ledger.register_referral(&caller, &referrer)?))?;
            println!("{caller} registered, referrer {referrer}");
        }
        Commands::Trigger {
            sk_hex,
            referral,
            amount,
        } => {
            let caller = keys::caller_from_sk_hex(&sk_hex)?;
            let referrer =
                mutate(state, |ledger| Ok(ledger.trigger_reward(&caller, &referral, amount)?))?;
            println!("rewarded {referral}: paid {amount} to {referrer}");
        }
        Commands::Pause { sk_hex } => set_paused_cmd(state, &sk_hex, true)?,
        Commands::Unpause { sk_hex } => set_paused_cmd(state, &sk_hex, false)?,
        Commands::Show { referral } => {
            let ledger = store::load(state)?;
            print_json(&ledger.get_referral(&referral))?;
        }
        Commands::Status => {
            let ledger = store::load(state)?;
            print_json(&StatusView {
                address: ledger.address(),
                owner: ledger.owner(),
                confirmer: ledger.confirmer(),
                paused: ledger.is_paused(),
                pool_balance: ledger.pool_balance(),
                referrals: ledger.referrals().len(),
                events: ledger.events().len(),
            })?;
        }
        Commands::Balance { account } => {
            let ledger = store::load(state)?;
            println!("{}", ledger.value_service().balance_of(&account));
        }
        Commands::Events { referral } => {
            let ledger = store::load(state)?;
            match referral {
                Some(referral) => {
                    let rewards: Vec<_> = ledger.events().rewards_for(&referral).collect();
                    print_json(&rewards)?;
                }
                None => print_json(ledger.events())?,
            }
        }
        Commands::Verify => {
            let file = store::read_state(state)?;
            let root = file.state_root.clone();
            file.into_ledger()?;
            info!(%root, "state verified");
            println!("verify: OK (state root & token merkle root match)");
        }
    }
    Ok(())
}

fn init_cmd(state: &Path, config_path: &Path, force: bool) -> Result<()> {
    store::locked(state, || deploy(state, config_path, force))
}

fn deploy(state: &Path, config_path: &Path, force: bool) -> Result<()> {
    if state.exists() && !force {
        bail!(
            "state file {} already exists (use --force to overwrite)",
            state.display()
        );
    }
    let config = DeploymentConfig::load(config_path)?;
    let supply = to_base_units(config.initial_supply_tokens);
    let token = TokenLedger::with_initial_supply(&config.owner, supply);
    let ledger = RewardLedger::new(
        config.owner.clone(),
        config.confirmer().clone(),
        config.ledger_address.clone(),
        token,
    )
    .context("invalid deployment roles")?;
    store::save(state, &ledger)?;
    info!(address = %ledger.address(), owner = %ledger.owner(), confirmer = %ledger.confirmer(), "ledger deployed");
    println!(
        "deployed ledger {} (owner {}, supply {}) → {}",
        ledger.address(),
        ledger.owner(),
        supply,
        state.display()
    );
    Ok(())
}

fn set_paused_cmd(state: &Path, sk_hex: &str, paused: bool) -> Result<()> {
    let caller = keys::caller_from_sk_hex(sk_hex)?;
    mutate(state, |ledger| Ok(ledger.set_paused(&caller, paused)?))?;
    println!("paused = {paused}");
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("encode output")?;
    println!("{json}");
    Ok(())
}
