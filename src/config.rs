//! Command line and environment configuration.
//!
//! Every option can also come from the environment, under the variable names
//! the bot has always read (`PK`, `GAS_PRICE`, `INFRUA_URL`, ...).

use crate::chain::DEFAULT_RPC_URL;
use crate::gas::GasPolicy;
use crate::oracle::DEFAULT_ORACLE_URL;
use crate::orchestrator::DiscoverySettings;
use crate::payload::MintTemplate;
use crate::submitter::{Account, MintSettings};
use alloy::primitives::U256;
use anyhow::{anyhow, bail, ensure};
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const GWEI_DECIMALS: u32 = 9;
const ETHER_DECIMALS: u32 = 18;

#[derive(Parser, Debug)]
#[command(version, about = "Finds unminted ethscription ticks and mints them")]
pub struct Args {
    /// JSON-RPC endpoint of the node
    #[arg(long, env = "INFRUA_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: Url,

    /// Comma-separated private keys, one account each
    #[arg(long, env = "PK", value_delimiter = ',', hide_env_values = true)]
    pub private_keys: Vec<String>,

    /// Bid ceiling in gwei
    #[arg(long, env = "GAS_PRICE", default_value = "20", value_parser = parse_gwei)]
    pub gas_price: u128,

    /// Rounds wait while the network gas price is above this, in gwei
    #[arg(long, env = "MAX_GAS_PRICE", default_value = "100", value_parser = parse_gwei)]
    pub max_gas_price: u128,

    /// Accounts holding less ether than this are skipped
    #[arg(long, env = "MIN_BALANCE", default_value = "0", value_parser = parse_ether)]
    pub min_balance: U256,

    /// Transactions per account and round
    #[arg(long, env = "PARALLEL_TX_NUM", default_value_t = crate::orchestrator::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Base URL of the ethscriptions existence API
    #[arg(long, env = "ORACLE_URL", default_value = DEFAULT_ORACLE_URL)]
    pub oracle_url: String,

    #[arg(long, env = "ORACLE_TIMEOUT_SECS", default_value_t = 30)]
    pub oracle_timeout_secs: u64,

    #[arg(long, env = "CHAIN_ID", default_value_t = crate::submitter::DEFAULT_CHAIN_ID)]
    pub chain_id: u64,

    #[arg(long, env = "GAS_LIMIT", default_value_t = crate::submitter::DEFAULT_GAS_LIMIT)]
    pub gas_limit: u64,

    #[arg(long, env = "PROTOCOL", default_value = "erc-20")]
    pub protocol: String,

    #[arg(long, env = "TICK", default_value = "nodes")]
    pub tick: String,

    /// Amount minted per transaction, as written into the payload
    #[arg(long, env = "AMOUNT", default_value = "10000")]
    pub amount: String,

    #[arg(long, env = "ID_START", default_value_t = crate::orchestrator::DEFAULT_ID_RANGE.0)]
    pub id_start: u64,

    #[arg(long, env = "ID_END", default_value_t = crate::orchestrator::DEFAULT_ID_RANGE.1)]
    pub id_end: u64,

    /// Idle time after a skipped round, in seconds
    #[arg(long, env = "WAIT_SECS", default_value_t = 5)]
    pub wait_secs: u64,

    #[arg(long, env = "RECEIPT_TIMEOUT", default_value_t = 1800)]
    pub receipt_timeout_secs: u64,

    /// Also write the log to this file
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Args {
    /// Fails when no key is given; blank entries don't count.
    pub fn accounts(&self) -> anyhow::Result<Vec<Account>> {
        let accounts = self
            .private_keys
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| Account::from_private_key(k))
            .collect::<anyhow::Result<Vec<_>>>()?;
        ensure!(!accounts.is_empty(), "privates is empty");
        Ok(accounts)
    }

    pub fn gas_policy(&self) -> GasPolicy {
        GasPolicy::new(self.gas_price, self.max_gas_price)
    }

    pub fn mint_settings(&self) -> MintSettings {
        MintSettings {
            min_balance: self.min_balance,
            gas_limit: self.gas_limit,
            chain_id: self.chain_id,
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
        }
    }

    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            template: MintTemplate {
                protocol: self.protocol.clone(),
                op: "mint".into(),
                tick: self.tick.clone(),
                amount: self.amount.clone(),
            },
            id_range: (self.id_start, self.id_end),
            batch_size: self.batch_size,
        }
    }
}

/// Gwei amount to wei.
fn parse_gwei(amount: &str) -> anyhow::Result<u128> {
    parse_units(amount, GWEI_DECIMALS)
}

/// Ether amount to wei.
fn parse_ether(amount: &str) -> anyhow::Result<U256> {
    Ok(U256::from(parse_units(amount, ETHER_DECIMALS)?))
}

/// Exact decimal to integer conversion, `parse_units("1.5", 9) == 1_500_000_000`.
pub fn parse_units(amount: &str, decimals: u32) -> anyhow::Result<u128> {
    let amount = amount.trim();
    let (int, frac) = amount.split_once('.').unwrap_or((amount, ""));
    if int.is_empty() && frac.is_empty() {
        bail!("empty amount");
    }
    if !int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        bail!("not a decimal amount: {amount}");
    }
    if frac.len() > decimals as usize {
        bail!("{amount} has more than {decimals} decimals");
    }

    let overflow = || anyhow!("amount too large: {amount}");
    let scale = 10_u128.pow(decimals);
    let int = if int.is_empty() { 0 } else { int.parse::<u128>()? };
    let frac = if frac.is_empty() {
        0
    } else {
        frac.parse::<u128>()? * 10_u128.pow(decimals - frac.len() as u32)
    };
    int.checked_mul(scale)
        .and_then(|x| x.checked_add(frac))
        .ok_or_else(overflow)
}
