//! Mints unclaimed ethscription ticks.
//!
//! Ids are drawn at random from the configured range, checked against the
//! ethscriptions existence API, and the free ones are minted as self-transactions
//! spread over all configured accounts. Runs until killed.
//!
//! ```text
//! PK=<key1>,<key2> GAS_PRICE=20 MAX_GAS_PRICE=30 PARALLEL_TX_NUM=5 mint-ticks
//! ```
//!
//! The existence check and the mint aren't atomic. Someone else can claim an id
//! between the two, in which case the indexer simply ignores our copy.

use clap::Parser;
use ethscription_minter::chain::RpcChain;
use ethscription_minter::config::Args;
use ethscription_minter::oracle::HttpOracle;
use ethscription_minter::orchestrator::{Orchestrator, TokioSleeper};
use ethscription_minter::set_up_logging;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    set_up_logging(args.log_level, args.log_file.as_deref())?;

    let accounts = args.accounts()?;
    info!(
        "minting with {} accounts: {:?}",
        accounts.len(),
        accounts.iter().map(|a| a.address()).collect::<Vec<_>>()
    );

    let orchestrator = Orchestrator::new(
        RpcChain::connect(args.rpc_url.clone()),
        HttpOracle::new(&args.oracle_url, Duration::from_secs(args.oracle_timeout_secs))?,
        TokioSleeper,
        args.gas_policy(),
        args.mint_settings(),
        args.discovery_settings(),
        accounts,
        Duration::from_secs(args.wait_secs),
    )?;

    orchestrator.run(&mut StdRng::from_entropy()).await;
    Ok(())
}
