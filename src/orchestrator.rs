//! The minting loop.
//!
//! ```text
//!            too expensive / no gas price
//!  CHECK_GAS ───────────────────────────────► WAIT ──┐
//!     │ ▲                                       ▲     │
//!     │ └───────────────────────────────────────┼─────┘
//!     ▼                      nothing found      │
//!  DISCOVER ────────────────────────────────────┘
//!     │
//!     ▼
//!  SPLIT_AND_SUBMIT ──► CHECK_GAS
//! ```
//!
//! Every state is re-evaluated from scratch each round; nothing carries over.

use crate::candidate::build_candidates;
use crate::chain::ChainClient;
use crate::gas::{format_gwei, GasPolicy};
use crate::oracle::ExistenceOracle;
use crate::payload::MintTemplate;
use crate::submitter::{Account, MintSettings, MintSubmitter};
use anyhow::ensure;
use futures::future::join_all;
use log::{error, info, warn};
use rand::Rng;
use std::time::Duration;

pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_ID_RANGE: (u64, u64) = (1, 999_999);

#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub template: MintTemplate,
    pub id_range: (u64, u64),
    /// candidates wanted per account and round
    pub batch_size: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            template: MintTemplate::default(),
            id_range: DEFAULT_ID_RANGE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    GasUnavailable,
    GasTooHigh,
    NoCandidates,
    Submitted {
        found: usize,
        /// candidates handed to accounts; the rest of `found` was dropped
        assigned: usize,
        /// accounts whose batch reached a receipt
        minted: usize,
    },
}

pub struct Orchestrator<C, O, S> {
    chain: C,
    oracle: O,
    sleeper: S,
    gas: GasPolicy,
    mint: MintSettings,
    discovery: DiscoverySettings,
    accounts: Vec<Account>,
    wait: Duration,
}

impl<C, O, S> Orchestrator<C, O, S>
where
    C: ChainClient,
    O: ExistenceOracle,
    S: Sleeper,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: C,
        oracle: O,
        sleeper: S,
        gas: GasPolicy,
        mint: MintSettings,
        discovery: DiscoverySettings,
        accounts: Vec<Account>,
        wait: Duration,
    ) -> anyhow::Result<Self> {
        ensure!(!accounts.is_empty(), "privates is empty");
        Ok(Self {
            chain,
            oracle,
            sleeper,
            gas,
            mint,
            discovery,
            accounts,
            wait,
        })
    }

    /// Runs rounds until the process is stopped.
    pub async fn run<R: Rng + ?Sized>(&self, rng: &mut R) {
        loop {
            self.run_round(rng).await;
        }
    }

    pub async fn run_round<R: Rng + ?Sized>(&self, rng: &mut R) -> RoundOutcome {
        let current = match self.chain.gas_price().await {
            Ok(price) => price,
            Err(e) => {
                warn!("failed to read gas price: {e:#}");
                self.sleeper.sleep(self.wait).await;
                return RoundOutcome::GasUnavailable;
            }
        };
        info!("now gas={}", format_gwei(current));
        if self.gas.too_expensive(current) {
            info!("gas={} is too high", format_gwei(current));
            self.sleeper.sleep(self.wait).await;
            return RoundOutcome::GasTooHigh;
        }

        let wanted = self.discovery.batch_size * self.accounts.len();
        let candidates = build_candidates(
            &self.oracle,
            &self.discovery.template,
            self.discovery.id_range,
            wanted,
            rng,
        )
        .await;
        if candidates.is_empty() {
            info!("no ticks");
            self.sleeper.sleep(self.wait).await;
            return RoundOutcome::NoCandidates;
        }

        let chunks = split_evenly(&candidates, self.accounts.len());
        let submitter = MintSubmitter::new(&self.chain, &self.gas, &self.mint);
        let results = join_all(
            self.accounts
                .iter()
                .zip(&chunks)
                .map(|(account, chunk)| submitter.submit(account, chunk)),
        )
        .await;

        let mut minted = 0;
        for (account, result) in self.accounts.iter().zip(results) {
            match result {
                Ok(Some(hash)) => {
                    info!("finished {} {hash}", account.address());
                    minted += 1;
                }
                Ok(None) => {}
                Err(e) => error!("mint round of {} failed: {e:#}", account.address()),
            }
        }

        RoundOutcome::Submitted {
            found: candidates.len(),
            assigned: chunks.iter().map(|c| c.len()).sum(),
            minted,
        }
    }
}

/// `parts` contiguous chunks of `len / parts` items each. The `len % parts`
/// trailing items are left out.
pub fn split_evenly<T>(items: &[T], parts: usize) -> Vec<&[T]> {
    if parts == 0 {
        return Vec::new();
    }
    let size = items.len() / parts;
    (0..parts)
        .map(|i| &items[i * size..(i + 1) * size])
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gas::GWEI;
    use crate::oracle::Availability;
    use crate::testing::{FakeChain, RecordingSleeper, ScriptedOracle};
    use alloy::consensus::Transaction;
    use alloy::signers::local::PrivateKeySigner;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn accounts(n: usize) -> Vec<Account> {
        (0..n)
            .map(|_| Account::new(PrivateKeySigner::random()))
            .collect()
    }

    fn orchestrator(
        chain: FakeChain,
        oracle: ScriptedOracle,
        discovery: DiscoverySettings,
        accounts: Vec<Account>,
    ) -> Orchestrator<FakeChain, ScriptedOracle, RecordingSleeper> {
        Orchestrator::new(
            chain,
            oracle,
            RecordingSleeper::default(),
            GasPolicy::new(20 * GWEI, 100 * GWEI),
            MintSettings::default(),
            discovery,
            accounts,
            DEFAULT_WAIT,
        )
        .unwrap()
    }

    #[test]
    fn split_drops_remainder() {
        let items = [1, 2, 3, 4, 5];
        assert_eq!(split_evenly(&items, 3), vec![&[1][..], &[2], &[3]]);

        let items = [1, 2, 3, 4, 5, 6, 7];
        assert_eq!(split_evenly(&items, 3), vec![&[1, 2][..], &[3, 4], &[5, 6]]);

        let items = [1, 2, 3, 4, 5, 6];
        assert_eq!(split_evenly(&items, 2), vec![&[1, 2, 3][..], &[4, 5, 6]]);
        assert_eq!(split_evenly(&items, 1), vec![&items[..]]);

        // fewer items than parts: nobody gets anything
        let items = [1, 2];
        let empty: &[i32] = &[];
        assert_eq!(split_evenly(&items, 3), vec![empty, empty, empty]);

        assert!(split_evenly(&items, 0).is_empty());
    }

    #[test]
    fn needs_accounts() {
        let result = Orchestrator::new(
            FakeChain::new(GWEI),
            ScriptedOracle::new(|_, _| None),
            RecordingSleeper::default(),
            GasPolicy::new(20 * GWEI, 100 * GWEI),
            MintSettings::default(),
            DiscoverySettings::default(),
            Vec::new(),
            DEFAULT_WAIT,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn waits_when_gas_too_high() {
        let bot = orchestrator(
            FakeChain::new(101 * GWEI),
            ScriptedOracle::new(|_, _| None),
            DiscoverySettings::default(),
            accounts(2),
        );
        let outcome = bot.run_round(&mut StdRng::seed_from_u64(1)).await;
        assert_eq!(outcome, RoundOutcome::GasTooHigh);
        assert_eq!(bot.sleeper.slept(), vec![DEFAULT_WAIT]);
        assert_eq!(bot.oracle.calls(), 0);
        assert!(bot.chain.sent().is_empty());
    }

    #[tokio::test]
    async fn waits_when_gas_unreadable() {
        let bot = orchestrator(
            FakeChain::unreachable(),
            ScriptedOracle::new(|_, _| None),
            DiscoverySettings::default(),
            accounts(1),
        );
        let outcome = bot.run_round(&mut StdRng::seed_from_u64(1)).await;
        assert_eq!(outcome, RoundOutcome::GasUnavailable);
        assert_eq!(bot.sleeper.slept(), vec![DEFAULT_WAIT]);
        assert_eq!(bot.oracle.calls(), 0);
    }

    #[tokio::test]
    async fn waits_when_nothing_found() {
        let bot = orchestrator(
            FakeChain::new(10 * GWEI),
            ScriptedOracle::new(|_, _| Some(Availability::Taken)),
            DiscoverySettings {
                id_range: (1, 10),
                ..Default::default()
            },
            accounts(2),
        );
        let outcome = bot.run_round(&mut StdRng::seed_from_u64(1)).await;
        assert_eq!(outcome, RoundOutcome::NoCandidates);
        assert_eq!(bot.sleeper.slept(), vec![DEFAULT_WAIT]);
        assert_eq!(bot.oracle.calls(), 10);
        assert!(bot.chain.sent().is_empty());
    }

    #[tokio::test]
    async fn splits_found_candidates() {
        let accounts = accounts(3);
        let addresses = accounts.iter().map(Account::address).collect::<Vec<_>>();
        let bot = orchestrator(
            FakeChain::new(10 * GWEI),
            ScriptedOracle::new(|_, _| None),
            // only five ids exist, six are wanted
            DiscoverySettings {
                id_range: (1, 5),
                batch_size: 2,
                ..Default::default()
            },
            accounts,
        );

        let outcome = bot.run_round(&mut StdRng::seed_from_u64(1)).await;
        assert_eq!(
            outcome,
            RoundOutcome::Submitted {
                found: 5,
                assigned: 3,
                minted: 3
            }
        );
        assert_eq!(bot.oracle.calls(), 5);
        assert!(bot.sleeper.slept().is_empty());

        let sent = bot.chain.sent();
        assert_eq!(sent.len(), 3);
        for address in addresses {
            let own = sent
                .iter()
                .filter(|tx| (**tx).to() == Some(address))
                .collect::<Vec<_>>();
            assert_eq!(own.len(), 1);
            assert_eq!(own[0].nonce(), 0);
        }
    }

    #[tokio::test]
    async fn full_round() {
        let bot = orchestrator(
            FakeChain::new(10 * GWEI),
            ScriptedOracle::new(|call, _| (call % 3 == 2).then_some(Availability::Taken)),
            DiscoverySettings {
                batch_size: 4,
                ..Default::default()
            },
            accounts(2),
        );

        let outcome = bot.run_round(&mut StdRng::seed_from_u64(8)).await;
        assert_eq!(
            outcome,
            RoundOutcome::Submitted {
                found: 8,
                assigned: 8,
                minted: 2
            }
        );
        let sent = bot.chain.sent();
        assert_eq!(sent.len(), 8);
        assert_eq!(bot.chain.awaited().len(), 2);
    }
}
