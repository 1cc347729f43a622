//! In-memory stand-ins for the node, the existence API and the clock.

use crate::chain::ChainClient;
use crate::oracle::{Availability, ExistenceOracle};
use crate::orchestrator::Sleeper;
use crate::payload::encode_data;
use alloy::consensus::TxEnvelope;
use alloy::primitives::{Address, TxHash, U256};
use anyhow::anyhow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Rule = Box<dyn Fn(usize, &str) -> Option<Availability> + Send + Sync>;

/// Answers by `rule(call_index, payload)`; `None` means available.
pub struct ScriptedOracle {
    rule: Rule,
    payloads: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(rule: impl Fn(usize, &str) -> Option<Availability> + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

impl ExistenceOracle for ScriptedOracle {
    async fn check(&self, payload: &str) -> Availability {
        let call = {
            let mut payloads = self.payloads.lock().unwrap();
            payloads.push(payload.into());
            payloads.len() - 1
        };
        (self.rule)(call, payload).unwrap_or_else(|| Availability::Available(encode_data(payload)))
    }
}

pub struct FakeChain {
    gas_price: Option<u128>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    confirms: bool,
    sent: Mutex<Vec<TxEnvelope>>,
    awaited: Mutex<Vec<TxHash>>,
    nonce_queries: AtomicUsize,
}

impl FakeChain {
    /// Every account holds 1 ether and starts at nonce 0.
    pub fn new(gas_price: u128) -> Self {
        Self {
            gas_price: Some(gas_price),
            balances: HashMap::new(),
            nonces: HashMap::new(),
            confirms: true,
            sent: Mutex::new(Vec::new()),
            awaited: Mutex::new(Vec::new()),
            nonce_queries: AtomicUsize::new(0),
        }
    }

    /// `eth_gasPrice` fails.
    pub fn unreachable() -> Self {
        Self {
            gas_price: None,
            ..Self::new(0)
        }
    }

    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.balances.insert(address, balance);
        self
    }

    pub fn with_nonce(mut self, address: Address, nonce: u64) -> Self {
        self.nonces.insert(address, nonce);
        self
    }

    pub fn never_confirm(mut self) -> Self {
        self.confirms = false;
        self
    }

    pub fn sent(&self) -> Vec<TxEnvelope> {
        self.sent.lock().unwrap().clone()
    }

    pub fn awaited(&self) -> Vec<TxHash> {
        self.awaited.lock().unwrap().clone()
    }

    pub fn nonce_queries(&self) -> usize {
        self.nonce_queries.load(Ordering::SeqCst)
    }
}

impl ChainClient for FakeChain {
    async fn gas_price(&self) -> anyhow::Result<u128> {
        self.gas_price.ok_or_else(|| anyhow!("connection refused"))
    }

    async fn balance(&self, address: Address) -> anyhow::Result<U256> {
        Ok(self
            .balances
            .get(&address)
            .copied()
            .unwrap_or(U256::from(1_000_000_000_000_000_000_u128)))
    }

    async fn pending_nonce(&self, address: Address) -> anyhow::Result<u64> {
        self.nonce_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.nonces.get(&address).copied().unwrap_or_default())
    }

    async fn send_transaction(&self, tx: TxEnvelope) -> anyhow::Result<TxHash> {
        let hash = *tx.tx_hash();
        self.sent.lock().unwrap().push(tx);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: TxHash, timeout: Duration) -> anyhow::Result<bool> {
        self.awaited.lock().unwrap().push(hash);
        if self.confirms {
            Ok(true)
        } else {
            tokio::time::sleep(timeout).await;
            Err(anyhow!("no receipt for {hash}"))
        }
    }
}

/// Records requested sleeps instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}
