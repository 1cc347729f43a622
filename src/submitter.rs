//! Per-account mint batches.
//!
//! A batch is a run of zero-value transactions an account sends to itself,
//! one per payload, with contiguous nonces starting at the account's pending
//! nonce. All of them are signed before the first is broadcast.

use crate::chain::ChainClient;
use crate::gas::GasPolicy;
use crate::payload::decode_data;
use alloy::consensus::TxEnvelope;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Context;
use log::{info, warn};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_GAS_LIMIT: u64 = 31_000;
pub const DEFAULT_CHAIN_ID: u64 = 1;
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(1800);

pub struct Account {
    address: Address,
    wallet: EthereumWallet,
}

impl Account {
    pub fn from_private_key(key: &str) -> anyhow::Result<Self> {
        let signer: PrivateKeySigner = key.trim().parse().context("invalid private key")?;
        Ok(Self::new(signer))
    }

    pub fn new(signer: PrivateKeySigner) -> Self {
        Self {
            address: signer.address(),
            wallet: EthereumWallet::from(signer),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct MintSettings {
    /// accounts holding less than this (wei) sit the round out
    pub min_balance: U256,
    pub gas_limit: u64,
    pub chain_id: u64,
    pub receipt_timeout: Duration,
}

impl Default for MintSettings {
    fn default() -> Self {
        Self {
            min_balance: U256::ZERO,
            gas_limit: DEFAULT_GAS_LIMIT,
            chain_id: DEFAULT_CHAIN_ID,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }
}

pub struct MintSubmitter<'a, C> {
    chain: &'a C,
    gas: &'a GasPolicy,
    settings: &'a MintSettings,
}

impl<'a, C: ChainClient> MintSubmitter<'a, C> {
    pub fn new(chain: &'a C, gas: &'a GasPolicy, settings: &'a MintSettings) -> Self {
        Self {
            chain,
            gas,
            settings,
        }
    }

    /// Mints `payloads` from `account` and waits for the last transaction.
    ///
    /// `Ok(None)` means the account was skipped: balance under the minimum, or
    /// nothing to mint. A receipt timeout is an error, but the transactions
    /// already broadcast stay in flight and may still confirm.
    pub async fn submit(
        &self,
        account: &Account,
        payloads: &[String],
    ) -> anyhow::Result<Option<TxHash>> {
        let address = account.address();
        let balance = self.chain.balance(address).await?;
        if balance < self.settings.min_balance {
            info!(
                "address {address} balance {} is too low",
                format_ether(balance)
            );
            return Ok(None);
        }
        if payloads.is_empty() {
            info!("address {address} no ticks");
            return Ok(None);
        }
        info!("start for {address} and ticks {:?}", payloads);

        let quote = self.gas.fetch_quote(self.chain).await?;
        info!(
            "account {address} mint token, gas_price={} now gas price {}",
            quote.bid, quote.current
        );
        let nonce = self.chain.pending_nonce(address).await?;
        info!("now nonce {nonce}");

        let batch = self.sign_batch(account, nonce, quote.bid, payloads).await?;

        let mut last_hash = None;
        for (i, tx) in batch.into_iter().enumerate() {
            let hash = self
                .chain
                .send_transaction(tx)
                .await
                .with_context(|| format!("broadcasting nonce {} of {address}", nonce + i as u64))?;
            info!("Transaction {} sent. Transaction hash: {hash}", i + 1);
            last_hash = Some(hash);
        }
        let last_hash = last_hash.context("batch is empty")?;
        info!("tx hash: {last_hash}");

        let succeeded = self
            .chain
            .wait_for_receipt(last_hash, self.settings.receipt_timeout)
            .await?;
        if !succeeded {
            warn!("transaction {last_hash} of {address} reverted");
        }
        Ok(Some(last_hash))
    }

    async fn sign_batch(
        &self,
        account: &Account,
        first_nonce: u64,
        gas_price: u128,
        payloads: &[String],
    ) -> anyhow::Result<Vec<TxEnvelope>> {
        let address = account.address();
        let mut signed = Vec::with_capacity(payloads.len());
        for (nonce, payload) in (first_nonce..).zip(payloads) {
            let tx = TransactionRequest::default()
                .with_from(address)
                .with_to(address)
                .with_nonce(nonce)
                .with_gas_price(gas_price)
                .with_gas_limit(self.settings.gas_limit)
                .with_chain_id(self.settings.chain_id)
                .with_value(U256::ZERO)
                .with_input(decode_data(payload)?)
                .build(&account.wallet)
                .await
                .with_context(|| format!("signing nonce {nonce} of {address}"))?;
            signed.push(tx);
        }
        Ok(signed)
    }
}
