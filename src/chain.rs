//! The slice of the node's JSON-RPC the minter uses.

use alloy::consensus::TxEnvelope;
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::anyhow;
use std::time::Duration;
use url::Url;

pub const DEFAULT_RPC_URL: &str = "https://rpc.ankr.com/eth";

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Shared by every account's submission in a round, so implementations must
/// tolerate concurrent calls.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// `eth_gasPrice`, in wei.
    async fn gas_price(&self) -> anyhow::Result<u128>;

    async fn balance(&self, address: Address) -> anyhow::Result<U256>;

    /// Transaction count including pending transactions: the next free nonce.
    async fn pending_nonce(&self, address: Address) -> anyhow::Result<u64>;

    async fn send_transaction(&self, tx: TxEnvelope) -> anyhow::Result<TxHash>;

    /// Blocks until `hash` has a receipt and returns its success status.
    /// Errors once `timeout` elapses.
    async fn wait_for_receipt(&self, hash: TxHash, timeout: Duration) -> anyhow::Result<bool>;
}

pub struct RpcChain {
    provider: DynProvider,
}

impl RpcChain {
    pub fn connect(url: Url) -> Self {
        Self::new(ProviderBuilder::new().connect_http(url).erased())
    }

    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

impl ChainClient for RpcChain {
    async fn gas_price(&self) -> anyhow::Result<u128> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn balance(&self, address: Address) -> anyhow::Result<U256> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn pending_nonce(&self, address: Address) -> anyhow::Result<u64> {
        Ok(self
            .provider
            .get_transaction_count(address)
            .pending()
            .await?)
    }

    async fn send_transaction(&self, tx: TxEnvelope) -> anyhow::Result<TxHash> {
        let pending = self.provider.send_tx_envelope(tx).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: TxHash, timeout: Duration) -> anyhow::Result<bool> {
        let poll = async {
            loop {
                if let Some(receipt) = self.provider.get_transaction_receipt(hash).await? {
                    return anyhow::Ok(receipt.status());
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| anyhow!("no receipt for {hash} after {}s", timeout.as_secs()))?
    }
}
