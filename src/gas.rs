use crate::chain::ChainClient;
use log::info;

pub const GWEI: u128 = 1_000_000_000;

/// Bid for the next batch and the network price it was derived from, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasQuote {
    pub bid: u128,
    pub current: u128,
}

#[derive(Debug, Clone)]
pub struct GasPolicy {
    /// bids stay under this, in wei
    ceiling: u128,
    /// no round is started above this network price, in wei
    max_gas_price: u128,
}

impl GasPolicy {
    pub fn new(ceiling: u128, max_gas_price: u128) -> Self {
        Self {
            ceiling,
            max_gas_price,
        }
    }

    /// Outbids the network by 20% while that stays under the ceiling.
    /// Otherwise moves a fifth of the way from the network price towards the
    /// ceiling, which is below the network price when it is already above
    /// the ceiling.
    ///
    /// Computed in `f64` then truncated, the same arithmetic the bot always
    /// used.
    pub fn quote(&self, current: u128) -> GasQuote {
        let boosted = (current as f64 * 1.2) as u128;
        let bid = if boosted < self.ceiling {
            boosted
        } else {
            let distance = self.ceiling as f64 - current as f64;
            (distance * 0.2 + current as f64) as u128
        };
        GasQuote { bid, current }
    }

    pub fn too_expensive(&self, current: u128) -> bool {
        current > self.max_gas_price
    }

    pub async fn fetch_quote<C: ChainClient>(&self, chain: &C) -> anyhow::Result<GasQuote> {
        let quote = self.quote(chain.gas_price().await?);
        info!(
            "now gas price {} max gas price {}, bidding {}",
            quote.current, self.ceiling, quote.bid
        );
        Ok(quote)
    }
}

pub fn format_gwei(wei: u128) -> String {
    format!("{}", wei as f64 / GWEI as f64)
}
