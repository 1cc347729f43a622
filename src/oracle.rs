//! Client of the ethscriptions existence API.
//!
//! `GET {base}/api/ethscriptions/exists/{sha256}` answers `{"result": bool}`.
//! The answer only holds at query time; someone else may mint the same payload
//! before our transaction lands, and nothing here can prevent that.

use crate::payload::{content_digest, encode_data};
use log::{info, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ORACLE_URL: &str = "https://ethscriber.xyz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Not minted yet. Carries the payload's data encoding.
    Available(String),
    Taken,
    /// The lookup failed; nothing is known about the payload.
    Unknown,
}

#[allow(async_fn_in_trait)]
pub trait ExistenceOracle {
    async fn check(&self, payload: &str) -> Availability;
}

#[derive(Deserialize, Debug)]
struct ExistsResponse {
    result: bool,
}

pub struct HttpOracle {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOracle {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').into(),
        })
    }

    fn exists_url(&self, digest: &str) -> String {
        format!("{}/api/ethscriptions/exists/{}", self.base_url, digest)
    }
}

impl ExistenceOracle for HttpOracle {
    async fn check(&self, payload: &str) -> Availability {
        let url = self.exists_url(&content_digest(payload));
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Existence lookup for {payload} failed: {e}");
                return Availability::Unknown;
            }
        };
        if response.status() != StatusCode::OK {
            info!("Failed to get messages. Status code: {}", response.status());
            return Availability::Unknown;
        }
        match response.json::<ExistsResponse>().await {
            Ok(body) => classify(payload, body.result),
            Err(e) => {
                warn!("Unreadable existence response for {payload}: {e}");
                Availability::Unknown
            }
        }
    }
}

fn classify(payload: &str, exists: bool) -> Availability {
    if exists {
        info!("the {payload} has been minted, skip");
        Availability::Taken
    } else {
        info!("the {payload} is not minted, can be minted");
        Availability::Available(encode_data(payload))
    }
}
