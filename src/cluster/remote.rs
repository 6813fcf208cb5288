//! Registry pull from a seed node over HTTP.

use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;

use super::protocol::{ENDPOINT_REGISTRY, RegistryTransfer};
use crate::error::TransportError;

#[derive(Clone, Default)]
pub struct RemoteRegistryClient {
    http_client: reqwest::Client,
}

impl RemoteRegistryClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    async fn get_with_retry(
        &self,
        url: String,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            match self.http_client.get(url.clone()).timeout(timeout).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }

    /// Fetches the interceptor registry of `map_name` from `peer`.
    pub async fn fetch_registry(
        &self,
        peer: SocketAddr,
        map_name: &str,
    ) -> Result<RegistryTransfer, TransportError> {
        let unreachable = |reason: String| TransportError::Unreachable {
            member: peer.to_string(),
            reason,
        };

        let url = format!("http://{}{}", peer, ENDPOINT_REGISTRY.replace(":name", map_name));
        let response = self
            .get_with_retry(url, Duration::from_millis(500), 5)
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unreachable(format!("registry request returned {}", response.status())));
        }

        let transfer: Option<RegistryTransfer> = response
            .json()
            .await
            .map_err(|e| TransportError::Frame(e.to_string()))?;
        let transfer = transfer.ok_or_else(|| unreachable("empty registry response".to_string()))?;

        tracing::info!(
            "Fetched {} interceptor(s) of map '{}' from {}",
            transfer.entries.len(),
            map_name,
            peer
        );
        Ok(transfer)
    }
}
