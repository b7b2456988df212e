//! Remote pinning service adapter (Pinata-compatible HTTP API)
//!
//! - upload: multipart `POST {api}/pinning/pinFileToIPFS`
//! - fetch:  `GET {gateway}/ipfs/{cid}`
//! - unpin:  `DELETE {api}/pinning/unpin/{cid}`
//!
//! The bearer token comes from `PinningConfig` and is only sent to the API
//! host, never to the gateway.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{BlobMetadata, BlobStore, StoreError};
use crate::config::{ConfigError, PinningConfig};
use crate::snapshot::ContentId;

/// Longest error body echoed back in `StoreError::Rejected`
const MAX_ERROR_BODY: usize = 512;

pub struct PinningServiceStore {
    client: Client,
    api_base: String,
    gateway_base: String,
    jwt: String,
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
    #[serde(rename = "PinSize", default)]
    pin_size: Option<u64>,
}

impl PinningServiceStore {
    /// Build the adapter from validated configuration; fails closed without a token
    pub fn new(config: &PinningConfig) -> Result<Self, ConfigError> {
        let jwt = config.credential()?.to_string();
        let api_base = config.api_url()?.as_str().trim_end_matches('/').to_string();
        let gateway_base = config
            .gateway_url()?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base,
            gateway_base,
            jwt,
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/pinning/pinFileToIPFS", self.api_base)
    }

    fn fetch_url(&self, id: &ContentId) -> String {
        format!("{}/ipfs/{}", self.gateway_base, id)
    }

    fn unpin_url(&self, id: &ContentId) -> String {
        format!("{}/pinning/unpin/{}", self.api_base, id)
    }
}

fn network(e: reqwest::Error) -> StoreError {
    StoreError::Network(e.to_string())
}

async fn rejected(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    StoreError::Rejected { status, message }
}

/// Content ids are placed in URL paths; anything but a plain token is refused
fn check_id(id: &ContentId) -> Result<(), StoreError> {
    let ok = !id.as_str().is_empty() && id.as_str().chars().all(|c| c.is_ascii_alphanumeric());
    if ok {
        Ok(())
    } else {
        Err(StoreError::NotFound(id.clone()))
    }
}

#[async_trait]
impl BlobStore for PinningServiceStore {
    async fn upload(&self, bytes: Bytes, metadata: &BlobMetadata) -> Result<ContentId, StoreError> {
        let size = bytes.len();
        let file_name = format!("{}.json", metadata.name);
        let part = Part::bytes(bytes.to_vec())
            .file_name(file_name)
            .mime_str("application/json")
            .map_err(network)?;
        let metadata_json =
            serde_json::to_string(metadata).map_err(|e| StoreError::Decode(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata_json);

        let response = self
            .client
            .post(self.upload_url())
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(network)?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        if pinned.ipfs_hash.is_empty() {
            return Err(StoreError::Decode("empty IpfsHash in pin response".into()));
        }

        info!(
            "Pinned {} bytes as {} (reported size {:?})",
            size, pinned.ipfs_hash, pinned.pin_size
        );
        Ok(ContentId::new(pinned.ipfs_hash))
    }

    async fn fetch(&self, id: &ContentId) -> Result<Bytes, StoreError> {
        check_id(id)?;
        let response = self
            .client
            .get(self.fetch_url(id))
            .send()
            .await
            .map_err(network)?;

        match response.status() {
            s if s.is_success() => response.bytes().await.map_err(network),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.clone())),
            _ => Err(rejected(response).await),
        }
    }

    async fn unpin(&self, id: &ContentId) -> Result<(), StoreError> {
        check_id(id)?;
        let response = self
            .client
            .delete(self.unpin_url(id))
            .bearer_auth(&self.jwt)
            .send()
            .await
            .map_err(network)?;

        match response.status() {
            s if s.is_success() => {
                debug!("Unpinned {}", id);
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.clone())),
            _ => Err(rejected(response).await),
        }
    }
}
