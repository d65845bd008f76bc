//! Bundlr node client.
//!
//! Prices uploads, signs data items with the configured wallet and posts
//! them to the node.

use std::sync::Arc;

use evoapp_protocol::TxId;
use evoapp_publish::{
    BoxFuture, PublishError, SignedUnit, StorageNetwork, UploadUnit, Winston,
};
use serde::Deserialize;

use crate::data_item::sign_data_item;
use crate::error::GatewayError;
use crate::http;
use crate::wallet::Wallet;

#[derive(Deserialize)]
struct SubmitResponse {
    id: Option<String>,
}

/// A Bundlr node bound to one wallet.
#[derive(Clone)]
pub struct BundlrNode {
    http: reqwest::Client,
    host: String,
    wallet: Arc<Wallet>,
}

impl BundlrNode {
    pub fn new(host: &str, wallet: Arc<Wallet>) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http::client()?,
            host: host.trim_end_matches('/').to_string(),
            wallet,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Price in winston for storing `bytes` bytes.
    pub async fn price(&self, bytes: u64) -> Result<Winston, GatewayError> {
        let url = format!("{}/price/arweave/{bytes}", self.host);
        let resp = self.http.get(&url).send().await?;
        let body = http::read_body(resp).await?;
        let text = String::from_utf8_lossy(&body);
        let winston = text
            .trim()
            .trim_matches('"')
            .parse::<u128>()
            .map_err(|_| GatewayError::InvalidResponse(format!("price {:?}", text.trim())))?;
        Ok(Winston(winston))
    }

    /// Posts a signed data item. The node echoes the id; if it does not,
    /// the id fixed at signing time is returned.
    pub async fn post(&self, id: &TxId, bytes: &[u8]) -> Result<TxId, GatewayError> {
        let url = format!("{}/tx/arweave", self.host);
        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?;
        let body = http::read_body(resp).await?;

        let echoed = serde_json::from_slice::<SubmitResponse>(&body)
            .ok()
            .and_then(|r| r.id);
        match echoed {
            Some(echoed) if echoed != id.as_str() => Err(GatewayError::InvalidResponse(format!(
                "node returned id {echoed}, expected {id}"
            ))),
            _ => {
                tracing::debug!(id = %id, bytes = bytes.len(), "data item accepted");
                Ok(id.clone())
            }
        }
    }
}

impl StorageNetwork for BundlrNode {
    fn price_for(&self, bytes: u64) -> BoxFuture<'_, Result<Winston, PublishError>> {
        Box::pin(async move { Ok(self.price(bytes).await?) })
    }

    fn sign(&self, unit: UploadUnit) -> BoxFuture<'_, Result<SignedUnit, PublishError>> {
        let wallet = Arc::clone(&self.wallet);
        Box::pin(async move {
            // RSA signing is CPU-bound.
            let item = tokio::task::spawn_blocking(move || {
                sign_data_item(&wallet, &unit.data, &unit.tags)
            })
            .await
            .map_err(|e| PublishError::Network(format!("signing task failed: {e}")))??;
            Ok(SignedUnit {
                id: item.id,
                bytes: item.bytes,
            })
        })
    }

    fn submit<'a>(&'a self, unit: &'a SignedUnit) -> BoxFuture<'a, Result<TxId, PublishError>> {
        Box::pin(async move { Ok(self.post(&unit.id, &unit.bytes).await?) })
    }
}
