//! Warp DRE (distributed remote evaluation) state reads.

use std::collections::HashSet;

use evoapp_protocol::{Balances, VouchCounts};
use evoapp_publish::{BoxFuture, ContractState, PublishError};
use evoapp_resolver::{Reputation, ResolveError};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GatewayError, reputation_error};
use crate::http;

pub const DEFAULT_DRE_URL: &str = "https://dre-1.warp.cc/contract";

/// The stamps contract holding vouched stamps.
pub const DEFAULT_STAMPS_CONTRACT: &str = "FMRHYgSijiUNBrFy-XqyNNXenHsCV0ThR4lGAPO4chA";

#[derive(Deserialize)]
struct StateResponse {
    state: Option<Value>,
}

/// Reads evaluated contract state from a DRE node.
#[derive(Clone)]
pub struct WarpDre {
    http: reqwest::Client,
    url: String,
}

impl WarpDre {
    pub fn new(url: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http::client()?,
            url: url.to_string(),
        })
    }

    /// Evaluated state of `contract`.
    pub async fn state(&self, contract: &str) -> Result<Value, GatewayError> {
        let resp = self
            .http
            .get(&self.url)
            .query(&[("id", contract)])
            .send()
            .await?;
        let body = http::read_body(resp).await?;
        let parsed: StateResponse = serde_json::from_slice(&body)?;
        parsed.state.ok_or_else(|| {
            GatewayError::InvalidResponse(format!("no state for contract {contract}"))
        })
    }

    /// The `balances` table of a contract. A contract without one has no holders.
    pub async fn balances(&self, contract: &str) -> Result<Balances, GatewayError> {
        let state = self.state(contract).await?;
        balances_from_state(&state)
    }
}

pub(crate) fn balances_from_state(state: &Value) -> Result<Balances, GatewayError> {
    let Some(table) = state.get("balances") else {
        return Ok(Balances::new());
    };
    let table = table
        .as_object()
        .ok_or_else(|| GatewayError::InvalidResponse("balances is not an object".into()))?;

    table
        .iter()
        .map(|(address, amount)| {
            amount
                .as_u64()
                .map(|n| (address.clone(), n))
                .ok_or_else(|| {
                    GatewayError::InvalidResponse(format!(
                        "balance for {address} is not a whole number: {amount}"
                    ))
                })
        })
        .collect()
}

impl ContractState for WarpDre {
    fn read_balances<'a>(
        &'a self,
        contract: &'a str,
    ) -> BoxFuture<'a, Result<Balances, PublishError>> {
        Box::pin(async move { Ok(self.balances(contract).await?) })
    }
}

/// Vouched stamp counts, read from the stamps contract state.
#[derive(Clone)]
pub struct StampsReputation {
    dre: WarpDre,
    contract: String,
}

impl StampsReputation {
    pub fn new(dre: WarpDre, contract: &str) -> Self {
        Self {
            dre,
            contract: contract.to_string(),
        }
    }

    pub async fn vouched_counts(&self, ids: &[String]) -> Result<VouchCounts, GatewayError> {
        let state = self.dre.state(&self.contract).await?;
        let counts = count_vouched(&state, ids);
        tracing::debug!(
            versions = ids.len(),
            stamped = counts.values().filter(|n| **n > 0).count(),
            "stamp counts read"
        );
        Ok(counts)
    }
}

/// Counts stamps with `vouched: true` per asset. Every id in `ids` gets an
/// entry, zero when unstamped.
pub(crate) fn count_vouched(state: &Value, ids: &[String]) -> VouchCounts {
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut counts: VouchCounts = ids.iter().map(|id| (id.clone(), 0)).collect();

    let stamps = state.get("stamps").and_then(Value::as_object);
    for stamp in stamps.into_iter().flat_map(|m| m.values()) {
        let vouched = stamp.get("vouched").and_then(Value::as_bool).unwrap_or(false);
        if !vouched {
            continue;
        }
        if let Some(asset) = stamp.get("asset").and_then(Value::as_str)
            && wanted.contains(asset)
            && let Some(n) = counts.get_mut(asset)
        {
            *n += 1;
        }
    }
    counts
}

impl Reputation for StampsReputation {
    fn counts<'a>(
        &'a self,
        ids: &'a [String],
    ) -> BoxFuture<'a, Result<VouchCounts, ResolveError>> {
        Box::pin(async move { self.vouched_counts(ids).await.map_err(reputation_error) })
    }
}
