//! Atomic-asset registry: one data item that is both the asset payload and a
//! SmartWeave contract, registered with the Warp gateway.

use evoapp_protocol::constants::{DATA_PROTOCOL, tags};
use evoapp_protocol::{AssetInfo, Tag, TxId};
use evoapp_publish::{AssetRegistry, AssetRequest, BoxFuture, PublishError, StorageNetwork, UploadUnit};
use serde_json::json;

use crate::bundlr::BundlrNode;
use crate::dre::WarpDre;
use crate::error::GatewayError;
use crate::graphql::{GraphqlClient, topics_from_tags};
use crate::http;

pub const DEFAULT_WARP_GATEWAY: &str = "https://gateway.warp.cc";

/// Atomic asset contract source.
pub const DEFAULT_CONTRACT_SRC: &str = "Of9pi--Gj7hCTawhgxOwbuWnFI1h24TTgO5pw8ENJNQ";

const APP_NAME: &str = "SmartWeaveContract";
const APP_VERSION: &str = "0.3.0";

/// Creates and reads atomic assets.
pub struct AtomicAssets {
    http: reqwest::Client,
    bundlr: BundlrNode,
    graphql: GraphqlClient,
    dre: WarpDre,
    warp_gateway: String,
    contract_src: String,
}

impl AtomicAssets {
    pub fn new(
        bundlr: BundlrNode,
        graphql: GraphqlClient,
        dre: WarpDre,
        warp_gateway: &str,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http::client()?,
            bundlr,
            graphql,
            dre,
            warp_gateway: warp_gateway.trim_end_matches('/').to_string(),
            contract_src: DEFAULT_CONTRACT_SRC.to_string(),
        })
    }

    pub fn with_contract_src(mut self, contract_src: &str) -> Self {
        self.contract_src = contract_src.to_string();
        self
    }

    /// Tags of the asset data item, in the order they are written.
    pub fn asset_tags(&self, request: &AssetRequest) -> Vec<Tag> {
        let init_state = json!({
            "ticker": "ATOMIC-ASSET",
            "name": request.title,
            "balances": request.balances,
            "claimable": [],
        });

        let mut out = vec![
            Tag::new(tags::CONTENT_TYPE, &request.content_type),
            Tag::new("App-Name", APP_NAME),
            Tag::new("App-Version", APP_VERSION),
            Tag::new("Contract-Src", &self.contract_src),
            Tag::new("Init-State", init_state.to_string()),
            Tag::new(tags::DATA_PROTOCOL, DATA_PROTOCOL),
            Tag::new(tags::TYPE, &request.asset_type),
            Tag::new(tags::TITLE, &request.title),
            Tag::new(tags::DESCRIPTION, &request.description),
        ];
        if !request.group_id.is_empty() {
            out.push(Tag::new(tags::GROUP_ID, &request.group_id));
        }
        if let Some(forks) = &request.forks {
            out.push(Tag::new(tags::FORKS, forks.as_str()));
        }
        if !request.meta.is_empty() {
            out.push(Tag::new("Meta", &request.meta));
        }
        for topic in &request.topics {
            out.push(Tag::new(format!("{}{topic}", tags::TOPIC_PREFIX), topic));
        }
        out.extend(
            request
                .custom_tags
                .iter()
                .filter(|t| !t.value.is_empty())
                .cloned(),
        );
        out
    }

    /// Asks the Warp gateway to index a contract uploaded through Bundlr.
    async fn register(&self, id: &TxId) -> Result<(), GatewayError> {
        let node = self
            .bundlr
            .host()
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let url = format!("{}/gateway/contracts/register", self.warp_gateway);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "id": id.as_str(), "bundlrNode": node }))
            .send()
            .await?;
        http::read_body(resp).await?;
        Ok(())
    }

    pub async fn create_asset(&self, request: AssetRequest) -> Result<TxId, PublishError> {
        let unit = UploadUnit::new(request.data.clone().into_bytes(), self.asset_tags(&request));
        let signed = self.bundlr.sign(unit).await?;
        let id = self.bundlr.submit(&signed).await?;
        self.register(&id).await?;
        tracing::info!(id = %id, title = %request.title, "atomic asset registered");
        Ok(id)
    }

    /// Reads an asset: metadata from its tags, holders from its contract state.
    pub async fn asset(&self, id: &str) -> Result<AssetInfo, GatewayError> {
        let tx = self
            .graphql
            .transaction(id)
            .await?
            .ok_or_else(|| GatewayError::InvalidResponse(format!("asset {id} not found")))?;

        let balances = match self.dre.balances(id).await {
            Ok(balances) => balances,
            Err(e) => {
                tracing::warn!(id, error = %e, "contract state unavailable");
                Default::default()
            }
        };

        let tag = |name: &str| tx.tag(name).unwrap_or_default().to_string();
        Ok(AssetInfo {
            id: tx.id.clone(),
            title: tag(tags::TITLE),
            description: tag(tags::DESCRIPTION),
            asset_type: tag(tags::TYPE),
            topics: topics_from_tags(&tx.tags),
            group_id: tag(tags::GROUP_ID),
            forks: tag(tags::FORKS),
            owner: tx.owner.as_ref().map(|o| o.address.clone()).unwrap_or_default(),
            balances,
            tags: tx.tags.clone(),
        })
    }
}

impl AssetRegistry for AtomicAssets {
    fn create(&self, request: AssetRequest) -> BoxFuture<'_, Result<TxId, PublishError>> {
        Box::pin(self.create_asset(request))
    }

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<AssetInfo, PublishError>> {
        Box::pin(async move { Ok(self.asset(id).await?) })
    }
}
