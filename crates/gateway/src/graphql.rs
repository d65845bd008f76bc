//! Arweave GraphQL client: transaction tags, fork trees and wrapper lookup.

use std::collections::{HashMap, HashSet, VecDeque};

use evoapp_protocol::constants::{DATA_PROTOCOL, MANIFEST_CONTENT_TYPE, tags};
use evoapp_protocol::{Tag, VersionNode};
use evoapp_resolver::{BoxFuture, ResolveError, VersionGraph, WrapperIndex};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{GatewayError, graph_error, index_error};
use crate::http;

pub const DEFAULT_GRAPHQL_URL: &str = "https://arweave.net/graphql";

/// Fork chains deeper than this are cut off.
pub const MAX_FORK_DEPTH: usize = 32;

const PAGE_SIZE: u32 = 100;

const TX_QUERY: &str = "query ($ids: [ID!]) {
  transactions(ids: $ids) {
    edges { node { id owner { address } tags { name value } } }
  }
}";

const FORKS_QUERY: &str = "query ($id: String!, $first: Int, $after: String) {
  transactions(first: $first, after: $after, tags: [{ name: \"Forks\", values: [$id] }]) {
    pageInfo { hasNextPage }
    edges { cursor node { id } }
  }
}";

const WRAPPER_QUERY: &str = "query ($txid: String!, $contentType: String!, $protocol: String!) {
  transactions(tags: [
    { name: \"Content-Type\", values: [$contentType] },
    { name: \"Data-Protocol\", values: [$protocol] },
    { name: \"Wrapper-For\", values: [$txid] }
  ]) { edges { node { id } } }
}";

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

#[derive(Deserialize)]
struct TransactionsData {
    transactions: Connection,
}

#[derive(Deserialize)]
struct Connection {
    #[serde(default, rename = "pageInfo")]
    page_info: PageInfo,
    edges: Vec<Edge>,
}

#[derive(Default, Deserialize)]
struct PageInfo {
    #[serde(default, rename = "hasNextPage")]
    has_next_page: bool,
}

#[derive(Deserialize)]
struct Edge {
    #[serde(default)]
    cursor: Option<String>,
    node: TransactionNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub address: String,
}

/// A transaction as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionNode {
    pub id: String,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl TransactionNode {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

/// Arweave GraphQL endpoint.
#[derive(Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    url: String,
}

impl GraphqlClient {
    pub fn new(url: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http::client()?,
            url: url.to_string(),
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let body = http::read_body(resp).await?;
        let parsed: GraphqlResponse<T> = serde_json::from_slice(&body)?;

        if let Some(first) = parsed.errors.first() {
            return Err(GatewayError::InvalidResponse(format!(
                "graphql: {}",
                first.message
            )));
        }
        parsed
            .data
            .ok_or_else(|| GatewayError::InvalidResponse("graphql: no data".into()))
    }

    /// Looks up a single transaction with its tags.
    pub async fn transaction(&self, id: &str) -> Result<Option<TransactionNode>, GatewayError> {
        let data: TransactionsData = self.query(TX_QUERY, json!({ "ids": [id] })).await?;
        Ok(data.transactions.edges.into_iter().next().map(|e| e.node))
    }

    /// Ids of the transactions tagged as forks of `id`, following the
    /// cursor until the last page.
    pub async fn forks_of(&self, id: &str) -> Result<Vec<String>, GatewayError> {
        let mut ids = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let data: TransactionsData = self
                .query(
                    FORKS_QUERY,
                    json!({ "id": id, "first": PAGE_SIZE, "after": after }),
                )
                .await?;
            let Connection { page_info, edges } = data.transactions;
            let cursor = edges.last().and_then(|e| e.cursor.clone());
            ids.extend(edges.into_iter().map(|e| e.node.id));

            if !page_info.has_next_page {
                return Ok(ids);
            }
            match cursor {
                Some(next) if after.as_deref() != Some(next.as_str()) => after = Some(next),
                _ => {
                    return Err(GatewayError::InvalidResponse(format!(
                        "graphql: fork page for {id} has more results but no new cursor"
                    )));
                }
            }
        }
    }

    /// Builds the fork tree rooted at `root`. Ids already seen are skipped, so
    /// a cycle in the `Forks` tags cannot loop.
    pub async fn fork_tree(&self, root: &str) -> Result<VersionNode, GatewayError> {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::from([root.to_string()]);
        let mut queue = VecDeque::from([(root.to_string(), 0usize)]);

        while let Some((id, depth)) = queue.pop_front() {
            if depth >= MAX_FORK_DEPTH {
                tracing::warn!(id = %id, depth, "fork tree depth limit reached");
                continue;
            }
            let mut kept = Vec::new();
            for child in self.forks_of(&id).await? {
                if seen.insert(child.clone()) {
                    queue.push_back((child.clone(), depth + 1));
                    kept.push(child);
                }
            }
            children.insert(id, kept);
        }

        tracing::debug!(root, versions = seen.len(), "fork tree built");
        Ok(assemble(root, &mut children))
    }

    /// Newest wrapper manifest deployed for `base`.
    pub async fn find_wrapper(&self, base: &str) -> Result<Option<String>, GatewayError> {
        let data: TransactionsData = self
            .query(
                WRAPPER_QUERY,
                json!({
                    "txid": base,
                    "contentType": MANIFEST_CONTENT_TYPE,
                    "protocol": DATA_PROTOCOL,
                }),
            )
            .await?;
        Ok(data.transactions.edges.into_iter().last().map(|e| e.node.id))
    }
}

fn assemble(id: &str, children: &mut HashMap<String, Vec<String>>) -> VersionNode {
    let kids = children.remove(id).unwrap_or_default();
    VersionNode::with_children(
        id,
        kids.iter().map(|kid| assemble(kid, children)).collect(),
    )
}

impl VersionGraph for GraphqlClient {
    fn resolve<'a>(&'a self, root: &'a str) -> BoxFuture<'a, Result<VersionNode, ResolveError>> {
        Box::pin(async move { self.fork_tree(root).await.map_err(graph_error) })
    }
}

impl WrapperIndex for GraphqlClient {
    fn latest_wrapper<'a>(
        &'a self,
        base: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ResolveError>> {
        Box::pin(async move { self.find_wrapper(base).await.map_err(index_error) })
    }
}

/// Topics are stored as `Topic:<name>` tags.
pub(crate) fn topics_from_tags(list: &[Tag]) -> Vec<String> {
    list.iter()
        .filter_map(|t| t.name.strip_prefix(tags::TOPIC_PREFIX))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::{Reply, mock_server};

    fn edges(ids: &[&str]) -> String {
        let nodes: Vec<String> = ids
            .iter()
            .map(|id| format!(r#"{{"node":{{"id":"{id}"}}}}"#))
            .collect();
        format!(
            r#"{{"data":{{"transactions":{{"edges":[{}]}}}}}}"#,
            nodes.join(",")
        )
    }

    #[tokio::test]
    async fn transaction_returns_tags_and_owner() {
        let body = r#"{"data":{"transactions":{"edges":[{"node":{
            "id":"A","owner":{"address":"addr"},
            "tags":[{"name":"Title","value":"Todo"},{"name":"Topic:tools","value":"tools"}]
        }}]}}}"#;
        let (url, captured, handle) = mock_server(vec![Reply::ok(body)]).await;
        let client = GraphqlClient::new(&url).unwrap();

        let tx = client.transaction("A").await.unwrap().unwrap();
        assert_eq!(tx.tag("Title"), Some("Todo"));
        assert_eq!(tx.owner.unwrap().address, "addr");
        assert_eq!(topics_from_tags(&tx.tags), vec!["tools"]);

        let request: serde_json::Value =
            serde_json::from_slice(&captured.lock().unwrap()[0].body).unwrap();
        assert_eq!(request["variables"]["ids"][0], "A");
        handle.abort();
    }

    #[tokio::test]
    async fn missing_transaction_is_none() {
        let (url, _, handle) = mock_server(vec![Reply::ok(&edges(&[]))]).await;
        let client = GraphqlClient::new(&url).unwrap();
        assert!(client.transaction("A").await.unwrap().is_none());
        handle.abort();
    }

    #[tokio::test]
    async fn graphql_errors_are_reported() {
        let body = r#"{"errors":[{"message":"bad query"}]}"#;
        let (url, _, handle) = mock_server(vec![Reply::ok(body)]).await;
        let client = GraphqlClient::new(&url).unwrap();
        let err = client.forks_of("A").await.unwrap_err();
        assert!(err.to_string().contains("bad query"));
        handle.abort();
    }

    #[tokio::test]
    async fn forks_follow_cursor_across_pages() {
        let first = r#"{"data":{"transactions":{
            "pageInfo":{"hasNextPage":true},
            "edges":[{"cursor":"c1","node":{"id":"B"}},{"cursor":"c2","node":{"id":"C"}}]
        }}}"#;
        let second = r#"{"data":{"transactions":{
            "pageInfo":{"hasNextPage":false},
            "edges":[{"cursor":"c3","node":{"id":"D"}}]
        }}}"#;
        let (url, captured, handle) =
            mock_server(vec![Reply::ok(first), Reply::ok(second)]).await;
        let client = GraphqlClient::new(&url).unwrap();

        assert_eq!(client.forks_of("A").await.unwrap(), vec!["B", "C", "D"]);

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 2);
        let page1: serde_json::Value = serde_json::from_slice(&captured[0].body).unwrap();
        let page2: serde_json::Value = serde_json::from_slice(&captured[1].body).unwrap();
        assert!(page1["variables"]["after"].is_null());
        assert_eq!(page2["variables"]["after"], "c2");
        handle.abort();
    }

    #[tokio::test]
    async fn next_page_without_cursor_is_an_error() {
        let body = r#"{"data":{"transactions":{
            "pageInfo":{"hasNextPage":true},
            "edges":[{"node":{"id":"B"}}]
        }}}"#;
        let (url, _, handle) = mock_server(vec![Reply::ok(body)]).await;
        let client = GraphqlClient::new(&url).unwrap();
        let err = client.forks_of("A").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
        handle.abort();
    }

    #[tokio::test]
    async fn fork_tree_is_breadth_first_and_cycle_safe() {
        // A -> [B, C]; B -> [D, A]; C -> []; D -> []
        let replies = vec![
            Reply::ok(&edges(&["B", "C"])),
            Reply::ok(&edges(&["D", "A"])),
            Reply::ok(&edges(&[])),
            Reply::ok(&edges(&[])),
        ];
        let (url, captured, handle) = mock_server(replies).await;
        let client = GraphqlClient::new(&url).unwrap();

        let tree = client.fork_tree("A").await.unwrap();
        assert_eq!(
            tree,
            VersionNode::with_children(
                "A",
                vec![
                    VersionNode::with_children("B", vec![VersionNode::leaf("D")]),
                    VersionNode::leaf("C"),
                ],
            )
        );
        assert_eq!(captured.lock().unwrap().len(), 4);
        handle.abort();
    }

    #[tokio::test]
    async fn fork_tree_error_maps_to_graph_error() {
        let (url, _, handle) = mock_server(vec![Reply::status(500, "down")]).await;
        let client = GraphqlClient::new(&url).unwrap();
        let err = client.resolve("A").await.unwrap_err();
        assert!(matches!(err, ResolveError::Graph(_)));
        handle.abort();
    }

    #[tokio::test]
    async fn latest_wrapper_takes_last_edge() {
        let (url, captured, handle) = mock_server(vec![Reply::ok(&edges(&["W1", "W2"]))]).await;
        let client = GraphqlClient::new(&url).unwrap();
        assert_eq!(
            client.latest_wrapper("BASE").await.unwrap(),
            Some("W2".to_string())
        );

        let request: serde_json::Value =
            serde_json::from_slice(&captured.lock().unwrap()[0].body).unwrap();
        assert_eq!(request["variables"]["txid"], "BASE");
        assert_eq!(request["variables"]["protocol"], DATA_PROTOCOL);
        handle.abort();
    }

    #[tokio::test]
    async fn no_wrapper_is_none() {
        let (url, _, handle) = mock_server(vec![Reply::ok(&edges(&[]))]).await;
        let client = GraphqlClient::new(&url).unwrap();
        assert_eq!(client.latest_wrapper("BASE").await.unwrap(), None);
        handle.abort();
    }
}
