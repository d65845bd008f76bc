use evoapp_publish::PublishError;
use evoapp_resolver::ResolveError;

/// Errors from the gateway clients.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<GatewayError> for PublishError {
    fn from(e: GatewayError) -> Self {
        PublishError::Network(e.to_string())
    }
}

/// Maps a gateway error into the resolver's error for a given lookup.
pub(crate) fn graph_error(e: GatewayError) -> ResolveError {
    ResolveError::Graph(e.to_string())
}

pub(crate) fn reputation_error(e: GatewayError) -> ResolveError {
    ResolveError::Reputation(e.to_string())
}

pub(crate) fn index_error(e: GatewayError) -> ResolveError {
    ResolveError::WrapperIndex(e.to_string())
}
