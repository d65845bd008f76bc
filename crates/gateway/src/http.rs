//! Shared HTTP helpers.

use crate::error::GatewayError;

/// Builds the HTTP client shared by the gateway clients.
pub fn client() -> Result<reqwest::Client, GatewayError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("evoapp/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Returns the response body, or an `Api` error for non-success statuses.
pub(crate) async fn read_body(resp: reqwest::Response) -> Result<Vec<u8>, GatewayError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GatewayError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.bytes().await?.to_vec())
}
