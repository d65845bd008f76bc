/// Errors produced while resolving a version.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("version graph lookup failed: {0}")]
    Graph(String),

    #[error("reputation lookup failed: {0}")]
    Reputation(String),

    #[error("wrapper lookup failed: {0}")]
    WrapperIndex(String),

    #[error("no versions to choose from")]
    Empty,
}
