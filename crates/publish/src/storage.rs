//! Collaborator traits for the storage network, asset registry and
//! contract state.
//!
//! The CLI wires HTTP implementations from `evoapp-gateway`; tests use
//! in-memory mocks. Keeping these behind traits keeps the publish flow
//! decoupled from transport.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use evoapp_protocol::{AssetInfo, Balances, Tag, TxId};

use crate::error::PublishError;

/// Boxed future returned by collaborator methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Winston per AR.
const WINSTON_PER_AR: u128 = 1_000_000_000_000;

/// A storage price in winston (10^-12 AR).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Winston(pub u128);

impl Winston {
    /// Formats the amount in AR with six decimals.
    pub fn to_ar_string(self) -> String {
        let whole = self.0 / WINSTON_PER_AR;
        let micro = (self.0 % WINSTON_PER_AR) / 1_000_000;
        format!("{whole}.{micro:06}")
    }
}

impl fmt::Display for Winston {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw bytes plus tags, ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadUnit {
    pub data: Vec<u8>,
    pub tags: Vec<Tag>,
}

impl UploadUnit {
    pub fn new(data: Vec<u8>, tags: Vec<Tag>) -> Self {
        Self { data, tags }
    }

    /// Returns the value of the first tag named `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

/// A signed upload unit. The identifier is fixed at signing time, so
/// resubmitting the same unit never creates a second transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUnit {
    pub id: TxId,
    pub bytes: Vec<u8>,
}

/// Storage network (Bundlr node) collaborator.
pub trait StorageNetwork: Send + Sync {
    /// Quotes the cost of storing `bytes` bytes.
    fn price_for(&self, bytes: u64) -> BoxFuture<'_, Result<Winston, PublishError>>;

    /// Signs an upload unit with the configured wallet.
    fn sign(&self, unit: UploadUnit) -> BoxFuture<'_, Result<SignedUnit, PublishError>>;

    /// Submits a signed unit and returns its identifier once accepted.
    fn submit<'a>(&'a self, unit: &'a SignedUnit) -> BoxFuture<'a, Result<TxId, PublishError>>;
}

/// Everything needed to mint an app asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub asset_type: String,
    pub group_id: String,
    pub title: String,
    pub description: String,
    pub topics: Vec<String>,
    pub balances: Balances,
    pub forks: Option<TxId>,
    /// Asset payload (the serialized manifest).
    pub data: String,
    pub content_type: String,
    /// Free-form metadata (release notes).
    pub meta: String,
    pub custom_tags: Vec<Tag>,
}

/// Content-addressed asset collaborator.
pub trait AssetRegistry: Send + Sync {
    fn create(&self, request: AssetRequest) -> BoxFuture<'_, Result<TxId, PublishError>>;

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<AssetInfo, PublishError>>;
}

/// Contract-state collaborator, used to inherit balances when forking.
pub trait ContractState: Send + Sync {
    fn read_balances<'a>(&'a self, contract: &'a str)
    -> BoxFuture<'a, Result<Balances, PublishError>>;
}
