//! HTTP implementations of the evoapp collaborators.
//!
//! - [`BundlrNode`] prices, signs and posts data items ([`StorageNetwork`]).
//! - [`GraphqlClient`] reads tags, fork trees and wrapper deployments
//!   ([`VersionGraph`], [`WrapperIndex`]).
//! - [`WarpDre`] reads contract state ([`ContractState`]) and
//!   [`StampsReputation`] turns the stamps contract into vouch counts
//!   ([`Reputation`]).
//! - [`AtomicAssets`] mints and reads app assets ([`AssetRegistry`]).
//!
//! Data items are signed locally with a JWK [`Wallet`].
//!
//! [`StorageNetwork`]: evoapp_publish::StorageNetwork
//! [`ContractState`]: evoapp_publish::ContractState
//! [`AssetRegistry`]: evoapp_publish::AssetRegistry
//! [`VersionGraph`]: evoapp_resolver::VersionGraph
//! [`WrapperIndex`]: evoapp_resolver::WrapperIndex
//! [`Reputation`]: evoapp_resolver::Reputation

pub mod assets;
pub mod bundlr;
pub mod data_item;
pub mod deep_hash;
pub mod dre;
pub mod error;
pub mod graphql;
pub mod http;
pub mod wallet;

pub use assets::{AtomicAssets, DEFAULT_CONTRACT_SRC, DEFAULT_WARP_GATEWAY};
pub use bundlr::BundlrNode;
pub use data_item::{DataItem, sign_data_item};
pub use dre::{DEFAULT_DRE_URL, DEFAULT_STAMPS_CONTRACT, StampsReputation, WarpDre};
pub use error::GatewayError;
pub use graphql::{DEFAULT_GRAPHQL_URL, GraphqlClient, TransactionNode};
pub use wallet::Wallet;
