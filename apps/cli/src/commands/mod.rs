//! Subcommand implementations.

pub mod create;
pub mod get;
pub mod resolve;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use evoapp_gateway::{AtomicAssets, BundlrNode, GraphqlClient, Wallet, WarpDre};

use crate::config::CliConfig;

/// How a command finished, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The user declined a confirmation.
    Cancelled,
}

/// Exit code for a command that failed.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for a run the user cancelled at a confirmation.
pub const EXIT_CANCELLED: u8 = 3;

/// Loads the wallet, naming the keyfile on failure.
pub fn load_wallet(path: &Path) -> anyhow::Result<Arc<Wallet>> {
    let wallet = Wallet::from_file(path)
        .with_context(|| format!("loading wallet {}", path.display()))?;
    Ok(Arc::new(wallet))
}

/// Gateway clients for one invocation.
pub struct Clients {
    pub bundlr: BundlrNode,
    pub dre: WarpDre,
    pub assets: AtomicAssets,
}

impl Clients {
    pub fn connect(config: &CliConfig, host: &str, wallet: Arc<Wallet>) -> anyhow::Result<Self> {
        let bundlr = BundlrNode::new(host, wallet)?;
        let graphql = GraphqlClient::new(&config.graphql_url)?;
        let dre = WarpDre::new(&config.dre_url)?;
        let assets = AtomicAssets::new(bundlr.clone(), graphql, dre.clone(), &config.warp_gateway_url)?
            .with_contract_src(&config.contract_src);
        Ok(Self {
            bundlr,
            dre,
            assets,
        })
    }
}
