//! `evoapp get <id>`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use evoapp_protocol::TxId;
use evoapp_publish::AssetRegistry;

use crate::commands::{Clients, Outcome, load_wallet};
use crate::config::CliConfig;
use crate::options::{validate_tx_id, validate_wallet};
use crate::prompt::{StdioPrompter, ask};

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Transaction ID of the app (43 characters)
    #[arg(value_parser = validate_tx_id)]
    pub id: TxId,

    /// Path to your keyfile
    #[arg(short, long)]
    pub wallet: Option<PathBuf>,

    /// Increase verbosity of logs and errors
    #[arg(long)]
    pub debug: bool,
}

pub async fn run(args: GetArgs, config: &CliConfig) -> anyhow::Result<Outcome> {
    let wallet_path = match args.wallet.or_else(|| config.wallet.clone()) {
        Some(path) => path,
        None => ask(
            &mut StdioPrompter::stdin(),
            "Please provide a path to your Arweave wallet keyfile",
            None,
            validate_wallet,
        )?,
    };
    let wallet = load_wallet(&wallet_path)?;
    let clients = Clients::connect(config, &config.host, wallet)?;

    tracing::debug!(id = %args.id, "fetching app");
    let info = clients
        .assets
        .get(args.id.as_str())
        .await
        .context("Error occurred whilst fetching data")?;

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(Outcome::Done)
}
