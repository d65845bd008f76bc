//! `evoapp resolve <id>`: shows which version a wrapper would open.

use clap::Args;
use evoapp_gateway::{GraphqlClient, StampsReputation, WarpDre};
use evoapp_protocol::TxId;
use evoapp_resolver::{Resolution, Resolver, abort_url};

use crate::commands::Outcome;
use crate::config::CliConfig;
use crate::options::validate_tx_id;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Transaction ID of the base version (43 characters)
    #[arg(value_parser = validate_tx_id)]
    pub id: TxId,

    /// Print the resolution as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase verbosity of logs and errors
    #[arg(long)]
    pub debug: bool,
}

pub async fn run(args: ResolveArgs, config: &CliConfig) -> anyhow::Result<Outcome> {
    let graphql = GraphqlClient::new(&config.graphql_url)?;
    let reputation = StampsReputation::new(WarpDre::new(&config.dre_url)?, &config.stamps_contract);

    let resolution = Resolver::new(&graphql, &reputation)
        .resolve(args.id.as_str())
        .await?;
    let wrapper = match graphql.find_wrapper(args.id.as_str()).await {
        Ok(wrapper) => wrapper,
        Err(e) => {
            tracing::warn!(error = %e, "wrapper lookup failed");
            None
        }
    };

    if args.json {
        let value = serde_json::json!({
            "versions": resolution
                .versions
                .iter()
                .map(|id| serde_json::json!({ "id": id, "vouched": resolution.count(id) }))
                .collect::<Vec<_>>(),
            "selected": resolution.selected,
            "url": format!("{}{}", config.gateway(), resolution.selected),
            "wrapper": wrapper,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", render(&resolution, &config.gateway()));
        if let Some(wrapper) = wrapper.as_deref() {
            println!("wrapper: {}{wrapper}", config.gateway());
        }
        println!(
            "escape:  {}",
            abort_url(wrapper.as_deref(), args.id.as_str())
        );
    }
    Ok(Outcome::Done)
}

/// One line per version in pre-order, the selection marked with `*`.
fn render(resolution: &Resolution, gateway: &str) -> String {
    let mut out = String::new();
    for id in &resolution.versions {
        let mark = if *id == resolution.selected { '*' } else { ' ' };
        out.push_str(&format!("{mark} {id}  {} vouched\n", resolution.count(id)));
    }
    out.push_str(&format!("selected: {gateway}{}\n", resolution.selected));
    out
}
