//! `evoapp create <folder> <base|fork>`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use evoapp_protocol::{AppKind, Manifest};
use evoapp_publish::{
    AppDraft, PnpmBuild, PublishContext, Publisher, ScanReport, UploadCache, UploadQuote,
    WrapperRequest, load_snapshot, parse_topics,
};
use serde_json::json;

use crate::commands::{Clients, Outcome, load_wallet};
use crate::config::{CliConfig, upload_cache_path};
use crate::options::{CreatePlan, resolve_create};
use crate::output;
use crate::prompt::{Prompter, StdioPrompter};

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Folder containing the built app
    pub folder: PathBuf,

    /// Whether this is a base version or a fork of another version
    #[arg(value_parser = parse_kind, value_name = "base|fork")]
    pub kind: AppKind,

    /// Path to your keyfile
    #[arg(short, long)]
    pub wallet: Option<PathBuf>,

    /// Title of the app (max. 80 characters)
    #[arg(short, long)]
    pub title: Option<String>,

    /// Description of the app (max. 300 characters)
    #[arg(short, long)]
    pub description: Option<String>,

    /// Transaction ID of the app being forked
    #[arg(short, long)]
    pub forks: Option<String>,

    /// Number of tokens to mint for your work
    #[arg(short, long)]
    pub balance: Option<String>,

    /// Transaction ID of the app's source code
    #[arg(short, long)]
    pub source_code: Option<String>,

    /// Index file for the manifest, relative to the folder
    #[arg(short, long)]
    pub index_file: Option<String>,

    /// Path to release notes
    #[arg(long)]
    pub release_notes: Option<PathBuf>,

    /// Unique identifier for your app (base versions only)
    #[arg(long, alias = "groupId")]
    pub group_id: Option<String>,

    /// Bundlr node URL (e.g. https://node2.bundlr.network)
    #[arg(long)]
    pub host: Option<String>,

    /// Comma-separated topics (e.g. react,todo,warp)
    #[arg(long)]
    pub topics: Option<String>,

    /// Transaction ID of the app logo
    #[arg(long)]
    pub logo: Option<String>,

    /// Publish a previously written manifest instead of uploading the folder
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Files uploaded in parallel
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip confirmation steps
    #[arg(long)]
    pub skip_confirmation: bool,

    /// Skip prompts for optional fields
    #[arg(long)]
    pub skip_optional: bool,

    /// Increase verbosity of logs and errors
    #[arg(long)]
    pub debug: bool,
}

fn parse_kind(value: &str) -> Result<AppKind, String> {
    match value {
        "base" => Ok(AppKind::Base),
        "fork" => Ok(AppKind::Fork),
        _ => Err("You can only specify an application as a base or fork".into()),
    }
}

/// Where the manifest comes from.
enum Source {
    Upload { report: ScanReport, quote: UploadQuote },
    Snapshot(Manifest),
}

pub async fn run(args: CreateArgs, config: &CliConfig) -> anyhow::Result<Outcome> {
    std::fs::read_dir(&args.folder)
        .with_context(|| format!("cannot read folder {}", args.folder.display()))?;

    let mut prompter = StdioPrompter::stdin();
    let plan = resolve_create(&args, config, &mut prompter)?;

    let wallet = load_wallet(&plan.wallet)?;
    let owner = wallet.address().to_string();
    let clients = Clients::connect(config, &plan.host, wallet)?;
    let builder = PnpmBuild::new(config.build_tool.clone()).with_output(args.debug);

    let mut publisher = Publisher::new(PublishContext {
        storage: &clients.bundlr,
        registry: &clients.assets,
        contracts: &clients.dre,
        builder: &builder,
        retry: config.retry_policy(),
        concurrency: args
            .concurrency
            .unwrap_or(config.upload_concurrency)
            .max(1),
        gateway: config.gateway(),
    });
    let progress = publisher.take_events().map(output::spawn_progress);

    let cancel = publisher.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });

    let result = publish(
        &publisher,
        &plan,
        &owner,
        config,
        args.skip_confirmation,
        &mut prompter,
    )
    .await;

    interrupt.abort();
    drop(publisher);
    if let Some(progress) = progress {
        let _ = progress.await;
    }
    result
}

async fn publish(
    publisher: &Publisher<'_>,
    plan: &CreatePlan,
    owner: &str,
    config: &CliConfig,
    skip_confirmation: bool,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<Outcome> {
    let source = match &plan.manifest {
        Some(path) => Source::Snapshot(
            load_snapshot(path)
                .with_context(|| format!("loading manifest {}", path.display()))?,
        ),
        None => {
            let report = publisher.scan(&plan.folder).await?;
            let quote = publisher.quote(&report).await?;
            Source::Upload { report, quote }
        }
    };

    println!("{}", summary(plan, owner));
    if let Source::Upload { quote, .. } = &source {
        println!("Uploading {}", output::describe_quote(quote));
    }
    if !skip_confirmation
        && !prompter.confirm("Would you like to confirm the following changes?")?
    {
        println!("Deployment cancelled");
        return Ok(Outcome::Cancelled);
    }

    let manifest = match source {
        Source::Snapshot(manifest) => manifest,
        Source::Upload { report, .. } => {
            let mut cache = if config.upload_cache {
                match UploadCache::load(&upload_cache_path()) {
                    Ok(cache) => Some(cache),
                    Err(e) => {
                        tracing::warn!(error = %e, "upload cache unavailable");
                        None
                    }
                }
            } else {
                None
            };

            let uploaded = publisher
                .upload(&plan.folder, &report, Some(&plan.index_file), cache.as_mut())
                .await;
            if let Some(cache) = cache.as_mut()
                && let Err(e) = cache.save()
            {
                tracing::warn!(error = %e, "failed to save upload cache");
            }
            let manifest = uploaded?;

            let cwd = std::env::current_dir()?;
            let path = publisher.write_manifest(&manifest, &plan.folder, &cwd).await?;
            println!("Manifest written to {}", path.display());
            manifest
        }
    };

    let mut group_id = plan.group_id.clone();
    if let (AppKind::Fork, Some(parent)) = (plan.kind, &plan.forks) {
        let info = publisher.fork_source(parent).await?;
        println!("Forked version found, group id {:?}", info.group_id);
        group_id = Some(info.group_id).filter(|g| !g.is_empty());
    }

    let draft = AppDraft {
        kind: plan.kind,
        title: plan.title.clone(),
        description: plan.description.clone(),
        topics: plan.topics.clone(),
        group_id,
        forks: plan.forks.clone(),
        balance: plan.balance,
        owner: owner.to_string(),
        release_notes: plan.release_notes.clone(),
        source_code: plan.source_code.clone(),
        logo: plan.logo.clone(),
    };
    let id = publisher.create_asset(&draft, &manifest).await?;
    println!("You've successfully deployed your evolutionary app! Transaction ID: {id}");
    println!("Visit your deployment at: {}{id}", config.gateway());

    if plan.kind == AppKind::Base {
        println!("Deploying app wrapper...");
        let wrapper_id = publisher
            .deploy_wrapper(&WrapperRequest {
                base_id: id.to_string(),
                title: plan.title.clone(),
                description: plan.description.clone(),
                topics: parse_topics(&plan.topics),
                logo: plan.logo.as_ref().map(|l| l.to_string()),
            })
            .await?;
        println!(
            "App wrapper successfully deployed at {}{wrapper_id}",
            config.gateway()
        );
    }

    Ok(Outcome::Done)
}

/// The options shown before publishing.
fn summary(plan: &CreatePlan, owner: &str) -> String {
    let value = json!({
        "folder": plan.folder.display().to_string(),
        "type": plan.kind,
        "owner": owner,
        "title": plan.title,
        "description": plan.description,
        "groupId": plan.group_id,
        "topics": parse_topics(&plan.topics),
        "forks": plan.forks,
        "balance": plan.balance,
        "sourceCode": plan.source_code,
        "logo": plan.logo,
        "host": plan.host,
        "indexFile": plan.index_file,
        "manifest": plan.manifest.as_ref().map(|p| p.display().to_string()),
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}
