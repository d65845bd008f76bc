//! Field validation and interactive completion of `create` options.
//!
//! Supplied values that fail validation are reported, cleared and asked
//! for again, so a typo never aborts a run.

use std::path::{Path, PathBuf};

use evoapp_protocol::constants::{
    ALLOWED_HOSTS, DEFAULT_INDEX, DESCRIPTION_LEN, GROUP_ID_LEN, TITLE_LEN, TX_ID_LEN,
};
use evoapp_protocol::{AppKind, TxId};
use evoapp_publish::manifest::snapshot_file_name;

use crate::commands::create::CreateArgs;
use crate::config::CliConfig;
use crate::prompt::{Prompter, ask};

/// Everything `create` needs once prompting is done.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePlan {
    pub folder: PathBuf,
    pub kind: AppKind,
    pub wallet: PathBuf,
    pub title: String,
    pub description: String,
    pub group_id: Option<String>,
    pub topics: String,
    pub forks: Option<TxId>,
    pub balance: u64,
    /// Release notes text, read from the file given.
    pub release_notes: String,
    pub host: String,
    pub index_file: String,
    pub source_code: Option<TxId>,
    pub logo: Option<TxId>,
    /// Previously written manifest to publish instead of uploading.
    pub manifest: Option<PathBuf>,
}

fn check_len(value: &str, (min, max): (usize, usize)) -> Result<String, String> {
    let len = value.chars().count();
    if len < min {
        return Err(format!("Too short. Must be at least {min} characters."));
    }
    if len > max {
        return Err(format!("Too long. Must be a maximum of {max} characters."));
    }
    Ok(value.to_string())
}

pub fn validate_title(value: &str) -> Result<String, String> {
    check_len(value, TITLE_LEN)
}

pub fn validate_description(value: &str) -> Result<String, String> {
    check_len(value, DESCRIPTION_LEN)
}

pub fn validate_group_id(value: &str) -> Result<String, String> {
    check_len(value, GROUP_ID_LEN)
}

pub fn validate_tx_id(value: &str) -> Result<TxId, String> {
    TxId::parse(value)
        .map_err(|_| format!("Must be a Transaction ID ({TX_ID_LEN} characters)."))
}

pub fn validate_balance(value: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| "Balance must be a non-negative integer".to_string())
}

pub fn validate_host(value: &str) -> Result<String, String> {
    let host = value.trim_end_matches('/');
    if ALLOWED_HOSTS.contains(&host) {
        Ok(host.to_string())
    } else {
        Err(format!(
            "Must be a valid bundlr node (one of {}).",
            ALLOWED_HOSTS.join(", ")
        ))
    }
}

pub fn validate_wallet(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("No keyfile found at {value}"))
    }
}

pub fn validate_topics(value: &str) -> Result<String, String> {
    if evoapp_publish::parse_topics(value).is_empty() {
        Err("Provide at least one topic".into())
    } else {
        Ok(value.to_string())
    }
}

fn read_release_notes(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))
}

fn warn(field: &str, reason: &str) {
    println!("• \"{field}\" {reason}");
}

/// Validates a supplied value, clearing it (with a warning) when invalid.
fn supplied<T>(
    field: &str,
    value: Option<&str>,
    validate: impl Fn(&str) -> Result<T, String>,
) -> Option<T> {
    let value = value?;
    match validate(value) {
        Ok(v) => Some(v),
        Err(reason) => {
            warn(field, &reason);
            None
        }
    }
}

/// Completes the options of `evoapp create`, prompting for anything missing.
pub fn resolve_create(
    args: &CreateArgs,
    config: &CliConfig,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<CreatePlan> {
    let kind = args.kind;
    let optional = !args.skip_optional;

    let wallet_arg = args
        .wallet
        .as_ref()
        .or(config.wallet.as_ref())
        .map(|p| p.to_string_lossy().into_owned());
    let mut wallet = supplied("wallet", wallet_arg.as_deref(), validate_wallet);
    let mut title = supplied("title", args.title.as_deref(), validate_title);
    let mut description = supplied("description", args.description.as_deref(), validate_description);
    let mut group_id = match kind {
        // Forks inherit the group of the version they fork.
        AppKind::Fork => None,
        AppKind::Base => supplied("groupId", args.group_id.as_deref(), validate_group_id),
    };
    let mut topics = supplied("topics", args.topics.as_deref(), validate_topics);
    let mut forks = supplied("forks", args.forks.as_deref(), validate_tx_id);
    let mut balance = supplied("balance", args.balance.as_deref(), validate_balance);
    let mut release_notes = args.release_notes.as_ref().and_then(|p| match read_release_notes(p) {
        Ok(text) => Some(text),
        Err(reason) => {
            warn("release-notes", &reason);
            None
        }
    });
    let mut host = supplied("host", args.host.as_deref(), validate_host);
    let source_code = supplied("sourceCode", args.source_code.as_deref(), validate_tx_id);
    let logo = supplied("logo", args.logo.as_deref(), validate_tx_id);
    let index_file = args.index_file.clone();

    if wallet.is_none() {
        wallet = Some(ask(prompter, "Provide a path to your keyfile", None, validate_wallet)?);
    }
    if title.is_none() {
        title = Some(ask(prompter, "Provide a title for your app", None, validate_title)?);
    }
    if description.is_none() {
        description = Some(ask(
            prompter,
            "Provide a description for your app",
            None,
            validate_description,
        )?);
    }
    if group_id.is_none() && kind == AppKind::Base && optional {
        group_id = ask(
            prompter,
            "Provide an optional groupId for your app (leave empty to skip)",
            None,
            |v| match v {
                "" => Ok(None),
                v => validate_group_id(v).map(Some),
            },
        )?;
    }
    if topics.is_none() {
        topics = Some(ask(
            prompter,
            "Provide a list of comma-separated topics",
            None,
            validate_topics,
        )?);
    }
    if forks.is_none() && kind == AppKind::Fork {
        forks = Some(ask(
            prompter,
            "Provide a transaction ID for the app you are remixing",
            None,
            validate_tx_id,
        )?);
    }
    if balance.is_none() {
        balance = Some(ask(
            prompter,
            "Set the number of tokens you wish to mint",
            None,
            validate_balance,
        )?);
    }
    if release_notes.is_none() && optional {
        release_notes = ask(
            prompter,
            "Provide a path to your release notes (leave empty to skip)",
            None,
            |v| match v {
                "" => Ok(None),
                v => read_release_notes(Path::new(v)).map(Some),
            },
        )?;
    }
    if host.is_none() && optional {
        let choices: Vec<&str> = std::iter::once(config.host.as_str())
            .chain(ALLOWED_HOSTS.iter().copied().filter(|h| *h != config.host))
            .collect();
        let picked = prompter.select("Choose a preferred host for bundlr", &choices)?;
        host = validate_host(&picked).ok();
    }
    let index_file = match index_file {
        Some(index) => index,
        None if optional => ask(
            prompter,
            "Provide an index file for your manifest",
            Some(DEFAULT_INDEX),
            |v| Ok::<_, String>(v.to_string()),
        )?,
        None => DEFAULT_INDEX.to_string(),
    };

    let manifest = match &args.manifest {
        Some(path) => Some(path.clone()),
        None if optional
            && prompter
                .confirm("Do you already have a manifest file you would like to deploy?")? =>
        {
            let initial = snapshot_file_name(&args.folder);
            Some(ask(
                prompter,
                "Please provide a path to the file containing your manifest",
                Some(&initial),
                |v| {
                    if v.ends_with(".json") {
                        Ok(PathBuf::from(v))
                    } else {
                        Err("Must be a file of type json.".to_string())
                    }
                },
            )?)
        }
        None => None,
    };

    let host = match host {
        Some(host) => host,
        None => validate_host(&config.host).map_err(anyhow::Error::msg)?,
    };

    Ok(CreatePlan {
        folder: args.folder.clone(),
        kind,
        wallet: wallet.unwrap_or_default(),
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        group_id,
        topics: topics.unwrap_or_default(),
        forks,
        balance: balance.unwrap_or_default(),
        release_notes: release_notes.unwrap_or_default(),
        host,
        index_file,
        source_code,
        logo,
        manifest,
    })
}
