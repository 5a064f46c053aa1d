//! Command-line driver for one OpsGenie notification cycle.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use crate::{Messages, Notifier, OpsGenieConfig, OpsGenieNotifier};

/// Command-line arguments of `opsgenie-notify`.
#[derive(Debug, Parser)]
#[command(name = "opsgenie-notify", version, about = "Send health-check alerts to OpsGenie")]
pub struct Args {
    /// Notifier config file (JSON or TOML). Environment is used when absent.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON array of messages. Reads stdin when absent or `-`.
    #[arg(long)]
    pub messages: Option<PathBuf>,

    /// Override the cluster name shown in alerts.
    #[arg(long, env = "OPSGENIE_CLUSTER_NAME")]
    pub cluster_name: Option<String>,

    /// Override the OpsGenie API base URL.
    #[arg(long, env = "OPSGENIE_API_URL")]
    pub api_url: Option<String>,
}

/// How a notification cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every message was dispatched.
    Sent,
    /// The notifier is disabled; nothing was sent.
    Disabled,
    /// At least one dispatch failed.
    DispatchFailed,
    /// Configuration or messages could not be loaded.
    InvalidInput,
}

impl Outcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Sent | Self::Disabled => 0,
            Self::DispatchFailed => 1,
            Self::InvalidInput => 2,
        }
    }
}

/// Resolve the notifier configuration: file or environment, then overrides.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub fn load_config(args: &Args) -> Result<OpsGenieConfig> {
    let mut config = match &args.config {
        Some(path) => OpsGenieConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => OpsGenieConfig::from_env(),
    };

    if let Some(cluster_name) = &args.cluster_name {
        config.cluster_name.clone_from(cluster_name);
    }
    if let Some(api_url) = &args.api_url {
        config.api_url.clone_from(api_url);
    }

    Ok(config)
}

/// Read the message batch from `path`, or from `stdin` when absent or `-`.
///
/// # Errors
///
/// Returns an error if the input cannot be read or is not a JSON array of
/// health checks.
pub fn load_messages(path: Option<&PathBuf>, stdin: impl Read) -> Result<Messages> {
    let raw = match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read messages from {}", path.display()))?,
        _ => {
            let mut raw = String::new();
            let mut stdin = stdin;
            stdin
                .read_to_string(&mut raw)
                .context("Failed to read messages from stdin")?;
            raw
        }
    };

    serde_json::from_str(&raw).context("Messages must be a JSON array of health checks")
}

/// Load configuration and messages, then run one notification cycle.
pub async fn run(args: &Args, stdin: impl Read) -> Outcome {
    let loaded = load_config(args)
        .and_then(|config| Ok((config, load_messages(args.messages.as_ref(), stdin)?)));
    let (config, messages) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Unable to start notification cycle");
            return Outcome::InvalidInput;
        }
    };

    info!(?config, count = messages.len(), "Notifier configured");

    let notifier = OpsGenieNotifier::new(config);
    if !notifier.enabled() {
        info!("OpsGenie notifier disabled, nothing sent");
        return Outcome::Disabled;
    }

    if notifier.notify(&messages).await {
        Outcome::Sent
    } else {
        Outcome::DispatchFailed
    }
}
