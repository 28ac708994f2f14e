//! # vop
//!
//! Command-line driver for the Visa Offers Platform user API.
//!
//! Credentials come from `--config <file.toml>` or, without it, from the
//! `VISA_API_*` environment variables. Responses are printed to stdout as
//! pretty JSON; logs go to stderr.
//!
//! ## Commands
//!
//! - `vop hello-world` - connectivity check
//! - `vop get-user <USER_KEY>` - fetch an enrollment record
//! - `vop enroll-user <USER_KEY> <CARD_JSON>` - enroll with one card
//! - `vop add-card <USER_KEY> <CARD_JSON>` - add a card
//! - `vop delete-card <USER_KEY> <CARD_ID>` - remove a card
//! - `vop unenroll-user <USER_KEY>` - unenroll

#![allow(
    clippy::print_stdout,
    reason = "stdout carries the command result"
)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use vop_client::{ClientConfig, VopClient};

mod observability;

use observability::{LogFormat, init_observability};

/// Visa Offers Platform user API client
#[derive(Debug, Parser)]
#[command(name = "vop")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a TOML configuration file (default: VISA_API_* environment)
    #[arg(short, long, global = true, env = "VOP_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// MLE key id; enables message-level encryption together with --mle-server-key
    #[arg(long, global = true, env = "VISA_API_MLE_KEY_ID", requires = "mle_server_key")]
    mle_key_id: Option<String>,

    /// MLE server public key PEM
    #[arg(long, global = true, env = "VISA_API_MLE_SERVER_KEY", hide_env_values = true)]
    mle_server_key: Option<String>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "VOP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Call the connectivity check endpoint
    HelloWorld,

    /// Fetch a user's enrollment record
    GetUser {
        /// User key
        user_key: String,
    },

    /// Enroll a user with one card
    EnrollUser {
        /// User key
        user_key: String,
        /// Card as a JSON object, e.g. '{"cardNumber":"4111111111111111"}'
        #[arg(value_parser = parse_json)]
        card: Value,
    },

    /// Add a card to an enrolled user
    AddCard {
        /// User key
        user_key: String,
        /// Card as a JSON object
        #[arg(value_parser = parse_json)]
        card: Value,
    },

    /// Remove a card from an enrolled user
    DeleteCard {
        /// User key
        user_key: String,
        /// Card id
        card_id: String,
    },

    /// Unenroll a user
    UnenrollUser {
        /// User key
        user_key: String,
    },
}

fn parse_json(value: &str) -> Result<Value, String> {
    serde_json::from_str(value).map_err(|e| format!("invalid JSON: {e}"))
}

fn load_config(path: Option<&PathBuf>) -> Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(ClientConfig::from_env()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_observability(LogFormat::from_env(), &cli.log_level);

    let config = load_config(cli.config.as_ref())?;
    let client = VopClient::new(config).context("failed to create client")?;

    if let (Some(key_id), Some(server_key)) = (&cli.mle_key_id, &cli.mle_server_key) {
        client.init_mle(key_id, server_key).context("failed to initialize MLE")?;
        info!(key_id = %key_id, "message-level encryption enabled");
    }

    let result = match cli.command {
        Command::HelloWorld => client.hello_world().await,
        Command::GetUser { user_key } => client.get_user(&user_key).await,
        Command::EnrollUser { user_key, card } => client.enroll_user(&user_key, card).await,
        Command::AddCard { user_key, card } => client.add_card(&user_key, card).await,
        Command::DeleteCard { user_key, card_id } => client.delete_card(&user_key, &card_id).await,
        Command::UnenrollUser { user_key } => client.unenroll_user(&user_key).await,
    }?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_enroll_user() {
        let cli = Cli::try_parse_from([
            "vop",
            "enroll-user",
            "u-1",
            r#"{"cardNumber":"4111111111111111"}"#,
        ])
        .unwrap();

        let Command::EnrollUser { user_key, card } = cli.command else {
            panic!("expected enroll-user");
        };
        assert_eq!(user_key, "u-1");
        assert_eq!(card["cardNumber"], "4111111111111111");
    }

    #[test]
    fn test_parse_rejects_bad_card_json() {
        assert!(Cli::try_parse_from(["vop", "add-card", "u-1", "{not json"]).is_err());
    }

    #[test]
    fn test_parse_delete_card_with_config() {
        let cli =
            Cli::try_parse_from(["vop", "delete-card", "u-1", "card-7", "--config", "vop.toml"])
                .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("vop.toml")));
        assert!(matches!(cli.command, Command::DeleteCard { ref card_id, .. } if card_id == "card-7"));
    }
}
