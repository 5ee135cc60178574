// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : pnl_stream_rust — realized PnL aggregator for Bybit executions
Module  : config.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Subscribes to the Bybit V5 private `execution` stream, prices
          every fill (derivative execPnl / spot signed notional, net of
          fee), keeps running totals per order, per symbol and overall,
          serves them over HTTP with Prometheus metrics, and optionally
          records/replays raw frames as JSONL.
=============================================================================
*/
use std::env;
use std::path::{Path, PathBuf};

use clap::Parser;
use dotenvy::dotenv;
use thiserror::Error;
use tracing::warn;

/// Command-line switches. Everything exchange-related comes from ENV (.env).
#[derive(Debug, Clone, Parser)]
#[command(name = "pnl_stream_rust", version, about = "Realized PnL from the Bybit execution stream")]
pub struct Cli {
    /// Replay a JSONL capture (RECORD_FILE output) instead of connecting
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Load this dotenv file instead of ./.env
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,

    /// Don't start the HTTP query/metrics server
    #[arg(long)]
    pub no_http: bool,
}

/// Bybit environment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Domain {
    Testnet,
    Mainnet,
}

impl Domain {
    pub fn parse(raw: &str) -> Domain {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Domain::Mainnet,
            _ => Domain::Testnet,
        }
    }

    pub fn default_ws_url(&self) -> &'static str {
        match self {
            Domain::Testnet => "wss://stream-testnet.bybit.com/v5/private",
            Domain::Mainnet => "wss://stream.bybit.com/v5/private",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Testnet => "testnet",
            Domain::Mainnet => "mainnet",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Args {
    // bybit
    pub domain: Domain,
    pub ws_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub ping_interval_secs: u64,
    pub auth_expires_ms: i64,

    // http / files
    pub http_port: u16,
    pub record_file: Option<String>,

    // cli
    pub replay: Option<PathBuf>,
    pub http_enabled: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required to connect to the private stream")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("cannot load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

pub fn load(cli: Cli) -> Result<Args, ConfigError> {
    // Pastikan .env dibaca; file eksplisit wajib ada, ./.env opsional
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile { path: path.clone(), source })?;
        }
        None => {
            let _ = dotenv();
        }
    }

    let domain = Domain::parse(&env::var("BYBIT_DOMAIN").unwrap_or_else(|_| "TESTNET".to_string()));
    let ws_url = env::var("BYBIT_WS_URL").unwrap_or_else(|_| domain.default_ws_url().to_string());

    let api_key = env::var("BYBIT_API_KEY").unwrap_or_default();
    let api_secret = env::var("BYBIT_API_SECRET").unwrap_or_default();
    // replay tidak butuh kredensial
    if cli.replay.is_none() {
        if api_key.is_empty() {
            return Err(ConfigError::Missing("BYBIT_API_KEY"));
        }
        if api_secret.is_empty() {
            return Err(ConfigError::Missing("BYBIT_API_SECRET"));
        }
    }

    let ping_interval_secs = parse_or("BYBIT_PING_INTERVAL_SECS", 20u64)?;
    let auth_expires_ms = parse_or("BYBIT_AUTH_EXPIRES_MS", 10_000i64)?;
    let http_port = parse_or("HTTP_PORT", 8080u16)?;
    let record_file = record_target(env::var("RECORD_FILE").ok(), cli.replay.as_deref());

    if ping_interval_secs == 0 {
        return Err(ConfigError::Invalid { key: "BYBIT_PING_INTERVAL_SECS", value: "0".into() });
    }

    Ok(Args {
        domain,
        ws_url,
        api_key,
        api_secret,
        ping_interval_secs,
        auth_expires_ms,
        http_port,
        record_file,
        replay: cli.replay,
        http_enabled: !cli.no_http,
    })
}

/// Replay never records: the capture being read may be RECORD_FILE itself,
/// and appending to it while reading would feed the same frames back in.
fn record_target(record_file: Option<String>, replay: Option<&Path>) -> Option<String> {
    let path = record_file.filter(|s| !s.trim().is_empty())?;
    if let Some(replay) = replay {
        warn!(record_file = %path, replay = %replay.display(), "RECORD_FILE ignored in replay mode");
        return None;
    }
    Some(path)
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: v }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_parsing_and_urls() {
        assert_eq!(Domain::parse("MAINNET"), Domain::Mainnet);
        assert_eq!(Domain::parse(" mainnet "), Domain::Mainnet);
        assert_eq!(Domain::parse("TESTNET"), Domain::Testnet);
        assert_eq!(Domain::parse("whatever"), Domain::Testnet);
        assert_eq!(Domain::Mainnet.default_ws_url(), "wss://stream.bybit.com/v5/private");
        assert_eq!(Domain::Testnet.default_ws_url(), "wss://stream-testnet.bybit.com/v5/private");
    }

    #[test]
    fn cli_flags() {
        let cli = Cli::parse_from(["pnl_stream_rust", "--replay", "cap.jsonl", "--no-http"]);
        assert_eq!(cli.replay, Some(PathBuf::from("cap.jsonl")));
        assert!(cli.no_http);
        assert!(cli.env_file.is_none());
    }

    #[test]
    fn replay_turns_recording_off() {
        let cap = PathBuf::from("cap.jsonl");
        assert_eq!(record_target(Some("cap.jsonl".into()), Some(cap.as_path())), None);
        assert_eq!(record_target(Some("other.jsonl".into()), Some(cap.as_path())), None);
        assert_eq!(record_target(Some("cap.jsonl".into()), None), Some("cap.jsonl".to_string()));
        assert_eq!(record_target(Some("  ".into()), None), None);
        assert_eq!(record_target(None, None), None);
    }

    #[test]
    fn parse_or_uses_default_and_rejects_junk() {
        // keys unique to this test so parallel tests don't race on ENV
        env::set_var("PNL_TEST_PORT_OK", "9000");
        env::set_var("PNL_TEST_PORT_BAD", "ninety");
        assert_eq!(parse_or("PNL_TEST_PORT_OK", 1u16).unwrap(), 9000);
        assert_eq!(parse_or("PNL_TEST_PORT_UNSET", 7u16).unwrap(), 7);
        assert!(matches!(
            parse_or("PNL_TEST_PORT_BAD", 1u16),
            Err(ConfigError::Invalid { key: "PNL_TEST_PORT_BAD", .. })
        ));
    }
}
