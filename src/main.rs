// ===============================
// src/main.rs
// ===============================
/*
 # query
 curl -s localhost:8080/pnl/total
 curl -s localhost:8080/pnl/symbol/BTCUSDT
 curl -s localhost:8080/pnl/order/<orderId>
 curl -s localhost:8080/metrics | egrep '^(executions_total|pnl_total_realized|ws_connected)'

 # offline
 cargo run -- --replay data/frames.jsonl --no-http
*/
/*
=============================================================================
Project : pnl_stream_rust — realized PnL aggregator for Bybit executions
Module  : main.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Subscribes to the Bybit V5 private `execution` stream, prices
          every fill (derivative execPnl / spot signed notional, net of
          fee), keeps running totals per order, per symbol and overall,
          serves them over HTTP with Prometheus metrics, and optionally
          records/replays raw frames as JSONL.
=============================================================================
*/
mod domain;
mod config;
mod metrics;
mod recorder;
mod decode;
mod pnl;
mod store;
mod service;
mod bybit;    // auth signing + control frames
mod stream;   // private websocket adapter (reconnect/ping)
mod http;     // query API + /metrics

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::domain::Event;
use crate::service::ExecutionPnlService;
use crate::store::PnlStore;

#[tokio::main]
async fn main() -> ExitCode {
    // ---- Logging ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ---- Load config ----
    let cli = config::Cli::parse();
    let args = match config::load(cli) {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "config error");
            return ExitCode::FAILURE;
        }
    };

    info!(
        domain = args.domain.as_str(),
        ws_url = %args.ws_url,
        http_port = args.http_port,
        http_enabled = args.http_enabled,
        record_file = ?args.record_file,
        replay = ?args.replay,
        "startup config"
    );

    // ---- Metrics ----
    metrics::init();

    // ---- State (hidup selama proses) ----
    let mut svc = ExecutionPnlService::new(Arc::new(PnlStore::new()));

    // ---- Recorder (optional) ----
    let mut recorder_task = None;
    if let Some(path) = args.record_file.clone() {
        let (rec_tx, rec_rx) = mpsc::channel::<Event>(8192);
        let _ = rec_tx.try_send(Event::Note(format!("started domain={}", args.domain.as_str())));
        svc = svc.with_recorder(rec_tx);
        recorder_task = Some(tokio::spawn(recorder::run(rec_rx, path)));
    }

    // ---- HTTP query API ----
    if args.http_enabled {
        let store_http = Arc::clone(svc.store());
        let port = args.http_port;
        tokio::spawn(async move {
            if let Err(e) = http::serve(port, store_http).await {
                error!(error = %e, port, "http server failed");
            }
        });
    }

    let code = match args.replay.clone() {
        // ---- Replay (offline) ----
        Some(path) => match recorder::replay(&path, &svc).await {
            Ok(frames) => {
                let snap = svc.store().snapshot();
                info!(
                    frames,
                    fills = snap.fills_merged,
                    total = %svc.total_realized_pnl(),
                    orders = snap.by_order.len(),
                    symbols = snap.by_symbol.len(),
                    "replay totals"
                );
                if args.http_enabled {
                    info!("replay finished, still serving queries (ctrl-c to exit)");
                    let _ = tokio::signal::ctrl_c().await;
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "replay failed");
                ExitCode::FAILURE
            }
        },
        // ---- Live stream ----
        None => tokio::select! {
            _ = stream::run(svc.clone(), args) => {
                error!("stream task ended");
                ExitCode::FAILURE
            }
            _ = tokio::signal::ctrl_c() => {
                info!(total = %svc.total_realized_pnl(), "shutdown");
                ExitCode::SUCCESS
            }
        },
    };

    // drop sender supaya recorder flush dan selesai
    drop(svc);
    if let Some(task) = recorder_task {
        let _ = task.await;
    }
    code
}
