// ===============================
// src/stream.rs
// ===============================
//
// Bybit V5 private stream adapter:
// - connect -> auth (HMAC) -> subscribe `execution`
// - app-level {"op":"ping"} every BYBIT_PING_INTERVAL_SECS
// - every non-control text frame goes to ExecutionPnlService::on_message
// - on drop/error: exponential backoff + jitter, then reconnect (forever)
//
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use thiserror::Error;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::bybit::{timestamp_ms, OpRequest, OpResponse};
use crate::config::Args;
use crate::decode::EXECUTION_TOPIC;
use crate::metrics::{WS_CONNECTED, WS_FRAMES, WS_LAST_FRAME_TS, WS_RECONNECTS};
use crate::service::ExecutionPnlService;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("bad ws url: {0}")]
    Url(#[from] url::ParseError),
    #[error("ws error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("auth rejected: {0}")]
    Auth(String),
    #[error("subscribe rejected: {0}")]
    Subscribe(String),
}

pub async fn run(svc: ExecutionPnlService, args: Args) {
    let mut attempt: u32 = 0;
    loop {
        match session(&svc, &args, &mut attempt).await {
            Ok(()) => info!("private stream closed, will reconnect…"),
            Err(StreamError::Url(e)) => {
                error!(?e, ws_url = %args.ws_url, "bad ws url, giving up");
                return;
            }
            Err(e) => error!(error = %e, "private stream failed"),
        }
        WS_CONNECTED.set(0);
        WS_RECONNECTS.inc();

        // Exponential backoff + jitter
        attempt = attempt.saturating_add(1);
        sleep(backoff(attempt)).await;
    }
}

/// 0.5s, 1s, 2s, ... capped at 16s, plus up to 250ms jitter.
fn backoff(attempt: u32) -> Duration {
    let shift = attempt.min(6);
    let base_ms = 250u64.saturating_mul(1u64 << shift);
    let jitter = rand::thread_rng().gen_range(0..=250);
    Duration::from_millis(base_ms + jitter)
}

async fn session(
    svc: &ExecutionPnlService,
    args: &Args,
    attempt: &mut u32,
) -> Result<(), StreamError> {
    let url = Url::parse(&args.ws_url)?;
    info!(ws_url = %args.ws_url, domain = args.domain.as_str(), "connecting bybit private stream");

    let (ws, _resp) = connect_async(url).await?;
    let (mut write, mut read) = ws.split();

    let expires = timestamp_ms() + args.auth_expires_ms;
    write
        .send(Message::Text(OpRequest::auth(&args.api_key, &args.api_secret, expires).to_json()))
        .await?;

    let mut ping = interval(Duration::from_secs(args.ping_interval_secs));
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await; // tick pertama langsung selesai

    loop {
        tokio::select! {
            frame = read.next() => {
                let txt = match frame {
                    Some(Ok(Message::Text(t))) => t,
                    Some(Ok(Message::Close(cf))) => {
                        info!(?cf, "close frame");
                        return Ok(());
                    }
                    Some(Ok(_)) => continue, // ping/pong/binary are handled by tungstenite
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                };
                WS_FRAMES.inc();
                WS_LAST_FRAME_TS.set(Utc::now().timestamp());

                match OpResponse::parse(&txt) {
                    Some(resp) => {
                        if let Some(next) = on_control(&resp)? {
                            write.send(Message::Text(next.to_json())).await?;
                        }
                        if resp.op == "subscribe" {
                            WS_CONNECTED.set(1);
                            *attempt = 0;
                            info!(topic = EXECUTION_TOPIC, conn_id = ?resp.conn_id, "subscribed");
                        }
                    }
                    None => svc.on_message(&txt),
                }
            }
            _ = ping.tick() => {
                write.send(Message::Text(OpRequest::ping().to_json())).await?;
            }
        }
    }
}

/// Handshake bookkeeping. Returns the next request to send, if any.
fn on_control(resp: &OpResponse) -> Result<Option<OpRequest>, StreamError> {
    let msg = || resp.ret_msg.clone().unwrap_or_default();
    match resp.op.as_str() {
        "auth" if resp.is_ok() => {
            info!(conn_id = ?resp.conn_id, "auth ok");
            Ok(Some(OpRequest::subscribe(&[EXECUTION_TOPIC])))
        }
        "auth" => Err(StreamError::Auth(msg())),
        "subscribe" if resp.is_ok() => Ok(None),
        "subscribe" => Err(StreamError::Subscribe(msg())),
        "pong" | "ping" => {
            debug!("pong");
            Ok(None)
        }
        other => {
            warn!(op = other, "unexpected control frame");
            Ok(None)
        }
    }
}
