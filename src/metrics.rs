// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Stream health --------
pub static WS_FRAMES: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("ws_frames_total", "text frames received").unwrap());

pub static WS_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("ws_connected", "1 if the private stream is connected and authed, 0 otherwise")
        .unwrap()
});

pub static WS_RECONNECTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("ws_reconnects_total", "Number of reconnects to the private stream").unwrap()
});

pub static WS_LAST_FRAME_TS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("ws_last_frame_ts", "Unix seconds of the last received frame").unwrap()
});

// -------- Executions / PnL --------
pub static EXECUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("executions_total", "execution records by outcome (priced / skip_*)"),
        &["outcome"],
    )
    .unwrap()
});

pub static DECODE_ERRORS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("decode_errors_total", "frames that failed to decode").unwrap());

// f64 mirror of the decimal total, display only
pub static PNL_TOTAL: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("pnl_total_realized", "total net realized PnL").unwrap());

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(WS_FRAMES.clone())),
        REGISTRY.register(Box::new(WS_CONNECTED.clone())),
        REGISTRY.register(Box::new(WS_RECONNECTS.clone())),
        REGISTRY.register(Box::new(WS_LAST_FRAME_TS.clone())),
        REGISTRY.register(Box::new(EXECUTIONS.clone())),
        REGISTRY.register(Box::new(DECODE_ERRORS.clone())),
        REGISTRY.register(Box::new(PNL_TOTAL.clone())),
    ] {
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}
