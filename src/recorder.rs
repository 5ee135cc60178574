// ===============================
// src/recorder.rs
// ===============================
//
// JSONL recorder + replay:
// - run    : tulis setiap Event (raw frame / priced fill) ke file .jsonl (append),
//            BufWriter, flush tiap 1s dan/atau tiap 1000 event, reopen kalau gagal.
// - replay : baca capture, kirim ulang setiap Frame lewat on_message.
//            Fill lines are ignored, they get recomputed.
//
// ENV: set `RECORD_FILE=/path/to/frames.jsonl` agar aktif (lihat main.rs).
//
use std::path::Path;
use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter},
    sync::mpsc,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info, warn};

use crate::domain::Event;
use crate::service::ExecutionPnlService;

async fn open_writer(path: &str) -> std::io::Result<BufWriter<File>> {
    // Pastikan parent directory ada (kalau ada)
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent).await {
                error!(?e, %path, "recorder: create_dir_all failed");
            }
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    Ok(BufWriter::new(file))
}

pub async fn run(mut rx: mpsc::Receiver<Event>, path: String) {
    info!(%path, "recorder: started");
    let mut writer = match open_writer(&path).await {
        Ok(w) => w,
        Err(e) => {
            error!(?e, %path, "recorder: open failed, recording disabled");
            return;
        }
    };

    // Flush periodik (tiap 1 detik) + flush berbasis jumlah event
    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut since_last_flush: u32 = 0;
    const FLUSH_EVERY_N_EVENTS: u32 = 1000;

    loop {
        tokio::select! {
            maybe_ev = rx.recv() => {
                let Some(ev) = maybe_ev else {
                    // Channel closed: flush dan keluar
                    let _ = writer.flush().await;
                    info!("recorder: channel closed, stopped");
                    break;
                };

                let mut line = match serde_json::to_string(&ev) {
                    Ok(s) => s,
                    Err(e) => {
                        error!(?e, "recorder: serialize error, skip event");
                        continue;
                    }
                };
                line.push('\n');

                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    error!(?e, "recorder: write_all failed, attempting reopen");
                    writer = match open_writer(&path).await {
                        Ok(w) => w,
                        Err(e2) => {
                            error!(?e2, "recorder: reopen failed, recording stopped");
                            return;
                        }
                    };
                    // coba lagi sekali setelah reopen
                    if let Err(e2) = writer.write_all(line.as_bytes()).await {
                        error!(?e2, "recorder: write_all failed again after reopen, drop event");
                        continue;
                    }
                }

                since_last_flush += 1;
                if since_last_flush >= FLUSH_EVERY_N_EVENTS {
                    let _ = writer.flush().await;
                    since_last_flush = 0;
                }
            }

            _ = tick.tick() => {
                let _ = writer.flush().await;
                since_last_flush = 0;
            }
        }
    }
}

/// Feed every recorded frame through the service. Returns frames replayed.
pub async fn replay(path: &Path, svc: &ExecutionPnlService) -> std::io::Result<u64> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut frames: u64 = 0;
    let mut lineno: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        lineno += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(&line) {
            Ok(Event::Frame { raw, .. }) => {
                svc.on_message(&raw);
                frames += 1;
            }
            Ok(_) => {}
            Err(e) => warn!(line = lineno, error = %e, "replay: bad line, skipped"),
        }
    }
    info!(path = %path.display(), frames, "replay: done");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PnlStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("pnl_stream_rust_{}_{}", std::process::id(), name))
            .join("capture.jsonl")
    }

    #[tokio::test]
    async fn record_then_replay_reproduces_totals() {
        let path = temp_path("roundtrip");
        let _ = std::fs::remove_file(&path);

        let (tx, rx) = mpsc::channel(64);
        let recorder = tokio::spawn(run(rx, path.to_string_lossy().into_owned()));

        let live = ExecutionPnlService::new(Arc::new(PnlStore::new())).with_recorder(tx);
        live.on_message(r#"{"topic":"execution","data":[{"category":"linear","orderId":"o1","symbol":"BTCUSDT","execPnl":"10.5","execFee":"0.2"}]}"#);
        live.on_message(r#"{"topic":"wallet","data":[]}"#);
        live.on_message(r#"{"topic":"execution","data":[{"category":"spot","orderId":"o2","symbol":"ETHUSDT","side":"Buy","execValue":"100","execFee":"0.1"}]}"#);
        let live_total = live.total_realized_pnl();
        drop(live);
        recorder.await.unwrap();

        let offline = ExecutionPnlService::new(Arc::new(PnlStore::new()));
        let frames = replay(&path, &offline).await.unwrap();

        assert_eq!(frames, 3);
        assert_eq!(live_total, dec!(-89.8));
        assert_eq!(offline.total_realized_pnl(), live_total);
        assert_eq!(offline.store().realized_pnl_for_order("o2"), dec!(-100.1));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn replay_skips_junk_lines() {
        let path = temp_path("junk");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let frame = Event::Frame {
            ts_ms: 0,
            raw: r#"{"topic":"execution","data":[{"category":"linear","execPnl":"4"}]}"#.into(),
        };
        let body = format!("not json\n\n{}\n{{\"Note\":\"hi\"}}\n", serde_json::to_string(&frame).unwrap());
        std::fs::write(&path, body).unwrap();

        let svc = ExecutionPnlService::new(Arc::new(PnlStore::new()));
        assert_eq!(replay(&path, &svc).await.unwrap(), 1);
        assert_eq!(svc.total_realized_pnl(), dec!(4));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn replay_missing_file_is_an_error() {
        let svc = ExecutionPnlService::new(Arc::new(PnlStore::new()));
        assert!(replay(Path::new("/definitely/not/here.jsonl"), &svc).await.is_err());
    }
}
