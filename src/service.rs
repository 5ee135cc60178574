// ===============================
// src/service.rs
// ===============================
//
// The one entry point the stream adapter (and replay) calls: on_message(raw).
// decode -> price -> merge, per record. Nothing in here blocks or panics on a
// bad frame; decode errors are logged and counted, skips are informational.
//
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::decode::decode_message;
use crate::domain::{Event, ExecutionEvent};
use crate::metrics::{DECODE_ERRORS, EXECUTIONS, PNL_TOTAL};
use crate::pnl::{price, Pricing, SkipReason};
use crate::store::PnlStore;

#[derive(Clone)]
pub struct ExecutionPnlService {
    store: Arc<PnlStore>,
    rec_tx: Option<mpsc::Sender<Event>>,
}

impl ExecutionPnlService {
    pub fn new(store: Arc<PnlStore>) -> Self {
        Self { store, rec_tx: None }
    }

    /// Mirror frames and priced fills to the recorder (best effort, never waits).
    pub fn with_recorder(mut self, rec_tx: mpsc::Sender<Event>) -> Self {
        self.rec_tx = Some(rec_tx);
        self
    }

    pub fn store(&self) -> &Arc<PnlStore> {
        &self.store
    }

    pub fn on_message(&self, raw: &str) {
        debug!(frame = %raw, "ws frame");
        self.record(Event::Frame { ts_ms: Utc::now().timestamp_millis(), raw: raw.to_string() });

        let events = match decode_message(raw) {
            Ok(evs) => evs,
            Err(e) => {
                DECODE_ERRORS.inc();
                warn!(error = %e, "dropping undecodable frame");
                return;
            }
        };

        for ev in &events {
            self.on_execution(ev);
        }
    }

    fn on_execution(&self, ev: &ExecutionEvent) {
        let net = match price(ev) {
            Pricing::Net(net) => net,
            Pricing::Skip(reason) => {
                EXECUTIONS.with_label_values(&[reason.label()]).inc();
                info!(
                    reason = reason.label(),
                    category = ?ev.category_raw,
                    symbol = ?ev.symbol,
                    order_id = ?ev.order_id,
                    side = ?ev.side_raw,
                    "execution skipped"
                );
                return;
            }
        };

        let total = match self.store.merge(ev.order_id.as_deref(), ev.symbol.as_deref(), net) {
            Ok(total) => total,
            Err(e) => {
                EXECUTIONS.with_label_values(&[SkipReason::Overflow.label()]).inc();
                warn!(
                    error = %e,
                    symbol = ?ev.symbol,
                    order_id = ?ev.order_id,
                    "execution dropped, store unchanged"
                );
                return;
            }
        };
        EXECUTIONS.with_label_values(&["priced"]).inc();
        PNL_TOTAL.set(total.to_f64().unwrap_or(0.0));

        info!(
            category = ?ev.category_raw,
            symbol = ?ev.symbol,
            side = ?ev.side.map(|s| s.as_str()),
            qty = ?ev.exec_qty,
            value = ?ev.exec_value,
            fee = ?ev.exec_fee,
            pnl = %net,
            "EXECUTION"
        );

        self.record(Event::Fill {
            ts_ms: ev.exec_time_ms.unwrap_or_else(|| Utc::now().timestamp_millis()),
            order_id: ev.order_id.clone(),
            symbol: ev.symbol.clone(),
            category: ev.category,
            side: ev.side,
            net_pnl: net,
        });
    }

    fn record(&self, ev: Event) {
        if let Some(tx) = &self.rec_tx {
            let _ = tx.try_send(ev);
        }
    }

    pub fn total_realized_pnl(&self) -> Decimal {
        self.store.total_realized_pnl()
    }
}
