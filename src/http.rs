// ===============================
// src/http.rs
// ===============================
//
// Read-only query API over the PnL store (+ Prometheus text on /metrics):
//   GET /pnl                 -> full snapshot
//   GET /pnl/total           -> {"total": "..."}
//   GET /pnl/order/{id}      -> {"orderId": "...", "realizedPnl": "..."}
//   GET /pnl/symbol/{sym}    -> {"symbol": "...", "realizedPnl": "..."}
//   GET /metrics, GET /health
// Decimals go out as JSON strings, unknown keys read "0".
//
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::header::{self, HeaderValue};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use crate::metrics::encode_metrics;
use crate::store::PnlStore;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";
const PROM: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn serve(port: u16, store: Arc<PnlStore>) -> Result<(), hyper::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let make_svc = make_service_fn(move |_conn| {
        let store = Arc::clone(&store);
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let store = Arc::clone(&store);
                async move { Ok::<_, Infallible>(route(&store, &req)) }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    info!(%addr, "http listening on /pnl (and /metrics)");
    server.await
}

pub fn route(store: &PnlStore, req: &Request<Body>) -> Response<Body> {
    debug!(method = %req.method(), path = %req.uri().path(), "http request");

    if req.method() != Method::GET {
        return reply(StatusCode::METHOD_NOT_ALLOWED, TEXT, "method not allowed\n");
    }

    let segments: Vec<&str> = req.uri().path().trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["health"] => reply(StatusCode::OK, TEXT, "ok\n"),
        ["metrics"] => reply(StatusCode::OK, PROM, encode_metrics()),
        ["pnl"] => json_reply(&store.snapshot()),
        ["pnl", "total"] => json_reply(&json!({ "total": store.total_realized_pnl() })),
        ["pnl", "order", id] if !id.is_empty() => json_reply(&json!({
            "orderId": id,
            "realizedPnl": store.realized_pnl_for_order(id),
        })),
        ["pnl", "symbol", sym] if !sym.is_empty() => json_reply(&json!({
            "symbol": sym,
            "realizedPnl": store.realized_pnl_for_symbol(sym),
        })),
        _ => reply(StatusCode::NOT_FOUND, TEXT, "not found\n"),
    }
}

fn json_reply<T: serde::Serialize>(value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(body) => reply(StatusCode::OK, JSON, body),
        Err(_) => reply(StatusCode::INTERNAL_SERVER_ERROR, TEXT, "serialize error\n"),
    }
}

fn reply(status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response<Body> {
    let mut rsp = Response::new(body.into());
    *rsp.status_mut() = status;
    rsp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    rsp
}
