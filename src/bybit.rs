// ===============================
// src/bybit.rs
// ===============================
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub fn timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Private stream auth: hex(HMAC_SHA256(secret, "GET/realtime" + expires)).
pub fn sign_auth(secret: &str, expires_ms: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("GET/realtime{expires_ms}").as_bytes());
    let sig = mac.finalize().into_bytes();
    hex::encode(sig)
}

// ---- Outbound control frames ----
#[derive(Debug, Serialize)]
pub struct OpRequest {
    pub op: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<serde_json::Value>,
}

impl OpRequest {
    pub fn auth(api_key: &str, api_secret: &str, expires_ms: i64) -> Self {
        let sig = sign_auth(api_secret, expires_ms);
        Self {
            op: "auth",
            args: vec![api_key.into(), expires_ms.into(), sig.into()],
        }
    }

    pub fn subscribe(topics: &[&str]) -> Self {
        Self { op: "subscribe", args: topics.iter().map(|t| (*t).into()).collect() }
    }

    pub fn ping() -> Self {
        Self { op: "ping", args: Vec::new() }
    }

    pub fn to_json(&self) -> String {
        // only &str / i64 inside, serialization can't fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---- Inbound control frames (auth/subscribe/pong acks) ----
#[derive(Debug, Deserialize)]
pub struct OpResponse {
    pub op: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub ret_msg: Option<String>,
    #[serde(default)]
    pub conn_id: Option<String>,
}

impl OpResponse {
    /// None for data frames (they carry `topic`, not `op`).
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str::<Self>(raw).ok()
    }

    /// Private-stream pong has no `success` field; treat missing as ok.
    pub fn is_ok(&self) -> bool {
        self.success.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_signature_is_hmac_sha256_hex() {
        // echo -n "GET/realtime1700000000000" | openssl dgst -sha256 -hmac "secret"
        let sig = sign_auth("secret", 1_700_000_000_000);
        assert_eq!(sig, "9baf584ddf7a063dffe910d97ce4eac0cf7064058356de8b8d92f028e5ad936f");
        assert_ne!(sig, sign_auth("secret", 1_700_000_000_001));
        assert_ne!(sig, sign_auth("other", 1_700_000_000_000));
    }

    #[test]
    fn control_frames_serialize_like_bybit_expects() {
        let sub = OpRequest::subscribe(&["execution"]).to_json();
        assert_eq!(sub, r#"{"op":"subscribe","args":["execution"]}"#);

        assert_eq!(OpRequest::ping().to_json(), r#"{"op":"ping"}"#);

        let auth: serde_json::Value =
            serde_json::from_str(&OpRequest::auth("key", "secret", 42).to_json()).unwrap();
        assert_eq!(auth["op"], "auth");
        assert_eq!(auth["args"][0], "key");
        assert_eq!(auth["args"][1], 42);
        assert_eq!(auth["args"][2], sign_auth("secret", 42));
    }

    #[test]
    fn parses_acks_and_ignores_data_frames() {
        let ok = OpResponse::parse(r#"{"success":true,"ret_msg":"","op":"auth","conn_id":"c1"}"#).unwrap();
        assert_eq!(ok.op, "auth");
        assert!(ok.is_ok());

        let bad = OpResponse::parse(r#"{"success":false,"ret_msg":"Invalid sign","op":"auth"}"#).unwrap();
        assert!(!bad.is_ok());
        assert_eq!(bad.ret_msg.as_deref(), Some("Invalid sign"));

        let pong = OpResponse::parse(r#"{"req_id":"","op":"pong","args":["1672"],"conn_id":"c"}"#).unwrap();
        assert!(pong.is_ok());

        assert!(OpResponse::parse(r#"{"topic":"execution","data":[]}"#).is_none());
    }
}
