//! Alert ingress: one HTTP endpoint per registered source, served by an
//! axum router over shared `IngressState`. `validate_webhook_signature`
//! (HMAC-SHA256, constant-time compare) is the optional per-source
//! signature check.

use crate::investigation::scheduler::InvestigationScheduler;
use crate::investigation::types::{AlertEvent, Severity};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

const WEBHOOK_MAX_BODY: usize = 1_048_576;

/// A source decoder turns a request body into one or more canonical alert
/// events. Implemented per alert-provider shape (Prometheus
/// Alertmanager, PagerDuty, a generic JSON webhook, ...).
pub trait SourceDecoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<Vec<AlertEvent>, String>;
}

/// A generic decoder: expects `{"severity": "critical", "labels": {...},
/// "annotations": {...}}`, one alert per request body.
pub struct GenericJsonDecoder;

#[derive(serde::Deserialize)]
struct GenericAlertPayload {
    #[serde(default = "default_severity")]
    severity: Severity,
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

fn default_severity() -> Severity {
    Severity::Warning
}

impl SourceDecoder for GenericJsonDecoder {
    fn decode(&self, body: &[u8]) -> Result<Vec<AlertEvent>, String> {
        let payload: GenericAlertPayload =
            serde_json::from_slice(body).map_err(|e| format!("invalid alert payload: {e}"))?;
        Ok(vec![AlertEvent {
            id: uuid::Uuid::new_v4().to_string(),
            severity: payload.severity,
            labels: payload.labels,
            annotations: payload.annotations,
            received_at: chrono::Utc::now(),
        }])
    }
}

pub struct AlertSource {
    pub name: String,
    pub webhook_path: String,
    pub decoder: Arc<dyn SourceDecoder>,
    /// Optional HMAC-SHA256 shared secret; when set, requests must carry a
    /// valid `X-Signature-256`/`X-Hub-Signature-256` header.
    pub secret: Option<String>,
}

/// Keyed by `webhook_path` so the catch-all route can look sources up by
/// the path the request actually arrived on.
#[derive(Clone)]
pub struct IngressState {
    scheduler: Arc<InvestigationScheduler>,
    sources: Arc<RwLock<HashMap<String, Arc<AlertSource>>>>,
}

impl IngressState {
    pub fn new(scheduler: Arc<InvestigationScheduler>) -> Self {
        Self {
            scheduler,
            sources: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registration is dynamic: sources can be added after the router is
    /// already serving traffic. The endpoint table is read-through under a
    /// lock.
    pub fn register_source(&self, source: AlertSource) {
        self.sources
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(source.webhook_path.clone(), Arc::new(source));
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub fn build_router(state: IngressState) -> Router {
    Router::new()
        .route("/{*path}", post(alert_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn alert_handler(
    State(state): State<IngressState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    let source = {
        let sources = state
            .sources
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sources.get(&path).cloned()
    };
    let Some(source) = source else {
        debug!("alert ingress: no source registered for path '{path}'");
        return StatusCode::NOT_FOUND.into_response();
    };

    if body.len() > WEBHOOK_MAX_BODY {
        warn!("alert ingress: payload too large on '{path}'");
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    }

    if let Some(secret) = &source.secret {
        let signature = headers
            .get("X-Signature-256")
            .or_else(|| headers.get("X-Hub-Signature-256"))
            .and_then(|v| v.to_str().ok());
        let Some(signature) = signature else {
            warn!("alert ingress: missing signature on '{path}'");
            return StatusCode::FORBIDDEN.into_response();
        };
        if !validate_webhook_signature(secret, signature, &body) {
            warn!("alert ingress: invalid signature on '{path}'");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let events = match source.decoder.decode(&body) {
        Ok(events) => events,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody { error: e }),
            )
                .into_response();
        }
    };

    for event in events {
        match state.scheduler.submit(event).await {
            Ok(_) => {}
            Err(reason) => {
                warn!("alert ingress: {reason}");
                return StatusCode::TOO_MANY_REQUESTS.into_response();
            }
        }
    }

    StatusCode::ACCEPTED.into_response()
}

/// Exposed at crate root as `fuzz_api::validate_webhook_signature` so the
/// `fuzz/` harness can drive it without reaching into a private module.
pub(crate) fn validate_webhook_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());
    let sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    expected.as_bytes().ct_eq(sig.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_with_and_without_prefix() {
        let secret = "shh";
        let body = b"hello world";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        assert!(validate_webhook_signature(secret, &sig, body));
        assert!(validate_webhook_signature(secret, &format!("sha256={sig}"), body));
    }

    #[test]
    fn invalid_signature_is_rejected() {
        assert!(!validate_webhook_signature("shh", "deadbeef", b"body"));
    }

    #[test]
    fn generic_decoder_parses_severity_and_labels() {
        let body = br#"{"severity":"critical","labels":{"service":"checkout"}}"#;
        let events = GenericJsonDecoder.decode(body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Critical);
        assert_eq!(events[0].labels.get("service"), Some(&"checkout".to_string()));
    }

    #[test]
    fn generic_decoder_defaults_severity_to_warning() {
        let events = GenericJsonDecoder.decode(b"{}").unwrap();
        assert_eq!(events[0].severity, Severity::Warning);
    }

    #[test]
    fn generic_decoder_rejects_malformed_json() {
        assert!(GenericJsonDecoder.decode(b"not json").is_err());
    }
}
