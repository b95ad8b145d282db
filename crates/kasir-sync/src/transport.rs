//! # HTTP Transport
//!
//! reqwest client for the Kasir API with exponential backoff on transient
//! failures.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Lifecycle                                │
//! │                                                                         │
//! │  send ──► 2xx ──► parse {success, data} envelope ──► Ok(data)           │
//! │    │                                                                    │
//! │    ├──► connect error / timeout / 5xx ──► wait backoff ──► send again   │
//! │    │        500ms → 1s → 2s → ... (cap 30s, give up after 60s)          │
//! │    │                                                                    │
//! │    ├──► 401 ──► Unauthorized (no retry, token must be replaced)         │
//! │    │                                                                    │
//! │    └──► other 4xx ──► Rejected {code, message} (no retry)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::ExponentialBackoff;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use kasir_core::envelope::ApiEnvelope;
use kasir_core::sync::{BulkSyncRequest, SyncReport};
use kasir_core::ProductDetail;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Transport Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// API base URL including `/api/v1`.
    pub base_url: String,

    /// Bearer token sent on authenticated routes.
    pub auth_token: Option<String>,

    pub request_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,

    /// Total time spent retrying one request before giving up.
    pub max_elapsed: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            base_url: "http://localhost:3000/api/v1".to_string(),
            auth_token: None,
            request_timeout: Duration::from_secs(15),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(60),
        }
    }
}

impl From<&SyncConfig> for TransportConfig {
    fn from(config: &SyncConfig) -> Self {
        TransportConfig {
            base_url: config.server.url.clone(),
            auth_token: config.server.auth_token.clone(),
            request_timeout: config.request_timeout(),
            initial_backoff: Duration::from_millis(config.sync.initial_backoff_ms),
            max_backoff: Duration::from_secs(config.sync.max_backoff_secs),
            max_elapsed: Duration::from_secs(config.sync.max_elapsed_secs),
        }
    }
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// Client for the two endpoints the sync client talks to.
///
/// ## Usage
/// ```rust,ignore
/// let transport = HttpTransport::new(TransportConfig::from(&config))?;
/// let report = transport.push_transactions(&batch).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: TransportConfig,
    http: Client,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> SyncResult<Self> {
        url::Url::parse(&config.base_url)?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        Ok(HttpTransport { config, http })
    }

    /// `POST /sync` with the whole batch. Per-item outcomes come back in the
    /// report; an `Err` means nothing is known about any item.
    pub async fn push_transactions(&self, batch: &BulkSyncRequest) -> SyncResult<SyncReport> {
        let url = self.endpoint("sync");
        debug!(count = batch.transactions.len(), %url, "Pushing offline transactions");

        self.with_retry("push_transactions", || {
            self.authorized(self.http.post(&url)).json(batch)
        })
        .await
    }

    /// `GET /products`: the full catalog for the local cache.
    pub async fn fetch_products(&self) -> SyncResult<Vec<ProductDetail>> {
        let url = self.endpoint("products");
        debug!(%url, "Fetching product catalog");

        self.with_retry("fetch_products", || self.http.get(&url))
            .await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_interval: self.config.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: Some(self.config.max_elapsed),
            ..Default::default()
        }
    }

    /// Sends the request built by `build`, retrying transient failures.
    async fn with_retry<T, F>(&self, operation: &'static str, build: F) -> SyncResult<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        backoff::future::retry(self.backoff(), || async {
            match send_once::<T>(build()).await {
                Ok(data) => Ok(data),
                Err(e) if e.is_retryable() => {
                    warn!(operation, error = %e, "Request failed, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }
}

/// One attempt: send, map the status, unwrap the envelope.
async fn send_once<T: DeserializeOwned>(request: RequestBuilder) -> SyncResult<T> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    let envelope: Option<ApiEnvelope<T>> = serde_json::from_str(&body).ok();

    if !status.is_success() {
        let (code, message) = match envelope.and_then(|e| e.error) {
            Some(error) => (error.code, error.message),
            None => (status.as_u16().to_string(), body),
        };

        return Err(match status {
            StatusCode::UNAUTHORIZED => SyncError::Unauthorized(message),
            s if s.is_server_error() => SyncError::ServerError {
                status: s.as_u16(),
                message,
            },
            _ => SyncError::Rejected { code, message },
        });
    }

    let envelope = envelope.ok_or_else(|| {
        SyncError::InvalidResponse(format!("expected a JSON envelope, got: {body}"))
    })?;

    match envelope.into_result() {
        Ok(Some(data)) => Ok(data),
        Ok(None) => Err(SyncError::InvalidResponse("envelope without data".into())),
        Err(error) => Err(SyncError::Rejected {
            code: error.code,
            message: error.message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::Utc;
    use kasir_core::checkout::{CheckoutItem, CheckoutRequest};
    use kasir_core::sync::SyncTransaction;
    use kasir_core::{Money, PaymentMethod};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/v1")
    }

    fn fast_config(base_url: String) -> TransportConfig {
        TransportConfig {
            base_url,
            auth_token: Some("token-1".to_string()),
            request_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            max_elapsed: Duration::from_secs(2),
        }
    }

    fn batch() -> BulkSyncRequest {
        BulkSyncRequest {
            transactions: vec![SyncTransaction {
                id: "offline-1".to_string(),
                data: CheckoutRequest {
                    payment_method: PaymentMethod::Cash,
                    items: vec![CheckoutItem {
                        product_id: "p1".to_string(),
                        quantity: 2,
                        price_at_record: Money::from_rupiah(24_000),
                    }],
                },
                created_at: Utc::now(),
            }],
        }
    }

    #[tokio::test]
    async fn test_push_sends_bearer_and_parses_report() {
        async fn sync(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
            assert_eq!(
                headers.get("authorization").unwrap().to_str().unwrap(),
                "Bearer token-1"
            );
            assert_eq!(body["transactions"][0]["data"]["paymentMethod"], "CASH");
            Json(json!({"success": true, "data": {"success": ["offline-1"], "failed": []}}))
        }

        let base = serve(Router::new().route("/api/v1/sync", post(sync))).await;
        let transport = HttpTransport::new(fast_config(base)).unwrap();

        let report = transport.push_transactions(&batch()).await.unwrap();
        assert_eq!(report.success, vec!["offline-1".to_string()]);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let calls = Arc::new(AtomicUsize::new(0));

        async fn flaky(State(calls): State<Arc<AtomicUsize>>) -> (AxumStatus, Json<Value>) {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                (
                    AxumStatus::SERVICE_UNAVAILABLE,
                    Json(json!({"success": false, "error": {"code": "INTERNAL_ERROR", "message": "busy"}})),
                )
            } else {
                (AxumStatus::OK, Json(json!({"success": true, "data": []})))
            }
        }

        let app = Router::new()
            .route("/api/v1/products", get(flaky))
            .with_state(calls.clone());
        let base = serve(app).await;
        let transport = HttpTransport::new(fast_config(base)).unwrap();

        let products = transport.fetch_products().await.unwrap();
        assert!(products.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));

        async fn deny(State(calls): State<Arc<AtomicUsize>>) -> (AxumStatus, Json<Value>) {
            calls.fetch_add(1, Ordering::SeqCst);
            (
                AxumStatus::UNAUTHORIZED,
                Json(json!({"success": false, "error": {"code": "UNAUTHORIZED", "message": "Unauthorized"}})),
            )
        }

        let app = Router::new()
            .route("/api/v1/sync", post(deny))
            .with_state(calls.clone());
        let base = serve(app).await;
        let transport = HttpTransport::new(fast_config(base)).unwrap();

        let err = transport.push_transactions(&batch()).await.unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized(ref m) if m == "Unauthorized"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejection_carries_error_code() {
        async fn reject() -> (AxumStatus, Json<Value>) {
            (
                AxumStatus::BAD_REQUEST,
                Json(json!({"success": false, "error": {"code": "VALIDATION_ERROR", "message": "Validation failed"}})),
            )
        }

        let base = serve(Router::new().route("/api/v1/sync", post(reject))).await;
        let transport = HttpTransport::new(fast_config(base)).unwrap();

        let err = transport.push_transactions(&batch()).await.unwrap_err();
        assert!(matches!(err, SyncError::Rejected { ref code, .. } if code == "VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_unreachable_server_gives_up() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = fast_config(format!("http://{addr}/api/v1"));
        config.max_elapsed = Duration::from_millis(200);
        let transport = HttpTransport::new(config).unwrap();

        let err = transport.fetch_products().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let mut config = TransportConfig::default();
        config.base_url = "http://localhost:3000/api/v1/".to_string();
        let transport = HttpTransport::new(config).unwrap();
        assert_eq!(transport.endpoint("sync"), "http://localhost:3000/api/v1/sync");
    }
}
