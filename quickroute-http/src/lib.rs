//! Minimal JSON-over-HTTP client with safe logging, timeouts and cancellation.
//!
//! - Request options: ordered query params, timeout, cancellation token
//! - Redacts sensitive query params by name and never logs secret values
//! - Exactly one attempt per call; retry policy belongs to the caller
//! - Optional *raw* request/response logging via `QUICKROUTE_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```no_run
//! # async fn demo() -> Result<(), quickroute_http::HttpError> {
//! let client = quickroute_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", quickroute_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Cancellation: the whole exchange (send + body read) races the per-request
//! timeout and the optional [`CancellationToken`]. Whichever fires first drops
//! the in-flight future, which aborts the underlying connection.
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, and (optionally)
//! raw request/response lines (target `http.raw`) when `QUICKROUTE_HTTP_RAW=1`.

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
pub use tokio_util::sync::CancellationToken;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "QUICKROUTE_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_MAX: usize = 500;

const SECRET_PARAMS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_param(name: &str) -> bool {
    SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str())
}

/// Copy of `url` with every secret query value replaced by `<redacted>`.
fn redact_url(url: &Url) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    let mut out = url.clone();
    if pairs.is_empty() {
        return out;
    }
    out.query_pairs_mut().clear().extend_pairs(pairs);
    out
}

/// Best-effort curl line for repro, secrets redacted.
fn make_curl(method: &Method, url: &Url) -> String {
    format!("curl -X{} '{}'", method, redact_url(url).as_str())
}

/// Response headers for raw logging, with anything secret-looking masked.
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_param(&key) || key.eq_ignore_ascii_case("set-cookie") {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {status_text}, request_id={request_id}")]
    Api {
        status: StatusCode,
        status_text: String,
        /// Raw response body, read once and kept verbatim.
        body: String,
        request_id: String,
    },
}

// ==============================
// Request Options
// ==============================

/// Per-request tuning knobs for the HTTP client.
///
/// Query pairs go on the wire in the order given. Secrets such as an API
/// key travel as ordinary pairs; they are masked in logs by name.
///
/// ```
/// use quickroute_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_millis(750)),
///     query: Some(vec![("limit", "5".into()), ("key", "demo".into())]),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_millis(), 750);
/// assert!(opts.cancel.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>, // e.g. [("limit", "5".into())]
    /// External cancellation signal; raced against the response.
    pub cancel: Option<CancellationToken>,
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// A base without a trailing slash is treated as a directory, so
    /// relative paths are appended rather than replacing its last segment.
    ///
    /// ```no_run
    /// use quickroute_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let mut base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(HttpError::Url(format!("{base} cannot be a base URL")));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use quickroute_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options (query/timeout/cancel).
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json_internal(Method::GET, path, opts).await
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn request_json_internal<T>(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let mut rb = self.inner.request(method.clone(), url.clone());

        let pairs: Vec<(&str, &str)> = opts
            .query
            .iter()
            .flatten()
            .map(|(k, v)| (*k, v.as_ref()))
            .collect();
        if !pairs.is_empty() {
            rb = rb.query(&pairs);
        }

        let request = rb.build().map_err(|e| HttpError::Build(e.to_string()))?;

        // ----- Safe request logging (pre-send) -----
        let redacted_q: Vec<(String, String)> = redact_url(request.url())
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let req_id = format!("r{:x}", NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            query=?redacted_q,
            timeout_ms=timeout.as_millis() as u64,
            cancellable=opts.cancel.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(&method, request.url());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        // ----- Send: one attempt, raced against timeout and cancellation -----
        let t0 = Instant::now();
        let inner = self.inner.clone();
        let exchange = async move {
            let resp = inner.execute(request).await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(timeout)
                } else {
                    HttpError::Network(e.to_string())
                }
            })?;
            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| HttpError::Network(e.to_string()))?;
            Ok::<_, HttpError>((status, headers, bytes))
        };

        let cancel = opts.cancel.clone().unwrap_or_default();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HttpError::Cancelled),
            res = tokio::time::timeout(timeout, exchange) => match res {
                Ok(inner) => inner,
                Err(_) => Err(HttpError::Timeout(timeout)),
            },
        };

        let (status, headers, bytes) = match outcome {
            Ok(parts) => parts,
            Err(err) => {
                tracing::warn!(
                    req_id=%req_id,
                    elapsed_ms=t0.elapsed().as_millis() as u64,
                    error=%err,
                    "http.network_error"
                );
                return Err(err);
            }
        };
        let dur_ms = t0.elapsed().as_millis() as u64;

        let req_hdr_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("tracking-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            x_request_id=%req_hdr_id,
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(&headers);
            let truncated = bytes.len() > RAW_MAX_BODY;
            let text = String::from_utf8_lossy(&bytes[..bytes.len().min(RAW_MAX_BODY)]);
            tracing::info!(
                target:"http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snippet,
            "http.response.body_snippet"
        );

        // ----- Success path -----
        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(
                    req_id=%req_id,
                    serde_line=%e.line(),
                    serde_col=%e.column(),
                    serde_err=%e.to_string(),
                    body_snippet=%snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), snippet)
            });
        }

        // ----- Non-success: surface verbatim -----
        let request_id = req_hdr_id.to_string();
        tracing::warn!(
            req_id=%req_id,
            %status,
            x_request_id=%request_id,
            body_snippet=%snippet,
            "http.error"
        );
        Err(HttpError::Api {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
            request_id,
        })
    }
}

// ==============================
// Helpers
// ==============================

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}
