//! TomTom address search client.

use std::time::Duration;

use quickroute_config::ProviderConfig;
use quickroute_http::{CancellationToken, HttpClient, RequestOpts};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::AddressFinderError;
use crate::options::SearchOptions;
use crate::query::{build_query_params, search_path};
use crate::types::{NormalizedAddress, SearchResponse, TomTomSearchResults};

pub const DEFAULT_BASE_URL: &str = quickroute_config::DEFAULT_BASE_URL;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(quickroute_config::DEFAULT_TIMEOUT_MS);

/// Per-call timeout override and cancellation signal.
///
/// Both are honoured together: whichever fires first aborts the request.
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl SearchControl {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Client for the TomTom fuzzy search endpoint.
///
/// Cloning is cheap and clones share the connection pool; calls keep no
/// state between them, so one finder may serve concurrent searches.
#[derive(Clone)]
pub struct AddressFinder {
    http: HttpClient,
    api_key: String,
}

impl std::fmt::Debug for AddressFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressFinder")
            .field("base", &self.http.base().as_str())
            .field("timeout", &self.http.default_timeout)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl AddressFinder {
    /// Finder against the public TomTom endpoint with a 1s timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, AddressFinderError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Finder against a custom base URL (proxies, test servers).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, AddressFinderError> {
        let http = HttpClient::new(base_url)?.with_timeout(DEFAULT_TIMEOUT);
        Ok(Self {
            http,
            api_key: api_key.into(),
        })
    }

    /// Build from a loaded [`ProviderConfig`].
    ///
    /// ```
    /// use quickroute_config::QuickrouteConfigLoader;
    /// use quickroute_tomtom::AddressFinder;
    /// use std::time::Duration;
    ///
    /// let cfg = QuickrouteConfigLoader::new()
    ///     .with_yaml_str("provider:\n  api_key: demo\n  timeout_ms: 250")
    ///     .load()
    ///     .unwrap();
    /// let finder = AddressFinder::from_config(&cfg.provider).unwrap();
    /// assert_eq!(finder.timeout(), Duration::from_millis(250));
    /// ```
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self, AddressFinderError> {
        Ok(Self::with_base_url(cfg.api_key.clone(), &cfg.base_url)?
            .with_timeout(Duration::from_millis(cfg.timeout_ms)))
    }

    /// Default timeout for calls that do not override it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.http.default_timeout
    }

    /// Search with already-validated options.
    ///
    /// Issues exactly one GET; there is no retry on any failure. Only
    /// `results` and each result's `address`/`position` are checked; the rest
    /// of the payload is passed through in `raw` as received.
    #[instrument(skip(self, options, control), fields(query_len = query.len()))]
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
        control: SearchControl,
    ) -> Result<SearchResponse, AddressFinderError> {
        let params = build_query_params(&self.api_key, options);
        let path = search_path(query);
        debug!(?params, "tomtom.search.start");

        let raw: Value = self
            .http
            .get_json(
                &path,
                RequestOpts {
                    timeout: control.timeout,
                    query: Some(params.to_request_pairs()),
                    cancel: control.cancel,
                },
            )
            .await?;

        let payload = TomTomSearchResults::deserialize(&raw).map_err(|e| {
            AddressFinderError::MalformedResponse {
                reason: e.to_string(),
                body_snippet: snippet(&raw),
            }
        })?;

        let addresses: Vec<NormalizedAddress> =
            payload.results.iter().map(NormalizedAddress::from).collect();

        debug!(
            echoed_query = raw.pointer("/summary/query").and_then(serde_json::Value::as_str).unwrap_or("-"),
            total_results = raw.pointer("/summary/totalResults").and_then(serde_json::Value::as_u64),
            query_time_ms = raw.pointer("/summary/queryTime").and_then(serde_json::Value::as_u64),
            address_count = addresses.len(),
            "tomtom.search.success"
        );

        Ok(SearchResponse { addresses, raw })
    }

    /// Validate loosely-typed options, then search.
    ///
    /// Validation failures are returned before any network activity.
    pub async fn find(
        &self,
        query: &str,
        options: &Value,
        control: SearchControl,
    ) -> Result<SearchResponse, AddressFinderError> {
        let options = SearchOptions::from_value(options)?;
        self.search(query, &options, control).await
    }
}

/// One-shot search against the public TomTom endpoint.
///
/// `timeout_ms` defaults to 1000. Prefer a long-lived [`AddressFinder`] when
/// issuing many searches so the connection pool is reused.
///
/// ```no_run
/// use serde_json::json;
///
/// # async fn demo() -> Result<(), quickroute_tomtom::AddressFinderError> {
/// let found = quickroute_tomtom::find_addresses(
///     "123 Collins Street, Melbourne",
///     "my-api-key",
///     &json!({ "limit": 3, "geoBias": { "lat": -37.81, "lon": 144.96 } }),
///     None,
///     None,
/// )
/// .await?;
/// for address in &found.addresses {
///     println!("{} ({}, {})", address.formatted, address.latitude, address.longitude);
/// }
/// # Ok(()) }
/// ```
pub async fn find_addresses(
    query: &str,
    api_key: &str,
    options: &Value,
    timeout_ms: Option<u64>,
    cancel: Option<CancellationToken>,
) -> Result<SearchResponse, AddressFinderError> {
    let options = SearchOptions::from_value(options)?;
    let control = SearchControl {
        timeout: timeout_ms.map(Duration::from_millis),
        cancel,
    };
    AddressFinder::new(api_key)?
        .search(query, &options, control)
        .await
}

fn snippet(raw: &Value) -> String {
    let mut s = raw.to_string();
    if s.len() > 500 {
        let mut cut = 500;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str("...");
    }
    s
}
