//! TomTom address search, normalized into a compact address shape.
//!
//! - [`options`]: validation and defaulting of search tuning options
//! - [`query`]: query-string and path construction for the search endpoint
//! - [`client`]: [`AddressFinder`], one GET per search with timeout and
//!   cancellation
//! - [`types`]: provider payload types plus [`NormalizedAddress`] and
//!   [`SearchResponse`]
//!
//! Results are restricted to Australia ([`query::COUNTRY_SET`]). The raw
//! provider payload is returned alongside the normalized addresses for
//! callers that need fields this crate does not map.
//!
//! ```no_run
//! use quickroute_tomtom::{AddressFinder, SearchControl, SearchOptions};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), quickroute_tomtom::AddressFinderError> {
//! let finder = AddressFinder::new("my-api-key")?;
//! let options = SearchOptions::default().with_limit(3).with_geo_bias(-33.87, 151.21);
//! let found = finder
//!     .search(
//!         "1 Macquarie St Sydney",
//!         &options,
//!         SearchControl::default().with_timeout(Duration::from_millis(800)),
//!     )
//!     .await?;
//! println!("{} candidates, echoed query {}", found.addresses.len(), found.raw["summary"]["query"]);
//! # Ok(()) }
//! ```
//!
//! Failures never trigger retries here; see [`AddressFinderError`] for the
//! taxonomy a caller can build a retry policy on.

pub mod client;
pub mod error;
pub mod options;
pub mod query;
pub mod types;

pub use client::{AddressFinder, SearchControl, find_addresses};
pub use error::AddressFinderError;
pub use options::{GeoBias, IssueKind, SearchOptions, ValidationError, ValidationIssue};
pub use query::{ProviderQueryParams, build_query_params, build_query_string};
pub use quickroute_http::CancellationToken;
pub use types::{LatLon, NormalizedAddress, SearchResponse, TomTomSearchResult, TomTomSearchResults};
