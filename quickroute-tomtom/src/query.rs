//! Query construction for the TomTom fuzzy search endpoint.
//!
//! `GET {base}/search/2/search/{query}.json?{params}`

use std::borrow::Cow;
use std::fmt;

use url::form_urlencoded;

use crate::options::SearchOptions;

/// The single region results are restricted to.
pub const COUNTRY_SET: &str = "AUS";
pub const VIEW: &str = "Unified";
pub const RELATED_POIS: &str = "off";
pub const TYPEAHEAD: &str = "true";
pub const API_KEY_PARAM: &str = "key";

const SEARCH_PATH_PREFIX: &str = "search/2/search/";

/// Ordered provider query parameters, in the order they go on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderQueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl ProviderQueryParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.pairs.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `application/x-www-form-urlencoded` rendering, in insertion order.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Borrowed pairs for the HTTP layer, key included.
    pub(crate) fn to_request_pairs(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        self.pairs
            .iter()
            .map(|(k, v)| (*k, Cow::Borrowed(v.as_str())))
            .collect()
    }
}

impl fmt::Debug for ProviderQueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.pairs.iter().map(|(k, v)| {
                let shown = if *k == API_KEY_PARAM { "<redacted>" } else { v.as_str() };
                (*k, shown)
            }))
            .finish()
    }
}

/// Build the parameter set for one search call.
///
/// Counts render in their shortest decimal form (`5`, `1.5`, `-1`).
pub fn build_query_params(api_key: &str, options: &SearchOptions) -> ProviderQueryParams {
    let mut pairs: Vec<(&'static str, String)> = vec![
        ("limit", options.limit().to_string()),
        ("minFuzzyLevel", options.min_fuzzy_level().to_string()),
        ("maxFuzzyLevel", options.max_fuzzy_level().to_string()),
        ("typeahead", TYPEAHEAD.to_string()),
        ("countrySet", COUNTRY_SET.to_string()),
        ("view", VIEW.to_string()),
        ("relatedPois", RELATED_POIS.to_string()),
        (API_KEY_PARAM, api_key.to_string()),
    ];

    if let Some(bias) = options.geo_bias() {
        pairs.push(("geoBias", format!("point:{},{}", bias.lat, bias.lon)));
    }

    ProviderQueryParams { pairs }
}

/// Encoded query string exactly as it goes on the wire.
///
/// ```
/// use quickroute_tomtom::{build_query_string, SearchOptions};
///
/// let qs = build_query_string("test-key", &SearchOptions::default().with_geo_bias(90.0, 180.0));
/// assert!(qs.contains("limit=5"));
/// assert!(qs.contains("geoBias=point%3A90%2C180"));
/// assert!(qs.contains("key=test-key"));
/// ```
pub fn build_query_string(api_key: &str, options: &SearchOptions) -> String {
    build_query_params(api_key, options).to_query_string()
}

/// Percent-encode free text for use as a single URL path segment.
pub fn encode_query_segment(query: &str) -> String {
    urlencoding::encode(query).into_owned()
}

/// Path of the search endpoint, relative to the provider base URL.
pub fn search_path(query: &str) -> String {
    format!("{SEARCH_PATH_PREFIX}{}.json", encode_query_segment(query))
}
