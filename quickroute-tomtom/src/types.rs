//! TomTom search payload projection and the normalized output shape.
//!
//! Only what the mapping reads is decoded: the `results` list and, per
//! result, `position` plus the `address` object. Everything else in the
//! payload (score, POI data, viewport, summary...) is left to `_raw` and never
//! type-checked, so unexpected shapes there cannot fail a search.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FREEFORM_ADDRESS: &str = "freeformAddress";

/// Top-level response of `search/2/search/{query}.json`, as far as mapping
/// needs it.
#[derive(Debug, Clone, Deserialize)]
pub struct TomTomSearchResults {
    pub results: Vec<TomTomSearchResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// One search hit. `address` is kept exactly as sent; a missing or `null`
/// address maps to an empty object.
#[derive(Debug, Clone, Deserialize)]
pub struct TomTomSearchResult {
    #[serde(default)]
    pub address: Option<Map<String, Value>>,
    pub position: LatLon,
}

// ==============================
// Normalized output
// ==============================

/// Compact address shape handed back to callers.
///
/// `components` is the provider's address object as sent, including `null`
/// values and unexpected types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedAddress {
    pub formatted: String,
    pub components: Map<String, Value>,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&TomTomSearchResult> for NormalizedAddress {
    fn from(result: &TomTomSearchResult) -> Self {
        let components = result.address.clone().unwrap_or_default();
        let formatted = components
            .get(FREEFORM_ADDRESS)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            formatted,
            components,
            latitude: result.position.lat,
            longitude: result.position.lon,
        }
    }
}

/// Normalized addresses, in provider order, plus the untouched payload.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub addresses: Vec<NormalizedAddress>,
    #[serde(rename = "_raw")]
    pub raw: Value,
}
