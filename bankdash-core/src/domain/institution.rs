//! Institution record as returned by the aggregator

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Financial institution display metadata
///
/// Passed through unchanged: field names follow the aggregator's wire
/// format, and fields this crate does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub institution_id: String,
    pub name: String,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub country_codes: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    /// Base64 encoded PNG
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub routing_numbers: Vec<String>,
    #[serde(default)]
    pub oauth: bool,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}
