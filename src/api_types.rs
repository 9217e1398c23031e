//! Wire shapes for the tender marketplace and for the notice store.
//!
//! Everything a producer may omit or mistype is read through the lenient helpers at the bottom of
//! this file, so a single odd field degrades to "absent" instead of rejecting the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/* -------------------------------------------------------------------------- */
/* Store records                                                              */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNotice {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, rename = "noticeId", deserialize_with = "lenient_id")]
    pub notice_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub agency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub procurement_type: Option<String>, // "RFP" | "RFQ" | "ITB" | "EOI" | ...
    #[serde(default, deserialize_with = "lenient_list")]
    pub countries: Vec<RawCountry>,
    #[serde(default, rename = "countryCode", deserialize_with = "lenient")]
    pub country_code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub technologies: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub deadline: Option<String>, // ISO date
    #[serde(default, deserialize_with = "lenient_number")]
    pub fit_score: Option<f64>, // legacy single score
    #[serde(default, rename = "structuredScore", deserialize_with = "lenient_number")]
    pub structured_score: Option<f64>,
    #[serde(default, rename = "totalScore", deserialize_with = "lenient_number")]
    pub total_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub budget_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub budget_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub raw_json: Option<RawAux>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCountry {
    #[serde(default, deserialize_with = "lenient")]
    pub country: Option<String>,
    #[serde(default, rename = "countryCode", deserialize_with = "lenient")]
    pub country_code: Option<String>,
}

/// Auxiliary payload attached upstream by the scoring pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAux {
    #[serde(default, deserialize_with = "lenient_number")]
    pub semantic_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub semantic_matches: Vec<RawSemanticMatch>,
    #[serde(default, deserialize_with = "lenient")]
    pub fit_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub fit_pros: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub fit_cons: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub reference_projects: Vec<RawReferenceProject>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub documents: Vec<RawDocument>,
    #[serde(default, deserialize_with = "lenient")]
    pub budget: Option<RawBudget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSemanticMatch {
    pub score: f64, // [0.0, 1.0]
    #[serde(default, deserialize_with = "lenient")]
    pub source_title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReferenceProject {
    pub title: String,
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBudget {
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_estimated: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub estimate_source: Option<String>,
}

/* -------------------------------------------------------------------------- */
/* Marketplace API                                                            */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub last_updated_date_from: String, // RFC 3339, UTC
    pub page_size: u32,
    pub page_number: u32,
    pub sort: SearchSort,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSort {
    pub name: String,
    pub order: String,
}

/// Items are kept as raw JSON so the store receives exactly what the marketplace sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub total_items: Option<u64>,
}

/* -------------------------------------------------------------------------- */
/* Lenient field readers                                                      */
/* -------------------------------------------------------------------------- */

fn lenient<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(v.and_then(|v| serde_json::from_value(v).ok()))
}

/// Keeps the well-formed elements of a list and drops the rest; non-lists become empty.
fn lenient_list<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Numbers may arrive as JSON numbers or numeric strings ("85", "1.5e5").
fn lenient_number<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    })
}

fn lenient_id<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
