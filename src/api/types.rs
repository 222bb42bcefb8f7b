use serde::{Deserialize, Deserializer, Serialize};

use crate::identifier::ensure_prefix;

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

/// Success envelope: `{ "data": ... }`. History may return `data: null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
#[serde(bound(serialize = "T: serde::Serialize"))]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
}

/// Error envelope for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: String,
    /// RFC 3339 instant; only present on 429.
    #[serde(default)]
    pub next_reset: Option<String>,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Sentinel the backend uses for "no limit requested".
pub const NO_LIMIT: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryParams {
    pub username: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    NO_LIMIT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySection {
    pub heading: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub params: SummaryParams,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub summary: Vec<SummarySection>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tweets: Vec<String>,
}

/// The backend serializes empty lists as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SummaryResult {
    /// Return the result with `params.username` carrying the `@` prefix.
    pub fn normalized(mut self) -> Self {
        self.params.username = ensure_prefix(&self.params.username);
        self
    }

    /// Short description of the request window, e.g. `last 10 posts from ...`.
    pub fn description(&self) -> String {
        let mut out = String::new();
        if self.params.limit != NO_LIMIT {
            out.push_str(&format!("last {} posts ", self.params.limit));
        }
        if !self.params.from.is_empty() {
            out.push_str(&format!("from {} ", self.params.from));
        }
        if !self.params.to.is_empty() {
            out.push_str(&format!("to {} ", self.params.to));
        }
        out.trim_end().to_owned()
    }

    /// Plain-text form: `heading\ntext` per section, blank line between.
    pub fn plain_text(&self) -> String {
        self.summary
            .iter()
            .map(|s| format!("{}\n{}", s.heading, s.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
