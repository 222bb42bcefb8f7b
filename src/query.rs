use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;

use crate::identifier::AccountIdentifier;

/// Percent-encoding set for URL query values (encode everything except unreserved chars).
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Path segments additionally keep `@` literal; it is a valid pchar.
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &QUERY_ENCODE_SET.remove(b'@');

fn encode_query(s: &str) -> String {
    utf8_percent_encode(s, QUERY_ENCODE_SET).to_string()
}

pub(crate) fn encode_path_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT_ENCODE_SET).to_string()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("invalid {field} date {value:?}, expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
}

/// Raw form state as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct QueryForm {
    pub identifier: AccountIdentifier,
    /// Post limit, forwarded verbatim. The backend enforces 5-100.
    pub limit: String,
    pub include_retweets: bool,
    pub from: String,
    pub to: String,
}

/// A composed summarization request. Unset fields never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryQuery {
    pub identifier: AccountIdentifier,
    pub limit: Option<String>,
    pub include_retweets: bool,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl SummaryQuery {
    pub fn new(identifier: AccountIdentifier) -> Self {
        Self {
            identifier,
            limit: None,
            include_retweets: false,
            from: None,
            to: None,
        }
    }

    /// Key/value pairs in wire order, omitting everything unset.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref limit) = self.limit {
            pairs.push(("limit", limit.clone()));
        }
        if self.include_retweets {
            pairs.push(("retweets", "1".to_owned()));
        }
        if let Some(from) = self.from {
            pairs.push(("from", from.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(to) = self.to {
            pairs.push(("to", to.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        pairs
    }

    /// Encoded query string without the leading `?`; empty when nothing is set.
    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={}", encode_query(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Request path and query, e.g. `/api/summarize/@alice?limit=10`.
    pub fn path_and_query(&self) -> String {
        let path = format!(
            "/api/summarize/{}",
            encode_path_segment(self.identifier.as_str())
        );
        let query = self.query_string();
        if query.is_empty() {
            path
        } else {
            format!("{path}?{query}")
        }
    }
}

/// Build a query from the current form state.
///
/// Returns `Ok(None)` when the identifier is empty: the request is simply not
/// sent. The limit is not range-checked here.
pub fn compose(form: &QueryForm) -> Result<Option<SummaryQuery>, ComposeError> {
    if form.identifier.is_empty() {
        return Ok(None);
    }

    let limit = Some(form.limit.as_str())
        .filter(|l| !l.is_empty())
        .map(str::to_owned);

    Ok(Some(SummaryQuery {
        identifier: form.identifier.clone(),
        limit,
        include_retweets: form.include_retweets,
        from: parse_day(&form.from, "from")?.map(start_of_day),
        to: parse_day(&form.to, "to")?.map(end_of_day),
    }))
}

fn parse_day(input: &str, field: &'static str) -> Result<Option<NaiveDate>, ComposeError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ComposeError::InvalidDate {
            field,
            value: input.to_owned(),
        })
}

/// `YYYY-MM-DDT00:00:00Z`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// `YYYY-MM-DDT23:59:59Z`
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    date.and_time(last_second).and_utc()
}
