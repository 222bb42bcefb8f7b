//! Session state: the summary cache, the rate-limit countdown and the loading
//! flag, mutated only through the entry points below.
//!
//! Every transition takes the current state plus an event (and, where time
//! matters, an explicit `now`), so the whole lifecycle can be driven from tests
//! without a terminal or a network.

use chrono::{DateTime, Utc};

use crate::api::types::SummaryResult;
use crate::api::{ApiClientError, ApiResult, FailureKind};
use crate::countdown::RateLimitCountdown;
use crate::identifier::AccountIdentifier;
use crate::query::{QueryForm, SummaryQuery, compose};

const GENERIC_FAILURE: &str = "Failed to fetch data";

// ---------------------------------------------------------------------------
// Summary cache
// ---------------------------------------------------------------------------

/// Snapshot of the cache version taken when a history load is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Applied,
    /// A live result was prepended after the ticket was issued; nothing written.
    Stale,
}

/// Most-recent-first list of summaries. Never deduplicated, never evicted.
#[derive(Debug, Clone, Default)]
pub struct SummaryCache {
    entries: Vec<SummaryResult>,
    version: u64,
}

impl SummaryCache {
    pub fn prepend(&mut self, result: SummaryResult) {
        self.entries.insert(0, result.normalized());
        self.version += 1;
    }

    pub fn ticket(&self) -> HistoryTicket {
        HistoryTicket(self.version)
    }

    /// Replace the whole list, keeping server order.
    pub fn replace_all(&mut self, ticket: HistoryTicket, results: Vec<SummaryResult>) -> CacheWrite {
        if ticket.0 != self.version {
            return CacheWrite::Stale;
        }
        self.entries = results.into_iter().map(SummaryResult::normalized).collect();
        CacheWrite::Applied
    }

    pub fn entries(&self) -> &[SummaryResult] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&SummaryResult> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

impl Notification {
    fn new(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_owned(),
            description: description.into(),
        }
    }

    /// Informational message raised by the interactive client.
    pub fn info(title: &str, description: impl Into<String>) -> Self {
        Self::new(title, description)
    }

    fn for_error(err: &ApiClientError) -> Self {
        match err {
            ApiClientError::RateLimited { message, .. } => {
                Self::new("Request limit reached", message.clone())
            }
            ApiClientError::ApiError { detail, .. } => Self::new("Error occurred", detail.clone()),
            ApiClientError::Http(_) | ApiClientError::Deserialize(_) => {
                Self::new("Error occurred", GENERIC_FAILURE)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch control
// ---------------------------------------------------------------------------

/// What the fetch control shows, and whether it accepts a press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchControl {
    Loading,
    Countdown(String),
    NeedsIdentifier,
    Ready,
}

impl FetchControl {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Loading => "Loading...".to_owned(),
            Self::Countdown(remaining) => format!("Next request possible in {remaining}"),
            Self::NeedsIdentifier | Self::Ready => "Fetch".to_owned(),
        }
    }
}

/// Result of applying a finished fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Prepended,
    /// Countdown armed when the server supplied a parsable reset time.
    RateLimited { armed: bool },
    BackendError,
    TransportFailure,
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub cache: SummaryCache,
    pub countdown: RateLimitCountdown,
    pub loading: bool,
    pub notification: Option<Notification>,
    pub show_summaries: bool,
}

impl SessionState {
    pub fn fetch_control(&self, identifier: &AccountIdentifier, now: DateTime<Utc>) -> FetchControl {
        if self.loading {
            FetchControl::Loading
        } else if self.countdown.is_blocking(now) {
            FetchControl::Countdown(self.countdown.label(now))
        } else if identifier.is_empty() {
            FetchControl::NeedsIdentifier
        } else {
            FetchControl::Ready
        }
    }

    /// Compose a request from the form and mark it in flight.
    ///
    /// Returns `None` without touching the loading flag when the control is
    /// disabled, the identifier is empty, or a date field does not parse.
    pub fn begin_fetch(&mut self, form: &QueryForm, now: DateTime<Utc>) -> Option<SummaryQuery> {
        if !self.fetch_control(&form.identifier, now).is_enabled() {
            return None;
        }
        match compose(form) {
            Ok(Some(query)) => {
                self.loading = true;
                Some(query)
            }
            Ok(None) => None,
            Err(e) => {
                self.notification = Some(Notification::new("Invalid input", e.to_string()));
                None
            }
        }
    }

    /// Apply a completed fetch. The loading flag is released on every path.
    pub fn finish_fetch(&mut self, result: ApiResult<SummaryResult>) -> FetchOutcome {
        self.loading = false;

        let err = match result {
            Ok(summary) => {
                self.cache.prepend(summary);
                self.show_summaries = true;
                return FetchOutcome::Prepended;
            }
            Err(err) => err,
        };
        let err = err.as_ref();

        self.notification = Some(Notification::for_error(err));
        match (err.kind(), err) {
            (_, ApiClientError::RateLimited { next_reset, .. }) => {
                if let Some(at) = *next_reset {
                    tracing::info!(%at, "rate limited, countdown armed");
                    self.countdown.arm(at);
                } else {
                    tracing::warn!("rate limited without a usable reset time");
                }
                FetchOutcome::RateLimited {
                    armed: next_reset.is_some(),
                }
            }
            (FailureKind::Backend, _) => {
                tracing::warn!("summary request failed: {err}");
                FetchOutcome::BackendError
            }
            _ => {
                tracing::warn!("summary request failed: {err}");
                FetchOutcome::TransportFailure
            }
        }
    }

    pub fn history_ticket(&self) -> HistoryTicket {
        self.cache.ticket()
    }

    /// Seed the cache from the history endpoint.
    pub fn seed_history(
        &mut self,
        ticket: HistoryTicket,
        result: ApiResult<Vec<SummaryResult>>,
    ) -> CacheWrite {
        match result {
            Ok(list) if list.is_empty() => CacheWrite::Applied,
            Ok(list) => {
                let write = self.cache.replace_all(ticket, list);
                if write == CacheWrite::Stale {
                    tracing::warn!("history arrived after a live fetch; keeping live results");
                }
                write
            }
            Err(err) => {
                let err = err.as_ref();
                tracing::warn!("history load failed: {err}");
                let description = match err {
                    ApiClientError::ApiError { detail, .. }
                    | ApiClientError::RateLimited {
                        message: detail, ..
                    } => detail.clone(),
                    ApiClientError::Http(_) | ApiClientError::Deserialize(_) => {
                        GENERIC_FAILURE.to_owned()
                    }
                };
                self.notification = Some(Notification::new("Error occurred", description));
                CacheWrite::Applied
            }
        }
    }

    /// Recompute the countdown. Returns `true` while it still blocks; once it
    /// has expired the target is cleared and `false` is returned.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if self.countdown.is_blocking(now) {
            return true;
        }
        self.countdown.disarm();
        false
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::api::types::{NO_LIMIT, SummaryParams, SummarySection};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap()
    }

    fn result(username: &str) -> SummaryResult {
        SummaryResult {
            params: SummaryParams {
                username: username.to_owned(),
                from: String::new(),
                to: String::new(),
                limit: NO_LIMIT,
            },
            summary: vec![SummarySection {
                heading: "h".into(),
                text: "t".into(),
            }],
            tweets: vec![],
        }
    }

    fn names(state: &SessionState) -> Vec<&str> {
        state
            .cache
            .entries()
            .iter()
            .map(|r| r.params.username.as_str())
            .collect()
    }

    fn form(handle: &str) -> QueryForm {
        QueryForm {
            identifier: AccountIdentifier::from_input(handle),
            ..QueryForm::default()
        }
    }

    #[test]
    fn test_prepend_orders_most_recent_first() {
        let mut state = SessionState::default();
        let ticket = state.history_ticket();
        state.seed_history(ticket, Ok(vec![result("@old")]));

        state.finish_fetch(Ok(result("r1")));
        state.finish_fetch(Ok(result("r2")));
        assert_eq!(names(&state), vec!["@r2", "@r1", "@old"]);
    }

    #[test]
    fn test_repeated_fetches_accumulate() {
        let mut state = SessionState::default();
        state.finish_fetch(Ok(result("@same")));
        state.finish_fetch(Ok(result("@same")));
        assert_eq!(state.cache.len(), 2);
    }

    #[test]
    fn test_history_is_normalized() {
        let mut state = SessionState::default();
        let ticket = state.history_ticket();
        let write = state.seed_history(ticket, Ok(vec![result("abc"), result("@def")]));
        assert_eq!(write, CacheWrite::Applied);
        assert_eq!(names(&state), vec!["@abc", "@def"]);
    }

    #[test]
    fn test_empty_history_leaves_cache_empty() {
        let mut state = SessionState::default();
        let ticket = state.history_ticket();
        state.seed_history(ticket, Ok(vec![]));
        assert!(state.cache.is_empty());
        assert_eq!(state.notification, None);
    }

    #[test]
    fn test_history_failure_notifies() {
        let mut state = SessionState::default();
        let ticket = state.history_ticket();
        state.seed_history(ticket, Err(Arc::new(ApiClientError::Deserialize("eof".into()))));
        assert!(state.cache.is_empty());
        assert_eq!(
            state.notification,
            Some(Notification::new("Error occurred", "Failed to fetch data"))
        );
    }

    #[test]
    fn test_late_history_does_not_overwrite_live_fetch() {
        let mut state = SessionState::default();
        let ticket = state.history_ticket();

        state.finish_fetch(Ok(result("@live")));
        let write = state.seed_history(ticket, Ok(vec![result("@a"), result("@b")]));

        assert_eq!(write, CacheWrite::Stale);
        assert_eq!(names(&state), vec!["@live"]);
    }

    #[test]
    fn test_empty_identifier_is_not_dispatched() {
        let mut state = SessionState::default();
        let f = form("");
        assert_eq!(
            state.fetch_control(&f.identifier, now()),
            FetchControl::NeedsIdentifier
        );
        assert!(!state.fetch_control(&f.identifier, now()).is_enabled());
        assert_eq!(state.begin_fetch(&f, now()), None);
        assert!(!state.loading);
    }

    #[test]
    fn test_fetch_without_options_round_trip() {
        let mut state = SessionState::default();
        let query = state.begin_fetch(&form("@alice"), now()).unwrap();
        assert_eq!(query.query_string(), "");
        assert!(state.loading);
        assert_eq!(state.fetch_control(&query.identifier, now()), FetchControl::Loading);

        // A second press while loading is refused.
        assert_eq!(state.begin_fetch(&form("@alice"), now()), None);

        let outcome = state.finish_fetch(Ok(result("alice")));
        assert_eq!(outcome, FetchOutcome::Prepended);
        assert!(!state.loading);
        assert!(state.show_summaries);
        assert_eq!(names(&state), vec!["@alice"]);
    }

    #[test]
    fn test_loading_released_on_every_failure() {
        let failures = [
            ApiClientError::ApiError {
                status: 500,
                detail: "Failed to summarize tweets".into(),
            },
            ApiClientError::Deserialize("eof".into()),
            ApiClientError::RateLimited {
                message: "limit".into(),
                next_reset: None,
            },
        ];
        for err in failures {
            let mut state = SessionState::default();
            state.begin_fetch(&form("@alice"), now()).unwrap();
            state.finish_fetch(Err(Arc::new(err)));
            assert!(!state.loading);
            assert!(state.notification.is_some());
            assert!(state.cache.is_empty());
        }
    }

    #[test]
    fn test_backend_error_surfaces_server_message() {
        let mut state = SessionState::default();
        let outcome = state.finish_fetch(Err(Arc::new(ApiClientError::ApiError {
            status: 500,
            detail: "Limit not in range [5, 100]".into(),
        })));
        assert_eq!(outcome, FetchOutcome::BackendError);
        assert_eq!(
            state.notification,
            Some(Notification::new("Error occurred", "Limit not in range [5, 100]"))
        );
    }

    #[test]
    fn test_invalid_date_notifies_without_loading() {
        let mut state = SessionState::default();
        let mut f = form("@alice");
        f.to = "tomorrow".into();
        assert_eq!(state.begin_fetch(&f, now()), None);
        assert!(!state.loading);
        assert_eq!(
            state.notification.as_ref().map(|n| n.title.as_str()),
            Some("Invalid input")
        );
    }

    #[test]
    fn test_rate_limit_blocks_until_reset() {
        let mut state = SessionState::default();
        let f = form("@alice");
        let reset = now() + TimeDelta::hours(1);

        state.begin_fetch(&f, now()).unwrap();
        let outcome = state.finish_fetch(Err(Arc::new(ApiClientError::RateLimited {
            message: "Too many requests".into(),
            next_reset: Some(reset),
        })));
        assert_eq!(outcome, FetchOutcome::RateLimited { armed: true });
        assert_eq!(
            state.notification,
            Some(Notification::new("Request limit reached", "Too many requests"))
        );

        let control = state.fetch_control(&f.identifier, now());
        assert_eq!(control, FetchControl::Countdown("1 h".into()));
        assert_eq!(control.label(), "Next request possible in 1 h");
        assert_eq!(state.begin_fetch(&f, now()), None);

        // Tick once per second; the label shrinks until it is empty.
        let mut previous = state.countdown.remaining(now());
        let mut t = now();
        while state.tick(t) {
            t += TimeDelta::seconds(1);
            let current = state.countdown.remaining(t);
            assert!(current.label() != previous.label() || current.is_zero());
            previous = current;
        }
        assert_eq!(t, reset);
        assert_eq!(state.countdown.next_allowed_at(), None);
        assert_eq!(state.fetch_control(&f.identifier, t), FetchControl::Ready);
        assert!(state.begin_fetch(&f, t).is_some());
    }

    #[test]
    fn test_rate_limit_at_ninety_seconds() {
        let mut state = SessionState::default();
        state.finish_fetch(Err(Arc::new(ApiClientError::RateLimited {
            message: "slow down".into(),
            next_reset: Some(now() + TimeDelta::seconds(90)),
        })));
        assert_eq!(state.countdown.label(now()), "1 min, 30 s");
        assert_eq!(state.countdown.label(now() + TimeDelta::seconds(91)), "");
    }

    #[test]
    fn test_rate_limit_without_reset_does_not_arm() {
        let mut state = SessionState::default();
        let outcome = state.finish_fetch(Err(Arc::new(ApiClientError::RateLimited {
            message: "limit".into(),
            next_reset: None,
        })));
        assert_eq!(outcome, FetchOutcome::RateLimited { armed: false });
        assert!(!state.countdown.is_blocking(now()));
    }

    #[test]
    fn test_dismiss_notification() {
        let mut state = SessionState::default();
        state.finish_fetch(Err(Arc::new(ApiClientError::Deserialize("x".into()))));
        state.dismiss_notification();
        assert_eq!(state.notification, None);
    }
}
