use crate::api::types::{ApiResponse, SummaryResult};
use crate::api::{ApiClientError, SumxClient};
use crate::query::SummaryQuery;

impl SumxClient {
    /// Request a fresh summary for one account.
    ///
    /// The returned result already carries an `@`-prefixed username.
    pub async fn summarize(&self, query: &SummaryQuery) -> Result<SummaryResult, ApiClientError> {
        let resp: ApiResponse<SummaryResult> = self.get(&query.path_and_query()).await?;
        resp.data
            .map(SummaryResult::normalized)
            .ok_or_else(|| ApiClientError::Deserialize("response has no data".into()))
    }

    /// Load previously generated summaries, newest first as the server orders them.
    ///
    /// A `null` or missing list is an empty history, not an error. Usernames
    /// come back `@`-prefixed, as from [`SumxClient::summarize`].
    pub async fn list_summaries(&self) -> Result<Vec<SummaryResult>, ApiClientError> {
        let resp: ApiResponse<Vec<SummaryResult>> = self.get("/api/summaries").await?;
        Ok(resp
            .data
            .unwrap_or_default()
            .into_iter()
            .map(SummaryResult::normalized)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::FailureKind;
    use crate::identifier::AccountIdentifier;

    fn client(server: &MockServer) -> SumxClient {
        SumxClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn result_json(username: &str) -> serde_json::Value {
        json!({
            "params": { "username": username, "from": "", "to": "", "limit": -1 },
            "summary": [{ "heading": "Topic", "text": "Body" }],
            "tweets": ["hello world"]
        })
    }

    #[tokio::test]
    async fn summarize_without_options_sends_no_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/summarize/@alice"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": result_json("alice") })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let query = SummaryQuery::new(AccountIdentifier::from_input("alice"));
        let result = client(&server).summarize(&query).await.unwrap();
        assert_eq!(result.params.username, "@alice");
        assert_eq!(result.tweets, vec!["hello world".to_owned()]);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn summarize_forwards_options() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/summarize/@bob"))
            .and(query_param("limit", "20"))
            .and(query_param("retweets", "1"))
            .and(query_param("from", "2024-01-01T00:00:00Z"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": result_json("@bob") })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut query = SummaryQuery::new(AccountIdentifier::from_input("@bob"));
        query.limit = Some("20".into());
        query.include_retweets = true;
        query.from = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let result = client(&server).summarize(&query).await.unwrap();
        assert_eq!(result.params.username, "@bob");
    }

    #[tokio::test]
    async fn summarize_rate_limited_extracts_reset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": "Too many requests",
                "next_reset": "2030-05-01T12:00:00Z"
            })))
            .mount(&server)
            .await;

        let query = SummaryQuery::new(AccountIdentifier::from_input("alice"));
        let err = client(&server).summarize(&query).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::RateLimited);
        match err {
            ApiClientError::RateLimited {
                message,
                next_reset,
            } => {
                assert_eq!(message, "Too many requests");
                assert_eq!(
                    next_reset,
                    Some(Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap())
                );
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn summarize_backend_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({ "error": "Limit not in range [5, 100]" })),
            )
            .mount(&server)
            .await;

        let query = SummaryQuery::new(AccountIdentifier::from_input("alice"));
        let err = client(&server).summarize(&query).await.unwrap_err();
        match err {
            ApiClientError::ApiError { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "Limit not in range [5, 100]");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn summarize_malformed_body_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let query = SummaryQuery::new(AccountIdentifier::from_input("alice"));
        let err = client(&server).summarize(&query).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[tokio::test]
    async fn list_summaries_null_data_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/summaries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
            .mount(&server)
            .await;

        let list = client(&server).list_summaries().await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn list_summaries_preserves_order_and_prefixes_usernames() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/summaries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [result_json("newest"), result_json("@oldest")]
            })))
            .mount(&server)
            .await;

        let list = client(&server).list_summaries().await.unwrap();
        let names: Vec<_> = list.iter().map(|r| r.params.username.as_str()).collect();
        assert_eq!(names, vec!["@newest", "@oldest"]);
    }

    #[tokio::test]
    async fn list_summaries_unreachable_server_is_transport_failure() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let client = SumxClient::new(&uri, Duration::from_secs(2)).unwrap();
        let err = client.list_summaries().await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
    }
}
