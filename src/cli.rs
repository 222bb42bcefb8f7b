use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, eyre};

use crate::api::types::SummaryResult;
use crate::api::{ApiClientError, SumxClient};
use crate::config::{AppConfig, load_config};
use crate::countdown::Remaining;
use crate::identifier::AccountIdentifier;
use crate::query::{QueryForm, compose};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "sumxtui", about = "TUI and CLI for AI summaries of X accounts")]
pub struct Cli {
    /// Backend base URL (overrides config and SUMX_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Launch the interactive TUI (default)
    Tui,
    /// Request a summary of an account (JSONL)
    Summarize {
        /// Account handle, with or without @
        handle: String,
        /// Number of recent posts to consider (backend accepts 5-100)
        #[arg(long)]
        limit: Option<String>,
        /// Include reposts
        #[arg(long)]
        retweets: bool,
        /// First day of the window (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last day of the window (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Print plain text instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// List previously generated summaries, newest first (JSONL)
    History,
}

// ---------------------------------------------------------------------------
// Client construction (shared with main.rs TUI path)
// ---------------------------------------------------------------------------

/// Resolve the effective config: file + env, then the `--api-url` flag.
pub fn resolve_config(api_url: Option<&str>) -> eyre::Result<AppConfig> {
    let mut config = load_config();
    if let Some(url) = api_url {
        config.api_url = url.to_owned();
    }
    config.validated_api_url()?;
    Ok(config)
}

pub fn build_client(config: &AppConfig) -> eyre::Result<SumxClient> {
    let client =
        SumxClient::new(&config.api_url, config.request_timeout()).map_err(|e| eyre!("{e}"))?;
    tracing::debug!(base_url = client.base_url(), "api client ready");
    Ok(client)
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// Either one JSON line or the plain `heading\ntext` blocks.
fn render_summary(result: &SummaryResult, text: bool) -> eyre::Result<String> {
    if text {
        Ok(result.plain_text())
    } else {
        Ok(serde_json::to_string(result)?)
    }
}

/// Turn a client error into a user-facing report. A 429 carries the time
/// left until the next request is allowed.
fn report_error(err: ApiClientError) -> eyre::Report {
    match err {
        ApiClientError::RateLimited {
            message,
            next_reset: Some(at),
        } => {
            let remaining = Remaining::from_delta(at - Utc::now()).label();
            if remaining.is_empty() {
                eyre!("{message}")
            } else {
                eyre!("{message} (next request possible in {remaining})")
            }
        }
        ApiClientError::RateLimited { message, .. } => eyre!("{message}"),
        ApiClientError::ApiError { detail, .. } => eyre!("{detail}"),
        other => eyre!("Failed to fetch data: {other}"),
    }
}

fn form_from_args(
    handle: &str,
    limit: Option<String>,
    retweets: bool,
    from: Option<String>,
    to: Option<String>,
) -> QueryForm {
    QueryForm {
        identifier: AccountIdentifier::from_input(handle),
        limit: limit.unwrap_or_default(),
        include_retweets: retweets,
        from: from.unwrap_or_default(),
        to: to.unwrap_or_default(),
    }
}

/// One JSON line per stored summary, newest first.
async fn history_lines(client: &SumxClient) -> eyre::Result<Vec<String>> {
    let results = client.list_summaries().await.map_err(report_error)?;
    results
        .iter()
        .map(|result| serde_json::to_string(result).map_err(eyre::Report::from))
        .collect()
}

// ---------------------------------------------------------------------------
// Command execution
// ---------------------------------------------------------------------------

pub async fn run_command(cmd: CliCommand, config: &AppConfig) -> eyre::Result<()> {
    let client = build_client(config)?;

    match cmd {
        CliCommand::Tui => unreachable!("tui is handled in main"),

        CliCommand::Summarize {
            handle,
            limit,
            retweets,
            from,
            to,
            text,
        } => {
            let form = form_from_args(&handle, limit, retweets, from, to);
            let query = compose(&form)?.ok_or_else(|| eyre!("an account handle is required"))?;
            let result = client.summarize(&query).await.map_err(report_error)?;
            println!("{}", render_summary(&result, text)?);
        }

        CliCommand::History => {
            for line in history_lines(&client).await? {
                println!("{line}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_form_from_args_normalizes_handle() {
        let form = form_from_args("alice", Some("20".into()), true, None, None);
        assert_eq!(form.identifier.as_str(), "@alice");
        assert_eq!(form.limit, "20");
        assert!(form.include_retweets);
        assert!(form.from.is_empty());

        let query = compose(&form).unwrap().unwrap();
        assert_eq!(query.path_and_query(), "/api/summarize/@alice?limit=20&retweets=1");
    }

    #[test]
    fn test_bare_at_sign_is_rejected() {
        let form = form_from_args("@", None, false, None, None);
        assert!(compose(&form).unwrap().is_none());
    }

    #[test]
    fn test_report_rate_limit_includes_remaining() {
        let err = ApiClientError::RateLimited {
            message: "Too many requests".into(),
            next_reset: Some(Utc::now() + TimeDelta::minutes(5) + TimeDelta::seconds(30)),
        };
        let msg = report_error(err).to_string();
        assert!(msg.starts_with("Too many requests (next request possible in "));
        assert!(msg.contains("min"));
    }

    #[test]
    fn test_report_rate_limit_without_reset() {
        let err = ApiClientError::RateLimited {
            message: "Too many requests".into(),
            next_reset: None,
        };
        assert_eq!(report_error(err).to_string(), "Too many requests");
    }

    #[test]
    fn test_report_backend_error_uses_server_message() {
        let err = ApiClientError::ApiError {
            status: 500,
            detail: "user not found".into(),
        };
        assert_eq!(report_error(err).to_string(), "user not found");
    }

    #[test]
    fn test_text_output_is_only_sections() {
        use crate::api::types::{SummaryParams, SummarySection};

        let result = SummaryResult {
            params: SummaryParams {
                username: "@alice".into(),
                from: String::new(),
                to: String::new(),
                limit: 10,
            },
            summary: vec![
                SummarySection {
                    heading: "Rust".into(),
                    text: "Lifetimes".into(),
                },
                SummarySection {
                    heading: "Food".into(),
                    text: "Ramen".into(),
                },
            ],
            tweets: vec![],
        };
        assert_eq!(
            render_summary(&result, true).unwrap(),
            "Rust\nLifetimes\n\nFood\nRamen"
        );
        assert!(render_summary(&result, false).unwrap().starts_with("{\"params\""));
    }

    #[tokio::test]
    async fn test_history_lines_prefix_usernames() {
        use std::time::Duration;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/summaries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "params": { "username": "abc", "from": "", "to": "", "limit": -1 },
                    "summary": [{ "heading": "Topic", "text": "Body" }],
                    "tweets": []
                }]
            })))
            .mount(&server)
            .await;

        let client = SumxClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let lines = history_lines(&client).await.unwrap();
        assert_eq!(lines.len(), 1);

        let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["params"]["username"], "@abc");
    }

    #[test]
    fn test_cli_parses_summarize() {
        let cli = Cli::try_parse_from([
            "sumxtui",
            "--api-url",
            "http://127.0.0.1:9000",
            "summarize",
            "bob",
            "--limit",
            "10",
            "--from",
            "2024-01-01",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://127.0.0.1:9000"));
        match cli.command {
            Some(CliCommand::Summarize {
                handle,
                limit,
                retweets,
                from,
                to,
                text,
            }) => {
                assert_eq!(handle, "bob");
                assert_eq!(limit.as_deref(), Some("10"));
                assert!(!retweets);
                assert_eq!(from.as_deref(), Some("2024-01-01"));
                assert!(to.is_none());
                assert!(!text);
            }
            _ => panic!("expected summarize"),
        }
    }
}
