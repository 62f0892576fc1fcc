//! JIRA Integration Adapter
//!
//! Write side of the sync: searches, creates issues and appends comments
//! through the JIRA REST v2 API (plain-text descriptions and comment bodies).

use super::retry::{classify_reqwest, with_retry, RetryConfig, RetryDecision, RetryableError};
use super::{BoardClient, BoardComment, Issue, NewIssue};
use crate::config::{HttpSettings, JiraConfig};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Per-request timeout for search/query operations
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Per-request timeout for create/update operations
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);
/// Page size used when listing comments
const COMMENT_PAGE_SIZE: u32 = 100;

/// Errors raised by the Board client
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("JIRA authentication failed: {0}")]
    Auth(String),
    #[error("JIRA resource not found: {0}")]
    NotFound(String),
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
    #[error("JIRA API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("JIRA network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl RetryableError for BoardError {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            BoardError::Network(e) => classify_reqwest(e),
            BoardError::RateLimited(secs) => RetryDecision::RetryAfter(Duration::from_secs(*secs)),
            BoardError::Api { status, .. } if *status >= 500 => RetryDecision::Retry,
            BoardError::Api { .. } | BoardError::Auth(_) | BoardError::NotFound(_) => {
                RetryDecision::NoRetry
            }
        }
    }
}

/// JIRA issue representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    pub id: String,
    pub fields: JiraFields,
}

/// The subset of issue fields the sync asks for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub created: Option<String>,
}

/// The authenticated user, as returned by `/myself`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraUser {
    #[serde(rename = "displayName", default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraComment {
    pub id: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraSearchResponse {
    #[serde(default)]
    total: u32,
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraCommentPage {
    #[serde(rename = "startAt", default)]
    start_at: u32,
    #[serde(default)]
    total: u32,
    comments: Vec<JiraComment>,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraCreatedIssue {
    key: String,
}

#[derive(Debug, Clone, Serialize)]
struct JiraCommentCreate<'a> {
    body: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct JiraKeyRef<'a> {
    key: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct JiraNameRef<'a> {
    name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct JiraCreateFields<'a> {
    project: JiraKeyRef<'a>,
    summary: &'a str,
    description: &'a str,
    #[serde(rename = "issuetype")]
    issue_type: JiraNameRef<'a>,
    components: Vec<JiraNameRef<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct JiraCreateIssue<'a> {
    fields: JiraCreateFields<'a>,
}

impl From<JiraIssue> for Issue {
    fn from(issue: JiraIssue) -> Self {
        Issue {
            key: issue.key,
            summary: issue.fields.summary,
            created: issue.fields.created,
        }
    }
}

impl From<JiraComment> for BoardComment {
    fn from(comment: JiraComment) -> Self {
        BoardComment {
            id: comment.id,
            body: comment.body,
        }
    }
}

/// JIRA REST client
pub struct JiraAdapter {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    retry: RetryConfig,
}

impl JiraAdapter {
    /// Create a new JIRA adapter without contacting the server
    pub fn new(config: &JiraConfig, http: &HttpSettings) -> Result<Self, BoardError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .danger_accept_invalid_certs(!config.verify)
            .build()?;

        let base_url = format!("{}/rest/api/2", config.api_url_prefix.trim_end_matches('/'));

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            retry: RetryConfig::with_max_retries(http.max_retries),
        })
    }

    /// Create the adapter and verify the credentials against `/myself`
    pub async fn connect(config: &JiraConfig, http: &HttpSettings) -> Result<Self, BoardError> {
        let adapter = Self::new(config, http)?;
        let url = format!("{}/myself", adapter.base_url);
        let response = adapter.authed(adapter.client.get(&url)).send().await?;
        let me: JiraUser = check_status(response, &url).await?.json().await?;
        info!(user = %me.display_name, url = %adapter.base_url, "Connected to JIRA");
        Ok(adapter)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    /// Search for issues using JQL
    pub async fn search(&self, jql: &str, max_results: u32) -> Result<Vec<JiraIssue>, BoardError> {
        let url = format!("{}/search", self.base_url);
        let params = [
            ("jql", jql.to_string()),
            ("maxResults", max_results.to_string()),
            ("fields", "summary,created".to_string()),
        ];

        debug!(jql = %jql, max_results = %max_results, "Searching JIRA issues");

        let (url, params) = (url.as_str(), &params);
        let result: JiraSearchResponse = with_retry(&self.retry, "jira_search", || async move {
            let request = self.authed(self.client.get(url).query(params));
            let response = request.timeout(SEARCH_TIMEOUT).send().await?;
            Ok::<_, BoardError>(check_status(response, jql).await?.json().await?)
        })
        .await?;

        debug!(
            total = result.total,
            returned = result.issues.len(),
            "JIRA search complete"
        );
        Ok(result.issues)
    }

    /// Fetch every comment of an issue, following pagination
    pub async fn comments(&self, key: &str) -> Result<Vec<JiraComment>, BoardError> {
        let url = format!("{}/issue/{}/comment", self.base_url, key);
        let mut comments = Vec::new();

        loop {
            let start_at = comments.len() as u32;
            let params = [
                ("startAt", start_at.to_string()),
                ("maxResults", COMMENT_PAGE_SIZE.to_string()),
            ];
            let (url, params) = (url.as_str(), &params);
            let page: JiraCommentPage = with_retry(&self.retry, "jira_comments", || async move {
                let request = self.authed(self.client.get(url).query(params));
                let response = request.timeout(SEARCH_TIMEOUT).send().await?;
                Ok::<_, BoardError>(check_status(response, key).await?.json().await?)
            })
            .await?;

            let fetched = page.comments.len();
            comments.extend(page.comments);
            if fetched == 0 || page.start_at as usize + fetched >= page.total as usize {
                break;
            }
        }

        debug!(key = %key, count = comments.len(), "Fetched JIRA comments");
        Ok(comments)
    }

    /// Create a new issue, returning its key
    pub async fn create(&self, issue: &NewIssue) -> Result<String, BoardError> {
        let url = format!("{}/issue", self.base_url);
        let body = JiraCreateIssue {
            fields: JiraCreateFields {
                project: JiraKeyRef { key: &issue.project },
                summary: &issue.summary,
                description: &issue.description,
                issue_type: JiraNameRef {
                    name: &issue.issue_type,
                },
                components: vec![JiraNameRef {
                    name: &issue.component,
                }],
            },
        };

        let request = self.authed(self.client.post(&url).json(&body));
        let response = request.timeout(WRITE_TIMEOUT).send().await?;
        let created: JiraCreatedIssue = check_status(response, &issue.summary).await?.json().await?;

        info!(key = %created.key, summary = %issue.summary, "Created JIRA issue");
        Ok(created.key)
    }

    /// Add a comment to an issue
    pub async fn comment(&self, key: &str, body: &str) -> Result<JiraComment, BoardError> {
        let url = format!("{}/issue/{}/comment", self.base_url, key);

        let request = self.authed(self.client.post(&url).json(&JiraCommentCreate { body }));
        let response = request.timeout(WRITE_TIMEOUT).send().await?;
        let comment: JiraComment = check_status(response, key).await?.json().await?;

        debug!(key = %key, comment = %comment.id, "Added JIRA comment");
        Ok(comment)
    }
}

/// Map non-success statuses onto [`BoardError`]
async fn check_status(response: Response, subject: &str) -> Result<Response, BoardError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(BoardError::Auth(format!("HTTP {}", response.status())))
        }
        StatusCode::NOT_FOUND => Err(BoardError::NotFound(subject.to_string())),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            Err(BoardError::RateLimited(retry_after))
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(BoardError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl BoardClient for JiraAdapter {
    async fn search_issues(&self, jql: &str) -> Result<Vec<Issue>, BoardError> {
        Ok(self
            .search(jql, 50)
            .await?
            .into_iter()
            .map(Issue::from)
            .collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, BoardError> {
        let key = self.create(issue).await?;
        Ok(Issue {
            key,
            summary: issue.summary.clone(),
            created: None,
        })
    }

    async fn list_comments(&self, issue: &Issue) -> Result<Vec<BoardComment>, BoardError> {
        Ok(self
            .comments(&issue.key)
            .await?
            .into_iter()
            .map(BoardComment::from)
            .collect())
    }

    async fn add_comment(&self, issue: &Issue, body: &str) -> Result<BoardComment, BoardError> {
        Ok(self.comment(&issue.key, body).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn test_config(url: &str) -> JiraConfig {
        JiraConfig {
            api_url_prefix: url.to_string(),
            verify: true,
            username: "sync-bot".to_string(),
            password: "hunter2".to_string(),
            project: "SUP".to_string(),
            component: "Support".to_string(),
            issue_type: "Bug".to_string(),
        }
    }

    fn http() -> HttpSettings {
        HttpSettings {
            timeout_secs: 5,
            max_retries: 0,
        }
    }

    #[test]
    fn test_adapter_creation() {
        let adapter = JiraAdapter::new(&test_config("https://jira.example.com/"), &http())
            .expect("Failed to create adapter");
        assert_eq!(adapter.base_url(), "https://jira.example.com/rest/api/2");
    }

    #[test]
    fn test_retry_classification() {
        assert_eq!(
            BoardError::RateLimited(7).retry_decision(),
            RetryDecision::RetryAfter(Duration::from_secs(7))
        );
        let err = BoardError::Api {
            status: 502,
            body: String::new(),
        };
        assert_eq!(err.retry_decision(), RetryDecision::Retry);
        let err = BoardError::Api {
            status: 400,
            body: "bad jql".to_string(),
        };
        assert_eq!(err.retry_decision(), RetryDecision::NoRetry);
    }

    #[tokio::test]
    async fn test_search_maps_issues() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::UrlEncoded(
                "jql".into(),
                "project = SUP ORDER BY created ASC".into(),
            ))
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"startAt":0,"maxResults":50,"total":2,"issues":[
                    {"id":"1","key":"SUP-1","fields":{"summary":"John Smith: Login broken","created":"2013-06-11T13:20:18.000+0000"}},
                    {"id":"2","key":"SUP-9","fields":{"summary":"John Smith: Login broken"}}
                ]}"#,
            )
            .create_async()
            .await;

        let adapter = JiraAdapter::new(&test_config(&server.url()), &http()).unwrap();
        let issues = adapter
            .search_issues("project = SUP ORDER BY created ASC")
            .await
            .unwrap();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].key, "SUP-1");
        assert_eq!(issues[1].created, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_comments_follow_pagination() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/rest/api/2/issue/SUP-1/comment")
            .match_query(Matcher::UrlEncoded("startAt".into(), "0".into()))
            .with_status(200)
            .with_body(r#"{"startAt":0,"maxResults":1,"total":2,"comments":[{"id":"10","body":"one"}]}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/rest/api/2/issue/SUP-1/comment")
            .match_query(Matcher::UrlEncoded("startAt".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"startAt":1,"maxResults":1,"total":2,"comments":[{"id":"11","body":"two"}]}"#)
            .create_async()
            .await;

        let adapter = JiraAdapter::new(&test_config(&server.url()), &http()).unwrap();
        let comments = adapter.comments("SUP-1").await.unwrap();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].body, "two");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_issue_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/api/2/issue")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "fields": {
                    "project": {"key": "SUP"},
                    "summary": "John Smith: Login broken",
                    "issuetype": {"name": "Bug"},
                    "components": [{"name": "Support"}]
                }
            })))
            .with_status(201)
            .with_body(r#"{"id":"10001","key":"SUP-42","self":"http://x/rest/api/2/issue/10001"}"#)
            .create_async()
            .await;

        let adapter = JiraAdapter::new(&test_config(&server.url()), &http()).unwrap();
        let issue = adapter
            .create_issue(&NewIssue {
                project: "SUP".to_string(),
                summary: "John Smith: Login broken".to_string(),
                description: "Ticket ID: 77".to_string(),
                issue_type: "Bug".to_string(),
                component: "Support".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(issue.key, "SUP-42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/rest/api/2/issue/SUP-1/comment")
            .with_status(401)
            .create_async()
            .await;
        server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"errorMessages":["bad jql"]}"#)
            .create_async()
            .await;

        let adapter = JiraAdapter::new(&test_config(&server.url()), &http()).unwrap();

        let err = adapter.comment("SUP-1", "hello").await.unwrap_err();
        assert!(matches!(err, BoardError::Auth(_)));

        let err = adapter.search("summary ~ \"\"", 1).await.unwrap_err();
        assert!(matches!(err, BoardError::Api { status: 400, .. }));
    }
}
