//! REST-backed comment store

use async_trait::async_trait;
use mefm_core::comment::{Comment, CommentDraft, CommentStatus};
use mefm_core::config::BackendConfig;
use mefm_core::error::{MefmError, Result};
use mefm_core::store::CommentStore;
use mefm_core::types::{CommentId, PractitionerId};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest stretch of an error body quoted in messages
const ERROR_BODY_LIMIT: usize = 200;

/// Comment store talking to the directory's REST backend
#[derive(Debug, Clone)]
pub struct HttpCommentStore {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpCommentStore {
    /// Create a store for `base_url` with default client settings
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_config(&BackendConfig {
            base_url: base_url.to_string(),
            ..BackendConfig::default()
        })
    }

    /// Create a store from backend configuration
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| MefmError::Config(format!("invalid backend URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(MefmError::Config(format!(
                "backend URL {} cannot be used as a base",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MefmError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    /// Base URL requests are made against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and turn transport failures and non-success statuses
    /// into persistence errors
    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            warn!("{} request failed: {}", operation, e);
            MefmError::persistence(operation, e)
        })?;

        let status = response.status();
        debug!("{} -> {}", operation, status);
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        warn!("{} rejected with {}: {}", operation, status, body);
        Err(MefmError::persistence(
            operation,
            if body.trim().is_empty() {
                format!("backend returned {}", status)
            } else {
                format!("backend returned {}: {}", status, body.trim())
            },
        ))
    }

    async fn fetch_list(&self, operation: &'static str, url: Url) -> Result<Vec<Comment>> {
        let response = self.send(operation, self.request(Method::GET, url)).await?;
        response
            .json::<Vec<Comment>>()
            .await
            .map_err(|e| MefmError::persistence(operation, format!("invalid response body: {}", e)))
    }
}

/// The create endpoint answers with the new id, either as JSON (number or
/// string) or as a bare token. Anything else carries no usable id.
fn parse_assigned_id(body: &str) -> Option<CommentId> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(id) = serde_json::from_str::<CommentId>(body) {
        return Some(id).filter(|id| !id.is_blank());
    }
    let bare = body
        .chars()
        .all(|c| !c.is_whitespace() && !matches!(c, '{' | '}' | '[' | ']' | '"' | ':' | ','));
    bare.then(|| CommentId::from(body))
}

#[async_trait]
impl CommentStore for HttpCommentStore {
    async fn create(&self, draft: &CommentDraft) -> Result<CommentId> {
        let url = self.endpoint(&["comments"]);
        let response = self
            .send("create", self.request(Method::POST, url).json(draft))
            .await?;

        let body = response
            .text()
            .await
            .map_err(|e| MefmError::persistence("create", e))?;
        parse_assigned_id(&body)
            .ok_or_else(|| MefmError::persistence("create", "backend did not return an id"))
    }

    async fn update(&self, comment: &Comment) -> Result<()> {
        let url = self.endpoint(&["comments"]);
        self.send("update", self.request(Method::PUT, url).json(comment))
            .await?;
        Ok(())
    }

    async fn list_for_practitioner(&self, practitioner_id: &PractitionerId) -> Result<Vec<Comment>> {
        let url = self.endpoint(&["comments", practitioner_id.as_str()]);
        self.fetch_list("list", url).await
    }

    async fn list_by_status(&self, status: CommentStatus) -> Result<Vec<Comment>> {
        let mut url = self.endpoint(&["comments"]);
        url.query_pairs_mut().append_pair("status", status.as_str());
        self.fetch_list("list", url).await
    }

    async fn resolve(&self, comments: &[Comment]) -> Result<()> {
        let url = self.endpoint(&["comments", "resolve"]);
        self.send("resolve", self.request(Method::POST, url).json(comments))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mefm_core::comment::NewComment;
    use mefm_core::types::UserId;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn draft(parent: Option<&str>) -> CommentDraft {
        CommentDraft::from_input(NewComment {
            parent_id: parent.map(CommentId::from),
            practitioner_id: PractitionerId::from("42"),
            user_id: UserId::from("7"),
            text: "Explained everything twice".to_string(),
        })
    }

    fn stored(status: CommentStatus) -> Comment {
        let mut comment = draft(None).into_comment(CommentId::from("99"));
        comment.date = Utc.with_ymd_and_hms(2019, 3, 1, 12, 0, 0).unwrap();
        comment.status = status;
        comment
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let store = HttpCommentStore::new("http://localhost:8080/api/").unwrap();
        assert_eq!(
            store.endpoint(&["comments", "resolve"]).as_str(),
            "http://localhost:8080/api/comments/resolve"
        );

        let store = HttpCommentStore::new("http://localhost:8080").unwrap();
        assert_eq!(
            store.endpoint(&["comments", "p 1"]).as_str(),
            "http://localhost:8080/comments/p%201"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpCommentStore::new("not a url"),
            Err(MefmError::Config(_))
        ));
        assert!(matches!(
            HttpCommentStore::new("mailto:someone@example.org"),
            Err(MefmError::Config(_))
        ));
    }

    #[test]
    fn test_parse_assigned_id() {
        assert_eq!(parse_assigned_id("5629499534213120"), Some(CommentId::from("5629499534213120")));
        assert_eq!(parse_assigned_id("\"c1\"\n"), Some(CommentId::from("c1")));
        assert_eq!(parse_assigned_id("c7"), Some(CommentId::from("c7")));
        assert_eq!(parse_assigned_id("  "), None);
        assert_eq!(parse_assigned_id("{\"id\":5}"), None);
        assert_eq!(parse_assigned_id("[5]"), None);
        assert_eq!(parse_assigned_id("created 5"), None);
    }

    #[tokio::test]
    async fn test_create_with_object_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/comments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5})))
            .mount(&server)
            .await;

        let store = HttpCommentStore::new(&server.uri()).unwrap();
        let err = store.create(&draft(None)).await.unwrap_err();
        assert!(err.is_persistence());
        assert!(err.to_string().contains("did not return an id"));
    }

    #[tokio::test]
    async fn test_create_posts_pending_draft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/comments"))
            .and(body_partial_json(json!({
                "parentId": "5",
                "practitionerId": "42",
                "userId": "7",
                "status": "PENDING",
                "text": "Explained everything twice"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_string("5629499534213120"))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpCommentStore::new(&server.uri()).unwrap();
        let id = store.create(&draft(Some("5"))).await.unwrap();
        assert_eq!(id, CommentId::from("5629499534213120"));
    }

    #[tokio::test]
    async fn test_create_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/comments"))
            .respond_with(ResponseTemplate::new(500).set_body_string("datastore unavailable"))
            .mount(&server)
            .await;

        let store = HttpCommentStore::new(&server.uri()).unwrap();
        let err = store.create(&draft(None)).await.unwrap_err();
        assert!(err.is_persistence());
        assert!(err.to_string().contains("datastore unavailable"));
    }

    #[tokio::test]
    async fn test_create_without_id_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/comments"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let store = HttpCommentStore::new(&server.uri()).unwrap();
        assert!(store.create(&draft(None)).await.unwrap_err().is_persistence());
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let store = HttpCommentStore::new(&uri).unwrap();
        assert!(store.create(&draft(None)).await.unwrap_err().is_persistence());
    }

    #[tokio::test]
    async fn test_update_puts_full_comment() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/comments"))
            .and(body_partial_json(json!({"id": "99", "status": "FLAGGED"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpCommentStore::new(&server.uri()).unwrap();
        store.update(&stored(CommentStatus::Flagged)).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_for_practitioner_accepts_numeric_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/comments/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1,
                    "practitionerId": 42,
                    "userId": 7,
                    "date": "2019-03-01T12:00:00Z",
                    "text": "root",
                    "status": "VISIBLE"
                },
                {
                    "id": 2,
                    "parentId": 1,
                    "practitionerId": 42,
                    "userId": 8,
                    "date": "2019-03-01T13:00:00Z",
                    "text": "reply",
                    "status": "PENDING"
                }
            ])))
            .mount(&server)
            .await;

        let store = HttpCommentStore::new(&server.uri()).unwrap();
        let comments = store
            .list_for_practitioner(&PractitionerId::from("42"))
            .await
            .unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].parent_id, Some(CommentId::from("1")));
        assert_eq!(comments[1].status, CommentStatus::Pending);
    }

    #[tokio::test]
    async fn test_list_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/comments/42"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let store = HttpCommentStore::new(&server.uri()).unwrap();
        assert!(store
            .list_for_practitioner(&PractitionerId::from("42"))
            .await
            .unwrap_err()
            .is_persistence());
    }

    #[tokio::test]
    async fn test_list_by_status_sends_query_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/comments"))
            .and(query_param("status", "FLAGGED"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored(CommentStatus::Flagged)])))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpCommentStore::from_config(&BackendConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            token: Some("secret".to_string()),
        })
        .unwrap();
        let comments = store.list_by_status(CommentStatus::Flagged).await.unwrap();
        assert_eq!(comments, vec![stored(CommentStatus::Flagged)]);
    }

    #[tokio::test]
    async fn test_resolve_posts_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/comments/resolve"))
            .and(body_partial_json(json!([{"id": "99", "status": "BLOCKED"}])))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpCommentStore::new(&server.uri()).unwrap();
        store.resolve(&[stored(CommentStatus::Blocked)]).await.unwrap();
    }
}
