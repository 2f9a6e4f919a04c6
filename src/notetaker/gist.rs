//! GitHub Gist client used as the note store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::notetaker::store::{Artifact, Document, NoteStore, StoreError};

pub const GITHUB_API_URL: &str = "https://api.github.com";

pub struct GistClient {
    token: String,
    api_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct GistFile<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    description: &'a str,
    public: bool,
    files: HashMap<&'a str, GistFile<'a>>,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    files: HashMap<&'a str, GistFile<'a>>,
}

#[derive(Deserialize, Debug)]
struct GistResponse {
    id: String,
    html_url: String,
}

impl GistClient {
    pub fn new(token: String, api_url: String, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("notetaker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { token, api_url: api_url.trim_end_matches('/').to_string(), http })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Artifact, StoreError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Http(format!("request timed out: {e}"))
                } else {
                    StoreError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Http(format!("failed to read response: {e}")))?;

        debug!("Gist response status: {status}");

        if !status.is_success() {
            return Err(StoreError::Api(format!("{status}: {body}")));
        }

        let gist: GistResponse =
            serde_json::from_str(&body).map_err(|e| StoreError::Parse(e.to_string()))?;

        Ok(Artifact { id: gist.id, url: gist.html_url })
    }
}

#[async_trait]
impl NoteStore for GistClient {
    async fn upsert(
        &self,
        existing: Option<&Artifact>,
        document: &Document,
    ) -> Result<Artifact, StoreError> {
        let files = HashMap::from([(
            document.name.as_str(),
            GistFile { content: &document.content },
        )]);

        let request = match existing {
            None => self.http.post(format!("{}/gists", self.api_url)).json(&CreateRequest {
                description: &document.description,
                public: document.public,
                files,
            }),
            Some(artifact) => self
                .http
                .patch(format!("{}/gists/{}", self.api_url, artifact.id))
                .json(&UpdateRequest { files }),
        };

        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn document(content: &str) -> Document {
        Document {
            name: "Notes.md".to_string(),
            description: "Uploaded by notetaker for alice".to_string(),
            content: content.to_string(),
            public: false,
        }
    }

    fn client(server: &MockServer) -> GistClient {
        GistClient::new("t0ken".to_string(), server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_create_posts_private_gist() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gists"))
            .and(header("authorization", "Bearer t0ken"))
            .and(body_partial_json(json!({
                "description": "Uploaded by notetaker for alice",
                "public": false,
                "files": { "Notes.md": { "content": "line1\nline2" } }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "aa5a315d",
                "html_url": "https://gist.github.com/aa5a315d"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let artifact = client(&server).upsert(None, &document("line1\nline2")).await.unwrap();

        assert_eq!(artifact.id, "aa5a315d");
        assert_eq!(artifact.url, "https://gist.github.com/aa5a315d");
    }

    #[tokio::test]
    async fn test_update_patches_existing_gist() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/gists/aa5a315d"))
            .and(body_partial_json(json!({
                "files": { "Notes.md": { "content": "more" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "aa5a315d",
                "html_url": "https://gist.github.com/aa5a315d"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let existing = Artifact {
            id: "aa5a315d".to_string(),
            url: "https://gist.github.com/aa5a315d".to_string(),
        };
        let artifact = client(&server).upsert(Some(&existing), &document("more")).await.unwrap();

        assert_eq!(artifact, existing);
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;

        let err = client(&server).upsert(None, &document("x")).await.unwrap_err();

        assert!(matches!(err, StoreError::Api(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_unparsable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).upsert(None, &document("x")).await.unwrap_err();

        assert!(matches!(err, StoreError::Parse(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "id": "1", "html_url": "u" }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let slow = GistClient::new("t".to_string(), server.uri(), Duration::from_millis(50)).unwrap();
        let err = slow.upsert(None, &document("x")).await.unwrap_err();

        assert!(matches!(err, StoreError::Http(_)));
    }
}
