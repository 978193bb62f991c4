//! Google Docs REST backend.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use docweave_types::{DocError, Document, Request, Result, batch_body};

use crate::api::DocsApi;

/// Default API root.
pub const DEFAULT_API_BASE: &str = "https://docs.googleapis.com";

/// [`DocsApi`] over the Docs v1 REST API with a bearer token.
#[derive(Debug, Clone)]
pub struct GoogleDocsApi {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl GoogleDocsApi {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base(DEFAULT_API_BASE, token, Duration::from_secs(30))
    }

    pub fn with_base(api_base: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DocError::remote(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/documents{}", self.api_base, path)
    }

    async fn send(&self, builder: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = builder
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| error_chain(what, &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DocError::NotFound(format!("{what}: {}", remote_message(&body))));
        }
        Err(DocError::Remote {
            message: format!("{what}: {}", remote_message(&body)),
            status: Some(status.as_u16()),
        })
    }
}

/// Flatten a transport error and its sources into one message.
fn error_chain(what: &str, err: &reqwest::Error) -> DocError {
    let mut chain = format!("{what}: {err}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        chain.push_str(&format!(" -> {cause}"));
        source = cause.source();
    }
    DocError::remote(chain)
}

/// Pull `error.message` out of an API error body, falling back to the raw text.
fn remote_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl DocsApi for GoogleDocsApi {
    async fn get_document(&self, document_id: &str) -> Result<Document> {
        let response = self
            .send(self.client.get(self.url(&format!("/{document_id}"))), "documents.get")
            .await?;
        response
            .json::<Document>()
            .await
            .map_err(|e| DocError::remote(format!("documents.get: malformed response: {e}")))
    }

    async fn batch_update(&self, document_id: &str, requests: &[Request]) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let url = self.url(&format!("/{document_id}:batchUpdate"));
        self.send(self.client.post(url).json(&batch_body(requests)), "documents.batchUpdate")
            .await?;
        Ok(())
    }

    async fn create_document(&self, title: &str) -> Result<Document> {
        let response = self
            .send(self.client.post(self.url("")).json(&json!({ "title": title })), "documents.create")
            .await?;
        response
            .json::<Document>()
            .await
            .map_err(|e| DocError::remote(format!("documents.create: malformed response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_message_extraction() {
        let body = r#"{"error":{"code":400,"message":"Invalid requests[0].insertText: bad index"}}"#;
        assert_eq!(remote_message(body), "Invalid requests[0].insertText: bad index");
        assert_eq!(remote_message("  plain failure \n"), "plain failure");
    }

    #[test]
    fn test_url_building_trims_slash() {
        let api = GoogleDocsApi::with_base("http://localhost:9/", "t", Duration::from_secs(1)).unwrap();
        assert_eq!(api.url("/abc:batchUpdate"), "http://localhost:9/v1/documents/abc:batchUpdate");
        assert_eq!(api.url(""), "http://localhost:9/v1/documents");
    }
}
