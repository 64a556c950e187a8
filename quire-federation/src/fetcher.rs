//! Remote document and attachment retrieval.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::FederationConfig;
use crate::error::FetchError;

/// `Accept` header peers recognize as a federation request.
pub const ACTIVITY_ACCEPT: &str =
    r#"application/activity+json, application/ld+json; profile="https://www.w3.org/ns/activitystreams""#;

/// A parsed remote document.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub document: Value,
    pub content_type: String,
}

/// Raw attachment bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAttachment {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Transport used to dereference identifiers and attachment URLs.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// GETs a federation document.
    async fn fetch_document(&self, uri: &Url) -> Result<FetchedDocument, FetchError>;

    /// GETs an attachment's bytes.
    async fn fetch_attachment(&self, uri: &Url) -> Result<FetchedAttachment, FetchError>;
}

/// [`RemoteFetcher`] over `reqwest`.
pub struct HttpFetcher {
    client: Client,
    max_attachment_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &FederationConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            client,
            max_attachment_bytes: config.max_attachment_bytes,
        })
    }

    async fn get(&self, uri: &Url, accept: Option<&str>) -> Result<reqwest::Response, FetchError> {
        let mut request = self.client.get(uri.clone());
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        let response = request.send().await.map_err(|e| FetchError::Network {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_document(&self, uri: &Url) -> Result<FetchedDocument, FetchError> {
        debug!("GET {}", uri);
        let response = self.get(uri, Some(ACTIVITY_ACCEPT)).await?;

        let content_type = content_type(response.headers());
        let content_type = match content_type {
            Some(ct) if is_json(&ct) => ct,
            other => {
                return Err(FetchError::ContentType {
                    uri: uri.to_string(),
                    content_type: other,
                });
            }
        };

        let body = response.bytes().await.map_err(|e| FetchError::Body {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;
        let document = serde_json::from_slice(&body).map_err(|e| FetchError::Body {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;

        Ok(FetchedDocument {
            document,
            content_type,
        })
    }

    async fn fetch_attachment(&self, uri: &Url) -> Result<FetchedAttachment, FetchError> {
        debug!("GET {} (attachment)", uri);
        let limit = self.max_attachment_bytes;
        let too_large = || FetchError::TooLarge {
            uri: uri.to_string(),
            limit,
        };

        let mut response = self.get(uri, None).await?;
        let declared = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if declared.is_some_and(|len| len > limit) {
            return Err(too_large());
        }

        let content_type = content_type(response.headers());
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Body {
            uri: uri.to_string(),
            message: e.to_string(),
        })? {
            if (bytes.len() + chunk.len()) as u64 > limit {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedAttachment {
            bytes,
            content_type,
        })
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Whether a `Content-Type` value names a JSON document.
fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::is_json;

    #[test]
    fn json_content_types() {
        assert!(is_json("application/json"));
        assert!(is_json("application/activity+json"));
        assert!(is_json(
            r#"application/ld+json; profile="https://www.w3.org/ns/activitystreams""#
        ));
        assert!(is_json("Application/JSON; charset=utf-8"));
        assert!(!is_json("text/html"));
        assert!(!is_json("image/svg+xml"));
    }
}
