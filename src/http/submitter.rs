use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::error::{AppError, Result};

/// Status and body of one downstream call.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

/// The only way submissions reach the network.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// POST `body` to the configured endpoint with the given content type.
    async fn post(&self, body: String, content_type: &'static str) -> Result<Reply>;
}

/// [`Submitter`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: Client,
    endpoint: Url,
}

impl HttpSubmitter {
    pub fn new(client: Client, endpoint: &str) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn post(&self, body: String, content_type: &'static str) -> Result<Reply> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok(Reply { status, body })
    }
}

/// Accepts absolute http(s) URLs only.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::Init(format!(
            "Unsupported endpoint scheme '{}' in {}",
            other, url
        ))),
    }
}
