use async_trait::async_trait;
use thiserror::Error;

use crate::config::ApiKey;
use crate::models::ChatRequest;

/// Status and body of one completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Failure before a complete response was read.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // without_url keeps query strings out of logs
        Self(err.without_url().to_string())
    }
}

/// Sends one chat-completion POST. Timeouts are applied by the caller.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post(
        &self,
        request: &ChatRequest,
        api_key: &ApiKey,
    ) -> Result<TransportResponse, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    site_url: String,
    app_title: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, url: String, site_url: String, app_title: String) -> Self {
        Self {
            client,
            url,
            site_url,
            app_title,
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post(
        &self,
        request: &ChatRequest,
        api_key: &ApiKey,
    ) -> Result<TransportResponse, TransportError> {
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(api_key.expose())
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", &self.app_title)
            .json(request)
            .send()
            .await?;

        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(TransportResponse { status, body })
    }
}
