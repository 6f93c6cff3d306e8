//! reqwest-backed [`AdvisoryClient`].

use std::time::Duration;

use async_trait::async_trait;

use super::advisory::{AdvisoryClient, AdvisoryError, AdvisoryRequest, AdvisoryResponse};

/// Posts requests as JSON to a single endpoint URL.
#[derive(Debug, Clone)]
pub struct HttpAdvisoryClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpAdvisoryClient {
    /// `timeout` bounds each HTTP exchange; the coach service applies its
    /// own overall deadline on top.
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AdvisoryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tricoach/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
            api_key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AdvisoryClient for HttpAdvisoryClient {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<AdvisoryResponse, AdvisoryError> {
        let mut builder = self.http.post(&self.url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<AdvisoryResponse>()
            .await
            .map_err(|e| AdvisoryError::Malformed(e.to_string()))
    }
}
