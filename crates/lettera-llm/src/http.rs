use std::time::Duration;

use lettera_core::GatewayError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-over-HTTP access to the backend, shared by all service clients.
#[derive(Clone, Debug)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST `body` as JSON and decode the JSON response.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "service returned error status");
            return Err(GatewayError::from_status(status.as_u16(), text));
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::MalformedResponse(e.to_string()))
    }

    fn classify(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}
