use std::time::Duration;

use async_trait::async_trait;
use lettera_core::provider::{CompletionProvider, CompletionReply, CompletionRequest, CompletionResponse};
use lettera_core::GatewayError;
use tracing::{debug, instrument};

use crate::http::ServiceClient;

/// Completion service reached through `POST {base}/chat`.
pub struct HttpCompletionClient {
    service: ServiceClient,
}

impl HttpCompletionClient {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    pub fn from_url(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self::new(ServiceClient::new(base_url, timeout)?))
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionClient {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip_all, fields(language = %request.language, history = request.conversation_history.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionReply, GatewayError> {
        let response: CompletionResponse = self.service.post_json("chat", request).await?;
        let reply = response.into_reply()?;
        debug!(
            reply_chars = reply.reply.chars().count(),
            has_draft = reply.draft_text.is_some(),
            "completion received"
        );
        Ok(reply)
    }
}
