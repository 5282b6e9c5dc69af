use std::time::Duration;

use async_trait::async_trait;
use lettera_core::provider::{SourceSearch, SourceSnippet};
use lettera_core::{GatewayError, Language};
use serde::Serialize;
use tracing::instrument;

use crate::http::ServiceClient;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    language: Language,
    max_results: usize,
}

/// Legal-source search reached through `POST {base}/legal-search`.
///
/// Callers bound this with their own timeout; the client timeout only
/// guards against a hung connection.
pub struct HttpSourceSearch {
    service: ServiceClient,
}

impl HttpSourceSearch {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    pub fn from_url(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self::new(ServiceClient::new(base_url, timeout)?))
    }
}

#[async_trait]
impl SourceSearch for HttpSourceSearch {
    #[instrument(skip(self, query))]
    async fn search(
        &self,
        query: &str,
        language: Language,
        max_results: usize,
    ) -> Result<Vec<SourceSnippet>, GatewayError> {
        let body = SearchRequest {
            query,
            language,
            max_results,
        };
        let mut results: Vec<SourceSnippet> = self.service.post_json("legal-search", &body).await?;
        results.truncate(max_results);
        Ok(results)
    }
}
