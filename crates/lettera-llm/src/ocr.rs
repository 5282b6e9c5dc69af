use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use lettera_core::provider::OcrProvider;
use lettera_core::{Clock, GatewayError, Language};
use lettera_store::TtlCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::http::ServiceClient;

const CACHE_CAPACITY: usize = 32;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OcrRequest<'a> {
    data: String,
    mime_type: &'a str,
    language: Language,
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    text: Option<String>,
}

/// OCR service reached through `POST {base}/ocr`.
///
/// Readable results are cached per content digest, so re-sending the same
/// upload after a failed turn does not hit the service again.
pub struct HttpOcrClient {
    service: ServiceClient,
    cache: TtlCache<String, String>,
}

impl HttpOcrClient {
    pub fn new(service: ServiceClient, cache_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            service,
            cache: TtlCache::new(cache_ttl, CACHE_CAPACITY, clock),
        }
    }

    fn cache_key(data: &[u8], mime_type: &str, language: Language) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.update(mime_type.as_bytes());
        hasher.update(language.code().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[async_trait]
impl OcrProvider for HttpOcrClient {
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn extract_text(
        &self,
        data: &[u8],
        mime_type: &str,
        language: Language,
    ) -> Result<Option<String>, GatewayError> {
        let key = Self::cache_key(data, mime_type, language);
        if let Some(text) = self.cache.get(&key) {
            debug!("ocr cache hit");
            return Ok(Some(text));
        }

        let body = OcrRequest {
            data: base64::engine::general_purpose::STANDARD.encode(data),
            mime_type,
            language,
        };
        let response: Option<OcrResponse> = self.service.post_json("ocr", &body).await?;
        let text = response
            .and_then(|r| r.text)
            .filter(|t| !t.trim().is_empty());

        if let Some(text) = &text {
            self.cache.insert(key, text.clone());
        }
        Ok(text)
    }
}
