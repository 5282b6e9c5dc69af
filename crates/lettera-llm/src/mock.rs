use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use lettera_core::provider::{
    CompletionProvider, CompletionReply, CompletionRequest, OcrProvider, SourceSearch,
    SourceSnippet,
};
use lettera_core::{GatewayError, Language};

/// Pre-programmed completion outcomes for deterministic tests.
pub enum MockResponse {
    Reply(CompletionReply),
    Error(GatewayError),
    /// Wait a duration, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(reply: &str) -> Self {
        Self::Reply(CompletionReply {
            reply: reply.to_string(),
            draft_text: None,
        })
    }

    pub fn with_draft(reply: &str, draft: &str) -> Self {
        Self::Reply(CompletionReply {
            reply: reply.to_string(),
            draft_text: Some(draft.to_string()),
        })
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Completion provider that answers from a queue and records every request.
#[derive(Default)]
pub struct MockCompletion {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionReply, GatewayError> {
        self.requests.lock().push(request.clone());
        let next = self.responses.lock().pop_front();
        let Some(mut current) = next else {
            return Err(GatewayError::Rejected(
                "MockCompletion: no response configured".into(),
            ));
        };
        // Unroll nested delays iteratively.
        loop {
            match current {
                MockResponse::Reply(reply) => return Ok(reply),
                MockResponse::Error(e) => return Err(e),
                MockResponse::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    current = *inner;
                }
            }
        }
    }
}

/// Legal search returning a fixed result (or error) after an optional delay.
pub struct MockSearch {
    result: Result<Vec<SourceSnippet>, GatewayError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSearch {
    pub fn returning(snippets: Vec<SourceSnippet>) -> Self {
        Self {
            result: Ok(snippets),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SourceSearch for MockSearch {
    async fn search(
        &self,
        _query: &str,
        _language: Language,
        max_results: usize,
    ) -> Result<Vec<SourceSnippet>, GatewayError> {
        let _ = self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result
            .clone()
            .map(|snippets| snippets.into_iter().take(max_results).collect())
    }
}

/// OCR returning a fixed text (or nothing).
pub struct MockOcr {
    result: Result<Option<String>, GatewayError>,
    calls: AtomicUsize,
}

impl MockOcr {
    pub fn reading(text: &str) -> Self {
        Self {
            result: Ok(Some(text.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreadable() -> Self {
        Self {
            result: Ok(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OcrProvider for MockOcr {
    async fn extract_text(
        &self,
        _data: &[u8],
        _mime_type: &str,
        _language: Language,
    ) -> Result<Option<String>, GatewayError> {
        let _ = self.calls.fetch_add(1, Ordering::Relaxed);
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            message: "ciao".into(),
            language: Language::It,
            is_first_message: true,
            conversation_history: Vec::new(),
            document_text: None,
            legal_sources: Vec::new(),
        }
    }

    #[tokio::test]
    async fn responses_in_order_then_exhausted() {
        let mock = MockCompletion::new(vec![
            MockResponse::text("uno"),
            MockResponse::Error(GatewayError::Network("reset".into())),
        ]);
        assert_eq!(mock.complete(&request()).await.unwrap().reply, "uno");
        assert!(matches!(mock.complete(&request()).await, Err(GatewayError::Network(_))));
        assert!(mock.complete(&request()).await.is_err());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.last_request().unwrap().message, "ciao");
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_response_waits() {
        let mock = MockCompletion::new(vec![MockResponse::delayed(
            Duration::from_secs(30),
            MockResponse::with_draft("ecco", "Gentile Sig."),
        )]);
        let start = tokio::time::Instant::now();
        let reply = mock.complete(&request()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert_eq!(reply.draft_text.as_deref(), Some("Gentile Sig."));
    }

    #[tokio::test]
    async fn search_caps_results() {
        let snippet = SourceSnippet {
            snippet: "Art. 1".into(),
            source: "gazzetta".into(),
        };
        let search = MockSearch::returning(vec![snippet.clone(), snippet.clone(), snippet]);
        assert_eq!(search.search("q", Language::It, 2).await.unwrap().len(), 2);
        assert_eq!(search.call_count(), 1);
    }
}
