use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::language::Language;
use crate::messages::HistoryTurn;

/// Body sent to the completion service for one turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub message: String,
    pub language: Language,
    pub is_first_message: bool,
    pub conversation_history: Vec<HistoryTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legal_sources: Vec<SourceSnippet>,
}

/// Raw completion service response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub ok: bool,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub draft_text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A successful completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionReply {
    pub reply: String,
    pub draft_text: Option<String>,
}

impl CompletionResponse {
    /// `ok: false` and `ok: true` without a reply are both treated as failures.
    pub fn into_reply(self) -> Result<CompletionReply, GatewayError> {
        if !self.ok {
            return Err(GatewayError::Rejected(
                self.error.unwrap_or_else(|| "service reported failure".into()),
            ));
        }
        let draft_text = self.draft_text.filter(|d| !d.trim().is_empty());
        match self.reply {
            Some(reply) if !reply.trim().is_empty() => Ok(CompletionReply { reply, draft_text }),
            _ => match draft_text {
                Some(draft) => Ok(CompletionReply {
                    reply: draft.clone(),
                    draft_text: Some(draft),
                }),
                None => Err(GatewayError::MalformedResponse("response has no reply".into())),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnippet {
    pub snippet: String,
    pub source: String,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionReply, GatewayError>;
}

/// Legal-source search. Callers always wrap this in their own timeout.
#[async_trait]
pub trait SourceSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        language: Language,
        max_results: usize,
    ) -> Result<Vec<SourceSnippet>, GatewayError>;
}

/// Text extraction from an uploaded image or PDF. `Ok(None)` means nothing readable.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn extract_text(
        &self,
        data: &[u8],
        mime_type: &str,
        language: Language,
    ) -> Result<Option<String>, GatewayError>;
}

/// Plan lookup: unlimited, admin and paid accounts bypass the daily ceiling.
#[async_trait]
pub trait EntitlementLookup: Send + Sync {
    async fn is_rate_limit_exempt(&self) -> bool;
}

/// Fixed answer, for the CLI and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticEntitlement {
    pub exempt: bool,
}

#[async_trait]
impl EntitlementLookup for StaticEntitlement {
    async fn is_rate_limit_exempt(&self) -> bool {
        self.exempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Role;

    #[test]
    fn request_wire_shape() {
        let req = CompletionRequest {
            message: "Scrivi una lettera".into(),
            language: Language::It,
            is_first_message: true,
            conversation_history: vec![HistoryTurn::new(Role::User, "Scrivi una lettera")],
            document_text: None,
            legal_sources: Vec::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["language"], "it");
        assert_eq!(json["isFirstMessage"], true);
        assert_eq!(json["conversationHistory"][0]["role"], "user");
        assert!(json.get("documentText").is_none());
        assert!(json.get("legalSources").is_none());
    }

    #[test]
    fn ok_response_becomes_reply() {
        let resp: CompletionResponse =
            serde_json::from_str(r#"{"ok":true,"reply":"Certo!","draftText":"  "}"#).unwrap();
        let reply = resp.into_reply().unwrap();
        assert_eq!(reply.reply, "Certo!");
        assert!(reply.draft_text.is_none());
    }

    #[test]
    fn draft_only_response_uses_draft_as_reply() {
        let resp = CompletionResponse {
            ok: true,
            reply: None,
            draft_text: Some("Gentile Dottore".into()),
            error: None,
        };
        let reply = resp.into_reply().unwrap();
        assert_eq!(reply.reply, "Gentile Dottore");
        assert_eq!(reply.draft_text.as_deref(), Some("Gentile Dottore"));
    }

    #[test]
    fn failed_response_is_rejected() {
        let resp: CompletionResponse =
            serde_json::from_str(r#"{"ok":false,"error":"quota"}"#).unwrap();
        match resp.into_reply() {
            Err(GatewayError::Rejected(msg)) => assert_eq!(msg, "quota"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn empty_ok_response_is_malformed() {
        let resp = CompletionResponse {
            ok: true,
            ..Default::default()
        };
        assert!(matches!(resp.into_reply(), Err(GatewayError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn static_entitlement() {
        assert!(StaticEntitlement { exempt: true }.is_rate_limit_exempt().await);
        assert!(!StaticEntitlement::default().is_rate_limit_exempt().await);
    }
}
