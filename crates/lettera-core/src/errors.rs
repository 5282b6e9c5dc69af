use std::time::Duration;

/// Failures talking to the completion, OCR and legal-search services.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Server { .. } => "server",
            Self::Rejected(_) => "rejected",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Classify a non-2xx HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400..=499 => Self::Rejected(format!("status {status}: {body}")),
            _ => Self::Server { status, body },
        }
    }
}

/// Input rejected before any state is touched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("message is empty")]
    EmptyInput,
    #[error("attachment type not allowed: {0}")]
    DisallowedAttachment(String),
    #[error("attachment has no content")]
    EmptyAttachment,
}
