//! Conversation engine: turns user input into assistant replies and letter
//! drafts, with rate limiting, crash recovery and export surfaces.

pub mod context;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod rate_limit;
pub mod setup;
pub mod watchdog;

pub use context::ContextWindow;
pub use error::EngineError;
pub use export::{CaseMigrationPayload, DraftExport, MailtoLink, SaveOffer};
pub use orchestrator::{
    Attachment, ClearOutcome, Collaborators, FailureReason, Orchestrator, OrchestratorConfig,
    Phase, TurnOutcome, UserInput,
};
pub use rate_limit::{is_limited, RateLimitTracker};
pub use setup::{http_collaborators, open_store, orchestrator_from_settings};
pub use watchdog::spawn_idle_watchdog;
