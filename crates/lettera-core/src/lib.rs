//! Domain types shared by every lettera crate: the chat log, the per-session
//! entities that get persisted, the error taxonomy of the external services,
//! and the traits those services are reached through.

pub mod clock;
pub mod errors;
pub mod ids;
pub mod language;
pub mod messages;
pub mod provider;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{GatewayError, ValidationError};
pub use ids::{ConversationId, TurnId};
pub use language::Language;
pub use messages::{AttachmentKind, ChatMessage, HistoryTurn, Role};
pub use session::{Draft, RecoverySnapshot, SessionState};
