//! Conversation orchestrator: one state machine per conversation.
//!
//! A turn walks `Idle -> Sending -> [SearchingSources] -> AwaitingReply ->
//! Applying -> Idle`. Only one turn is in flight at a time; submitting while
//! busy is a no-op. Cancellation and failure are reported as
//! [`TurnOutcome`]s and always land back in `Idle`.
//!
//! Dictation is tracked apart from the turn phase. It may start while a
//! reply is pending; it vetoes `clear()` and the idle watchdog, and the next
//! submitted turn ends it.
//!
//! `Orchestrator` is a cheap `Clone` handle. State lives behind a
//! `parking_lot::Mutex` that is never held across an `.await`; every await
//! point re-checks an epoch counter so that a reply arriving after `clear()`
//! cannot touch the fresh conversation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lettera_core::provider::{
    CompletionProvider, CompletionReply, CompletionRequest, EntitlementLookup, OcrProvider,
    SourceSearch,
};
use lettera_core::{
    AttachmentKind, ChatMessage, Clock, ConversationId, Draft, GatewayError, Language,
    SessionState, TurnId, ValidationError,
};
use lettera_letter::{
    needs_legal_sources, patterns, LetterDetector, LetterExtractor, DEFAULT_FALLBACK_MIN_CHARS,
    DEFAULT_MIN_LETTER_CHARS,
};
use lettera_settings::LetteraSettings;
use lettera_store::{KeyValueStore, LiveView, PersistenceLayer, RestoreOutcome};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::context::ContextWindow;
use crate::error::EngineError;
use crate::export::{CaseMigrationPayload, DraftExport, SaveOffer};
use crate::rate_limit::{self, RateLimitTracker};

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub language: Language,
    pub daily_ceiling: u32,
    pub min_letter_chars: usize,
    pub fallback_min_chars: usize,
    /// Extracted text shorter than this is not promoted to a draft.
    pub min_draft_chars: usize,
    pub search_enabled: bool,
    pub search_timeout: Duration,
    pub search_max_results: usize,
    /// How long a declined "save to case" offer stays declined.
    pub save_offer_ttl: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            language: Language::BASE,
            daily_ceiling: 20,
            min_letter_chars: DEFAULT_MIN_LETTER_CHARS,
            fallback_min_chars: DEFAULT_FALLBACK_MIN_CHARS,
            min_draft_chars: 80,
            search_enabled: true,
            search_timeout: Duration::from_secs(8),
            search_max_results: 5,
            save_offer_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &LetteraSettings) -> Self {
        Self {
            language: settings.language,
            daily_ceiling: settings.rate_limit.daily_ceiling,
            min_letter_chars: settings.detector.min_letter_chars,
            fallback_min_chars: settings.extractor.fallback_min_chars,
            min_draft_chars: settings.extractor.min_draft_chars,
            search_enabled: settings.search.enabled,
            search_timeout: settings.search.timeout(),
            search_max_results: settings.search.max_results,
            save_offer_ttl: Duration::from_secs(settings.export.save_offer_ttl_secs),
        }
    }
}

/// External services a conversation talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub completion: Arc<dyn CompletionProvider>,
    pub ocr: Arc<dyn OcrProvider>,
    /// `None` disables legal-source lookups entirely.
    pub search: Option<Arc<dyn SourceSearch>>,
    pub entitlement: Arc<dyn EntitlementLookup>,
}

#[derive(Clone, Debug, Default)]
pub enum Phase {
    #[default]
    Idle,
    Sending {
        cancel: CancellationToken,
    },
    SearchingSources {
        cancel: CancellationToken,
    },
    AwaitingReply {
        turn: TurnId,
        cancel: CancellationToken,
    },
    Applying,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sending { .. } => "sending",
            Self::SearchingSources { .. } => "searching_sources",
            Self::AwaitingReply { .. } => "awaiting_reply",
            Self::Applying => "applying",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// A turn is in flight.
    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }

    fn cancel_token(&self) -> Option<&CancellationToken> {
        match self {
            Self::Sending { cancel }
            | Self::SearchingSources { cancel }
            | Self::AwaitingReply { cancel, .. } => Some(cancel),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Attachment {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// What the user sends: text, an optional document, or both.
#[derive(Clone, Debug, Default)]
pub struct UserInput {
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl UserInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        self.attachment = Some(Attachment {
            data,
            mime_type: mime_type.into(),
        });
        self
    }

    fn validate(&self) -> Result<AttachmentKind, ValidationError> {
        let kind = match &self.attachment {
            Some(attachment) => {
                let kind = AttachmentKind::from_mime(&attachment.mime_type).ok_or_else(|| {
                    ValidationError::DisallowedAttachment(attachment.mime_type.clone())
                })?;
                if attachment.data.is_empty() {
                    return Err(ValidationError::EmptyAttachment);
                }
                kind
            }
            None => AttachmentKind::None,
        };
        if self.text.trim().is_empty() && kind.is_none() {
            return Err(ValidationError::EmptyInput);
        }
        Ok(kind)
    }
}

#[derive(Clone, Debug)]
pub enum FailureReason {
    /// The attachment produced no text.
    UnreadableDocument,
    Gateway(GatewayError),
}

#[derive(Clone, Debug)]
pub enum TurnOutcome {
    /// A turn was already in flight.
    Ignored,
    /// Daily ceiling reached with a draft already produced.
    Limited,
    /// `limit_reached` is set on the one reply that crosses the ceiling.
    Replied { limit_reached: bool },
    DraftProduced { limit_reached: bool },
    Cancelled,
    Failed { reason: FailureReason },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    RefusedWhileDictating,
}

struct State {
    conversation: ConversationId,
    phase: Phase,
    dictating: bool,
    messages: Vec<ChatMessage>,
    draft: Draft,
    pending_input: String,
    window: ContextWindow,
    epoch: u64,
    limit_signal_shown: bool,
    last_activity: DateTime<Utc>,
    started: bool,
}

impl State {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            conversation: ConversationId::new(),
            phase: Phase::Idle,
            dictating: false,
            messages: Vec::new(),
            draft: Draft::default(),
            pending_input: String::new(),
            window: ContextWindow::new(),
            epoch: 0,
            limit_signal_shown: false,
            last_activity: now,
            started: false,
        }
    }

    fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.draft.is_empty() && self.pending_input.trim().is_empty()
    }

    fn exports_enabled(&self) -> bool {
        self.draft.generated_this_session && !self.draft.is_empty()
    }

    fn render(&mut self) {
        let _ = self.window.on_render(self.messages.len());
    }

    /// Returns true the first time the ceiling is crossed while a draft
    /// exists; re-arms once either condition goes away.
    fn take_limit_signal(&mut self, over_ceiling: bool) -> bool {
        if !over_ceiling || self.draft.is_empty() {
            self.limit_signal_shown = false;
            return false;
        }
        !std::mem::replace(&mut self.limit_signal_shown, true)
    }
}

/// Everything a turn needs after the state lock is released.
struct PendingTurn {
    epoch: u64,
    cancel: CancellationToken,
    is_first_message: bool,
    history: Vec<lettera_core::HistoryTurn>,
    exempt: bool,
}

struct Inner {
    config: OrchestratorConfig,
    collaborators: Collaborators,
    persistence: PersistenceLayer,
    rate_limit: RateLimitTracker,
    detector: LetterDetector,
    extractor: LetterExtractor,
    save_offer: SaveOffer,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl Inner {
    fn persist(&self, state: &State) {
        self.persistence.save_messages(&state.messages);
        self.persistence.save_draft(&state.draft.text);
        self.persistence.save_context_start(state.window.start());
        self.persistence
            .save_snapshot(&state.messages, &state.draft.text, &state.pending_input);
    }

    fn wipe(&self, state: &mut State) {
        if let Some(token) = state.phase.cancel_token() {
            token.cancel();
        }
        state.epoch = state.epoch.wrapping_add(1);
        state.phase = Phase::Idle;
        state.messages.clear();
        state.draft.clear();
        state.pending_input.clear();
        state.window.clear();
        state.limit_signal_shown = false;
        state.conversation = ConversationId::new();
        state.last_activity = self.clock.now_utc();
        self.persistence.clear_all();
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        collaborators: Collaborators,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now_utc();
        Self {
            inner: Arc::new(Inner {
                detector: LetterDetector::new(config.min_letter_chars),
                extractor: LetterExtractor::new(config.fallback_min_chars),
                persistence: PersistenceLayer::new(store.clone(), clock.clone()),
                rate_limit: RateLimitTracker::new(store, clock.clone()),
                save_offer: SaveOffer::new(config.save_offer_ttl, clock.clone()),
                state: Mutex::new(State::new(now)),
                config,
                collaborators,
                clock,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.lock().phase.clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.state.lock().messages.clone()
    }

    pub fn draft(&self) -> Draft {
        self.inner.state.lock().draft.clone()
    }

    pub fn pending_input(&self) -> String {
        self.inner.state.lock().pending_input.clone()
    }

    pub fn context_start(&self) -> usize {
        self.inner.state.lock().window.start()
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.inner.state.lock().conversation.clone()
    }

    pub fn is_dictating(&self) -> bool {
        self.inner.state.lock().dictating
    }

    /// Today's message count, after the reset policy.
    pub fn usage(&self) -> SessionState {
        self.inner.rate_limit.read()
    }

    /// The message counter could not be stored and is kept in memory only.
    pub fn usage_degraded(&self) -> bool {
        self.inner.rate_limit.is_degraded()
    }

    /// Export surfaces for a draft extracted in this session. A restored
    /// draft stays unexportable until a new letter is produced.
    pub fn export(&self) -> Option<DraftExport> {
        let state = self.inner.state.lock();
        DraftExport::new(&state.draft, &state.messages, self.inner.config.language)
    }

    pub fn exports_enabled(&self) -> bool {
        self.inner.state.lock().exports_enabled()
    }

    /// Offer "save to case" while a fresh draft exists and the user has not
    /// turned the offer down for this conversation.
    pub fn should_offer_save(&self) -> bool {
        let state = self.inner.state.lock();
        self.inner
            .save_offer
            .should_offer(&state.conversation, &state.draft)
    }

    pub fn decline_save(&self) {
        let conversation = self.conversation_id();
        info!(%conversation, "save to case declined");
        self.inner.save_offer.decline(&conversation);
    }

    /// Payload for moving this conversation into a case file, available
    /// only while the save offer stands.
    pub fn save_to_case(&self) -> Option<CaseMigrationPayload> {
        if !self.should_offer_save() {
            return None;
        }
        let payload = self.export()?.case_payload(self.inner.clock.now_utc());
        info!(messages = payload.messages.len(), "conversation handed to case");
        Some(payload)
    }

    /// Load persisted slots and run the one-shot crash recovery.
    #[instrument(skip(self))]
    pub fn startup(&self) -> RestoreOutcome {
        let inner = &self.inner;
        let mut guard = inner.state.lock();
        let state = &mut *guard;
        if state.started {
            return RestoreOutcome::AlreadyRan;
        }
        state.started = true;
        state.messages = inner.persistence.load_messages();
        state.draft = Draft::restored(inner.persistence.load_draft());
        state.window = ContextWindow::restored(inner.persistence.load_context_start());

        let outcome = inner.persistence.restore_from_snapshot(LiveView {
            messages: &state.messages,
            draft_text: &state.draft.text,
            pending_input: &state.pending_input,
        });
        if let RestoreOutcome::Restored(snapshot) = &outcome {
            state.messages = snapshot.messages.clone();
            state.draft = Draft::restored(snapshot.draft_text.clone());
            state.pending_input = snapshot.pending_input.clone();
        }
        state.render();
        state.last_activity = inner.clock.now_utc();
        inner.persist(state);
        info!(
            messages = state.messages.len(),
            context_start = state.window.start(),
            has_draft = !state.draft.is_empty(),
            "conversation loaded"
        );
        outcome
    }

    /// Send one user turn and wait for its outcome.
    ///
    /// Validation errors are returned before any state changes. Everything
    /// else, including service failures, is reported through the outcome.
    #[instrument(skip_all, fields(chars = input.text.chars().count(), attachment = input.attachment.is_some()))]
    pub async fn submit(&self, input: UserInput) -> Result<TurnOutcome, EngineError> {
        let kind = input.validate()?;
        if !self.is_idle() {
            debug!("turn in flight, submit ignored");
            return Ok(TurnOutcome::Ignored);
        }

        let exempt = self
            .inner
            .collaborators
            .entitlement
            .is_rate_limit_exempt()
            .await;
        let usage = self.inner.rate_limit.read();

        let turn = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if !state.phase.is_idle() {
                return Ok(TurnOutcome::Ignored);
            }
            if rate_limit::is_limited(
                &usage,
                self.inner.config.daily_ceiling,
                !state.draft.is_empty(),
                exempt,
            ) {
                info!(count = usage.message_count, "send blocked by daily limit");
                return Ok(TurnOutcome::Limited);
            }

            if std::mem::take(&mut state.dictating) {
                debug!("submit ends dictation");
            }
            let now = self.inner.clock.now_utc();
            state.window.mark_explicit();
            let turn = PendingTurn {
                epoch: state.epoch,
                cancel: CancellationToken::new(),
                is_first_message: state.window.is_first_message(&state.messages),
                history: state
                    .window
                    .build(&state.messages, &input.text, &state.draft.text),
                exempt,
            };
            state.phase = Phase::Sending {
                cancel: turn.cancel.clone(),
            };
            state
                .messages
                .push(ChatMessage::user(input.text.clone(), now).with_attachment(kind));
            state.pending_input.clear();
            state.last_activity = now;
            state.render();
            self.inner.persist(state);
            turn
        };

        Ok(self.run_turn(turn, input).await)
    }

    async fn run_turn(&self, turn: PendingTurn, input: UserInput) -> TurnOutcome {
        let inner = &self.inner;
        let language = inner.config.language;
        let cancel = turn.cancel.clone();

        let mut document_text = None;
        if let Some(attachment) = &input.attachment {
            let read = inner
                .collaborators
                .ocr
                .extract_text(&attachment.data, &attachment.mime_type, language);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = read => Some(result),
            };
            match result {
                None => return self.finish_cancelled(turn.epoch),
                Some(Ok(Some(text))) => {
                    debug!(chars = text.chars().count(), "document text extracted");
                    document_text = Some(text);
                }
                Some(Ok(None)) => {
                    return self.finish_failed(turn.epoch, FailureReason::UnreadableDocument)
                }
                Some(Err(e)) => return self.finish_failed(turn.epoch, FailureReason::Gateway(e)),
            }
        }

        let mut legal_sources = Vec::new();
        if let Some(search) = &inner.collaborators.search {
            if inner.config.search_enabled && needs_legal_sources(&input.text) {
                let phase = Phase::SearchingSources {
                    cancel: cancel.clone(),
                };
                if !self.advance(turn.epoch, phase) {
                    return self.finish_cancelled(turn.epoch);
                }
                let lookup = tokio::time::timeout(
                    inner.config.search_timeout,
                    search.search(&input.text, language, inner.config.search_max_results),
                );
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = lookup => Some(result),
                };
                match result {
                    None => return self.finish_cancelled(turn.epoch),
                    Some(Ok(Ok(sources))) => {
                        debug!(count = sources.len(), "legal sources found");
                        legal_sources = sources;
                    }
                    Some(Ok(Err(e))) => {
                        warn!(error = %e, "legal search failed, continuing without sources");
                    }
                    Some(Err(_)) => {
                        warn!(
                            timeout_ms = inner.config.search_timeout.as_millis() as u64,
                            "legal search timed out, continuing without sources"
                        );
                    }
                }
            }
        }

        let turn_id = TurnId::new();
        let phase = Phase::AwaitingReply {
            turn: turn_id.clone(),
            cancel: cancel.clone(),
        };
        if !self.advance(turn.epoch, phase) {
            return self.finish_cancelled(turn.epoch);
        }

        let request = CompletionRequest {
            message: input.text,
            language,
            is_first_message: turn.is_first_message,
            conversation_history: turn.history,
            document_text,
            legal_sources,
        };
        debug!(
            turn = %turn_id,
            history = request.conversation_history.len(),
            first = request.is_first_message,
            sources = request.legal_sources.len(),
            "awaiting reply"
        );
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = inner.collaborators.completion.complete(&request) => Some(result),
        };
        match result {
            None | Some(Err(GatewayError::Cancelled)) => self.finish_cancelled(turn.epoch),
            Some(Err(e)) => self.finish_failed(turn.epoch, FailureReason::Gateway(e)),
            Some(Ok(reply)) => self.apply(turn.epoch, turn.exempt, reply),
        }
    }

    fn apply(&self, epoch: u64, exempt: bool, reply: CompletionReply) -> TurnOutcome {
        if !self.advance(epoch, Phase::Applying) {
            debug!("reply arrived after clear, discarded");
            return TurnOutcome::Cancelled;
        }
        let draft = self.extract_draft(&reply);

        let inner = &self.inner;
        let mut guard = inner.state.lock();
        let state = &mut *guard;
        if state.epoch != epoch {
            debug!("reply arrived after clear, discarded");
            return TurnOutcome::Cancelled;
        }

        let count = inner.rate_limit.increment();
        let now = inner.clock.now_utc();
        let produced = match draft {
            Some(text) => {
                info!(chars = text.chars().count(), count, "draft extracted");
                state.draft = Draft::generated(text);
                state.messages.push(ChatMessage::assistant(
                    patterns(inner.config.language).draft_confirmation,
                    now,
                ));
                true
            }
            None => {
                debug!(count, "plain reply");
                state.messages.push(ChatMessage::assistant(reply.reply, now));
                false
            }
        };
        let limit_reached =
            state.take_limit_signal(!exempt && count >= inner.config.daily_ceiling);
        if limit_reached {
            info!(count, ceiling = inner.config.daily_ceiling, "daily limit reached");
        }

        state.phase = Phase::Idle;
        state.last_activity = now;
        state.render();
        inner.persist(state);

        if produced {
            TurnOutcome::DraftProduced { limit_reached }
        } else {
            TurnOutcome::Replied { limit_reached }
        }
    }

    /// Service-provided draft text first, then the detector on the reply.
    fn extract_draft(&self, reply: &CompletionReply) -> Option<String> {
        let inner = &self.inner;
        let from_service = reply
            .draft_text
            .as_deref()
            .and_then(|text| inner.extractor.extract(text));
        let text = match from_service {
            Some(text) => text,
            None if inner.detector.is_letter(&reply.reply) => {
                inner.extractor.extract(&reply.reply)?
            }
            None => return None,
        };
        if text.chars().count() < inner.config.min_draft_chars {
            debug!(chars = text.chars().count(), "extracted text too short for a draft");
            return None;
        }
        Some(text)
    }

    fn is_idle(&self) -> bool {
        self.inner.state.lock().phase.is_idle()
    }

    /// Move an in-flight turn to `phase` unless it was cleared or cancelled.
    fn advance(&self, epoch: u64, phase: Phase) -> bool {
        let mut state = self.inner.state.lock();
        if state.epoch != epoch
            || phase
                .cancel_token()
                .is_some_and(CancellationToken::is_cancelled)
        {
            return false;
        }
        state.phase = phase;
        true
    }

    fn finish_cancelled(&self, epoch: u64) -> TurnOutcome {
        let mut state = self.inner.state.lock();
        if state.epoch == epoch {
            state.phase = Phase::Idle;
        }
        info!("turn cancelled");
        TurnOutcome::Cancelled
    }

    fn finish_failed(&self, epoch: u64, reason: FailureReason) -> TurnOutcome {
        let inner = &self.inner;
        let mut guard = inner.state.lock();
        let state = &mut *guard;
        if state.epoch != epoch {
            return TurnOutcome::Cancelled;
        }

        let table = patterns(inner.config.language);
        let text = match &reason {
            FailureReason::UnreadableDocument => {
                warn!("attachment yielded no text");
                table.unreadable_document
            }
            FailureReason::Gateway(e) => {
                warn!(kind = e.error_kind(), error = %e, "turn failed");
                table.fallback_reply
            }
        };
        let now = inner.clock.now_utc();
        state.messages.push(ChatMessage::assistant(text, now));
        state.phase = Phase::Idle;
        state.last_activity = now;
        state.render();
        inner.persist(state);
        TurnOutcome::Failed { reason }
    }

    /// Abort the in-flight turn, if any. The turn reports `Cancelled`.
    pub fn cancel(&self) -> bool {
        let state = self.inner.state.lock();
        match state.phase.cancel_token() {
            Some(token) => {
                token.cancel();
                info!(phase = state.phase.name(), "cancel requested");
                true
            }
            None => false,
        }
    }

    /// Wipe the conversation and every persisted slot. Refused while the
    /// user is dictating.
    #[instrument(skip(self))]
    pub fn clear(&self) -> ClearOutcome {
        let mut state = self.inner.state.lock();
        if state.dictating {
            info!("clear refused while dictating");
            return ClearOutcome::RefusedWhileDictating;
        }
        self.inner.wipe(&mut state);
        info!(conversation = %state.conversation, "conversation cleared");
        ClearOutcome::Cleared
    }

    /// Returns false if dictation was already running.
    pub fn start_dictation(&self) -> bool {
        let mut state = self.inner.state.lock();
        if std::mem::replace(&mut state.dictating, true) {
            return false;
        }
        state.last_activity = self.inner.clock.now_utc();
        true
    }

    pub fn stop_dictation(&self) -> bool {
        let mut state = self.inner.state.lock();
        if !std::mem::take(&mut state.dictating) {
            return false;
        }
        state.last_activity = self.inner.clock.now_utc();
        true
    }

    pub fn set_pending_input(&self, text: impl Into<String>) {
        let mut state = self.inner.state.lock();
        state.pending_input = text.into();
        state.last_activity = self.inner.clock.now_utc();
        self.inner
            .persistence
            .save_snapshot(&state.messages, &state.draft.text, &state.pending_input);
    }

    /// Wipe the conversation if it has been untouched for `idle_timeout`.
    /// Never fires while dictating or while a turn is in flight.
    pub fn expire_if_idle(&self, idle_timeout: Duration) -> bool {
        let mut state = self.inner.state.lock();
        if state.dictating || !state.phase.is_idle() || state.is_empty() {
            return false;
        }
        let idle = (self.inner.clock.now_utc() - state.last_activity)
            .to_std()
            .unwrap_or_default();
        if idle < idle_timeout {
            return false;
        }
        info!(idle_secs = idle.as_secs(), "idle timeout, wiping conversation");
        self.inner.wipe(&mut state);
        true
    }
}
