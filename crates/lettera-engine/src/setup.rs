//! Wiring from settings to a running orchestrator.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lettera_core::provider::{SourceSearch, StaticEntitlement};
use lettera_core::Clock;
use lettera_llm::{HttpCompletionClient, HttpOcrClient, HttpSourceSearch, ServiceClient};
use lettera_settings::{LetteraSettings, StorageSettings};
use lettera_store::{Database, KeyValueStore, MemoryKvStore, SqliteKvStore};
use tracing::info;

use crate::error::EngineError;
use crate::orchestrator::{Collaborators, Orchestrator, OrchestratorConfig};

/// SQLite-backed slots, or in-memory ones when no path is configured.
pub fn open_store(storage: &StorageSettings) -> Result<Arc<dyn KeyValueStore>, EngineError> {
    let path = storage.db_path.trim();
    if path.is_empty() {
        info!("no database path configured, conversation will not survive restarts");
        return Ok(Arc::new(MemoryKvStore::new()));
    }
    let db = Database::open(Path::new(path))?;
    Ok(Arc::new(SqliteKvStore::new(db)))
}

/// HTTP collaborators for the configured backend.
pub fn http_collaborators(
    settings: &LetteraSettings,
    clock: Arc<dyn Clock>,
    exempt: bool,
) -> Result<Collaborators, EngineError> {
    let service = ServiceClient::new(
        settings.service.base_url.as_str(),
        Duration::from_millis(settings.service.request_timeout_ms),
    )?;
    let search = settings
        .search
        .enabled
        .then(|| Arc::new(HttpSourceSearch::new(service.clone())) as Arc<dyn SourceSearch>);
    Ok(Collaborators {
        completion: Arc::new(HttpCompletionClient::new(service.clone())),
        ocr: Arc::new(HttpOcrClient::new(
            service,
            Duration::from_secs(settings.service.ocr_cache_ttl_secs),
            clock,
        )),
        search,
        entitlement: Arc::new(StaticEntitlement { exempt }),
    })
}

pub fn orchestrator_from_settings(
    settings: &LetteraSettings,
    clock: Arc<dyn Clock>,
    exempt: bool,
) -> Result<Orchestrator, EngineError> {
    let store = open_store(&settings.storage)?;
    let collaborators = http_collaborators(settings, clock.clone(), exempt)?;
    Ok(Orchestrator::new(
        OrchestratorConfig::from_settings(settings),
        collaborators,
        store,
        clock,
    ))
}
