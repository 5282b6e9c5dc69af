use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::orchestrator::Orchestrator;

/// Periodically wipe a conversation that has sat untouched for
/// `idle_timeout`. Runs until `shutdown` is cancelled.
pub fn spawn_idle_watchdog(
    orchestrator: Orchestrator,
    interval: Duration,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick is immediate

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if orchestrator.expire_if_idle(idle_timeout) {
                        info!(
                            idle_timeout_secs = idle_timeout.as_secs(),
                            "idle conversation expired"
                        );
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{FixedOffset, TimeZone};
    use lettera_core::provider::StaticEntitlement;
    use lettera_core::ManualClock;
    use lettera_llm::{MockCompletion, MockOcr};
    use lettera_store::MemoryKvStore;

    use crate::orchestrator::{Collaborators, OrchestratorConfig};

    fn orchestrator(clock: Arc<ManualClock>) -> Orchestrator {
        let collaborators = Collaborators {
            completion: Arc::new(MockCompletion::default()),
            ocr: Arc::new(MockOcr::unreadable()),
            search: None,
            entitlement: Arc::new(StaticEntitlement::default()),
        };
        Orchestrator::new(
            OrchestratorConfig::default(),
            collaborators,
            Arc::new(MemoryKvStore::new()),
            clock,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn wipes_after_inactivity_then_stops() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let clock = Arc::new(ManualClock::new(tz.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap()));
        let orch = orchestrator(clock.clone());
        orch.set_pending_input("Egregio avvocato");

        let shutdown = CancellationToken::new();
        let handle = spawn_idle_watchdog(
            orch.clone(),
            Duration::from_secs(30),
            Duration::from_secs(1800),
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(orch.pending_input(), "Egregio avvocato");

        clock.advance(chrono::Duration::minutes(31));
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(orch.pending_input(), "");

        shutdown.cancel();
        handle.await.unwrap();
    }
}
