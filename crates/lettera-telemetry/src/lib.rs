use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default level directive. Overridden by the RUST_LOG env var.
    pub level: String,
    /// Per-module level overrides (e.g. "lettera_llm" => "debug").
    pub module_levels: Vec<(String, String)>,
    /// One JSON object per line instead of compact human output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            module_levels: Vec::new(),
            json: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid filter directive: {0}")]
    InvalidDirective(String),
    #[error("subscriber is gone: {0}")]
    Reload(String),
}

/// Keeps the reload handle for the installed filter.
pub struct TelemetryGuard {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
}

impl TelemetryGuard {
    /// Whether this guard owns the global subscriber.
    pub fn is_installed(&self) -> bool {
        self.handle.is_some()
    }

    /// Replace the active filter, e.g. `"debug"` or `"info,lettera_engine=trace"`.
    pub fn set_level(&self, directives: &str) -> Result<(), TelemetryError> {
        let filter = EnvFilter::try_new(directives)
            .map_err(|e| TelemetryError::InvalidDirective(format!("{directives}: {e}")))?;
        match &self.handle {
            Some(handle) => handle
                .reload(filter)
                .map_err(|e| TelemetryError::Reload(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Build the filter string from config, e.g. `"info,lettera_llm=debug"`.
pub fn filter_directives(config: &TelemetryConfig) -> String {
    let mut filter = config.level.trim().to_lowercase();
    if filter.is_empty() {
        filter.push_str("info");
    }
    for (module, level) in &config.module_levels {
        filter.push_str(&format!(",{}={}", module, level.to_lowercase()));
    }
    filter
}

/// Initialize the telemetry subsystem. Call once at startup.
///
/// If a global subscriber is already installed the returned guard is inert.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryGuard {
    let directives = filter_directives(config);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&directives).unwrap_or_else(|e| {
            eprintln!("lettera-telemetry: bad level {directives:?} ({e}), using info");
            EnvFilter::new("info")
        })
    });
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
    });
    let compact_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
    });

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(json_layer)
        .with(compact_layer)
        .try_init();

    match installed {
        Ok(()) => TelemetryGuard {
            handle: Some(handle),
        },
        Err(e) => {
            eprintln!("lettera-telemetry: subscriber already set: {e}");
            TelemetryGuard { handle: None }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_include_module_levels() {
        let config = TelemetryConfig {
            level: "WARN".into(),
            module_levels: vec![("lettera_llm".into(), "DEBUG".into())],
            json: false,
        };
        assert_eq!(filter_directives(&config), "warn,lettera_llm=debug");
    }

    #[test]
    fn empty_level_defaults_to_info() {
        let config = TelemetryConfig {
            level: "  ".into(),
            ..Default::default()
        };
        assert_eq!(filter_directives(&config), "info");
    }

    #[test]
    fn inert_guard_still_validates_directives() {
        let guard = TelemetryGuard { handle: None };
        assert!(guard.set_level("debug").is_ok());
        assert!(matches!(
            guard.set_level("lettera=notalevel"),
            Err(TelemetryError::InvalidDirective(_))
        ));
    }
}
