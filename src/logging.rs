//! Logging setup.
//!
//! The bridge emits `tracing` events everywhere and never installs a
//! subscriber on its own. Hosts that want the events on stderr call
//! [`init`] once at startup.
//!
//! - `FFI_BRIDGE_LOG_LEVEL`: trace, debug, info, warn (default), error
//! - `FFI_BRIDGE_LOG_SPANS`: when set, print span enter/close events
//!
//! `RUST_LOG` takes precedence over `FFI_BRIDGE_LOG_LEVEL` when present.

use once_cell::sync::OnceCell;
use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            show_spans: false,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = std::env::var("FFI_BRIDGE_LOG_LEVEL") {
            config.level = parse_level(&level).unwrap_or(Level::WARN);
        }
        config.show_spans = std::env::var("FFI_BRIDGE_LOG_SPANS").is_ok();
        config
    }
}

fn parse_level(word: &str) -> Option<Level> {
    match word.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging from the environment.
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with an explicit configuration. Only the first call
/// has any effect.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "ffi_bridge={}",
                config.level.as_str().to_lowercase()
            ))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        // Another subscriber may already be installed by the host.
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_span_events(span_events)
                    .with_target(true)
                    .with_thread_ids(cfg!(debug_assertions)),
            )
            .try_init();
    });
}

pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}
