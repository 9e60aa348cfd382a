//! Logging setup for ioc-context
//!
//! Every event this crate emits uses the `ioc_context` target: registration
//! and construction at DEBUG, cache hits at TRACE, failed constructions at
//! WARN. This module installs a `tracing-subscriber` to print them.
//!
//! # Features
//!
//! - `logging` - Emit tracing events (default)
//! - `logging-json` - JSON structured output
//! - `logging-pretty` - Human-readable multi-line output
//!
//! Without either subscriber feature the `init*` functions are no-ops, so
//! applications that install their own subscriber can still call them.
//!
//! # Example
//!
//! ```rust,ignore
//! use ioc_context::logging;
//!
//! // JSON if logging-json is enabled, pretty otherwise
//! logging::init();
//!
//! // Or tune it
//! logging::builder()
//!     .with_level(tracing::Level::TRACE)
//!     .context_only()
//!     .pretty()
//!     .init();
//! ```

use tracing::Level;

/// Log target used by every event in this crate
pub const TARGET: &str = "ioc_context";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line, colored
    Pretty,
    /// Single line per event
    Compact,
}

/// Builder for the logging subscriber
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_thread_names: bool,
    with_source_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            with_thread_names: false,
            with_source_location: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Only show events from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show events emitted by this crate
    pub fn context_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Include thread names, useful when several threads race for one bean
    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    /// Include file and line of each event
    pub fn with_source_location(mut self) -> Self {
        self.with_source_location = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// The filter directive this builder installs
    pub fn directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    /// Install the subscriber globally.
    ///
    /// Does nothing if a global subscriber is already set.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = EnvFilter::new(self.directive());
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_names(self.with_thread_names)
            .with_file(self.with_source_location)
            .with_line_number(self.with_source_location);

        let registry = tracing_subscriber::registry().with(filter);
        let _ = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => registry.with(layer.json()).try_init(),
            // Without the json feature fall back to the default formatter
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => registry.with(layer).try_init(),
            LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
            LogFormat::Compact => registry.with(layer.compact()).try_init(),
        };
    }

    /// No-op without a subscriber feature
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install the default subscriber: JSON with `logging-json`, pretty otherwise.
pub fn init() {
    if cfg!(feature = "logging-json") {
        init_json();
    } else {
        init_pretty();
    }
}

/// Install a JSON subscriber at DEBUG.
///
/// # Example output
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Constructing bean","bean":"userService","kind":"class","depth":1},"target":"ioc_context"}
/// ```
pub fn init_json() {
    builder().json().init();
}

/// Install a pretty subscriber at DEBUG.
pub fn init_pretty() {
    builder().pretty().init();
}

/// Install a subscriber that only shows this crate's events
pub fn init_context_only() {
    builder().context_only().pretty().init();
}
