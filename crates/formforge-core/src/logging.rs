//! Logging integration for formforge.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-unit spans.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// In debug mode a pretty, human-readable format is used; otherwise a
/// structured JSON format is used. Installing a second subscriber is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span scoping work on one generated unit.
///
/// # Examples
///
/// ```
/// use formforge_core::logging::unit_span;
///
/// let span = unit_span("validator", "app_UserFormValidator");
/// let _guard = span.enter();
/// tracing::debug!("loading unit");
/// ```
pub fn unit_span(kind: &str, name: &str) -> tracing::Span {
    tracing::debug_span!("unit", kind = kind, name = name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = Settings {
            log_level: "not a level ((".to_string(),
            ..Settings::default()
        };
        setup_logging(&settings);
        setup_logging(&Settings::default());
    }

    #[test]
    fn test_unit_span_enter() {
        let span = unit_span("transformer", "A_Transformer");
        let _guard = span.enter();
        tracing::debug!("inside span");
    }
}
