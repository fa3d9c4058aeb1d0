//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tracing subscriber setup for the trainer binaries."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "DEADSHIP_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static GUARDS: OnceCell<Vec<WorkerGuard>> = OnceCell::new();

/// Console rendering for the trainer's log output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber.
///
/// `DEADSHIP_LOG` takes precedence over `RUST_LOG`; both fall back to `info`.
/// Console output goes to stderr so scenario reports on stdout stay clean. With
/// [`LoggingConfig::session_file`] set, a daily JSON file is also written under
/// [`LoggingConfig::directory`] for session debriefs.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let mut guards = Vec::with_capacity(2);

    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(console_guard);
    let console_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(console_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .without_time()
            .with_writer(console_writer)
            .boxed(),
    };

    let file_layer = if config.session_file {
        std::fs::create_dir_all(&config.directory).with_context(|| {
            format!("unable to create log directory {}", config.directory.display())
        })?;
        let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
        let appender = daily(&config.directory, format!("{prefix}.log"));
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
        guards.push(file_guard);
        Some(
            fmt::layer()
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .with_writer(file_writer)
                .boxed(),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(filter_from_env())
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if installed {
        let _ = GUARDS.set(guards);
        info!(
            service = %service_name,
            format = ?config.format,
            session_file = config.session_file,
            "tracing initialised"
        );
    }
    Ok(())
}

fn filter_from_env() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => filter_or_default(&directive),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

fn filter_or_default(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|err| {
        eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to {DEFAULT_DIRECTIVE}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_names_are_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn bad_directive_falls_back_to_info() {
        assert_eq!(filter_or_default("deadship_sim=loud").to_string(), DEFAULT_DIRECTIVE);
        assert_eq!(filter_or_default("deadship_sim=debug").to_string(), "deadship_sim=debug");
    }

    #[test]
    fn session_file_controls_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let without = LoggingConfig {
            directory: dir.path().join("none"),
            session_file: false,
            ..LoggingConfig::default()
        };
        init_tracing("deadship-test", &without).unwrap();
        assert!(!without.directory.exists());

        let with = LoggingConfig {
            directory: dir.path().join("logs"),
            file_prefix: Some("unit".to_owned()),
            ..LoggingConfig::default()
        };
        init_tracing("deadship-test", &with).unwrap();
        assert!(with.directory.is_dir());
    }
}
