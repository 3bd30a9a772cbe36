//! # Structured Logging Module
//!
//! Structured logging setup and uniform operation records for broker lifecycle
//! operations and fleet rollouts.

use crate::config::{LogFormat, LoggingConfig};
use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured level. Safe to call more than once: if a
/// global subscriber already exists, the existing one is kept.
pub fn init_structured_logging(config: &LoggingConfig) {
    let filter = resolve_filter(config);

    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(false)
            .json()
            .boxed(),
    };

    if tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        return;
    }

    tracing::info!(
        pid = std::process::id(),
        level = %config.level,
        format = ?config.format,
        "🔧 STRUCTURED LOGGING: Initialized"
    );
}

fn resolve_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log structured data for a broker lifecycle operation
pub fn log_broker_operation(
    operation: &str,
    instance_id: &str,
    task_id: Option<u64>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        instance_id = %instance_id,
        task_id = task_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 BROKER_OPERATION"
    );
}

/// Log structured data for one instance of a fleet rollout
pub fn log_fleet_progress(
    offering_id: &str,
    operation: &str,
    instance_id: &str,
    status: &str,
    attempt: u32,
    details: Option<&str>,
) {
    tracing::info!(
        offering_id = %offering_id,
        operation = %operation,
        instance_id = %instance_id,
        status = %status,
        attempt = attempt,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🚢 FLEET_PROGRESS"
    );
}
