//! Logging setup and the audit trail.
//!
//! Audit lines are ordinary `tracing` events emitted with
//! `target: AUDIT_TARGET`. They show up on the console like everything else
//! and, when an audit file is configured, are also appended to that file.

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Context;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::AuditConfig;
use crate::config::LoggingConfig;

/// Target used for one-line-per-action audit events.
pub const AUDIT_TARGET: &str = "homestate::audit";

/// Console filter built from the configured level and per-target overrides.
pub fn console_filter(logging: &LoggingConfig) -> Targets {
    Targets::new()
        .with_default(logging.level)
        .with_targets(
            logging
                .overrides
                .iter()
                .map(|(target, level)| (target.clone(), *level)),
        )
}

/// Install the global subscriber.
pub fn init(logging: &LoggingConfig, audit: &AuditConfig) -> anyhow::Result<()> {
    let console = fmt::layer().with_filter(console_filter(logging));

    let audit_file = match &audit.path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open audit log {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(Targets::new().with_target(AUDIT_TARGET, Level::INFO)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(audit_file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
