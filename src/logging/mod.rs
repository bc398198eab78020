//! Diagnostics for the crate itself and process-level setup of a tracer.
//!
//! Trace lines produced by [`Tracer`] never go through `tracing`; they have
//! their own stable line format. `tracing` carries what the crate has to say
//! about its own operation (sink failures, shape caching, registry activity)
//! and, when `forward_to_tracing` is enabled, mirrors of the trace lines.

pub mod config;
pub mod console;

pub use config::TracerConfig;
pub use console::ConsoleOutput;

use crate::core::logger::Tracer;
use crate::Result;
use anyhow::{anyhow, Context};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

/// Environment variable overriding the diagnostics filter.
pub const DIAGNOSTICS_ENV: &str = "SESHAT_DIAGNOSTICS";

static DIAGNOSTICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Handle returned once diagnostics are installed.
#[derive(Debug)]
pub struct DiagnosticsGuard {
    console_output: ConsoleOutput,
}

impl DiagnosticsGuard {
    /// Returns the console stream diagnostics are written to.
    pub fn console_output(&self) -> ConsoleOutput {
        self.console_output
    }
}

/// Install the global `tracing` subscriber used for crate diagnostics.
///
/// Filters come from `SESHAT_DIAGNOSTICS` when set, otherwise from
/// `diagnostics_level`. Errors when invoked more than once per process unless
/// tests reset the guard.
pub fn init(config: &TracerConfig) -> Result<DiagnosticsGuard> {
    if DIAGNOSTICS_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(anyhow!("diagnostics already initialized"));
    }

    let env_filter = EnvFilter::try_from_env(DIAGNOSTICS_ENV)
        .or_else(|_| EnvFilter::try_new(&config.diagnostics_level))
        .context("failed to configure diagnostics level")?;

    let console_layer = console::console_layer::<Registry>(config.diagnostics_output);
    tracing_subscriber::registry()
        .with(console_layer)
        .with(env_filter)
        .try_init()
        .context("failed to install diagnostics subscriber")?;

    Ok(DiagnosticsGuard {
        console_output: config.diagnostics_output,
    })
}

/// A configured tracer plus the diagnostics installed alongside it.
pub struct Session {
    tracer: Arc<Tracer>,
    config: TracerConfig,
    _diagnostics: Option<DiagnosticsGuard>,
}

impl Session {
    pub fn tracer(&self) -> &Arc<Tracer> {
        &self.tracer
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }
}

/// Load configuration for `workspace_root`, install diagnostics and build
/// the process tracer.
///
/// Diagnostics installation failing (for example because the host program
/// already set a global subscriber) is reported and otherwise ignored.
pub fn start(workspace_root: Option<&Path>) -> Result<Session> {
    let config = TracerConfig::load(workspace_root)?;
    let diagnostics = match init(&config) {
        Ok(guard) => Some(guard),
        Err(err) => {
            tracing::warn!("diagnostics not installed: {:#}", err);
            None
        }
    };
    let tracer = Tracer::from_config(&config)?;
    Ok(Session {
        tracer,
        config,
        _diagnostics: diagnostics,
    })
}

#[cfg(test)]
/// Reset the initialization guard so tests can reconfigure diagnostics.
pub fn reset_for_tests() {
    DIAGNOSTICS_INITIALIZED.store(false, Ordering::SeqCst);
}
