use crate::logging::console::ConsoleOutput;
use crate::Result;
use anyhow::{anyhow, Context};
use dirs_next::home_dir;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

const DEFAULT_DIAGNOSTICS_LEVEL: &str = "warn";
const CONFIG_DIR: &str = ".seshat";
const CONFIG_FILE: &str = "config.toml";

/// Resolved tracer configuration after reading config files and env overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct TracerConfig {
    /// Console stream receiving trace lines.
    pub console_output: ConsoleOutput,
    /// File attached as secondary sink at startup.
    pub log_file: Option<PathBuf>,
    /// Mirror every trace line into `tracing` events.
    pub forward_to_tracing: bool,
    /// Console stream receiving the crate's own diagnostics.
    pub diagnostics_output: ConsoleOutput,
    /// Default `tracing` directive for diagnostics.
    pub diagnostics_level: String,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            console_output: ConsoleOutput::Stdout,
            log_file: None,
            forward_to_tracing: false,
            diagnostics_output: ConsoleOutput::Stderr,
            diagnostics_level: DEFAULT_DIAGNOSTICS_LEVEL.to_string(),
        }
    }
}

impl TracerConfig {
    /// Load configuration with deterministic precedence: defaults, config file, env overrides.
    ///
    /// The config file is `<workspace>/.seshat/config.toml`, or
    /// `~/.seshat/config.toml` when no workspace is given.
    pub fn load(workspace_root: Option<&Path>) -> Result<Self> {
        let path = match workspace_root {
            Some(workspace) => Some(config_path(workspace)),
            None => home_dir().map(|home| config_path(&home)),
        };
        let mut config = TracerConfig::default();
        if let Some(path) = path {
            if let Some(file_config) = Self::read_file(&path)? {
                config.apply(file_config, workspace_root)?;
            }
        }
        config.apply_env_overrides(workspace_root)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file, then apply env overrides.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = Self::read_file(path)?
            .ok_or_else(|| anyhow!("config file {} does not exist", path.display()))?;
        let base = path.parent().and_then(Path::parent);
        let mut config = TracerConfig::default();
        config.apply(raw, base)?;
        config.apply_env_overrides(base)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Option<TomlConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read tracer config {}", path.display()))?;
        let parsed: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse tracer config {}", path.display()))?;
        Ok(Some(parsed))
    }

    fn apply(&mut self, toml: TomlConfig, base: Option<&Path>) -> Result<()> {
        if let Some(tracer) = toml.tracer {
            if let Some(console_output) = tracer.console_output {
                self.console_output = console_output;
            }
            if let Some(log_file) = tracer.log_file {
                self.log_file = Some(resolve_path(&log_file, base)?);
            }
            if let Some(forward) = tracer.forward_to_tracing {
                self.forward_to_tracing = forward;
            }
            if let Some(diagnostics_output) = tracer.diagnostics_output {
                self.diagnostics_output = diagnostics_output;
            }
            if let Some(level) = tracer.diagnostics_level {
                self.diagnostics_level = level;
            }
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self, base: Option<&Path>) -> Result<()> {
        if let Ok(log_file) = env::var("SESHAT_LOG_FILE") {
            if !log_file.trim().is_empty() {
                self.log_file = Some(resolve_path(log_file.trim(), base)?);
            }
        }
        if let Ok(console) = env::var("SESHAT_CONSOLE") {
            self.console_output = ConsoleOutput::from_str(&console).map_err(|err| anyhow!(err))?;
        }
        if let Ok(forward) = env::var("SESHAT_FORWARD_TRACING") {
            self.forward_to_tracing = matches!(forward.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Directive::from_str(&self.diagnostics_level)
            .map_err(|_| anyhow!("tracer.diagnostics_level must be a valid tracing directive"))?;

        if let Some(log_file) = &self.log_file {
            if log_file.file_name().is_none() {
                return Err(anyhow!(
                    "tracer.log_file must name a file, got {}",
                    log_file.display()
                ));
            }
        }
        Ok(())
    }
}

fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(CONFIG_FILE)
}

fn resolve_path(raw: &str, base: Option<&Path>) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(anyhow!("tracer.log_file must not be empty"));
    }
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Ok(path);
    }
    match base {
        Some(base) => Ok(base.join(path)),
        None => Ok(env::current_dir()
            .context("failed to resolve relative log file against current directory")?
            .join(path)),
    }
}

#[derive(Debug, Deserialize)]
struct TomlConfig {
    tracer: Option<TomlTracerSection>,
}

#[derive(Debug, Deserialize)]
struct TomlTracerSection {
    console_output: Option<ConsoleOutput>,
    log_file: Option<String>,
    forward_to_tracing: Option<bool>,
    diagnostics_output: Option<ConsoleOutput>,
    diagnostics_level: Option<String>,
}
