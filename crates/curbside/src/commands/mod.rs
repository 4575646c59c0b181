//! CLI command handlers.

use std::path::{Path, PathBuf};

use anyhow::Result;
use curbside_config::LoadedConfig;

pub mod cache_check;
pub mod config;
pub mod watch;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// User config directory, if one could be determined.
    pub config_dir: Option<PathBuf>,
}

impl Context {
    /// Load the layered configuration (user dir + `./curbside.toml`).
    pub fn load_config(&self) -> Result<LoadedConfig> {
        Ok(curbside_config::load_config_with_options(
            None,
            self.config_dir.as_deref(),
        )?)
    }

    /// User config directory, or an error when none can be determined.
    pub fn require_config_dir(&self) -> Result<&Path> {
        self.config_dir
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }
}
