//! Configuration for cife
//!
//! Read from `cife.toml`. Lookup order: an explicit `--config` path, then
//! `./cife.toml`, then `$CIFE_CONFIG_DIR/config.toml` or the platform config
//! directory (`~/.config/cife/config.toml`). No file means defaults.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CifeError, Result};

pub use types::{
    CifeConfig, ColumnConfig, JudgeConfig, PromptConfig, Provider, OPENAI_BASE_URL,
};

const CONFIG_DIR: &str = "cife";
const CONFIG_FILE: &str = "config.toml";
const LOCAL_CONFIG_FILE: &str = "cife.toml";
const CONFIG_DIR_ENV_VAR: &str = "CIFE_CONFIG_DIR";

impl CifeConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CifeError::io_operation("read config", path.display(), e))?;
        let config: CifeConfig = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Find and load the configuration, falling back to defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(CifeError::InputNotFound {
                    path: path.to_path_buf(),
                });
            }
            return Self::load(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load(&local);
        }

        match global_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Reject values no judge run can work with
    pub fn validate(&self) -> Result<()> {
        let judge = &self.judge;
        if judge.concurrency == 0 {
            crate::bail_invalid!("judge.concurrency", "0 (must be at least 1)");
        }
        if judge.max_tokens == 0 || judge.correctness_max_tokens == 0 {
            crate::bail_invalid!("judge.max_tokens", "0 (must be at least 1)");
        }
        for (name, value) in [
            ("judge.temperature", judge.temperature),
            ("judge.correctness_temperature", judge.correctness_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                crate::bail_invalid!(name, value);
            }
        }
        if judge.model.trim().is_empty() {
            crate::bail_invalid!("judge.model", "empty model name");
        }
        if judge.provider != Provider::Openai && judge.base_url.is_none() {
            crate::bail_invalid!(
                "judge.base_url",
                format!("required for provider {}", judge.provider)
            );
        }
        Ok(())
    }
}

fn global_config_path() -> Option<PathBuf> {
    let dir = match std::env::var(CONFIG_DIR_ENV_VAR) {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::config_dir()?.join(CONFIG_DIR),
    };
    Some(dir.join(CONFIG_FILE))
}
