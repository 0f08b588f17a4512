mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::Context;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!("config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Check values that would make the service unusable.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.index.batch_size == 0 {
            anyhow::bail!("index.batch_size must be at least 1");
        }
        if self.index.max_concurrent_batches == 0 {
            anyhow::bail!("index.max_concurrent_batches must be at least 1");
        }
        if self.index.top_k == 0 || self.index.max_top_k == 0 {
            anyhow::bail!("index.top_k and index.max_top_k must be at least 1");
        }
        if self.gateway.max_body_size == 0 {
            anyhow::bail!("gateway.max_body_size must be positive");
        }
        Ok(())
    }
}
