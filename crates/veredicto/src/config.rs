//! Project configuration file support for veredicto.
//!
//! Loads configuration from `veredicto.toml` in the working directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Project-level configuration loaded from `veredicto.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Global default provider (applies to both drafter and critic)
    pub provider: Option<String>,
    /// Global default model (applies to both drafter and critic)
    pub model: Option<String>,
    /// Drafter-specific configuration
    #[serde(default)]
    pub drafter: RoleConfig,
    /// Critic-specific configuration
    #[serde(default)]
    pub critic: RoleConfig,
}

/// Configuration for a specific role (drafter or critic)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    /// Provider to use for this role
    pub provider: Option<String>,
    /// Model to use for this role
    pub model: Option<String>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "veredicto.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Get the effective provider for the drafter role.
    /// Priority: [drafter].provider > global provider > None
    pub fn drafter_provider(&self) -> Option<&str> {
        self.drafter.provider.as_deref().or(self.provider.as_deref())
    }

    /// Get the effective model for the drafter role.
    /// Priority: [drafter].model > global model > None
    pub fn drafter_model(&self) -> Option<&str> {
        self.drafter.model.as_deref().or(self.model.as_deref())
    }

    /// Get the effective provider for the critic role.
    /// Priority: [critic].provider > global provider > None
    pub fn critic_provider(&self) -> Option<&str> {
        self.critic.provider.as_deref().or(self.provider.as_deref())
    }

    /// Get the effective model for the critic role.
    /// Priority: [critic].model > global model > None
    pub fn critic_model(&self) -> Option<&str> {
        self.critic.model.as_deref().or(self.model.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_config_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
provider = "anthropic"
model = "claude-sonnet-4-20250514"

[critic]
provider = "openai"
model = "gpt-4o"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.drafter_provider(), Some("anthropic"));
        assert_eq!(config.drafter_model(), Some("claude-sonnet-4-20250514"));
        assert_eq!(config.critic_provider(), Some("openai"));
        assert_eq!(config.critic_model(), Some("gpt-4o"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn malformed_file_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "nonsense = ").unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "agent = \"claude\"").unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }
}
