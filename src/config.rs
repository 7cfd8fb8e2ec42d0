use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Env var that overrides `[account] access_token` from the config file.
pub const OAUTH_TOKEN_ENV: &str = "FREELANCER_OAUTH_TOKEN";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub bid: BidConfig,
}

/// Marketplace credentials and identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// OAuth access token. May be left empty when the token comes from the
    /// environment instead.
    #[serde(default)]
    pub access_token: String,
    /// Numeric user id of the bidder account.
    #[serde(default)]
    pub user_id: u64,
}

/// Project search filters sent with every poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Project types to include (e.g. "fixed", "hourly"). Empty = all.
    #[serde(default)]
    pub project_types: Vec<String>,
    /// Skill names, resolved to job ids each cycle. Empty = no skill filter.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Optional free-text query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Maximum number of projects per cycle.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Polling interval in seconds between project refreshes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

/// Bid submission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidConfig {
    /// Proposal text sent with every bid.
    #[serde(default = "default_proposal")]
    pub proposal: String,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_limit() -> u32 {
    30
}

fn default_proposal() -> String {
    "Hi, I'd be glad to help with this project. Happy to discuss details.".to_string()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            project_types: Vec::new(),
            skills: Vec::new(),
            query: None,
            limit: default_limit(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for BidConfig {
    fn default() -> Self {
        Self {
            proposal: default_proposal(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Write config to the given TOML file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Resolve the access token, env var taking precedence over the file.
    pub fn access_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(OAUTH_TOKEN_ENV) {
            if !token.is_empty() {
                return Ok(token);
            }
        }
        if self.account.access_token.is_empty() {
            anyhow::bail!(
                "no access token: set {OAUTH_TOKEN_ENV} or [account] access_token in the config file"
            );
        }
        Ok(self.account.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_file() {
        let config: AppConfig = toml::from_str("").expect("empty config parses");
        assert_eq!(config.settings.poll_interval_secs, 60);
        assert_eq!(config.filters.limit, 30);
        // A written-out default config round-trips to the same values.
        assert_eq!(AppConfig::default().filters.limit, 30);
        assert!(config.filters.skills.is_empty());
        assert!(config.filters.query.is_none());
        assert_eq!(config.account.user_id, 0);
        assert!(!config.bid.proposal.is_empty());
    }

    #[test]
    fn parses_full_file() {
        let config: AppConfig = toml::from_str(
            r#"
            [account]
            access_token = "tok"
            user_id = 42

            [filters]
            project_types = ["fixed"]
            skills = ["Rust", "Python"]
            query = "scraper"
            limit = 10

            [settings]
            poll_interval_secs = 15

            [bid]
            proposal = "hello"
            "#,
        )
        .expect("full config parses");
        assert_eq!(config.account.user_id, 42);
        assert_eq!(config.filters.skills, vec!["Rust", "Python"]);
        assert_eq!(config.filters.query.as_deref(), Some("scraper"));
        assert_eq!(config.filters.limit, 10);
        assert_eq!(config.settings.poll_interval_secs, 15);
        assert_eq!(config.bid.proposal, "hello");
    }

    #[test]
    fn token_from_file_when_env_unset() {
        let mut config = AppConfig::default();
        config.account.access_token = "file-token".to_string();
        // OAUTH_TOKEN_ENV is not set in the test environment
        if std::env::var(OAUTH_TOKEN_ENV).is_err() {
            assert_eq!(config.access_token().unwrap(), "file-token");
        }
    }

    #[test]
    fn missing_token_is_an_error() {
        let config = AppConfig::default();
        if std::env::var(OAUTH_TOKEN_ENV).is_err() {
            assert!(config.access_token().is_err());
        }
    }
}
