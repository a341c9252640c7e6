use crate::error::{Error, Result};
use crate::models::MilestoneState;
use std::env;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub api_url: String,
    pub assignee_check_concurrency: usize,
    pub max_requests_per_minute: u32,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load(true)
    }

    /// Same as `from_env`, but a missing token is allowed. Dry runs make no
    /// remote calls, so they only need the remaining settings.
    pub fn from_env_without_token() -> Result<Self> {
        Self::load(false)
    }

    fn load(require_token: bool) -> Result<Self> {
        let github_token = env::var("GITHUB_TOKEN")
            .or_else(|_| env::var("GITHUB_PAT"))
            .unwrap_or_default();

        if require_token {
            if env::var_os("GITHUB_TOKEN").is_none() && env::var_os("GITHUB_PAT").is_none() {
                return Err(Error::Config(
                    "GITHUB_TOKEN (or GITHUB_PAT) environment variable not set".to_string(),
                ));
            }
            if github_token.trim().is_empty() {
                return Err(Error::Config("GitHub token is empty".to_string()));
            }
        }

        let api_url = env::var("GITHUB_API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let assignee_check_concurrency = env::var("ASSIGNEE_CHECK_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(4);

        let max_requests_per_minute = env::var("MAX_REQUESTS_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let log_level = env::var("LOG_LEVEL")
            .map(|v| v.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            github_token,
            api_url,
            assignee_check_concurrency,
            max_requests_per_minute,
            log_level,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub assignee_check_concurrency: usize,
    pub show_progress: bool,
    pub private_repository: bool,
    pub milestone_state: MilestoneState,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            assignee_check_concurrency: 4,
            show_progress: false,
            private_repository: true,
            milestone_state: MilestoneState::Open,
        }
    }
}

impl From<&Config> for ProvisionConfig {
    fn from(config: &Config) -> Self {
        Self {
            assignee_check_concurrency: config.assignee_check_concurrency,
            ..Default::default()
        }
    }
}
