use crate::RemoteError;
use serde::{Deserialize, Serialize};

/// Environment variable read for the feed token when none is configured.
pub const DEFAULT_TOKEN_ENV: &str = "ICONPACK_FEED_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconServiceConfig {
    pub url: String,
    /// Upper bound on simultaneous image retrievals.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl IconServiceConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub url: String,
    pub organization: String,
    pub project: String,
    pub feed: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl FeedConfig {
    pub fn new(url: &str, organization: &str, project: &str, feed: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            organization: organization.to_owned(),
            project: project.to_owned(),
            feed: feed.to_owned(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Read the bearer token from the configured environment variable.
    pub fn resolve_token(&self) -> Result<String, RemoteError> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_owned()),
            _ => Err(RemoteError::Config(format!(
                "feed token not set: export {} with a token that may publish to feed '{}'",
                self.token_env, self.feed
            ))),
        }
    }
}

fn default_concurrency() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_owned()
}
