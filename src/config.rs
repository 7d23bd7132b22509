use serde::{Deserialize, Serialize};

/// Base configuration for the journal encryption client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalsConfig {
    /// Backend origin, without a trailing slash.
    pub base_url: String,
    /// Platform identifier reported during key creation.
    pub platform: String,
    /// Identifier sent in the client user agent string.
    pub user_agent: String,
}

impl Default for JournalsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.journal.test".into(),
            platform: "desktop".into(),
            user_agent: "journal-keys/0.1".into(),
        }
    }
}

impl JournalsConfig {
    /// Override the backend origin.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the reported platform identifier.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Override the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
