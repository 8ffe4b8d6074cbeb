use crate::error::{ConfigError, CoreError};
use crate::types::Rule;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_CLIENT_ID: &str = "FLAIRBOT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "FLAIRBOT_CLIENT_SECRET";
pub const ENV_USERNAME: &str = "FLAIRBOT_USERNAME";
pub const ENV_PASSWORD: &str = "FLAIRBOT_PASSWORD";

/// Largest page Reddit will serve for a listing.
const MAX_PAGE_SIZE: u32 = 100;

/// Longest accepted activity lookback: 100 years of 365 days, in seconds.
pub const MAX_RULES_RATE_SECS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Clone, Deserialize)]
pub struct BotConfig {
    pub subreddit: String,
    pub user_agent: String,

    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub ignored_users: Vec<String>,

    /// Seconds between poll cycles.
    pub check_rate: u64,
    /// Seconds of history that count towards a user's flair.
    pub rules_rate: u64,
    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_concurrent_authors")]
    pub max_concurrent_authors: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: i64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

fn default_page_size() -> u32 {
    25
}

fn default_max_concurrent_authors() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_token_refresh_margin_secs() -> i64 {
    60
}

fn default_api_base() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_token_url() -> String {
    "https://www.reddit.com/api/v1/access_token".to_string()
}

impl BotConfig {
    /// Reads a TOML file, or JSON when the extension is `.json`, then applies
    /// credential overrides from the environment and validates the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::Config(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }),
            _ => CoreError::Io(e),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let mut config = if is_json {
            Self::from_json_str(&raw)?
        } else {
            Self::from_toml_str(&raw)?
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        info!(
            "Loaded configuration for r/{} with {} rules from {}",
            config.subreddit,
            config.rules.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidFormat {
            details: e.to_string(),
        })
    }

    /// Replaces credentials with values from `lookup` when it has them.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields = [
            (ENV_CLIENT_ID, &mut self.client_id),
            (ENV_CLIENT_SECRET, &mut self.client_secret),
            (ENV_USERNAME, &mut self.username),
            (ENV_PASSWORD, &mut self.password),
        ];

        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                debug!("Using {} from environment", key);
                *field = value;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("subreddit", &self.subreddit),
            ("user_agent", &self.user_agent),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("username", &self.username),
            ("password", &self.password),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        if self.check_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "check_rate".to_string(),
                value: self.check_rate.to_string(),
            });
        }
        if self.rules_rate == 0 || self.rules_rate > MAX_RULES_RATE_SECS {
            return Err(ConfigError::InvalidValue {
                field: "rules_rate".to_string(),
                value: self.rules_rate.to_string(),
            });
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "page_size".to_string(),
                value: self.page_size.to_string(),
            });
        }
        if self.max_concurrent_authors == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_authors".to_string(),
                value: self.max_concurrent_authors.to_string(),
            });
        }

        for (position, rule) in self.rules.iter().enumerate() {
            if rule.min > rule.max {
                return Err(ConfigError::ValidationFailed {
                    reason: format!(
                        "rule {} ('{}') has min {} greater than max {}",
                        position, rule.text, rule.min, rule.max
                    ),
                });
            }
            if !rule.weight.is_finite() {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("rule {} ('{}') has a non-finite weight", position, rule.text),
                });
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.check_rate)
    }

    pub fn activity_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.rules_rate.min(MAX_RULES_RATE_SECS) as i64)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_refresh_margin(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_refresh_margin_secs)
    }

    pub fn ignored_set(&self) -> HashSet<String> {
        self.ignored_users.iter().cloned().collect()
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("subreddit", &self.subreddit)
            .field("user_agent", &self.user_agent)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ignored_users", &self.ignored_users)
            .field("check_rate", &self.check_rate)
            .field("rules_rate", &self.rules_rate)
            .field("rules", &self.rules)
            .field("page_size", &self.page_size)
            .field("max_concurrent_authors", &self.max_concurrent_authors)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token_refresh_margin_secs", &self.token_refresh_margin_secs)
            .field("api_base", &self.api_base)
            .field("token_url", &self.token_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityType;
    use std::io::Write;

    const SAMPLE: &str = r#"
subreddit = "IndianFood"
user_agent = "flairbot/0.1 by test_user"
client_id = "id"
client_secret = "secret"
username = "bot"
password = "hunter2"
ignored_users = ["AutoModerator"]
check_rate = 300
rules_rate = 2592000

[[rules]]
type = "comment"
min = 0
max = 10
weight = 1
text = "New"
class = "new"

[[rules]]
type = "post"
min = 5
max = 1000
weight = 2.5
text = "Chef"
class = "chef"
"#;

    #[test]
    fn test_parse_toml_with_defaults() {
        let config = BotConfig::from_toml_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.subreddit, "IndianFood");
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[1].activity_type, ActivityType::Post);
        assert_eq!(config.rules[1].weight, 2.5);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_concurrent_authors, 4);
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.activity_window(), chrono::Duration::days(30));
        assert!(config.ignored_set().contains("AutoModerator"));
    }

    #[test]
    fn test_parse_json_reference_layout() {
        let raw = r#"{
            "subreddit": "IndianFood",
            "user_agent": "flairbot",
            "client_id": "id",
            "client_secret": "secret",
            "username": "bot",
            "password": "pw",
            "ignored_users": [],
            "check_rate": 60,
            "rules_rate": 86400,
            "rules": [{"type": "post", "min": 0, "max": 3, "weight": 1, "text": "Cook", "class": "cook"}]
        }"#;

        let config = BotConfig::from_json_str(raw).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.rules[0].css_class, "cook");
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut config = BotConfig::from_toml_str(SAMPLE).unwrap();
        config.apply_env_overrides(|key| match key {
            ENV_PASSWORD => Some("from-env".to_string()),
            ENV_USERNAME => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.password, "from-env");
        assert_eq!(config.username, "bot");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut config = BotConfig::from_toml_str(SAMPLE).unwrap();
        config.client_secret.clear();

        match config.validate() {
            Err(ConfigError::MissingField { field }) => assert_eq!(field, "client_secret"),
            other => panic!("Expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_rule_rejected() {
        let mut config = BotConfig::from_toml_str(SAMPLE).unwrap();
        config.rules[0].min = 20;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = BotConfig::from_toml_str(SAMPLE).unwrap();
        config.check_rate = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = BotConfig::from_toml_str(SAMPLE).unwrap();
        config.page_size = 500;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_oversized_lookback_rejected() {
        let mut config = BotConfig::from_toml_str(SAMPLE).unwrap();
        config.rules_rate = 10_000_000_000_000;
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "rules_rate"),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
        assert_eq!(
            config.activity_window(),
            chrono::Duration::seconds(MAX_RULES_RATE_SECS as i64)
        );

        config.rules_rate = MAX_RULES_RATE_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = BotConfig::from_toml_str(SAMPLE).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = BotConfig::load(file.path()).unwrap();
        assert_eq!(config.check_rate, 300);
    }

    #[test]
    fn test_load_missing_file() {
        let result = BotConfig::load("/definitely/not/here.toml");
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
