use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use url::Url;

pub const CONFIG_PATH_ENV: &str = "WEB_APP_BOT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/bot.toml";
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const WEB_APP_URL_ENV: &str = "TELEGRAM_BOT_WEB_APP_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram_bot: TelegramBotConfig,
}

impl AppConfig {
    /// Loads `config/bot.toml` (or the file named by `WEB_APP_BOT_CONFIG`) and
    /// applies environment overrides.
    ///
    /// A missing file is only tolerated at the default path, so the bot can be
    /// configured from the environment alone.
    pub fn load_default() -> Result<Self> {
        let cfg = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::read_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::read_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => Self::default(),
        };

        let cfg = cfg.with_env_overrides(|key| env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let cfg = Self::read_file(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overrides file values with whatever `lookup` returns for
    /// `TELEGRAM_BOT_TOKEN` and `TELEGRAM_BOT_WEB_APP_URL`.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(TOKEN_ENV) {
            self.telegram_bot.token = token;
        }
        if let Some(url) = lookup(WEB_APP_URL_ENV) {
            self.telegram_bot.web_app_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram_bot.token.trim().is_empty() {
            return Err(anyhow!(
                "telegram_bot.token must be set (or provide {TOKEN_ENV})"
            ));
        }

        let url = self.telegram_bot.web_app_url.trim();
        if !url.is_empty() {
            Url::parse(url)
                .with_context(|| format!("telegram_bot.web_app_url is not a valid URL: {url}"))?;
        }

        Ok(())
    }

    fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let raw = fs::read_to_string(path_ref)
            .with_context(|| format!("failed to read config file {}", path_ref.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path_ref.display()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramBotConfig {
    #[serde(default)]
    pub token: String,
    /// Left empty, the bot still answers `/start`; Telegram then rejects the
    /// button and the failure is logged.
    #[serde(default)]
    pub web_app_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn write_temp_config(raw: &str) -> PathBuf {
        let mut path = env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after unix epoch")
            .as_nanos();
        path.push(format!(
            "web-app-bot-config-test-{}-{}.toml",
            std::process::id(),
            unique
        ));
        fs::write(&path, raw).expect("temp config should be writable");
        path
    }

    fn load_from_temp(raw: &str) -> Result<AppConfig> {
        let path = write_temp_config(raw);
        let result = AppConfig::load_from_path(&path);
        let _ = fs::remove_file(path);
        result
    }

    #[test]
    fn parse_minimal_config() {
        let raw = r#"
[telegram_bot]
token = "test-token"
"#;

        let cfg: AppConfig = toml::from_str(raw).expect("config should parse");
        assert_eq!(cfg.telegram_bot.token, "test-token");
        assert!(cfg.telegram_bot.web_app_url.is_empty());
    }

    #[test]
    fn load_from_path_reads_token_and_url() {
        let raw = r#"
[telegram_bot]
token = "test-token"
web_app_url = "https://example.com/app"
"#;

        let cfg = load_from_temp(raw).expect("config should load");
        assert_eq!(cfg.telegram_bot.token, "test-token");
        assert_eq!(cfg.telegram_bot.web_app_url, "https://example.com/app");
    }

    #[test]
    fn load_from_path_accepts_missing_web_app_url() {
        let raw = r#"
[telegram_bot]
token = "test-token"
"#;

        let cfg = load_from_temp(raw).expect("empty url is allowed");
        assert_eq!(cfg.telegram_bot.web_app_url, "");
    }

    #[test]
    fn load_from_path_rejects_blank_token() {
        let raw = r#"
[telegram_bot]
token = "   "
web_app_url = "https://example.com/app"
"#;
        let err = load_from_temp(raw).expect_err("config must fail");
        assert!(err.to_string().contains("telegram_bot.token must be set"));
    }

    #[test]
    fn load_from_path_rejects_malformed_url() {
        let raw = r#"
[telegram_bot]
token = "test-token"
web_app_url = "not a url"
"#;
        let err = load_from_temp(raw).expect_err("config must fail");
        assert!(
            err.to_string()
                .contains("telegram_bot.web_app_url is not a valid URL")
        );
    }

    #[test]
    fn load_from_path_reports_missing_file() {
        let err = AppConfig::load_from_path("/nonexistent/web-app-bot.toml")
            .expect_err("missing file must fail");
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let raw = r#"
[telegram_bot]
token = "file-token"
web_app_url = "https://file.example.com"
"#;
        let cfg: AppConfig = toml::from_str(raw).expect("config should parse");

        let cfg = cfg.with_env_overrides(|key| match key {
            TOKEN_ENV => Some("env-token".to_string()),
            WEB_APP_URL_ENV => Some("https://env.example.com/app".to_string()),
            _ => None,
        });

        assert_eq!(cfg.telegram_bot.token, "env-token");
        assert_eq!(cfg.telegram_bot.web_app_url, "https://env.example.com/app");
        cfg.validate().expect("overridden config should be valid");
    }

    #[test]
    fn env_overrides_keep_file_values_when_unset() {
        let cfg = AppConfig {
            telegram_bot: TelegramBotConfig {
                token: "file-token".to_string(),
                web_app_url: String::new(),
            },
        }
        .with_env_overrides(|_| None);

        assert_eq!(cfg.telegram_bot.token, "file-token");
        assert!(cfg.telegram_bot.web_app_url.is_empty());
    }

    #[test]
    fn default_config_fails_validation() {
        let err = AppConfig::default()
            .validate()
            .expect_err("default config has no token");
        assert!(err.to_string().contains(TOKEN_ENV));
    }
}
