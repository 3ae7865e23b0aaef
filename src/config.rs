//! Configuration file parser for the relay's `config.ini`.
//!
//! The file has three required sections:
//!
//! ```ini
//! [telegram]
//! bot_token = 123456:ABC...
//! chat_id = @my_channel
//! media_caption = <b>via feeds</b>
//!
//! [storage]
//! rss_feeds_file = rss_feeds.txt
//! published_images_file = data/published_images.txt
//!
//! [script]
//! delay_between_posts = 5
//! log_file = logs/relay.log
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.
//! Values are taken literally: no quote stripping and no escape sequences, so
//! Windows paths and HTML captions survive unchanged.
use ini::{Ini, ParseOption, Properties};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid INI in config file: {0}")]
    Parse(#[from] ini::ParseError),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Missing [{section}] section in config {}", .path.display())]
    MissingSection { section: &'static str, path: PathBuf },

    #[error("Missing `{key}` in config {}", .path.display())]
    MissingKey { key: &'static str, path: PathBuf },

    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Both `bot_token` and `chat_id` must be configured.")]
    MissingCredentials,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Where photos are posted: a numeric chat id or a public `@channel` username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
}

impl ChatTarget {
    fn parse(raw: &str) -> Result<Option<Self>, ConfigError> {
        if raw.is_empty() {
            return Ok(None);
        }
        if raw.starts_with('@') {
            return Ok(Some(ChatTarget::Username(raw.to_string())));
        }
        raw.parse::<i64>()
            .map(|id| Some(ChatTarget::Id(id)))
            .map_err(|_| ConfigError::InvalidValue {
                key: "chat_id",
                reason: format!("expected an integer id or @username, got {raw:?}"),
            })
    }
}

impl std::fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatTarget::Id(id) => write!(f, "{id}"),
            ChatTarget::Username(name) => f.write_str(name),
        }
    }
}

/// Markup used to render the caption attached to each photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptionFormat {
    #[default]
    Html,
    Markdown,
    MarkdownV2,
    Plain,
}

impl CaptionFormat {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_lowercase().as_str() {
            "" | "html" => Ok(CaptionFormat::Html),
            "markdown" => Ok(CaptionFormat::Markdown),
            "markdownv2" => Ok(CaptionFormat::MarkdownV2),
            "none" | "plain" => Ok(CaptionFormat::Plain),
            other => Err(ConfigError::InvalidValue {
                key: "parse_mode",
                reason: format!("unknown parse mode {other:?}"),
            }),
        }
    }
}

/// Bot credentials and destination, from the `[telegram]` section.
///
/// The bot token is held as a [`SecretString`] and masked in `Debug` output.
#[derive(Clone)]
pub struct TelegramSettings {
    pub bot_token: SecretString,
    /// `None` when the key is absent or blank; rejected by [`Settings::validate`].
    pub chat: Option<ChatTarget>,
    pub media_caption: String,
    pub parse_mode: CaptionFormat,
    /// Base URL of a self-hosted Bot API server. Defaults to the public API.
    pub api_url: Option<Url>,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = if self.bot_token.expose_secret().is_empty() {
            None
        } else {
            Some("[REDACTED]")
        };
        f.debug_struct("TelegramSettings")
            .field("bot_token", &token)
            .field("chat", &self.chat)
            .field("media_caption", &self.media_caption)
            .field("parse_mode", &self.parse_mode)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Complete run configuration. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub delay_between_posts: Duration,
    pub rss_feeds_file: PathBuf,
    pub published_images_file: PathBuf,
    pub log_file: PathBuf,
}

impl Settings {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    pub const DEFAULT_DELAY_SECS: u64 = 5;

    /// Load settings from an ini file.
    ///
    /// - Missing file → `Err(ConfigError::NotFound)`
    /// - Missing `[telegram]`, `[storage]` or `[script]` → `Err(ConfigError::MissingSection)`
    /// - Missing path keys → `Err(ConfigError::MissingKey)`
    /// - Empty `bot_token`/`chat_id` are accepted here and rejected by [`Settings::validate`]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_ini_str(&content, path, base_dir)
    }

    /// Parse settings from ini text. `path` is used in error messages only;
    /// relative paths are joined onto `base_dir`.
    pub fn from_ini_str(content: &str, path: &Path, base_dir: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str_opt(
            content,
            ParseOption {
                enabled_quote: false,
                enabled_escape: false,
                ..ParseOption::default()
            },
        )?;

        let section = |name: &'static str| {
            ini.section(Some(name))
                .ok_or_else(|| ConfigError::MissingSection {
                    section: name,
                    path: path.to_path_buf(),
                })
        };
        let telegram = section("telegram")?;
        let storage = section("storage")?;
        let script = section("script")?;

        let resolve = |props: &Properties, key: &'static str| -> Result<PathBuf, ConfigError> {
            let raw = value(props, key);
            if raw.is_empty() {
                return Err(ConfigError::MissingKey {
                    key,
                    path: path.to_path_buf(),
                });
            }
            let candidate = PathBuf::from(raw);
            Ok(if candidate.is_absolute() {
                candidate
            } else {
                base_dir.join(candidate)
            })
        };

        let delay_secs = match value(script, "delay_between_posts") {
            "" => Self::DEFAULT_DELAY_SECS,
            raw => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: "delay_between_posts",
                reason: e.to_string(),
            })?,
        };

        let api_url = match value(telegram, "api_url") {
            "" => None,
            raw => Some(Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                key: "api_url",
                reason: e.to_string(),
            })?),
        };

        let settings = Settings {
            telegram: TelegramSettings {
                bot_token: SecretString::from(value(telegram, "bot_token").to_string()),
                chat: ChatTarget::parse(value(telegram, "chat_id"))?,
                media_caption: value(telegram, "media_caption").to_string(),
                parse_mode: CaptionFormat::parse(value(telegram, "parse_mode"))?,
                api_url,
            },
            delay_between_posts: Duration::from_secs(delay_secs),
            rss_feeds_file: resolve(storage, "rss_feeds_file")?,
            published_images_file: resolve(storage, "published_images_file")?,
            log_file: resolve(script, "log_file")?,
        };
        Ok(settings)
    }

    /// Reject settings that cannot possibly reach Telegram.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.expose_secret().is_empty() || self.telegram.chat.is_none() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(())
    }
}

fn value<'a>(props: &'a Properties, key: &str) -> &'a str {
    props.get(key).map(str::trim).unwrap_or("")
}

// ============================================================================
// Tests
// ============================================================================
