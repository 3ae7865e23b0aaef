use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, Recipient};
use teloxide::RequestError;
use thiserror::Error;
use url::Url;

use crate::config::{CaptionFormat, ChatTarget, ConfigError, TelegramSettings};

/// Outcome of a failed send, split by what the delivery loop should do next.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The server asked us to wait before sending again. Retry the same image.
    #[error("Flood control exceeded, retry after {}s", .0.as_secs())]
    RateLimited(Duration),
    /// The image URL is not an absolute URL Telegram could fetch.
    #[error("Invalid image URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Any other Bot API or transport failure. The image is abandoned for this run.
    #[error("Telegram send failed: {0}")]
    Telegram(String),
}

/// Sends one photo, by URL, to a preconfigured destination.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn send_photo(&self, image_url: &str, caption: &str) -> Result<(), PublishError>;
}

/// [`Publisher`] backed by the Telegram Bot API `sendPhoto` method.
pub struct TelegramPublisher {
    bot: Bot,
    chat: Recipient,
    parse_mode: Option<ParseMode>,
}

impl TelegramPublisher {
    pub fn new(settings: &TelegramSettings) -> Result<Self, ConfigError> {
        let chat = match settings.chat.clone() {
            Some(ChatTarget::Id(id)) => Recipient::Id(ChatId(id)),
            Some(ChatTarget::Username(name)) => Recipient::ChannelUsername(name),
            None => return Err(ConfigError::MissingCredentials),
        };

        let mut bot = Bot::new(settings.bot_token.expose_secret());
        if let Some(api_url) = &settings.api_url {
            tracing::info!(api_url = %api_url, "Using custom Bot API server");
            bot = bot.set_api_url(api_url.clone());
        }

        let parse_mode = match settings.parse_mode {
            CaptionFormat::Html => Some(ParseMode::Html),
            #[allow(deprecated)]
            CaptionFormat::Markdown => Some(ParseMode::Markdown),
            CaptionFormat::MarkdownV2 => Some(ParseMode::MarkdownV2),
            CaptionFormat::Plain => None,
        };

        Ok(Self {
            bot,
            chat,
            parse_mode,
        })
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn send_photo(&self, image_url: &str, caption: &str) -> Result<(), PublishError> {
        let photo = InputFile::url(Url::parse(image_url)?);

        let mut request = self.bot.send_photo(self.chat.clone(), photo);
        if !caption.is_empty() {
            request = request.caption(caption);
        }
        if let Some(mode) = self.parse_mode {
            request = request.parse_mode(mode);
        }

        request.await.map(|_| ()).map_err(|e| match e {
            RequestError::RetryAfter(wait) => PublishError::RateLimited(wait.duration()),
            other => PublishError::Telegram(other.to_string()),
        })
    }
}
