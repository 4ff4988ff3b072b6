//! Messaging gateway.

use crate::error::{AlertError, AlertResult};
use async_trait::async_trait;
use buybot_core::{GroupId, MediaSource};
use teloxide::payloads::{SendAnimationSetters, SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::Requester;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use teloxide::Bot;
use tracing::debug;

/// Inline URL button under an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub text: String,
    pub url: String,
}

/// Delivery of HTML alerts to destination groups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send_text(&self, chat: GroupId, html: &str, buttons: &[LinkButton]) -> AlertResult<()>;

    async fn send_image(
        &self,
        chat: GroupId,
        media: &MediaSource,
        caption: &str,
        buttons: &[LinkButton],
    ) -> AlertResult<()>;

    async fn send_animation(
        &self,
        chat: GroupId,
        media: &MediaSource,
        caption: &str,
        buttons: &[LinkButton],
    ) -> AlertResult<()>;
}

/// Telegram Bot API gateway.
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot_token: &str) -> AlertResult<Self> {
        if bot_token.trim().is_empty() {
            return Err(AlertError::Delivery("Bot token is empty".to_string()));
        }
        Ok(Self {
            bot: Bot::new(bot_token.trim()),
        })
    }

    fn input_file(media: &MediaSource) -> AlertResult<InputFile> {
        match media {
            MediaSource::FileId(id) => Ok(InputFile::file_id(id.clone())),
            MediaSource::Url(url) => reqwest::Url::parse(url)
                .map(InputFile::url)
                .map_err(|_| AlertError::InvalidUrl(url.clone())),
        }
    }
}

/// One button per row. Buttons with unparsable URLs are dropped.
pub fn keyboard(buttons: &[LinkButton]) -> Option<InlineKeyboardMarkup> {
    let rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .iter()
        .filter_map(|b| {
            let url = reqwest::Url::parse(&b.url).ok()?;
            Some(vec![InlineKeyboardButton::url(b.text.clone(), url)])
        })
        .collect();
    (!rows.is_empty()).then(|| InlineKeyboardMarkup::new(rows))
}

fn delivery_error(e: teloxide::RequestError) -> AlertError {
    AlertError::Delivery(e.to_string())
}

#[async_trait]
impl MessageGateway for TelegramGateway {
    async fn send_text(&self, chat: GroupId, html: &str, buttons: &[LinkButton]) -> AlertResult<()> {
        let mut request = self
            .bot
            .send_message(ChatId(chat), html)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = keyboard(buttons) {
            request = request.reply_markup(markup);
        }
        request.await.map_err(delivery_error)?;
        debug!(chat, "Sent text alert");
        Ok(())
    }

    async fn send_image(
        &self,
        chat: GroupId,
        media: &MediaSource,
        caption: &str,
        buttons: &[LinkButton],
    ) -> AlertResult<()> {
        let mut request = self
            .bot
            .send_photo(ChatId(chat), Self::input_file(media)?)
            .caption(caption)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = keyboard(buttons) {
            request = request.reply_markup(markup);
        }
        request.await.map_err(delivery_error)?;
        debug!(chat, "Sent image alert");
        Ok(())
    }

    async fn send_animation(
        &self,
        chat: GroupId,
        media: &MediaSource,
        caption: &str,
        buttons: &[LinkButton],
    ) -> AlertResult<()> {
        let mut request = self
            .bot
            .send_animation(ChatId(chat), Self::input_file(media)?)
            .caption(caption)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = keyboard(buttons) {
            request = request.reply_markup(markup);
        }
        request.await.map_err(delivery_error)?;
        debug!(chat, "Sent animation alert");
        Ok(())
    }
}
