//! Messaging gateway that records every delivery.

use async_trait::async_trait;
use buybot_alert::{AlertResult, LinkButton, MessageGateway};
use buybot_core::{GroupId, MediaSource};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat: GroupId,
    pub kind: &'static str,
    pub html: String,
    pub media: Option<MediaSource>,
    pub buttons: Vec<LinkButton>,
}

#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingGateway {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    fn record(
        &self,
        chat: GroupId,
        kind: &'static str,
        html: &str,
        media: Option<&MediaSource>,
        buttons: &[LinkButton],
    ) {
        self.sent.lock().push(SentMessage {
            chat,
            kind,
            html: html.to_string(),
            media: media.cloned(),
            buttons: buttons.to_vec(),
        });
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn send_text(&self, chat: GroupId, html: &str, buttons: &[LinkButton]) -> AlertResult<()> {
        self.record(chat, "text", html, None, buttons);
        Ok(())
    }

    async fn send_image(
        &self,
        chat: GroupId,
        media: &MediaSource,
        caption: &str,
        buttons: &[LinkButton],
    ) -> AlertResult<()> {
        self.record(chat, "image", caption, Some(media), buttons);
        Ok(())
    }

    async fn send_animation(
        &self,
        chat: GroupId,
        media: &MediaSource,
        caption: &str,
        buttons: &[LinkButton],
    ) -> AlertResult<()> {
        self.record(chat, "animation", caption, Some(media), buttons);
        Ok(())
    }
}
