use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use teloxide::net::Download;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{FileId, MessageId, ThreadId};
use tracing::{info, warn};

use crate::albums::{AlbumBuffer, MediaSink};
use crate::platform::{MediaKind, MediaMessage, Messenger, PhotoVariant};

/// Run the Telegram side: receive updates, convert them, and feed the
/// album buffer until the process is interrupted.
pub async fn run<S>(bot: Bot, albums: AlbumBuffer<S>) -> Result<()>
where
    S: MediaSink + 'static,
{
    info!("Starting Telegram listener...");

    let handler = Update::filter_message().endpoint(handle_message::<S>);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![albums])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message<S>(bot: Bot, msg: Message, albums: AlbumBuffer<S>) -> ResponseResult<()>
where
    S: MediaSink + 'static,
{
    if let Some(text) = msg.text() {
        if text == "/start" || text == "/help" {
            bot.send_message(
                msg.chat.id,
                "Hi! Send me a photo, a video, or a document with an image or \
                 video inside, and I'll save it to Yandex Disk organized by \
                 chat and topic. Albums are uploaded once they finish arriving.",
            )
            .await?;
            return Ok(());
        }
    }

    let Some(media_msg) = media_message(&msg) else {
        return Ok(());
    };
    albums.dispatch(media_msg).await;
    Ok(())
}

/// Flatten a Telegram update into the platform-agnostic message model.
/// Messages without a sender (channel posts, service messages) or without
/// a media payload are skipped.
fn media_message(msg: &Message) -> Option<MediaMessage> {
    let from = msg.from.as_ref()?;
    let media = raw_media(msg)?;
    Some(MediaMessage {
        chat_id: msg.chat.id.0,
        thread_id: msg.thread_id.map(|t| t.0 .0),
        sender_id: from.id.0,
        message_id: msg.id.0,
        sent_at: msg.date.timestamp(),
        group_id: msg.media_group_id().map(|g| g.to_string()),
        media: Some(media),
    })
}

fn raw_media(msg: &Message) -> Option<MediaKind> {
    if let Some(sizes) = msg.photo() {
        let sizes = sizes
            .iter()
            .map(|p| PhotoVariant {
                file_id: p.file.id.0.clone(),
                width: p.width,
                height: p.height,
            })
            .collect();
        return Some(MediaKind::Photo { sizes });
    }
    if let Some(video) = msg.video() {
        return Some(MediaKind::Video {
            file_id: video.file.id.0.clone(),
        });
    }
    if let Some(doc) = msg.document() {
        return Some(MediaKind::Document {
            file_id: doc.file.id.0.clone(),
            mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
        });
    }
    None
}

/// Telegram as the upload pipeline's collaborator: resolves file handles
/// to bytes and delivers failure notices back to the chat.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_owned()))
            .await
            .context("Failed to resolve the file path")?;

        let mut stream = Box::pin(self.bot.download_file_stream(&file.path));
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read file bytes")?;
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }

    async fn notify(&self, msg: &MediaMessage, text: &str) -> Result<()> {
        let mut request = self.bot.send_message(ChatId(msg.chat_id), text);
        if let Some(thread_id) = msg.thread_id {
            request = request.message_thread_id(ThreadId(MessageId(thread_id)));
        }
        request
            .await
            .with_context(|| format!("Failed to notify chat {}", msg.chat_id))?;
        Ok(())
    }
}
