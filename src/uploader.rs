use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::albums::MediaSink;
use crate::disk::{DiskClient, DiskError};
use crate::platform::{MediaKind, MediaMessage, Messenger};

/// A storable attachment: the platform file handle to fetch, plus the
/// extension the stored copy will carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_id: String,
    pub ext: String,
}

/// Errors surfaced by a single message's upload run.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not download the attachment: {0:#}")]
    Download(anyhow::Error),
    #[error(transparent)]
    Disk(#[from] DiskError),
}

/// Pick the storable attachment out of a raw media payload, if any.
///
/// Photos store their largest variant as jpg and videos as mp4. Documents
/// are stored only when they declare an image/* or video/* media type,
/// keeping the declared subtype as the extension. Everything else is
/// skipped.
pub fn resolve_attachment(media: &MediaKind) -> Option<Attachment> {
    match media {
        MediaKind::Photo { sizes } => sizes
            .iter()
            .max_by_key(|v| u64::from(v.width) * u64::from(v.height))
            .map(|v| Attachment {
                file_id: v.file_id.clone(),
                ext: "jpg".to_string(),
            }),
        MediaKind::Video { file_id } => Some(Attachment {
            file_id: file_id.clone(),
            ext: "mp4".to_string(),
        }),
        MediaKind::Document { file_id, mime_type } => {
            let mime = mime_type.as_deref()?;
            let (kind, subtype) = mime.split_once('/')?;
            if (kind == "image" || kind == "video") && !subtype.is_empty() {
                Some(Attachment {
                    file_id: file_id.clone(),
                    ext: subtype.to_string(),
                })
            } else {
                None
            }
        }
    }
}

/// Deterministic remote location for a message's attachment:
/// `{root}/{chat}/{topic}/{sender}_{message}_{timestamp}.{ext}`, where
/// chats without topics use the fixed "no_topic" segment.
pub fn remote_path(root: &str, msg: &MediaMessage, ext: &str) -> String {
    let topic = msg
        .thread_id
        .map(|t| t.to_string())
        .unwrap_or_else(|| "no_topic".to_string());
    format!(
        "{}/{}/{}/{}_{}_{}.{}",
        root, msg.chat_id, topic, msg.sender_id, msg.message_id, msg.sent_at, ext
    )
}

/// Uploads one message's attachment: resolve it, fetch the bytes from the
/// platform, derive the remote path, store.
pub struct MediaUploader<M> {
    messenger: M,
    disk: DiskClient,
    root_folder: String,
}

impl<M: Messenger> MediaUploader<M> {
    pub fn new(messenger: M, disk: DiskClient, root_folder: String) -> Self {
        Self {
            messenger,
            disk,
            root_folder,
        }
    }

    /// Run the pipeline for one message. `Ok(None)` means the message had
    /// nothing storable; `Ok(Some(path))` is where the bytes landed.
    pub async fn process(&self, msg: &MediaMessage) -> Result<Option<String>, UploadError> {
        let Some(media) = &msg.media else {
            return Ok(None);
        };
        let Some(attachment) = resolve_attachment(media) else {
            return Ok(None);
        };

        let data = self
            .messenger
            .fetch_file(&attachment.file_id)
            .await
            .map_err(UploadError::Download)?;

        let path = remote_path(&self.root_folder, msg, &attachment.ext);
        info!("Uploading {} byte(s) to {}", data.len(), path);
        self.disk.upload_bytes(&path, data).await?;
        info!("Stored {}", path);
        Ok(Some(path))
    }
}

#[async_trait]
impl<M: Messenger> MediaSink for MediaUploader<M> {
    async fn handle(&self, msg: MediaMessage) {
        if let Err(e) = self.process(&msg).await {
            error!("Failed to store media from chat {}: {}", msg.chat_id, e);
            let notice = format!("Failed to save your file: {}", e);
            if let Err(send_err) = self.messenger.notify(&msg, &notice).await {
                warn!("Could not notify chat {}: {:#}", msg.chat_id, send_err);
            }
        }
    }
}
