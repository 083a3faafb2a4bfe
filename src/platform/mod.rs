pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// A media-bearing message received from the messaging platform.
///
/// Built once at the platform boundary; the rest of the crate only reads
/// these fields and never touches platform SDK types.
#[derive(Debug, Clone)]
pub struct MediaMessage {
    /// Chat the message was posted in
    pub chat_id: i64,
    /// Forum topic / thread, when the chat uses topics
    pub thread_id: Option<i32>,
    /// User who sent the message
    pub sender_id: u64,
    /// Platform message id, unique within the chat
    pub message_id: i32,
    /// Send time as unix seconds
    pub sent_at: i64,
    /// Album (media group) identifier shared by messages sent together
    pub group_id: Option<String>,
    /// Raw media payload, if the message carries one
    pub media: Option<MediaKind>,
}

/// Raw media payload as the platform reported it, before any policy
/// (variant selection, mime filtering) is applied.
#[derive(Debug, Clone)]
pub enum MediaKind {
    /// A photo with one entry per resolution variant
    Photo { sizes: Vec<PhotoVariant> },
    Video {
        file_id: String,
    },
    Document {
        file_id: String,
        /// Declared media type, e.g. "image/png"
        mime_type: Option<String>,
    },
}

/// One resolution variant of a photo.
#[derive(Debug, Clone)]
pub struct PhotoVariant {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// The messaging platform as the upload pipeline sees it: a way to pull
/// attachment bytes and a way to report failures back to the chat.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Download the raw bytes behind a platform file handle.
    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Send a plain-text notice back to the chat (and topic) a message
    /// came from.
    async fn notify(&self, msg: &MediaMessage, text: &str) -> Result<()>;
}
