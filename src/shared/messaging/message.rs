//! Chat Message Data Structure
//!
//! Represents a message in a conversation. Every message carries exactly one
//! typed payload; the payload decides the message type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::reply::{ReplySnapshot, ReplyTo};
use super::user::ParticipantSnapshot;
use super::{ConversationId, MessageId, StorageId, UserId};

/// Text written over a message when its sender (or an admin) deletes it
pub const DELETED_MESSAGE_TEXT: &str = "This message was deleted";

/// Type of message content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Video,
    Audio,
    Document,
}

impl MessageType {
    /// Column value used by the `messages` table
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Video => "video",
            MessageType::Audio => "audio",
            MessageType::Document => "document",
        }
    }

    /// Whether messages of this type reference a stored blob
    pub fn is_media(&self) -> bool {
        !matches!(self, MessageType::Text)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific message content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    /// Plain text message
    Text { content: String },
    /// Image with optional caption
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    /// Video; `gif_playback` loops it without sound
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default)]
        gif_playback: bool,
    },
    /// Voice note or audio file
    Audio { url: String },
    /// Document attachment (PDF, spreadsheet, ...)
    Document {
        url: String,
        mimetype: String,
        length: u64,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page_count: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        jpeg_thumbnail: Option<String>,
    },
}

impl MessagePayload {
    /// Create a text payload
    pub fn text(content: impl Into<String>) -> Self {
        MessagePayload::Text {
            content: content.into(),
        }
    }

    /// The message type this payload belongs to
    pub fn message_type(&self) -> MessageType {
        match self {
            MessagePayload::Text { .. } => MessageType::Text,
            MessagePayload::Image { .. } => MessageType::Image,
            MessagePayload::Video { .. } => MessageType::Video,
            MessagePayload::Audio { .. } => MessageType::Audio,
            MessagePayload::Document { .. } => MessageType::Document,
        }
    }

    /// Caption attached to media, if any
    pub fn caption(&self) -> Option<&str> {
        match self {
            MessagePayload::Image { caption, .. }
            | MessagePayload::Video { caption, .. }
            | MessagePayload::Document { caption, .. } => caption.as_deref(),
            MessagePayload::Text { .. } | MessagePayload::Audio { .. } => None,
        }
    }

    /// Short human-readable preview, used for conversation lists and push bodies
    ///
    /// Text is cut to `max_len` characters (with a trailing ellipsis); media
    /// gets a label followed by its caption.
    pub fn preview(&self, max_len: usize) -> String {
        let full = match self {
            MessagePayload::Text { content } => content.clone(),
            MessagePayload::Image { .. } => with_caption("📷 Photo", self.caption()),
            MessagePayload::Video { gif_playback, .. } => {
                let label = if *gif_playback { "🎞️ GIF" } else { "🎥 Video" };
                with_caption(label, self.caption())
            }
            MessagePayload::Audio { .. } => "🎤 Audio".to_string(),
            MessagePayload::Document { title, .. } => {
                with_caption(&format!("📄 {}", title), self.caption())
            }
        };
        truncate_chars(&full, max_len)
    }
}

fn with_caption(label: &str, caption: Option<&str>) -> String {
    match caption.map(str::trim).filter(|c| !c.is_empty()) {
        Some(caption) => format!("{} {}", label, caption),
        None => label.to_string(),
    }
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut preview: String = text.chars().take(keep).collect();
    preview.push_str("...");
    preview
}

/// Represents a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Conversation this message belongs to
    pub conversation_id: ConversationId,
    /// User who sent the message
    pub sender: UserId,
    /// Typed content
    pub payload: MessagePayload,
    /// Blob backing a media payload, removed together with the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<StorageId>,
    /// All participants except the sender, captured at send time
    pub receivers: Vec<UserId>,
    /// Users who have read the message (the sender reads it on send)
    pub readers: Vec<UserId>,
    /// Quoted message snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplySnapshot>,
    /// When the message was sent
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Type of the payload
    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    /// Turn the message into a "deleted" placeholder
    ///
    /// Returns the storage id that was attached, so the caller can drop the blob.
    pub fn tombstone(&mut self) -> Option<StorageId> {
        self.payload = MessagePayload::text(DELETED_MESSAGE_TEXT);
        self.reply = None;
        self.storage_id.take()
    }

    pub fn is_read_by(&self, user_id: UserId) -> bool {
        self.readers.contains(&user_id)
    }
}

/// A message as returned to clients, with the sender resolved to a snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageView {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub message_type: MessageType,
    pub sender: ParticipantSnapshot,
    pub payload: MessagePayload,
    pub receivers: Vec<UserId>,
    pub readers: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplySnapshot>,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: Message, sender: ParticipantSnapshot) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            message_type: message.payload.message_type(),
            sender,
            payload: message.payload,
            receivers: message.receivers,
            readers: message.readers,
            reply: message.reply,
            created_at: message.created_at,
        }
    }
}

/// Request to send a message
///
/// The `kind` tag selects the payload; media variants reference a blob
/// uploaded beforehand through the storage endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SendMessageRequest {
    Text {
        sender: UserId,
        content: String,
        #[serde(default)]
        reply_to: Option<ReplyTo>,
    },
    Image {
        sender: UserId,
        storage_id: StorageId,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        reply_to: Option<ReplyTo>,
    },
    Video {
        sender: UserId,
        storage_id: StorageId,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        gif_playback: Option<bool>,
        #[serde(default)]
        reply_to: Option<ReplyTo>,
    },
    Audio {
        sender: UserId,
        storage_id: StorageId,
        #[serde(default)]
        reply_to: Option<ReplyTo>,
    },
    Document {
        sender: UserId,
        storage_id: StorageId,
        mimetype: String,
        title: String,
        length: u64,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        file_name: Option<String>,
        #[serde(default)]
        page_count: Option<u32>,
        #[serde(default)]
        reply_to: Option<ReplyTo>,
    },
}

impl SendMessageRequest {
    /// Claimed sender of the message
    pub fn sender(&self) -> UserId {
        match self {
            SendMessageRequest::Text { sender, .. }
            | SendMessageRequest::Image { sender, .. }
            | SendMessageRequest::Video { sender, .. }
            | SendMessageRequest::Audio { sender, .. }
            | SendMessageRequest::Document { sender, .. } => *sender,
        }
    }

    /// Quoted message, if this is a reply
    pub fn reply_to(&self) -> Option<&ReplyTo> {
        match self {
            SendMessageRequest::Text { reply_to, .. }
            | SendMessageRequest::Image { reply_to, .. }
            | SendMessageRequest::Video { reply_to, .. }
            | SendMessageRequest::Audio { reply_to, .. }
            | SendMessageRequest::Document { reply_to, .. } => reply_to.as_ref(),
        }
    }
}

/// Response after sending a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message_id: MessageId,
}

/// Response for listing messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<MessageView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_message(payload: MessagePayload) -> Message {
        let sender = Uuid::new_v4();
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender,
            payload,
            storage_id: Some(Uuid::new_v4()),
            receivers: vec![Uuid::new_v4()],
            readers: vec![sender],
            reply: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_payload_type_tag() {
        let payload = MessagePayload::Video {
            url: "https://cdn/v.mp4".to_string(),
            caption: None,
            gif_playback: true,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["gif_playback"], true);
        assert_eq!(payload.message_type(), MessageType::Video);
    }

    #[test]
    fn test_media_message_types() {
        assert!(!MessageType::Text.is_media());
        assert!(MessageType::Audio.is_media());
    }

    #[test]
    fn test_text_preview_truncates_on_chars() {
        let payload = MessagePayload::text("olá, tudo bem com você?");
        assert_eq!(payload.preview(8), "olá, ...");
        assert_eq!(payload.preview(100), "olá, tudo bem com você?");
    }

    #[test]
    fn test_media_preview_uses_caption() {
        let image = MessagePayload::Image {
            url: "u".to_string(),
            caption: Some("  beach ".to_string()),
        };
        assert_eq!(image.preview(50), "📷 Photo beach");

        let audio = MessagePayload::Audio { url: "u".to_string() };
        assert_eq!(audio.preview(50), "🎤 Audio");

        let mut document = MessagePayload::Document {
            url: "u".to_string(),
            mimetype: "application/pdf".to_string(),
            length: 52_000,
            title: "Q3 report".to_string(),
            caption: Some("numbers inside".to_string()),
            file_name: None,
            page_count: None,
            jpeg_thumbnail: None,
        };
        assert_eq!(document.preview(50), "📄 Q3 report numbers inside");
        if let MessagePayload::Document { caption, .. } = &mut document {
            *caption = None;
        }
        assert_eq!(document.preview(50), "📄 Q3 report");
    }

    #[test]
    fn test_tombstone_clears_media_and_reply() {
        let mut message = sample_message(MessagePayload::Image {
            url: "u".to_string(),
            caption: None,
        });
        let storage_id = message.storage_id;

        let removed = message.tombstone();

        assert_eq!(removed, storage_id);
        assert_eq!(message.payload, MessagePayload::text(DELETED_MESSAGE_TEXT));
        assert!(message.storage_id.is_none());
        assert!(message.reply.is_none());
    }

    #[test]
    fn test_sender_has_read_on_send() {
        let message = sample_message(MessagePayload::text("hi"));
        assert!(message.is_read_by(message.sender));
        assert!(!message.is_read_by(message.receivers[0]));
    }

    #[test]
    fn test_send_request_kind_tag() {
        let sender = Uuid::new_v4();
        let json = serde_json::json!({
            "kind": "text",
            "sender": sender,
            "content": "hello",
        });
        let request: SendMessageRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.sender(), sender);
        assert!(request.reply_to().is_none());
    }
}
