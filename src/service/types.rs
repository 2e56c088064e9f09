//! Data exchanged with remote message services.

use std::fmt;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::ServiceError;

/// A chat the service resolved a reference to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Service-side chat id.
    pub id: i64,
    /// Display title.
    #[serde(default)]
    pub title: String,
}

impl Entity {
    /// Creates an entity.
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.title, self.id)
        }
    }
}

/// One message as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// Message id, unique within the chat.
    pub id: i64,
    /// Message text or caption.
    #[serde(default)]
    pub text: Option<String>,
    /// Attached media, if any.
    #[serde(default)]
    pub media: Option<Media>,
}

impl RemoteMessage {
    /// Creates a text-only message.
    pub fn text(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: Some(text.into()),
            media: None,
        }
    }

    /// Creates a message carrying a document.
    #[must_use]
    pub fn with_document(id: i64, text: Option<String>, document: MediaDocument) -> Self {
        Self {
            id,
            text,
            media: Some(Media::Document(document)),
        }
    }

    /// Returns the attached document, ignoring photos and other media.
    #[must_use]
    pub fn document(&self) -> Option<&MediaDocument> {
        match &self.media {
            Some(Media::Document(document)) => Some(document),
            _ => None,
        }
    }
}

/// Media attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Media {
    /// A file payload; the only kind this tool downloads.
    Document(MediaDocument),
    /// A compressed photo.
    Photo {
        /// Service-side photo id.
        id: i64,
    },
    /// Polls, geo points, web previews and anything newer.
    #[serde(other)]
    Unsupported,
}

/// A document payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDocument {
    /// Service-side document id.
    pub id: i64,
    /// Original file name, when the sender provided one.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Payload size in bytes, when known.
    #[serde(default)]
    pub size: Option<u64>,
    /// MIME type, when known.
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl MediaDocument {
    /// Creates a document descriptor without size or MIME type.
    #[must_use]
    pub fn new(id: i64, file_name: Option<String>) -> Self {
        Self {
            id,
            file_name,
            size: None,
            mime_type: None,
        }
    }

    /// Sets the payload size.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// The name the payload is listed and saved under.
    ///
    /// Falls back to `document_<id>.mp4` when the sender gave no name.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.file_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("document_{}.mp4", self.id),
        }
    }
}

/// A payload being streamed from the service.
pub struct MediaStream {
    /// Total payload size, when the service reports it.
    pub total_bytes: Option<u64>,
    /// Payload chunks in order.
    pub chunks: BoxStream<'static, Result<Vec<u8>, ServiceError>>,
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}
