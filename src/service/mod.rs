//! Remote message service port and its adapters.
//!
//! Everything that talks to the chat network goes through the
//! [`MessageService`] trait. Two adapters ship with the crate:
//!
//! - [`HttpMessageService`] speaks JSON to a local gateway process that owns
//!   the authenticated session.
//! - [`InMemoryService`] serves scripted chats, used by tests and dry runs.

mod constants;
mod error;
mod http;
mod memory;
mod retry_after;
mod types;

use async_trait::async_trait;

pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_RATE_LIMIT_WAIT, DEFAULT_SERVICE_URL, MAX_RETRY_AFTER,
    READ_TIMEOUT_SECS,
};
pub use error::ServiceError;
pub use http::{HttpMessageService, ServiceCredentials, classify_gateway_error};
pub use memory::{InMemoryService, MemoryChat, ServiceCall};
pub use retry_after::{cap_wait, parse_flood_wait_code, parse_retry_after};
pub use types::{Entity, Media, MediaDocument, MediaStream, RemoteMessage};

use crate::parser::ResourceReference;

/// Access to chats, their history and their media payloads.
///
/// Implementations must be usable from a multi-threaded runtime.
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Short adapter name for logs.
    fn name(&self) -> &'static str;

    /// Resolves a non-invite reference to a chat.
    async fn resolve(&self, reference: &ResourceReference) -> Result<Entity, ServiceError>;

    /// Exchanges an invite hash for membership and returns the joined chat.
    async fn import_invite(&self, token: &str) -> Result<Entity, ServiceError>;

    /// Returns up to `limit` messages older than `offset_id`, newest first.
    ///
    /// `None` starts from the newest message. An empty page means the
    /// history is exhausted.
    async fn fetch_history(
        &self,
        entity: &Entity,
        offset_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<RemoteMessage>, ServiceError>;

    /// Fetches one message; `Ok(None)` when it does not exist.
    async fn get_message(
        &self,
        entity: &Entity,
        message_id: i64,
    ) -> Result<Option<RemoteMessage>, ServiceError>;

    /// Opens the document payload of `message` for streaming.
    async fn open_media(
        &self,
        entity: &Entity,
        message: &RemoteMessage,
    ) -> Result<MediaStream, ServiceError>;
}
