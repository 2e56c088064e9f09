//! Chat history enumeration.
//!
//! [`MessageLister::list`] resolves a [`ResourceReference`], walks the chat
//! history page by page and numbers every message for display.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::parser::ResourceReference;
use crate::service::{Entity, MessageService, RemoteMessage, ServiceError};

/// Messages requested per history page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Text shown for messages without text.
pub const NO_TEXT: &str = "No text";

/// One numbered message of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedItem {
    /// Service-side message id.
    pub id: i64,
    /// 1-based position in the listing.
    pub display_index: usize,
    /// Message text, or [`NO_TEXT`].
    pub text: String,
    /// Name of the attached document, if any.
    pub media_name: Option<String>,
}

impl ListedItem {
    /// Creates an item; missing or empty text becomes [`NO_TEXT`].
    #[must_use]
    pub fn new(
        id: i64,
        display_index: usize,
        text: Option<String>,
        media_name: Option<String>,
    ) -> Self {
        let text = text
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| NO_TEXT.to_string());
        Self {
            id,
            display_index,
            text,
            media_name,
        }
    }

    fn from_message(message: &RemoteMessage, display_index: usize) -> Self {
        Self::new(
            message.id,
            display_index,
            message.text.clone(),
            message.document().map(|doc| doc.display_name()),
        )
    }

    /// Returns true when the message carries a downloadable document.
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.media_name.is_some()
    }
}

impl fmt::Display for ListedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.display_index, self.text)?;
        if let Some(name) = &self.media_name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

/// Result of a successful enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// The resolved chat.
    pub entity: Entity,
    /// Messages in service order, numbered from 1.
    pub items: Vec<ListedItem>,
    /// Set when a rate limit cut the enumeration short; holds the wait that
    /// was slept before returning.
    pub rate_limited: Option<Duration>,
}

impl Listing {
    /// Returns true when no message was gathered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of gathered messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when the enumeration was cut short.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.rate_limited.is_some()
    }
}

/// Errors that end a listing without items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    /// Invite hash was rejected.
    #[error("invite link is not valid: {token}")]
    InvalidInvite {
        /// The rejected hash.
        token: String,
    },

    /// Reference does not name a chat, or the link has expired.
    #[error("link not valid or expired: {reference}")]
    InvalidResource {
        /// The reference that failed.
        reference: String,
    },

    /// Chat is private and not reachable with this account.
    #[error("chat is private and not accessible: {reference}")]
    PrivateResource {
        /// The reference that failed.
        reference: String,
    },

    /// Resolution itself was rate limited; the wait has already been slept.
    #[error("rate limited while resolving the chat, waited {wait:?}")]
    RateLimited {
        /// The wait that was slept.
        wait: Duration,
    },

    /// Any other failure, with the underlying message.
    #[error("error while fetching messages: {message}")]
    Unknown {
        /// Underlying error text.
        message: String,
    },
}

impl ListError {
    /// Creates an unknown error from any displayable cause.
    pub fn unknown(cause: impl fmt::Display) -> Self {
        Self::Unknown {
            message: cause.to_string(),
        }
    }
}

impl From<ServiceError> for ListError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::InvalidInvite { token } => Self::InvalidInvite { token },
            ServiceError::InvalidResource { reference } => Self::InvalidResource { reference },
            ServiceError::PrivateResource { reference } => Self::PrivateResource { reference },
            ServiceError::RateLimited { wait } => Self::RateLimited { wait },
            other => Self::unknown(other),
        }
    }
}

/// Enumerates chat history through a [`MessageService`].
pub struct MessageLister {
    service: Arc<dyn MessageService>,
    page_size: usize,
}

impl MessageLister {
    /// Creates a lister with the default page size.
    #[must_use]
    pub fn new(service: Arc<dyn MessageService>) -> Self {
        Self {
            service,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the page size (minimum 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Lists every message of the referenced chat.
    ///
    /// # Errors
    ///
    /// See [`MessageLister::list_with`].
    pub async fn list(&self, reference: &ResourceReference) -> Result<Listing, ListError> {
        self.list_with(reference, &mut |_| {}).await
    }

    /// Lists every message, passing each numbered item to `observer` as it
    /// is gathered.
    ///
    /// A rate limit during enumeration sleeps for the requested wait and
    /// returns the items gathered so far with [`Listing::rate_limited`] set.
    ///
    /// # Errors
    ///
    /// Returns [`ListError`] when the chat cannot be resolved or a history
    /// page fails for any reason other than a rate limit.
    #[instrument(skip(self, observer), fields(reference = %reference, kind = %reference.kind()))]
    pub async fn list_with(
        &self,
        reference: &ResourceReference,
        observer: &mut (dyn FnMut(&ListedItem) + Send),
    ) -> Result<Listing, ListError> {
        let entity = match self.resolve(reference).await {
            Ok(entity) => entity,
            Err(ServiceError::RateLimited { wait }) => {
                warn!(wait_secs = wait.as_secs(), "rate limited while resolving, waiting");
                tokio::time::sleep(wait).await;
                return Err(ListError::RateLimited { wait });
            }
            Err(error) => {
                debug!(error = %error, "could not resolve chat");
                return Err(error.into());
            }
        };
        info!(chat = %entity, "chat resolved");

        let mut items: Vec<ListedItem> = Vec::new();
        let mut offset_id = None;
        let mut rate_limited = None;

        loop {
            let page = match self
                .service
                .fetch_history(&entity, offset_id, self.page_size)
                .await
            {
                Ok(page) => page,
                Err(ServiceError::RateLimited { wait }) => {
                    warn!(
                        wait_secs = wait.as_secs(),
                        gathered = items.len(),
                        "rate limited while listing, waiting then stopping early"
                    );
                    tokio::time::sleep(wait).await;
                    rate_limited = Some(wait);
                    break;
                }
                Err(error) => return Err(error.into()),
            };

            let page_len = page.len();
            for message in &page {
                let item = ListedItem::from_message(message, items.len() + 1);
                observer(&item);
                items.push(item);
            }

            let next_offset = page.last().map(|message| message.id);
            debug!(page_len, total = items.len(), ?next_offset, "history page fetched");
            if page_len < self.page_size || next_offset.is_none() || next_offset == offset_id {
                break;
            }
            offset_id = next_offset;
        }

        info!(items = items.len(), truncated = rate_limited.is_some(), "listing finished");
        Ok(Listing {
            entity,
            items,
            rate_limited,
        })
    }

    async fn resolve(&self, reference: &ResourceReference) -> Result<Entity, ServiceError> {
        match reference.invite_token() {
            Some(token) => self.service.import_invite(token).await,
            None => self.service.resolve(reference).await,
        }
    }
}

impl fmt::Debug for MessageLister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageLister")
            .field("service", &self.service.name())
            .field("page_size", &self.page_size)
            .finish()
    }
}
