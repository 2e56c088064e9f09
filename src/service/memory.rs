//! In-memory service for tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;

use super::{Entity, MediaDocument, MediaStream, MessageService, RemoteMessage, ServiceError};
use crate::parser::ResourceReference;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// One service call, recorded for assertions and used to target failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceCall {
    /// [`MessageService::resolve`] with the normalized reference.
    Resolve(String),
    /// [`MessageService::import_invite`] with the hash.
    ImportInvite(String),
    /// [`MessageService::fetch_history`] with the offset.
    FetchHistory(Option<i64>),
    /// [`MessageService::get_message`] with the message id.
    GetMessage(i64),
    /// [`MessageService::open_media`] with the message id.
    OpenMedia(i64),
    /// Reading the payload stream of a message. A failure queued for this
    /// call is yielded after the first chunk.
    ReadMedia(i64),
}

/// A scripted chat.
#[derive(Debug, Clone)]
pub struct MemoryChat {
    entity: Entity,
    references: Vec<String>,
    invites: Vec<String>,
    private: bool,
    messages: Vec<RemoteMessage>,
    payloads: HashMap<i64, Vec<u8>>,
}

impl MemoryChat {
    /// Creates a chat that resolves by its numeric id.
    #[must_use]
    pub fn new(entity: Entity) -> Self {
        let references = vec![entity.id.to_string()];
        Self {
            entity,
            references,
            invites: Vec::new(),
            private: false,
            messages: Vec::new(),
            payloads: HashMap::new(),
        }
    }

    /// Adds a normalized reference the chat resolves from.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    /// Adds an invite hash that joins the chat.
    #[must_use]
    pub fn with_invite(mut self, token: impl Into<String>) -> Self {
        self.invites.push(token.into());
        self
    }

    /// Makes resolution fail with [`ServiceError::PrivateResource`].
    #[must_use]
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Appends a message. Messages are kept newest first, so append newest
    /// before older ones.
    #[must_use]
    pub fn with_message(mut self, message: RemoteMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Appends a text-only message.
    #[must_use]
    pub fn with_text(self, id: i64, text: &str) -> Self {
        self.with_message(RemoteMessage::text(id, text))
    }

    /// Appends a message carrying a document with the given payload.
    #[must_use]
    pub fn with_document(
        mut self,
        id: i64,
        text: Option<&str>,
        file_name: Option<&str>,
        payload: Vec<u8>,
    ) -> Self {
        let document = MediaDocument::new(id * 10, file_name.map(ToString::to_string))
            .with_size(payload.len() as u64);
        self.payloads.insert(id, payload);
        self.with_message(RemoteMessage::with_document(
            id,
            text.map(ToString::to_string),
            document,
        ))
    }

    /// The chat's entity.
    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    chats: Vec<MemoryChat>,
    failures: HashMap<ServiceCall, VecDeque<ServiceError>>,
    calls: Vec<ServiceCall>,
}

impl MemoryState {
    fn enter(&mut self, call: ServiceCall) -> Result<(), ServiceError> {
        self.calls.push(call.clone());
        match self.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn chat(&self, entity: &Entity) -> Option<&MemoryChat> {
        self.chats.iter().find(|chat| chat.entity.id == entity.id)
    }
}

/// [`MessageService`] serving scripted chats from memory.
///
/// Failures can be queued per call with [`InMemoryService::push_failure`];
/// every call is recorded and can be inspected with
/// [`InMemoryService::calls`].
#[derive(Debug)]
pub struct InMemoryService {
    state: Mutex<MemoryState>,
    chunk_size: usize,
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryService {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the payload chunk size (minimum 1).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Adds a chat.
    #[must_use]
    pub fn with_chat(self, chat: MemoryChat) -> Self {
        self.lock().chats.push(chat);
        self
    }

    /// Queues `error` as the result of the next matching `call`.
    pub fn push_failure(&self, call: ServiceCall, error: ServiceError) {
        self.lock().failures.entry(call).or_default().push_back(error);
    }

    /// Calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls equal to `call`.
    #[must_use]
    pub fn count(&self, call: &ServiceCall) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MessageService for InMemoryService {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn resolve(&self, reference: &ResourceReference) -> Result<Entity, ServiceError> {
        let mut state = self.lock();
        state.enter(ServiceCall::Resolve(reference.as_str().to_string()))?;
        let chat = state
            .chats
            .iter()
            .find(|chat| {
                chat.references
                    .iter()
                    .any(|r| r == reference.as_str() || r == reference.raw())
            })
            .ok_or_else(|| ServiceError::invalid_resource(reference.as_str()))?;
        if chat.private {
            return Err(ServiceError::private_resource(reference.as_str()));
        }
        Ok(chat.entity.clone())
    }

    async fn import_invite(&self, token: &str) -> Result<Entity, ServiceError> {
        let mut state = self.lock();
        state.enter(ServiceCall::ImportInvite(token.to_string()))?;
        state
            .chats
            .iter()
            .find(|chat| chat.invites.iter().any(|t| t == token))
            .map(|chat| chat.entity.clone())
            .ok_or_else(|| ServiceError::invalid_invite(token))
    }

    async fn fetch_history(
        &self,
        entity: &Entity,
        offset_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<RemoteMessage>, ServiceError> {
        let mut state = self.lock();
        state.enter(ServiceCall::FetchHistory(offset_id))?;
        let chat = state
            .chat(entity)
            .ok_or_else(|| ServiceError::invalid_resource(entity.id.to_string()))?;

        let start = match offset_id {
            None => 0,
            Some(offset) => chat
                .messages
                .iter()
                .position(|m| m.id == offset)
                .map_or(chat.messages.len(), |pos| pos + 1),
        };
        Ok(chat.messages.iter().skip(start).take(limit).cloned().collect())
    }

    async fn get_message(
        &self,
        entity: &Entity,
        message_id: i64,
    ) -> Result<Option<RemoteMessage>, ServiceError> {
        let mut state = self.lock();
        state.enter(ServiceCall::GetMessage(message_id))?;
        Ok(state
            .chat(entity)
            .and_then(|chat| chat.messages.iter().find(|m| m.id == message_id))
            .cloned())
    }

    async fn open_media(
        &self,
        entity: &Entity,
        message: &RemoteMessage,
    ) -> Result<MediaStream, ServiceError> {
        let mut state = self.lock();
        state.enter(ServiceCall::OpenMedia(message.id))?;
        let payload = state
            .chat(entity)
            .and_then(|chat| chat.payloads.get(&message.id))
            .cloned()
            .ok_or_else(|| {
                ServiceError::protocol("open_media", format!("message {} has no media", message.id))
            })?;
        let read_failure = state
            .failures
            .get_mut(&ServiceCall::ReadMedia(message.id))
            .and_then(VecDeque::pop_front);
        drop(state);

        let total_bytes = Some(payload.len() as u64);
        let mut chunks: Vec<Result<Vec<u8>, ServiceError>> = payload
            .chunks(self.chunk_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        if let Some(error) = read_failure {
            chunks.truncate(1);
            chunks.push(Err(error));
        }

        Ok(MediaStream {
            total_bytes,
            chunks: stream::iter(chunks).boxed(),
        })
    }
}
