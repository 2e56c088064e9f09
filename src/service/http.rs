//! JSON gateway adapter.
//!
//! The gateway is a local process that holds the authenticated chat session
//! and exposes it over plain HTTP:
//!
//! | method | path | result |
//! |--------|------|--------|
//! | `POST` | `/v1/resolve` | [`Entity`] |
//! | `POST` | `/v1/invites/{token}/import` | [`Entity`] |
//! | `GET`  | `/v1/chats/{id}/messages?offset_id=&limit=` | `{"messages": [...]}` |
//! | `GET`  | `/v1/chats/{id}/messages/{msg}` | [`RemoteMessage`], 404 when absent |
//! | `GET`  | `/v1/chats/{id}/messages/{msg}/media` | raw payload bytes |
//!
//! Failures carry `{"error": "CODE", "seconds": N, "message": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_RATE_LIMIT_WAIT, READ_TIMEOUT_SECS};
use super::retry_after::{cap_wait, parse_flood_wait_code, parse_retry_after};
use super::{Entity, MediaStream, MessageService, RemoteMessage, ServiceError};
use crate::parser::ResourceReference;

const OP_RESOLVE: &str = "resolve";
const OP_IMPORT_INVITE: &str = "import_invite";
const OP_FETCH_HISTORY: &str = "fetch_history";
const OP_GET_MESSAGE: &str = "get_message";
const OP_OPEN_MEDIA: &str = "open_media";

/// Credentials forwarded to the gateway on every request.
#[derive(Clone)]
pub struct ServiceCredentials {
    /// Numeric application id.
    pub api_id: i64,
    /// Application secret.
    pub api_hash: String,
    /// Name of the persisted session the gateway should use.
    pub session_name: String,
}

impl std::fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("session_name", &self.session_name)
            .finish()
    }
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    reference: &'a str,
    kind: &'a str,
}

#[derive(Deserialize)]
struct HistoryPage {
    #[serde(default)]
    messages: Vec<RemoteMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    seconds: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// [`MessageService`] backed by the HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpMessageService {
    client: Client,
    base_url: Url,
}

impl HttpMessageService {
    /// Creates an adapter with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Protocol`] when the base URL is not an
    /// absolute http(s) URL, a credential cannot be sent as a header, or
    /// the HTTP client cannot be built.
    pub fn new(base_url: &str, credentials: &ServiceCredentials) -> Result<Self, ServiceError> {
        Self::with_timeouts(
            base_url,
            credentials,
            CONNECT_TIMEOUT_SECS,
            READ_TIMEOUT_SECS,
        )
    }

    /// Creates an adapter with custom timeouts.
    ///
    /// # Errors
    ///
    /// Same as [`HttpMessageService::new`].
    pub fn with_timeouts(
        base_url: &str,
        credentials: &ServiceCredentials,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, ServiceError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ServiceError::protocol("configure", format!("invalid gateway URL: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ServiceError::protocol(
                "configure",
                format!("unsupported gateway URL scheme: {}", base_url.scheme()),
            ));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(concat!("tgmedia/", env!("CARGO_PKG_VERSION")))
            .default_headers(credential_headers(credentials)?)
            .build()
            .map_err(|e| ServiceError::protocol("configure", e.to_string()))?;

        debug!(%base_url, "gateway client ready");
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|e| ServiceError::protocol("configure", format!("bad endpoint {path}: {e}")))
    }

    async fn send(
        request: RequestBuilder,
        operation: &str,
        subject: &str,
    ) -> Result<Response, ServiceError> {
        let response = Self::transmit(request, operation).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::failure(response, operation, subject).await)
        }
    }

    async fn transmit(request: RequestBuilder, operation: &str) -> Result<Response, ServiceError> {
        request
            .send()
            .await
            .map_err(|e| map_transport_error(operation, &e))
    }

    /// Classifies a non-success response from its status, `Retry-After`
    /// header and error body.
    async fn failure(response: Response, operation: &str, subject: &str) -> ServiceError {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let body = response.text().await.unwrap_or_default();
        let error =
            classify_gateway_error(operation, subject, status, retry_after.as_deref(), &body);
        debug!(operation, status, error = %error, "gateway request failed");
        error
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: Response,
        operation: &str,
    ) -> Result<T, ServiceError> {
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::timeout(operation)
            } else {
                ServiceError::protocol(operation, format!("invalid JSON: {e}"))
            }
        })
    }
}

#[async_trait]
impl MessageService for HttpMessageService {
    fn name(&self) -> &'static str {
        "http-gateway"
    }

    #[instrument(skip(self), fields(reference = %reference))]
    async fn resolve(&self, reference: &ResourceReference) -> Result<Entity, ServiceError> {
        let url = self.endpoint("v1/resolve")?;
        let body = ResolveRequest {
            reference: reference.as_str(),
            kind: reference.kind().as_str(),
        };
        let response = Self::send(
            self.client.post(url).json(&body),
            OP_RESOLVE,
            reference.as_str(),
        )
        .await?;
        Self::decode(response, OP_RESOLVE).await
    }

    #[instrument(skip(self, token))]
    async fn import_invite(&self, token: &str) -> Result<Entity, ServiceError> {
        let url = self.endpoint(&format!(
            "v1/invites/{}/import",
            urlencoding::encode(token)
        ))?;
        let response =
            Self::send(self.client.post(url), OP_IMPORT_INVITE, token).await?;
        Self::decode(response, OP_IMPORT_INVITE).await
    }

    #[instrument(skip(self, entity), fields(chat = entity.id))]
    async fn fetch_history(
        &self,
        entity: &Entity,
        offset_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<RemoteMessage>, ServiceError> {
        let mut url = self.endpoint(&format!("v1/chats/{}/messages", entity.id))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(offset_id) = offset_id {
                query.append_pair("offset_id", &offset_id.to_string());
            }
            query.append_pair("limit", &limit.to_string());
        }
        let subject = entity.id.to_string();
        let response =
            Self::send(self.client.get(url), OP_FETCH_HISTORY, &subject).await?;
        let page: HistoryPage = Self::decode(response, OP_FETCH_HISTORY).await?;
        Ok(page.messages)
    }

    #[instrument(skip(self, entity), fields(chat = entity.id))]
    async fn get_message(
        &self,
        entity: &Entity,
        message_id: i64,
    ) -> Result<Option<RemoteMessage>, ServiceError> {
        let url = self.endpoint(&format!("v1/chats/{}/messages/{message_id}", entity.id))?;
        let response = Self::transmit(self.client.get(url), OP_GET_MESSAGE).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(message_id, "message not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            let subject = entity.id.to_string();
            return Err(Self::failure(response, OP_GET_MESSAGE, &subject).await);
        }
        Self::decode(response, OP_GET_MESSAGE).await.map(Some)
    }

    #[instrument(skip(self, entity, message), fields(chat = entity.id, message_id = message.id))]
    async fn open_media(
        &self,
        entity: &Entity,
        message: &RemoteMessage,
    ) -> Result<MediaStream, ServiceError> {
        let url = self.endpoint(&format!(
            "v1/chats/{}/messages/{}/media",
            entity.id, message.id
        ))?;
        let subject = entity.id.to_string();
        let response =
            Self::send(self.client.get(url), OP_OPEN_MEDIA, &subject).await?;

        let total_bytes = response
            .content_length()
            .or_else(|| message.document().and_then(|doc| doc.size));
        let chunks = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| map_transport_error(OP_OPEN_MEDIA, &e))
            })
            .boxed();

        Ok(MediaStream {
            total_bytes,
            chunks,
        })
    }
}

fn credential_headers(credentials: &ServiceCredentials) -> Result<HeaderMap, ServiceError> {
    let header = |value: &str, name: &str| {
        HeaderValue::from_str(value).map_err(|_| {
            ServiceError::protocol(
                "configure",
                format!("{name} contains characters not allowed in a header"),
            )
        })
    };

    let mut headers = HeaderMap::new();
    headers.insert("x-api-id", HeaderValue::from(credentials.api_id));
    let mut api_hash = header(&credentials.api_hash, "API_HASH")?;
    api_hash.set_sensitive(true);
    headers.insert("x-api-hash", api_hash);
    headers.insert(
        "x-session-name",
        header(&credentials.session_name, "SESSION_NAME")?,
    );
    Ok(headers)
}

fn map_transport_error(operation: &str, error: &reqwest::Error) -> ServiceError {
    if error.is_timeout() {
        ServiceError::timeout(operation)
    } else {
        ServiceError::network(operation, error.to_string())
    }
}

/// Maps a failed gateway response to a [`ServiceError`].
///
/// `subject` is the reference, invite hash or chat id the request was about.
/// Error codes in the body take precedence over the HTTP status.
#[must_use]
pub fn classify_gateway_error(
    operation: &str,
    subject: &str,
    status: u16,
    retry_after: Option<&str>,
    body: &str,
) -> ServiceError {
    let body: GatewayErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = body.error.to_ascii_uppercase();

    if status == 429 || code.starts_with("FLOOD_WAIT") {
        let wait = retry_after
            .and_then(parse_retry_after)
            .or_else(|| body.seconds.map(|s| cap_wait(Duration::from_secs(s))))
            .or_else(|| parse_flood_wait_code(&code))
            .unwrap_or_else(|| {
                warn!(operation, "rate limited without a wait hint, using default");
                DEFAULT_RATE_LIMIT_WAIT
            });
        return ServiceError::rate_limited(wait);
    }

    match code.as_str() {
        "INVITE_HASH_INVALID" | "INVITE_HASH_EXPIRED" => {
            return ServiceError::invalid_invite(subject);
        }
        "CHANNEL_PRIVATE" | "CHAT_FORBIDDEN" => return ServiceError::private_resource(subject),
        "CHANNEL_INVALID" | "USERNAME_INVALID" | "USERNAME_NOT_OCCUPIED" | "PEER_ID_INVALID" => {
            return ServiceError::invalid_resource(subject);
        }
        "AUTH_KEY_UNREGISTERED" | "SESSION_REVOKED" | "API_ID_INVALID" => {
            return ServiceError::Unauthorized;
        }
        _ => {}
    }

    match (status, operation) {
        (401, _) => ServiceError::Unauthorized,
        (403, _) => ServiceError::private_resource(subject),
        (400 | 404, OP_RESOLVE) => ServiceError::invalid_resource(subject),
        (400 | 404, OP_IMPORT_INVITE) => ServiceError::invalid_invite(subject),
        (408 | 504, _) => ServiceError::timeout(operation),
        _ => {
            let detail = body.message.unwrap_or(body.error);
            ServiceError::protocol(operation, format!("HTTP {status}: {detail}"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credentials() -> ServiceCredentials {
        ServiceCredentials {
            api_id: 12345,
            api_hash: "0123456789abcdef".to_string(),
            session_name: "tester".to_string(),
        }
    }

    #[test]
    fn test_new_rejects_non_http_url() {
        let err = HttpMessageService::new("ftp://gateway", &credentials()).unwrap_err();
        assert!(matches!(err, ServiceError::Protocol { .. }));
        assert!(HttpMessageService::new("not a url", &credentials()).is_err());
    }

    #[test]
    fn test_new_rejects_header_unsafe_credentials() {
        let mut creds = credentials();
        creds.session_name = "bad\nname".to_string();
        let err = HttpMessageService::new("http://127.0.0.1:1", &creds).unwrap_err();
        assert!(err.to_string().contains("SESSION_NAME"), "got: {err}");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let service = HttpMessageService::new("http://127.0.0.1:1/gw", &credentials()).unwrap();
        let url = service.endpoint("v1/resolve").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:1/gw/v1/resolve");
    }

    #[test]
    fn test_credentials_debug_redacts_hash() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(rendered.contains("tester"));
    }

    #[test]
    fn test_classify_429_prefers_retry_after_header() {
        let err = classify_gateway_error(OP_GET_MESSAGE, "1", 429, Some("7"), r#"{"seconds": 30}"#);
        assert_eq!(err, ServiceError::rate_limited(Duration::from_secs(7)));
    }

    #[test]
    fn test_classify_429_falls_back_to_body_seconds() {
        let err = classify_gateway_error(OP_GET_MESSAGE, "1", 429, None, r#"{"seconds": 30}"#);
        assert_eq!(err, ServiceError::rate_limited(Duration::from_secs(30)));
    }

    #[test]
    fn test_classify_flood_wait_code_without_429() {
        let err = classify_gateway_error(
            OP_FETCH_HISTORY,
            "1",
            420,
            None,
            r#"{"error": "FLOOD_WAIT_12"}"#,
        );
        assert_eq!(err, ServiceError::rate_limited(Duration::from_secs(12)));
    }

    #[test]
    fn test_classify_429_without_hint_uses_default() {
        let err = classify_gateway_error(OP_OPEN_MEDIA, "1", 429, None, "");
        assert_eq!(err, ServiceError::rate_limited(DEFAULT_RATE_LIMIT_WAIT));
    }

    #[test]
    fn test_classify_invite_codes() {
        let err = classify_gateway_error(
            OP_IMPORT_INVITE,
            "AbC",
            400,
            None,
            r#"{"error": "INVITE_HASH_EXPIRED"}"#,
        );
        assert_eq!(err, ServiceError::invalid_invite("AbC"));
    }

    #[test]
    fn test_classify_private_channel() {
        let by_code = classify_gateway_error(
            OP_RESOLVE,
            "@secret",
            400,
            None,
            r#"{"error": "CHANNEL_PRIVATE"}"#,
        );
        assert_eq!(by_code, ServiceError::private_resource("@secret"));
        let by_status = classify_gateway_error(OP_RESOLVE, "@secret", 403, None, "");
        assert_eq!(by_status, ServiceError::private_resource("@secret"));
    }

    #[test]
    fn test_classify_unresolvable_reference() {
        let by_code = classify_gateway_error(
            OP_RESOLVE,
            "@nobody",
            400,
            None,
            r#"{"error": "USERNAME_NOT_OCCUPIED"}"#,
        );
        assert_eq!(by_code, ServiceError::invalid_resource("@nobody"));
        let by_status = classify_gateway_error(OP_RESOLVE, "@nobody", 404, None, "");
        assert_eq!(by_status, ServiceError::invalid_resource("@nobody"));
    }

    #[test]
    fn test_classify_unauthorized() {
        assert_eq!(
            classify_gateway_error(OP_RESOLVE, "@x", 401, None, ""),
            ServiceError::Unauthorized
        );
    }

    #[test]
    fn test_classify_unknown_is_protocol_with_detail() {
        let err = classify_gateway_error(
            OP_FETCH_HISTORY,
            "1",
            500,
            None,
            r#"{"error": "INTERNAL", "message": "boom"}"#,
        );
        match err {
            ServiceError::Protocol { operation, message } => {
                assert_eq!(operation, OP_FETCH_HISTORY);
                assert!(message.contains("500"));
                assert!(message.contains("boom"));
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }
}
