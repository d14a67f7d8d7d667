use std::fmt;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::accumulating_stream::AccumulatingStream;
use crate::client_logger::ClientLogger;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, UPLOAD_BYTES,
};
use crate::sse::process_sse;
use crate::types::{
    ChatRequest, ChatResponse, ImageUploadResponse, Message, NewSessionRequest, Session,
    StreamChunk, local_message_id,
};

/// A boxed stream of chunks as returned by [`AgoraClient::stream_chat`].
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Client for the agora chat service.
#[derive(Clone)]
pub struct AgoraClient {
    client: ReqwestClient,
    config: ApiConfig,
    timeout: Option<Duration>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl AgoraClient {
    /// Create a new client for the service described by `config`.
    ///
    /// No request timeout is set; streamed replies may take as long as the
    /// service needs.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Self::with_options(config, None)
    }

    /// Create a new client located by `AGORA_API_BASE_URL` and `AGORA_WS_URL`.
    pub fn from_env() -> Result<Self> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Create a new client with custom settings.
    pub fn with_options(config: ApiConfig, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ReqwestClient::builder().default_headers(default_headers());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self {
            client,
            config,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every reply passing through the client.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The service configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The request timeout, if one was set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// List all sessions.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let request = self.client.get(self.config.sessions_url()?);
        let response = self.execute(request).await?;
        parse_json(response).await
    }

    /// Create a session for `username`.
    pub async fn create_session(&self, username: &str) -> Result<Session> {
        let request = self
            .client
            .post(self.config.sessions_url()?)
            .json(&NewSessionRequest::new(username));
        let response = self.execute(request).await?;
        parse_json(response).await
    }

    /// Fetch the message history of a session, oldest first.
    ///
    /// Messages are returned with their session id filled in, a local id
    /// assigned and metadata in canonical form (empty when absent).
    pub async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let request = self
            .client
            .get(self.config.session_messages_url(session_id)?);
        let response = self.execute(request).await?;
        let messages: Vec<Message> = parse_json(response).await?;
        Ok(messages
            .into_iter()
            .map(|mut message| {
                if message.id.is_none() {
                    message.id = Some(local_message_id());
                }
                if message.session_id.is_none() {
                    message.session_id = Some(session_id.to_string());
                }
                message.metadata = Some(message.metadata_or_default().reconciled());
                message
            })
            .collect())
    }

    /// Delete a session and its messages.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let request = self.client.delete(self.config.session_url(session_id)?);
        self.execute(request).await?;
        Ok(())
    }

    /// Remove every message of a session, keeping the session.
    pub async fn clear_session(&self, session_id: &str) -> Result<()> {
        let request = self
            .client
            .post(self.config.session_clear_url(session_id)?);
        self.execute(request).await?;
        Ok(())
    }

    /// Send a message and wait for the complete reply.
    pub async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<Message> {
        let body = ChatRequest::new(session_id, content).with_image_url(image_url);
        let request = self.client.post(self.config.chat_url()?).json(&body);
        let response = self.execute(request).await?;
        let reply: ChatResponse = parse_json(response).await?;
        let message = reply.into_message(session_id);
        if let Some(logger) = &self.logger {
            logger.log_message(&message);
        }
        Ok(message)
    }

    /// Send a message and get the reply as a stream of chunks.
    ///
    /// The first chunk usually echoes the user's message with role `user`.
    /// Content chunks carry the full text so far; the final chunk carries
    /// the results.
    pub async fn stream_chat(
        &self,
        session_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<ChunkStream> {
        let body = ChatRequest::new(session_id, content).with_image_url(image_url);
        let request = self
            .client
            .post(self.config.chat_stream_url()?)
            .header(header::ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(&body);
        let response = self.execute(request).await?;

        // Get the byte stream from the response
        let chunks = process_sse(response.bytes_stream());

        match &self.logger {
            Some(logger) => {
                let (stream, _) = AccumulatingStream::new(chunks, session_id);
                Ok(Box::pin(stream.with_logger(Arc::clone(logger))))
            }
            None => Ok(Box::pin(chunks)),
        }
    }

    /// Upload the image at `path`.
    pub async fn upload_image(&self, path: impl AsRef<Path>) -> Result<ImageUploadResponse> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::io(format!("Failed to read {}: {}", path.display(), e), e))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();
        self.upload_image_bytes(&file_name, bytes).await
    }

    /// Upload an in-memory image named `file_name`.
    pub async fn upload_image_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ImageUploadResponse> {
        if bytes.is_empty() {
            return Err(Error::validation(
                format!("image '{file_name}' is empty"),
                Some("file".to_string()),
            ));
        }
        let size = bytes.len() as u64;
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(image_mime_type(file_name))
            .map_err(|e| {
                Error::http_client(format!("Invalid upload part: {}", e), Some(Box::new(e)))
            })?;
        let form = Form::new().part("file", part);
        let request = self
            .client
            .post(self.config.upload_image_url()?)
            .multipart(form);
        let response = self.execute(request).await?;
        UPLOAD_BYTES.count(size);
        parse_json(response).await
    }

    /// Send a request, converting transport failures and non-success statuses
    /// into errors.
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.execute_inner(request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            tracing::debug!(error = %err, "request failed");
        }
        result
    }

    async fn execute_inner(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        tracing::debug!(
            url = %response.url(),
            status = response.status().as_u16(),
            "response received"
        );
        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();
        let status_text = status.canonical_reason().unwrap_or("Unknown status").to_string();

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let (detail, param) = parse_detail(&error_body);
        let error_message = detail
            .or_else(|| Some(error_body.trim().to_string()).filter(|body| !body.is_empty()))
            .unwrap_or(status_text);

        // Map HTTP status code to appropriate error type
        match status_code {
            400 => Error::bad_request(error_message, param),
            404 => Error::not_found(error_message, None, None),
            408 => Error::timeout(error_message, None),
            422 => Error::validation(error_message, param),
            500 => Error::internal_server(error_message),
            502..=504 => Error::service_unavailable(error_message),
            _ => Error::api(status_code, error_message),
        }
    }
}

impl fmt::Debug for AgoraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgoraClient")
            .field("base_url", &self.config.base_url().as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.bytes().await.map_err(|e| {
        Error::http_client(format!("Failed to read response: {}", e), Some(Box::new(e)))
    })?;
    serde_json::from_slice(&body).map_err(|e| {
        Error::serialization(
            format!("Failed to parse response: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Extract the message from a FastAPI error body.
///
/// `detail` is either a string or, for validation failures, a list of
/// `{loc, msg}` objects.  Returns the message and the offending parameter.
fn parse_detail(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };
    match value.get("detail") {
        Some(Value::String(detail)) => (Some(detail.clone()), None),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            let param = items
                .first()
                .and_then(|item| item.get("loc"))
                .and_then(Value::as_array)
                .and_then(|loc| loc.last())
                .map(|last| match last {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
            if messages.is_empty() {
                (None, param)
            } else {
                (Some(messages.join("; ")), param)
            }
        }
        Some(Value::Null) | None => (None, None),
        Some(other) => (Some(other.to_string()), None),
    }
}

fn image_mime_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
