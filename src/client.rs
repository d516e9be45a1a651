use std::env;
use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{Attachment, ChatRequest, ImageReply};

/// Backend address used when neither configuration nor environment names one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
/// Environment variable that overrides the backend address.
pub const BASE_URL_ENV: &str = "NEXUSCHAT_BASE_URL";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const STREAM_PATH: &str = "api/chat/stream";
const IMAGE_PATH: &str = "api/chat/image";
const CLEAR_SESSION_PATH: &str = "api/session/clear";

/// A boxed stream of raw response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The wire operations a chat session needs from its backend.
///
/// [`NexusClient`] speaks HTTP; tests substitute scripted implementations.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Opens a streaming reply and returns its body as raw chunks.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream>;

    /// Sends a prompt with an image and waits for the complete reply.
    async fn chat_with_image(
        &self,
        request: &ChatRequest,
        image: &Attachment,
    ) -> Result<ImageReply>;

    /// Asks the backend to forget the memory of a session.
    async fn clear_session(&self, session_id: &str) -> Result<()>;
}

/// HTTP client for the NexusAI backend.
#[derive(Debug, Clone)]
pub struct NexusClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl NexusClient {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the NEXUSCHAT_BASE_URL environment
    /// variable; it falls back to a backend on localhost.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        // Replies stream for as long as the model talks, so only connecting is bounded here.
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Returns the backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        let status_code = response.status().as_u16();

        // The backend reports failures as `{"detail": "..."}`.
        #[derive(Deserialize)]
        struct ErrorResponse {
            detail: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.detail)
            .unwrap_or(error_body);
        Error::api(status_code, message)
    }
}

#[async_trait::async_trait]
impl ChatTransport for NexusClient {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream> {
        let url = self.endpoint(STREAM_PATH)?;
        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        tracing::debug!(%url, model = %request.model, "opening chat stream");
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        // Convert reqwest errors to our error type
        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {}", e), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }

    async fn chat_with_image(
        &self,
        request: &ChatRequest,
        image: &Attachment,
    ) -> Result<ImageReply> {
        let url = self.endpoint(IMAGE_PATH)?;
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| {
                Error::validation(
                    format!("Invalid image type {}: {}", image.mime_type, e),
                    Some("attachment".to_string()),
                )
            })?;
        let form = Form::new()
            .text("message", request.message.clone())
            .text("session_id", request.session_id.clone())
            .text("model", request.model.clone())
            .part("image", part);

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<ImageReply>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    async fn clear_session(&self, session_id: &str) -> Result<()> {
        let url = self.endpoint(CLEAR_SESSION_PATH)?;

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .query(&[("session_id", session_id)])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    // `Url::join` replaces the last path segment unless the base ends in a slash.
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::validation(
            format!("unsupported URL scheme {scheme}"),
            Some("base_url".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = NexusClient::new(Some("http://localhost:8000".to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = NexusClient::with_options(
            Some("https://chat.example.com/nexus".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(
            client.endpoint(STREAM_PATH).unwrap().as_str(),
            "https://chat.example.com/nexus/api/chat/stream"
        );
    }

    #[test]
    fn endpoints_join_under_base() {
        let client = NexusClient::new(Some("http://127.0.0.1:9000/".to_string())).unwrap();
        assert_eq!(
            client.endpoint(IMAGE_PATH).unwrap().as_str(),
            "http://127.0.0.1:9000/api/chat/image"
        );
        assert_eq!(
            client.endpoint(CLEAR_SESSION_PATH).unwrap().as_str(),
            "http://127.0.0.1:9000/api/session/clear"
        );
    }

    #[test]
    fn invalid_base_urls_are_rejected() {
        assert!(NexusClient::new(Some("not a url".to_string())).is_err());
        let err = NexusClient::new(Some("ftp://example.com".to_string())).unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        // Port 9 (discard) is not expected to accept HTTP connections on test machines.
        let client = NexusClient::with_options(
            Some("http://127.0.0.1:9".to_string()),
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        let request = ChatRequest::new("hi", "session", "GPT-4o-mini");
        let err = match client.stream_chat(&request).await {
            Ok(_) => panic!("expected a transport error"),
            Err(err) => err,
        };
        assert!(err.is_transport());
    }
}
