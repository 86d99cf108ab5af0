use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::credential::ApiKey;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{GenerateContentRequest, Model, StreamChunk};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A boxed stream of classified response chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// The streaming text-generation operation a chat session depends on.
///
/// [`Gemini`] is the production implementation; tests substitute in-memory
/// streams.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Start a streaming generation for `request` with `model`.
    ///
    /// Errors returned here happen before the first chunk; errors yielded by
    /// the stream happen mid-reply.
    async fn stream_generate_content(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<ChunkStream>;
}

/// Client for the Gemini API.
#[derive(Debug, Clone)]
pub struct Gemini {
    api_key: HeaderValue,
    client: ReqwestClient,
    base_url: Url,
    /// Limit on connecting and receiving response headers; the body is unbounded.
    timeout: Duration,
}

impl Gemini {
    /// Create a new Gemini client for the default endpoint.
    pub fn new(api_key: &ApiKey) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `timeout` bounds connecting and waiting for response headers, never the
    /// streamed body.  Fails if the key cannot be sent as a header, the base
    /// URL does not parse or the HTTP client cannot be built.
    pub fn with_options(
        api_key: &ApiKey,
        base_url: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(api_key.expose()).map_err(|_| {
            Error::authentication("API key contains characters that cannot be sent in a header")
        })?;
        api_key.set_sensitive(true);

        let base_url = normalize_base_url(base_url.unwrap_or(DEFAULT_API_URL))?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The streaming endpoint for a model.
    pub fn stream_url(&self, model: &Model) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("models/{model}:streamGenerateContent"))?;
        url.query_pairs_mut().append_pair("alt", "sse");
        Ok(url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert("x-goog-api-key", self.api_key.clone());
        headers
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };
        let (error_type, error_message) = parse_error_body(&error_body);

        // Map HTTP status code to appropriate error type
        match status_code {
            400 => Error::bad_request(error_message),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }
}

#[async_trait::async_trait]
impl ContentGenerator for Gemini {
    async fn stream_generate_content(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<ChunkStream> {
        let url = self.stream_url(model)?;
        tracing::debug!(
            %model,
            contents = request.contents.len(),
            "sending streamGenerateContent request"
        );

        let body = serde_json::to_vec(request)?;

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let send = self
            .client
            .post(url)
            .headers(self.default_headers())
            .body(body)
            .send();
        // Only the wait for headers is bounded; a long reply may stream for as
        // long as the model keeps producing it.
        let result = tokio::time::timeout(self.timeout, send).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                CLIENT_REQUEST_ERRORS.click();
                return Err(self.map_send_error(e));
            }
            Err(_) => {
                CLIENT_REQUEST_ERRORS.click();
                return Err(Error::timeout(
                    "No response headers from the API",
                    Some(self.timeout.as_secs_f64()),
                ));
            }
        };

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            tracing::warn!(error = %err, "streamGenerateContent rejected");
            return Err(err);
        }

        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

/// Parse a base URL, making sure relative joins keep its last path segment.
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::url(format!("{base_url} cannot be a base URL"), None));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Pull `(status, message)` out of a Google error body, falling back to the raw text.
fn parse_error_body(body: &str) -> (Option<String>, String) {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        status: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error);
    let status = detail.as_ref().and_then(|d| d.status.clone());
    let message = detail
        .and_then(|d| d.message)
        .unwrap_or_else(|| body.to_string());
    (status, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    fn key() -> ApiKey {
        ApiKey::new("test-key").unwrap()
    }

    #[test]
    fn client_creation() {
        let client = Gemini::new(&key()).unwrap();
        assert_eq!(client.base_url.as_str(), DEFAULT_API_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert!(client.api_key.is_sensitive());

        let client = Gemini::with_options(
            &key(),
            Some("https://proxy.example.com/gemini/v1beta"),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(
            client.base_url().as_str(),
            "https://proxy.example.com/gemini/v1beta/"
        );
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn stream_url_for_model() {
        let client = Gemini::new(&key()).unwrap();
        let url = client
            .stream_url(&Model::Known(KnownModel::Gemini25Flash))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn key_with_newline_fails_construction() {
        let key = ApiKey::new("abc\ndef").unwrap();
        let err = Gemini::new(&key).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn bad_base_url_fails_construction() {
        let err = Gemini::with_options(&key(), Some("not a url"), None).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn error_body_parsing() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            parse_error_body(body),
            (
                Some("INVALID_ARGUMENT".to_string()),
                "API key not valid.".to_string()
            )
        );
        assert_eq!(parse_error_body("gateway down"), (None, "gateway down".to_string()));
    }
}
