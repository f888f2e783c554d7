use std::env;
use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::observability::{
    CHAT_REQUEST_DURATION, CHAT_REQUEST_ERRORS, CHAT_REQUESTS, HANDSHAKE_ERRORS, HANDSHAKES,
};
use crate::stream::FragmentStream;
use crate::transcript::Message;

const DEFAULT_API_URL: &str = "https://duckduckgo.com/duckchat/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable overriding the default base URL.
pub const BASE_URL_ENV: &str = "DUCKCHAT_BASE_URL";

/// Header carrying the rotating session token, on requests and responses.
pub const VQD_HEADER: &str = "x-vqd-4";

/// Header acknowledging the service terms during the status handshake.
pub const VQD_ACCEPT_HEADER: &str = "x-vqd-accept";

const VQD_ACCEPT_VALUE: &str = "1";

/// The JSON body of a chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload<'a> {
    /// The model that should answer.
    pub model: Model,
    /// The full conversation so far, ending with the new user turn.
    pub messages: &'a [Message],
}

impl<'a> ChatPayload<'a> {
    /// Creates a payload for `model` over `messages`.
    pub fn new(model: Model, messages: &'a [Message]) -> Self {
        Self { model, messages }
    }
}

/// Client for the DuckDuckGo AI chat service.
#[derive(Debug, Clone)]
pub struct DuckChat {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl DuckChat {
    /// Create a new client.
    ///
    /// The base URL is read from the DUCKCHAT_BASE_URL environment variable
    /// when set, and defaults to the public service otherwise.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url
            .or_else(|| env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        // No total timeout on the client: chat responses stream for as long as
        // the model keeps talking.
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
            client,
            base_url,
            timeout,
        })
    }

    /// Create a client around a preconfigured reqwest client.
    ///
    /// Use this to control proxies, TLS or pooling; `timeout` still bounds
    /// the status handshake.
    pub fn with_client(client: ReqwestClient, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
            timeout,
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// The connect timeout, also applied to the whole status handshake.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform the status handshake and return the issued session token.
    pub async fn status(&self) -> Result<String> {
        HANDSHAKES.click();
        let url = self.base_url.join("status")?;
        debug!(%url, "requesting session token");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(VQD_ACCEPT_HEADER, VQD_ACCEPT_VALUE)
            .send()
            .await
            .map_err(|e| {
                HANDSHAKE_ERRORS.click();
                self.transport_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            HANDSHAKE_ERRORS.click();
            return Err(Error::authentication(
                format!(
                    "failed to initialize chat: {}",
                    status.canonical_reason().unwrap_or("unexpected status")
                ),
                Some(status.as_u16()),
            ));
        }

        match session_token(&response) {
            Some(token) => Ok(token),
            None => {
                HANDSHAKE_ERRORS.click();
                Err(Error::authentication(
                    format!("no {VQD_HEADER} header in status response"),
                    Some(status.as_u16()),
                ))
            }
        }
    }

    /// Send a chat request and return the decoded fragment stream.
    ///
    /// Returns as soon as the response headers arrive; the body is read
    /// lazily by the returned stream.
    pub async fn chat(&self, token: &str, payload: &ChatPayload<'_>) -> Result<FragmentStream> {
        CHAT_REQUESTS.click();
        let url = self.base_url.join("chat")?;
        debug!(
            %url,
            model = payload.model.identifier(),
            messages = payload.messages.len(),
            "sending chat request"
        );

        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .headers(self.chat_headers(token)?)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                CHAT_REQUEST_ERRORS.click();
                self.transport_error(e)
            })?;
        CHAT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CHAT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let token = session_token(&response);
        Ok(FragmentStream::new(response.bytes_stream(), token))
    }

    fn chat_headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let token = HeaderValue::from_str(token).map_err(|e| {
            Error::validation(
                format!("session token is not a valid header value: {e}"),
                Some(VQD_HEADER.to_string()),
            )
        })?;
        headers.insert(VQD_HEADER, token);
        Ok(headers)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
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

    /// Convert a rejected chat response into a request error.
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            body
        };
        Error::request(status.as_u16(), message)
    }
}

fn session_token(response: &Response) -> Option<String> {
    response
        .headers()
        .get(VQD_HEADER)
        .and_then(|val| val.to_str().ok())
        .filter(|val| !val.is_empty())
        .map(String::from)
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
