//! Error types for duckchat.
//!
//! This module defines the error taxonomy shared by the session core and the
//! chat driver: handshake failures, rejected chat requests, malformed event
//! lines, torn streams, and the transport errors underneath them.

use std::error;
use std::fmt;
use std::sync::Arc;

/// The main error type for duckchat.
#[derive(Clone, Debug)]
pub enum Error {
    /// The status handshake failed or returned no session token.
    Authentication {
        /// Human-readable error message.
        message: String,
        /// HTTP status code, when the service answered at all.
        status_code: Option<u16>,
    },

    /// The chat endpoint rejected a request.
    Request {
        /// HTTP status code.
        status_code: u16,
        /// Response body text, or the status reason when the body was empty.
        message: String,
    },

    /// A single event line could not be decoded.
    Decode {
        /// Human-readable error message.
        message: String,
        /// The offending line.
        line: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Reading the response body failed mid-stream.
    StreamRead {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// API timeout error.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Invalid caller input, such as an unknown model alias.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },
}

impl Error {
    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Error::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new request error.
    pub fn request(status_code: u16, message: impl Into<String>) -> Self {
        Error::Request {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new decode error for a single event line.
    pub fn decode(
        message: impl Into<String>,
        line: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Decode {
            message: message.into(),
            line: line.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new stream read error.
    pub fn stream_read(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::StreamRead {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Returns true if this error came from the status handshake.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if the chat endpoint rejected the request.
    pub fn is_request(&self) -> bool {
        matches!(self, Error::Request { .. })
    }

    /// Returns true if this error is a malformed event line.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }

    /// Returns true if the response body failed mid-stream.
    pub fn is_stream_read(&self) -> bool {
        matches!(self, Error::StreamRead { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Request { status_code, .. } => Some(*status_code),
            Error::Authentication { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication {
                message,
                status_code,
            } => {
                if let Some(status_code) = status_code {
                    write!(f, "Authentication error: {message} (status {status_code})")
                } else {
                    write!(f, "Authentication error: {message}")
                }
            }
            Error::Request {
                status_code,
                message,
            } => {
                if message.is_empty() {
                    write!(f, "Request rejected with status {status_code}")
                } else {
                    write!(f, "Request rejected with status {status_code}: {message}")
                }
            }
            Error::Decode { message, line, .. } => {
                write!(f, "Decode error: {message} (line: {line:?})")
            }
            Error::StreamRead { message, .. } => {
                write!(f, "Stream read error: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Decode { source, .. }
            | Error::StreamRead { source, .. }
            | Error::Connection { source, .. }
            | Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for duckchat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_carries_status() {
        let err = Error::request(429, "slow down");
        assert!(err.is_request());
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(
            err.to_string(),
            "Request rejected with status 429: slow down"
        );
    }

    #[test]
    fn authentication_without_status() {
        let err = Error::authentication("no token in response", None);
        assert!(err.is_authentication());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "Authentication error: no token in response");
    }

    #[test]
    fn decode_error_exposes_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("not-json").unwrap_err();
        let err = Error::decode("invalid event payload", "data: not-json", Some(Box::new(json_err)));
        assert!(err.is_decode());
        assert!(error::Error::source(&err).is_some());
        assert!(err.to_string().contains("data: not-json"));
    }

    #[test]
    fn url_parse_conversion() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::Url { .. }));
        assert!(error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("URL error: "));
    }
}
