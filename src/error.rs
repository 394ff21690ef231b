use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Errors returned by the WTSS client.
#[derive(Debug, Error)]
pub enum WtssError {
    /// The server could not be reached, or the request timed out.
    #[error("could not connect to WTSS server ({url})")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("WTSS request failed: HTTP {status} for url ({url})\n{message}")]
    Http {
        status: StatusCode,
        url: String,
        message: String,
    },

    /// The response body is not a JSON document.
    #[error("response from {url} is not a JSON document")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("coverage not found: {0}")]
    NotFound(String),

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("{0}")]
    Config(String),
}

impl WtssError {
    /// True for failures that happened before a usable response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, WtssError::Connection { .. } | WtssError::Http { .. })
    }

    /// True when the server answered but the payload did not have the expected shape.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WtssError::Validation(_) | WtssError::InvalidJson { .. }
        )
    }

    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        WtssError::Argument(msg.into())
    }
}

/// First schema violation found in a response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// JSON-pointer-like location of the offending value (`""` for the document root).
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "invalid WTSS response: {}", self.message)
        } else {
            write!(f, "invalid WTSS response at {}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Error document sent by WTSS servers, e.g. `{"code": 404, "description": "..."}`.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ServerErrorResponse {
    #[serde(default)]
    pub(crate) code: Option<u16>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    // Some deployments answer {"message":...} or {"error":...} instead.
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

impl ServerErrorResponse {
    pub(crate) fn text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error.as_deref())
    }

    /// Recognizes an error document delivered with a 2xx status.
    pub(crate) fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let obj = payload.as_object()?;
        if !(obj.contains_key("code") || obj.contains_key("error")) {
            return None;
        }
        serde_json::from_value(payload.clone()).ok()
    }

    pub(crate) fn is_not_found(&self) -> bool {
        self.code == Some(404)
            || self
                .text()
                .is_some_and(|t| t.to_lowercase().contains("not found"))
    }
}

pub(crate) fn format_http_error(status: StatusCode, url: &str, body: &str) -> WtssError {
    let message = match serde_json::from_str::<ServerErrorResponse>(body) {
        Ok(e) if e.text().is_some() => e.text().unwrap_or_default().to_string(),
        _ => body.trim().to_string(),
    };

    let message = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        format!(
            "WTSS authentication/authorization failed.\n- Check that the access token is valid and not expired\n- Pass it with --access-token, WTSS_ACCESS_TOKEN or `access_token:` in .wtssrc\n\nServer message: {}",
            message
        )
    } else {
        message
    };

    WtssError::Http {
        status,
        url: url.to_string(),
        message,
    }
}
