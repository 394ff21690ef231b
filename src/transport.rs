use log::{debug, warn};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::{WtssError, format_http_error};
use crate::util::urljoin;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// One blocking GET round trip returning a JSON document.
///
/// Paths are relative to the service base URL. An empty response body is
/// returned as [`Value::Null`] so callers can tell "nothing there" apart from a
/// malformed document.
pub trait Transport {
    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, WtssError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, WtssError> {
        (**self).get_json(path, query)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, WtssError> {
        (**self).get_json(path, query)
    }
}

/// [`Transport`] over `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    access_token: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(cfg: &ServiceConfig) -> Result<Self, WtssError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("wtss-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("wtss-rs")),
        );

        let mut builder = HttpClient::builder().default_headers(default_headers);

        if !cfg.verify {
            warn!("TLS certificate verification is disabled for {}", cfg.url);
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|e| WtssError::Connection {
            url: cfg.url.clone(),
            source: e,
        })?;

        Ok(Self {
            url: cfg.url.clone(),
            access_token: cfg.access_token.clone(),
            timeout: DEFAULT_TIMEOUT,
            http,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn apply_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match self.access_token.as_deref() {
            Some(token) => req.header("x-api-key", token.trim()),
            None => req,
        }
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, WtssError> {
        let url = urljoin(&self.url, path);
        debug!("GET {} {:?}", url, query);

        let req = self.http.get(&url).query(query).timeout(self.timeout);
        let resp = self
            .apply_auth(req)
            .send()
            .map_err(|e| WtssError::Connection {
                url: url.clone(),
                source: e,
            })?;

        let status = resp.status();
        let text = resp.text().map_err(|e| WtssError::Connection {
            url: url.clone(),
            source: e,
        })?;

        if !status.is_success() {
            return Err(format_http_error(status, &url, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| WtssError::InvalidJson { url, source: e })
    }
}
