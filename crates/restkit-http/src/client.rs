//! Request dispatch.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Request, Response};
use std::time::Duration;

use crate::request::headers::{CONTENT_TYPE_FORM, CONTENT_TYPE_JSON};
use crate::request::{encode_form, query_url, Method, RequestParams};

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("restkit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Build a configured HTTP client.
pub fn build_client(config: &DispatcherConfig) -> Result<Client, HttpError> {
    ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(HttpError::ClientBuild)
}

/// HTTP errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("failed to build request: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("{}", status_message(.code, .reason))]
    Status { code: u16, reason: String },
}

fn status_message(code: &u16, reason: &str) -> String {
    if reason.is_empty() {
        code.to_string()
    } else {
        format!("{} {}", code, reason)
    }
}

impl HttpError {
    /// Status code carried by a [`HttpError::Status`].
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout(e)
        } else if e.is_builder() {
            HttpError::Build(e)
        } else {
            HttpError::Request(e)
        }
    }
}

/// Turns [`RequestParams`] into HTTP calls.
///
/// Every call to [`Dispatcher::send`] performs exactly one request. There
/// are no retries.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    inner: Client,
}

impl Dispatcher {
    /// Create a dispatcher with default config.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher with custom config.
    pub fn with_config(config: DispatcherConfig) -> Result<Self, HttpError> {
        let inner = build_client(&config)?;
        Ok(Self { inner })
    }

    /// Get the inner reqwest client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Build the wire request for `params` without sending it.
    pub fn build(&self, params: &RequestParams) -> Result<Request, HttpError> {
        let mut headers = HeaderMap::new();

        let (url, body) = match params.method {
            Method::Get | Method::Delete => {
                params.populate_headers(&mut headers)?;
                (query_url(&params.endpoint, &params.params), None)
            }
            Method::Post | Method::Put => {
                let body = encode_form(&params.params);
                headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
                // Caller headers replace the form default instead of merging with it.
                if params.headers.is_empty() {
                    headers.insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static(CONTENT_TYPE_FORM),
                    );
                }
                params.populate_headers(&mut headers)?;
                (params.endpoint.clone(), Some(body))
            }
            Method::JsonPost => {
                let body = params.json_payload().to_string();
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(CONTENT_TYPE_JSON),
                );
                headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
                params.populate_headers(&mut headers)?;
                (params.endpoint.clone(), Some(body))
            }
        };

        let mut builder = self
            .inner
            .request(params.method.wire_method(), &url)
            .headers(headers)
            .timeout(params.effective_timeout());
        if let Some(body) = body {
            builder = builder.body(body);
        }

        builder.build().map_err(HttpError::Build)
    }

    /// Send the request described by `params`.
    pub async fn send(&self, params: &RequestParams) -> Result<Response, HttpError> {
        let request = self.build(params)?;
        let url = request.url().clone();

        tracing::debug!("Making {} request to: {}", params.method, url);
        let response = self.inner.execute(request).await.map_err(HttpError::from)?;
        tracing::debug!("{} response: {} {}", params.method, response.status(), url);

        Ok(response)
    }
}

/// Send `params` with a default [`Dispatcher`].
pub async fn curl(params: &RequestParams) -> Result<Response, HttpError> {
    Dispatcher::new()?.send(params).await
}
