//! HTTP client for the upstream platform API.
//!
//! Every call carries the relay's identification header and the browser's
//! forwarded cookies. The body comes back as raw bytes; decoding is left to the
//! caller. Nothing here retries.

use axum::{
    body::Bytes,
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{error::RelayError, RelayConfig};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One outbound call, described relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    cookies: Option<HeaderValue>,
}

impl UpstreamRequest {
    #[must_use]
    pub fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(ToString::to_string).collect(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            cookies: None,
        }
    }

    #[must_use]
    pub fn get(segments: &[&str]) -> Self {
        Self::new(Method::GET, segments)
    }

    #[must_use]
    pub fn post(segments: &[&str]) -> Self {
        Self::new(Method::POST, segments)
    }

    #[must_use]
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach the browser's `Cookie` header, verbatim.
    #[must_use]
    pub fn with_cookies(mut self, cookies: Option<HeaderValue>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Serialize `body` as JSON and set the matching content type.
    ///
    /// # Errors
    /// Returns an error if the body cannot be serialized.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, RelayError> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// What came back from the upstream: status, headers and the undecoded body.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Every `Set-Cookie` header on the response, in order.
    pub fn set_cookies(&self) -> impl Iterator<Item = &HeaderValue> {
        self.headers.get_all(SET_COOKIE).iter()
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: Url,
}

impl UpstreamClient {
    /// Build the shared client from the relay configuration.
    ///
    /// # Errors
    /// Returns an error if the reqwest client cannot be built.
    pub fn new(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(config.user_agent())
            .connect_timeout(CONNECT_TIMEOUT.min(config.upstream_timeout()))
            .timeout(config.upstream_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.upstream_url().clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve path segments against the base URL. Each segment is
    /// percent-encoded, so a value such as a user id cannot add path levels.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot carry a path.
    pub fn endpoint(
        &self,
        segments: &[String],
        query: &[(String, String)],
    ) -> Result<Url, RelayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RelayError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send one request and read the whole body.
    ///
    /// # Errors
    /// Returns `RelayError::Transport` if the upstream cannot be reached or the
    /// body cannot be read.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, RelayError> {
        let url = self.endpoint(&request.segments, &request.query)?;
        debug!("upstream request: {} {}", request.method, url.path());

        let mut builder = self
            .http
            .request(request.method, url)
            .headers(request.headers);
        if let Some(cookies) = request.cookies {
            builder = builder.header(COOKIE, cookies);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(RelayError::Transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(RelayError::Transport)?;

        debug!("upstream response: {} ({} bytes)", status, body.len());

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
