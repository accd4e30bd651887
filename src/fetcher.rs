//! Fetcher Module
//!
//! Performs the upstream JSON call behind a cache miss.

use std::fmt;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::cache::{Credentials, FetchResult, RequestOptions};
use crate::error::FetchError;

/// Default upstream timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// == Fetcher Trait ==
/// Source of upstream responses.
///
/// The returned future is `'static` so it can be shared between
/// deduplicated callers.
pub trait Fetcher: Send + Sync + fmt::Debug {
    fn fetch_remote(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> BoxFuture<'static, FetchResult>;
}

// == HTTP Fetcher ==
/// reqwest-backed fetcher against a base URL.
///
/// No cookies are kept between requests unless
/// [`with_cookie_store`](Self::with_cookie_store) is called. A jar holds one
/// user session, so a multi-client proxy leaves it off.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
    base_origin: Url,
    default_timeout: Duration,
    /// Sends no cookies
    client: Client,
    /// Keeps and sends cookies, when enabled
    cookie_client: Option<Client>,
}

impl HttpFetcher {
    // == Constructor ==
    pub fn new(base_url: &str, default_timeout: Duration) -> Result<Self, FetchError> {
        let base_origin = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidRequest(format!("base URL {}: {}", base_url, e)))?;

        let client = Client::builder()
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            base_origin,
            default_timeout,
            client,
            cookie_client: None,
        })
    }

    /// Enables a cookie jar for requests whose credentials allow cookies.
    pub fn with_cookie_store(mut self) -> Result<Self, FetchError> {
        let cookie_client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        self.cookie_client = Some(cookie_client);
        Ok(self)
    }

    /// Absolute endpoints are used as-is, others are appended to the base URL.
    fn resolve_url(&self, endpoint: &str) -> Result<Url, FetchError> {
        let raw = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        };

        Url::parse(&raw).map_err(|e| FetchError::InvalidRequest(format!("{}: {}", raw, e)))
    }

    fn client_for(&self, url: &Url, credentials: Credentials) -> &Client {
        let send_cookies = match credentials {
            Credentials::Omit => false,
            Credentials::Include => true,
            Credentials::SameOrigin => url.origin() == self.base_origin.origin(),
        };

        match &self.cookie_client {
            Some(cookie_client) if send_cookies => cookie_client,
            _ => &self.client,
        }
    }

    fn build_request(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<RequestBuilder, FetchError> {
        let url = self.resolve_url(endpoint)?;
        let method = Method::from_bytes(options.method().as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("method {}", options.method)))?;

        let mut request = self.client_for(&url, options.credentials).request(method, url);

        let has_content_type = options
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
        if !has_content_type {
            request = request.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidRequest(format!("header name {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::InvalidRequest(format!("header value for {}", name)))?;
            request = request.header(name, value);
        }

        if let Some(body) = &options.body {
            request = request.json(body);
        }

        Ok(request)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_remote(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> BoxFuture<'static, FetchResult> {
        let request = match self.build_request(endpoint, options) {
            Ok(request) => request,
            Err(err) => return future::ready(Err(err)).boxed(),
        };
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let endpoint = endpoint.to_string();

        async move {
            debug!("Fetching upstream: {}", endpoint);
            // Dropping the exchange on timeout aborts the in-flight call
            match tokio::time::timeout(timeout, exchange(request)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            }
        }
        .boxed()
    }
}

async fn exchange(request: RequestBuilder) -> FetchResult {
    let response = request
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
        });
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(Value::Null);
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| FetchError::Decode(e.to_string()))
}
