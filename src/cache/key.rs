//! Cache Key Module
//!
//! Request options and the deterministic cache key derived from them.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Credentials ==
/// Cookie handling for the upstream request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    /// Never send cookies
    Omit,
    /// Send cookies only to the upstream base origin
    #[default]
    SameOrigin,
    /// Always send cookies
    Include,
}

// == Request Options ==
/// Options of a cached request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// HTTP method, case-insensitive
    pub method: String,
    /// JSON body
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    /// Overrides the fetcher's default timeout
    #[serde(skip)]
    pub timeout: Option<Duration>,
    pub credentials: Credentials,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            body: None,
            headers: BTreeMap::new(),
            timeout: None,
            credentials: Credentials::default(),
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: "POST".to_string(),
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Upper-cased method, `GET` when empty.
    pub fn method(&self) -> String {
        let method = self.method.trim();
        if method.is_empty() {
            "GET".to_string()
        } else {
            method.to_ascii_uppercase()
        }
    }
}

// == Make Key ==
/// Derives the cache key `METHOD:endpoint:body:headers`.
///
/// Timeout and credentials do not change the response and are left out.
/// Header names are lower-cased and sorted.
pub fn make_key(endpoint: &str, options: &RequestOptions) -> String {
    let body = options
        .body
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_default();

    let mut headers: Vec<String> = options
        .headers
        .iter()
        .map(|(name, value)| format!("{}={}", name.to_ascii_lowercase(), value))
        .collect();
    headers.sort();

    format!(
        "{}:{}:{}:{}",
        options.method(),
        endpoint,
        body,
        headers.join("&")
    )
}
