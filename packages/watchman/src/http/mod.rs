//! HTTP fetch client shared by every source.
//!
//! Sources never talk to `reqwest` directly: they build a [`FetchRequest`] and
//! hand it to an [`HttpFetcher`]. Production uses [`ReqwestFetcher`]; tests use
//! [`crate::testing::MockFetcher`].

pub mod reqwest_fetcher;
pub mod retry;

pub use reqwest_fetcher::ReqwestFetcher;
pub use retry::{fetch_with_retry, Exhausted, RetryPolicy};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;

use crate::error::Result;
use crate::security::SecretString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound HTTP call.
///
/// Secret material (bearer headers, API keys, basic-auth passwords, form
/// values) is redacted from `Debug` output.
#[derive(Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub secret_headers: Vec<(String, SecretString)>,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub basic_auth: Option<(String, SecretString)>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            secret_headers: Vec::new(),
            query: Vec::new(),
            form: Vec::new(),
            basic_auth: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn secret_header(mut self, name: impl Into<String>, value: SecretString) -> Self {
        self.secret_headers.push((name.into(), value));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.basic_auth = Some((username.into(), password));
        self
    }

    /// Look up the first query parameter with this key.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret_names: Vec<&str> = self.secret_headers.iter().map(|(k, _)| k.as_str()).collect();
        let form_keys: Vec<&str> = self.form.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("FetchRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("secret_headers", &secret_names)
            .field("query", &self.query)
            .field("form", &form_keys)
            .field("basic_auth", &self.basic_auth.as_ref().map(|(user, _)| user))
            .finish()
    }
}

/// Status and raw body of one HTTP call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    /// Only 200 counts as success; every other status is retried.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Issues HTTP calls. Implementations must not retry on their own.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let request = FetchRequest::post("https://www.reddit.com/api/v1/access_token")
            .basic_auth("script-id", SecretString::new("script-secret"))
            .secret_header("Authorization", SecretString::new("bearer abc123"))
            .form("password", "hunter2");

        let debug = format!("{:?}", request);
        assert!(debug.contains("script-id"));
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("script-secret"));
        assert!(!debug.contains("abc123"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_query_opt_skips_none() {
        let request = FetchRequest::get("https://example.com")
            .query("limit", 100)
            .query_opt("after", None::<String>);

        assert_eq!(request.query_value("limit"), Some("100"));
        assert_eq!(request.query_value("after"), None);
    }

    #[test]
    fn test_only_200_is_success() {
        assert!(FetchResponse::ok("{}").is_success());
        assert!(!FetchResponse::new(204, "").is_success());
        assert!(!FetchResponse::new(429, "slow down").is_success());
    }
}
