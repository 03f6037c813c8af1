//! HTTP client with browser impersonation profiles.
//!
//! Several sources sit behind WAFs that fingerprint clients. Adapters
//! request a profile per call; the profile controls the User-Agent,
//! client-hint headers, and pre-seeded consent cookies. Impersonation is
//! applied at the header layer of the shared client.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, USER_AGENT};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::FetchError;

/// Default request timeout when no deadline clamp applies.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Impersonate Profile
// ============================================================================

/// A browser build (or crawler identity) the client impersonates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpersonateProfile {
    /// Chrome 126 on macOS.
    Chrome126,
    /// Chrome 131 on macOS.
    Chrome131,
    /// Search-engine crawler identity; some WAFs allowlist it.
    SearchCrawler,
}

impl ImpersonateProfile {
    /// User-Agent string for this profile.
    pub fn user_agent(&self) -> &'static str {
        match self {
            Self::Chrome126 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
            }
            Self::Chrome131 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
            }
            Self::SearchCrawler => "Yeti/1.1 (NHN Corp.; https://help.naver.com/robots/)",
        }
    }

    /// Full header set for this profile.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(self.user_agent()));
        match self {
            Self::Chrome126 | Self::Chrome131 => {
                headers.insert(
                    HeaderName::from_static("accept-language"),
                    HeaderValue::from_static("en-US,en;q=0.9"),
                );
                headers.insert(
                    HeaderName::from_static("sec-ch-ua-platform"),
                    HeaderValue::from_static("\"macOS\""),
                );
                headers.insert(
                    HeaderName::from_static("sec-fetch-mode"),
                    HeaderValue::from_static("navigate"),
                );
            }
            Self::SearchCrawler => {
                headers.insert(
                    HeaderName::from_static("accept"),
                    HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
                );
            }
        }
        headers
    }
}

impl fmt::Display for ImpersonateProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Chrome126 => "chrome_126",
            Self::Chrome131 => "chrome_131",
            Self::SearchCrawler => "search_crawler",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Request Shape
// ============================================================================

/// Per-request options layered on top of the shared client.
#[derive(Debug, Default, Clone)]
pub struct RequestShape {
    /// Impersonation profile, if any.
    pub profile: Option<ImpersonateProfile>,
    /// Extra headers for this request.
    pub headers: HeaderMap,
    /// Cookie header value (consent cookies, harvested sessions).
    pub cookies: Option<String>,
    /// Proxy URL for this request, when a proxy lease is active.
    pub proxy: Option<String>,
    /// Timeout override; normally the deadline clamp.
    pub timeout: Option<Duration>,
}

impl RequestShape {
    /// A bare shape with no impersonation.
    pub fn plain() -> Self {
        Self::default()
    }

    /// A shape using the given impersonation profile.
    pub fn impersonating(profile: ImpersonateProfile) -> Self {
        Self {
            profile: Some(profile),
            ..Self::default()
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the cookie header.
    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Routes the request through a proxy.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// Shared HTTP client for all adapters.
///
/// One connection pool per process, owned by the context the executor
/// injects. Per-request impersonation and proxying are layered on via
/// [`RequestShape`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a client with the default timeout.
    ///
    /// # Panics
    ///
    /// Panics when the TLS backend cannot be initialised; nothing in this
    /// process can do network I/O in that case.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom default timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .unwrap_or_else(|e| panic!("Failed to create HTTP client: {e}"));
        Self { inner: client }
    }

    /// The client to issue this request on.
    ///
    /// reqwest binds proxies at build time, so proxied requests get a
    /// short-lived client; everything else shares the pooled one.
    fn client_for(&self, shape: &RequestShape) -> Result<Client, FetchError> {
        match &shape.proxy {
            None => Ok(self.inner.clone()),
            Some(proxy_url) => {
                let proxy = reqwest::Proxy::all(proxy_url)?;
                let client = Client::builder()
                    .timeout(
                        shape
                            .timeout
                            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
                    )
                    .gzip(true)
                    .proxy(proxy)
                    .build()?;
                Ok(client)
            }
        }
    }

    fn apply_shape(
        &self,
        mut req: reqwest::RequestBuilder,
        shape: &RequestShape,
    ) -> reqwest::RequestBuilder {
        if let Some(profile) = shape.profile {
            req = req.headers(profile.headers());
        }
        if !shape.headers.is_empty() {
            req = req.headers(shape.headers.clone());
        }
        if let Some(cookies) = &shape.cookies {
            if let Ok(value) = HeaderValue::from_str(cookies) {
                req = req.header(COOKIE, value);
            }
        }
        if let Some(timeout) = shape.timeout {
            req = req.timeout(timeout);
        }
        req
    }

    /// Performs a GET request with query parameters.
    #[tracing::instrument(skip(self, shape, params), fields(url = %url))]
    pub async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        shape: &RequestShape,
    ) -> Result<Response, FetchError> {
        let client = self.client_for(shape)?;
        let req = self.apply_shape(client.get(url).query(params), shape);
        let response = req.send().await?;
        tracing::debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a POST request with a JSON body.
    #[tracing::instrument(skip(self, body, shape), fields(url = %url))]
    pub async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        shape: &RequestShape,
    ) -> Result<Response, FetchError> {
        let client = self.client_for(shape)?;
        let req = self.apply_shape(client.post(url).json(body), shape);
        let response = req.send().await?;
        tracing::debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a POST request with form data.
    #[tracing::instrument(skip(self, form, shape), fields(url = %url))]
    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
        shape: &RequestShape,
    ) -> Result<Response, FetchError> {
        let client = self.client_for(shape)?;
        let req = self.apply_shape(client.post(url).form(form), shape);
        let response = req.send().await?;
        tracing::debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for response handling.
pub trait ResponseExt: Sized {
    /// Converts error statuses into the matching [`FetchError`].
    fn check_status(self) -> Result<Self, FetchError>;

    /// The Retry-After header value in seconds.
    fn retry_after_secs(&self) -> Option<u64>;
}

impl ResponseExt for Response {
    fn check_status(self) -> Result<Self, FetchError> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                retry_after: self.retry_after_secs(),
            });
        }
        Err(FetchError::Status {
            status: status.as_u16(),
        })
    }

    fn retry_after_secs(&self) -> Option<u64> {
        self.headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_user_agents_differ() {
        assert_ne!(
            ImpersonateProfile::Chrome126.user_agent(),
            ImpersonateProfile::Chrome131.user_agent()
        );
        assert!(ImpersonateProfile::SearchCrawler
            .user_agent()
            .starts_with("Yeti"));
    }

    #[test]
    fn test_profile_headers_include_user_agent() {
        let headers = ImpersonateProfile::Chrome131.headers();
        assert!(headers.contains_key(USER_AGENT));
    }

    #[test]
    fn test_request_shape_builder() {
        let shape = RequestShape::impersonating(ImpersonateProfile::Chrome126)
            .with_cookies("CONSENT=YES+")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(shape.profile, Some(ImpersonateProfile::Chrome126));
        assert_eq!(shape.cookies.as_deref(), Some("CONSENT=YES+"));
        assert_eq!(shape.timeout, Some(Duration::from_secs(3)));
    }
}
