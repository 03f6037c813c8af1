//! Fetch error types and failure classification.

use farescout_core::FailureKind;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for adapter fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned an error status.
    #[error("Upstream returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The request deadline expired mid-flight.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Rate limited upstream, or the local bucket stayed empty past the
    /// deadline.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, when the upstream said so.
        retry_after: Option<u64>,
    },

    /// WAF block, CAPTCHA, or another classified bot challenge.
    #[error("Bot challenge: {0}")]
    BotChallenge(String),

    /// A previously valid token was rejected.
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// Credentials are missing or invalid.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The response root structure is not what the parser expects.
    ///
    /// Raised when a source changes shape; demotes the adapter and fires a
    /// structural-change alert.
    #[error("Unusable response: {0}")]
    Unusable(String),

    /// JSON deserialization error at the response root.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Browser automation error.
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// OAuth token error.
    #[error("OAuth error: {0}")]
    Oauth(#[from] OauthError),

    /// The request was cancelled by deadline or caller.
    #[error("Cancelled")]
    Cancelled,
}

impl FetchError {
    /// Classifies this error into the taxonomic [`FailureKind`].
    pub fn classify(&self) -> FailureKind {
        match self {
            Self::Http(err) => {
                if err.is_timeout() {
                    FailureKind::TransientNetwork
                } else if err.is_connect() || err.is_request() {
                    FailureKind::TransientNetwork
                } else {
                    FailureKind::ParseUnusable
                }
            }
            Self::Status { status } => match status {
                429 => FailureKind::RateLimited,
                401 => FailureKind::AuthExpired,
                403 => FailureKind::BotChallenge,
                500..=599 => FailureKind::TransientNetwork,
                _ => FailureKind::ParseUnusable,
            },
            Self::DeadlineExceeded | Self::Cancelled => FailureKind::Cancelled,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::BotChallenge(_) => FailureKind::BotChallenge,
            Self::AuthExpired(_) => FailureKind::AuthExpired,
            Self::AuthFailed(_) => FailureKind::AuthExpired,
            Self::Unusable(_) | Self::Json(_) => FailureKind::ParseUnusable,
            Self::Browser(err) => err.classify(),
            Self::Oauth(_) => FailureKind::AuthExpired,
        }
    }
}

// ============================================================================
// Browser Error
// ============================================================================

/// Error type for browser automation.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// No system browser binary was found.
    #[error("Browser binary not found: {0}")]
    BinaryNotFound(String),

    /// The browser process failed to launch.
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    /// All pool slots are leased and the wait timed out.
    #[error("Browser pool exhausted after {0:?}")]
    PoolExhausted(std::time::Duration),

    /// Navigation failed or timed out.
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// An expected page element never appeared.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Script evaluation inside the page failed.
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    /// The page redirected somewhere unexpected, usually a challenge page.
    #[error("Redirected to challenge page: {0}")]
    ChallengeRedirect(String),

    /// CDP-level error from the browser.
    #[error("CDP error: {0}")]
    Cdp(String),
}

impl BrowserError {
    /// Classifies browser failures into the taxonomic kind.
    pub fn classify(&self) -> FailureKind {
        match self {
            Self::ChallengeRedirect(_) => FailureKind::BotChallenge,
            Self::PoolExhausted(_) => FailureKind::RateLimited,
            Self::ElementNotFound(_) | Self::EvaluationFailed(_) => FailureKind::ParseUnusable,
            _ => FailureKind::TransientNetwork,
        }
    }
}

// ============================================================================
// OAuth Error
// ============================================================================

/// Error type for OAuth2 token operations.
#[derive(Debug, Error)]
pub enum OauthError {
    /// Client id/secret are not configured.
    #[error("OAuth credentials not configured for {0}")]
    NotConfigured(String),

    /// The token endpoint rejected the request.
    #[error("Token request rejected: HTTP {0}")]
    Rejected(u16),

    /// The token endpoint was unreachable.
    #[error("Token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token response was malformed.
    #[error("Malformed token response: {0}")]
    Malformed(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            FetchError::Status { status: 429 }.classify(),
            FailureKind::RateLimited
        );
        assert_eq!(
            FetchError::Status { status: 401 }.classify(),
            FailureKind::AuthExpired
        );
        assert_eq!(
            FetchError::Status { status: 403 }.classify(),
            FailureKind::BotChallenge
        );
        assert_eq!(
            FetchError::Status { status: 503 }.classify(),
            FailureKind::TransientNetwork
        );
    }

    #[test]
    fn test_cancellation_classification() {
        assert_eq!(FetchError::Cancelled.classify(), FailureKind::Cancelled);
        assert_eq!(
            FetchError::DeadlineExceeded.classify(),
            FailureKind::Cancelled
        );
    }

    #[test]
    fn test_browser_challenge_classification() {
        let err = FetchError::Browser(BrowserError::ChallengeRedirect("akamai".to_string()));
        assert_eq!(err.classify(), FailureKind::BotChallenge);
    }
}
