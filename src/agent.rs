//! BrowserAgent capability contract.
//!
//! The workflow core never talks to a concrete browser driver; every stage
//! acts through this trait. The default implementation is the chromiumoxide
//! adapter in [`crate::adapter`], and tests substitute scripted mocks.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::types::Cookie;

/// Errors surfaced by [`BrowserAgent`] operations.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("navigation to '{url}' failed: {message}")]
    Navigation { url: String, message: String },
    #[error("script execution failed: {0}")]
    Script(String),
    #[error("cookie injection failed: {0}")]
    Cookie(String),
    #[error("window handle '{0}' not found")]
    WindowNotFound(String),
    #[error("screenshot capture failed: {0}")]
    Screenshot(String),
    #[error("browser session is not initialized")]
    NotInitialized,
    #[error("browser agent error: {0}")]
    Message(String),
}

/// A normalized cookie ready for injection into the browser.
///
/// Produced by the authenticator after domain normalization so agent
/// implementations never re-apply normalization rules.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieParam {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub expiration: Option<f64>,
}

impl CookieParam {
    pub fn from_cookie(cookie: &Cookie, canonical_domain: &str) -> Self {
        CookieParam {
            name: cookie.name.trim().to_string(),
            value: cookie.value.trim().to_string(),
            domain: cookie.normalized_domain(canonical_domain),
            path: cookie.normalized_path(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            expiration: cookie.expiration,
        }
    }
}

/// Capability contract of the external automated browser.
#[async_trait]
pub trait BrowserAgent: Send + Sync {
    /// Load a URL. Implementations must tolerate slow-loading pages by
    /// treating a load timeout as non-fatal when the current domain already
    /// matches the target.
    async fn navigate(&self, url: &str) -> Result<(), AgentError>;

    /// Whether an element matching the selector currently exists.
    async fn locate(&self, selector: &str) -> Result<bool, AgentError>;

    /// Execute a script in page context and return its JSON result.
    async fn run_script(&self, script: &str, args: &[JsonValue]) -> Result<JsonValue, AgentError>;

    async fn add_cookie(&self, cookie: &CookieParam) -> Result<(), AgentError>;

    async fn refresh(&self) -> Result<(), AgentError>;

    async fn current_url(&self) -> Result<String, AgentError>;

    /// All open window handles, in creation order.
    async fn window_handles(&self) -> Result<Vec<String>, AgentError>;

    /// Switch the browsing context exclusively to the given handle; every
    /// subsequent read must use the new handle's context.
    async fn switch_to_window(&self, handle: &str) -> Result<(), AgentError>;

    async fn screenshot(&self) -> Result<Vec<u8>, AgentError>;

    /// Tear down the session. Called unconditionally on every exit path.
    async fn close(&self) -> Result<(), AgentError>;
}
