//! Core data structures shared across the publish workflow.
//!
//! These strongly-typed models provide a common vocabulary for credentials,
//! publishable content, and the structured results handed back across the
//! service boundary. Every entity here is created per request and dropped
//! together with the owning browser session.

pub mod content;
pub mod credentials;
pub mod result;

pub use content::{Platform, PublishContent, MAX_TAGS};
pub use credentials::{Cookie, Credentials, CredentialsError};
pub use result::{PublishResult, TrackMetrics, VerifyOutcome};
