//! Resilient browser-automation core for multi-step publish workflows.
//!
//! The crate drives an external automated browser through the full publish
//! choreography of a content platform: authenticate, open the editor, fill
//! and verify each field, commit the publish, and confirm it actually
//! happened. Page interactions are assumed to fail transiently, so every
//! stage runs under a bounded retry budget and verifies its own effect
//! before the workflow moves forward.
//!
//! [`service::Publisher`] is the entry point; it executes plans from
//! [`workflow`] through any [`agent::BrowserAgent`] implementation. A
//! chromiumoxide-backed agent lives in [`adapter`], and tests substitute
//! scripted mocks.

pub mod adapter;
pub mod agent;
pub mod auth;
pub mod config;
pub mod logging;
pub mod retry;
pub mod scripts;
pub mod service;
pub mod tabs;
pub mod types;
pub mod verify;
pub mod workflow;

pub use agent::{AgentError, BrowserAgent, CookieParam};
pub use config::{ConfigError, CrosspostConfig, CrosspostConfigOverrides, Verbosity};
pub use service::Publisher;
pub use types::{
    Cookie, Credentials, CredentialsError, Platform, PublishContent, PublishResult, TrackMetrics,
    VerifyOutcome,
};
pub use workflow::{ActionOrchestrator, WorkflowError, WorkflowPlan, WorkflowState};
