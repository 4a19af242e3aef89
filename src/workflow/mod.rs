//! Multi-step publish workflows.
//!
//! A [`WorkflowPlan`] is the static description of one platform's publish
//! choreography: where the editor lives, how each field is located, which
//! buttons move the flow forward, and how the platform signals a confirmed
//! publish. The [`orchestrator`] executes a plan through a
//! [`BrowserAgent`](crate::agent::BrowserAgent); [`stage`] holds the shared
//! per-stage executor. Platform plans live in [`medium`] and [`substack`].

pub mod medium;
pub mod orchestrator;
pub mod stage;
pub mod substack;

use std::fmt;

use thiserror::Error;

use crate::agent::AgentError;
use crate::auth::{AuthError, SiteProfile};
use crate::retry::RetryFailure;
use crate::tabs::TabError;
use crate::types::Platform;
use crate::verify::FieldClass;

pub use orchestrator::ActionOrchestrator;

/// Terminal workflow failures. Each variant maps to a stable classification
/// name carried in [`PublishResult::error`](crate::types::PublishResult).
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("content is incomplete: title and body are required")]
    IncompleteContent,
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),
    #[error("editor surface never became ready")]
    EditorNotFound,
    #[error("field '{field}' could not be verified after filling")]
    FieldVerificationFailed { field: &'static str },
    #[error("publish control '{name}' never became available")]
    SubmitUnavailable { name: &'static str },
    #[error("publish was submitted but never confirmed")]
    PublishNotConfirmed,
    #[error("no new tab appeared to confirm the publish")]
    NoNewTab,
    #[error("session budget exhausted before the workflow finished")]
    SessionTimeout,
    #[error(transparent)]
    StageExhausted(#[from] RetryFailure),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl From<TabError> for WorkflowError {
    fn from(err: TabError) -> Self {
        match err {
            TabError::NoNewTab => WorkflowError::NoNewTab,
            TabError::Agent(inner) => WorkflowError::Agent(inner),
        }
    }
}

impl WorkflowError {
    /// Stable classification name reported across the service boundary.
    pub fn classification(&self) -> &'static str {
        match self {
            WorkflowError::IncompleteContent => "IncompleteContentError",
            WorkflowError::Authentication(_) => "AuthenticationError",
            WorkflowError::EditorNotFound => "EditorNotFoundError",
            WorkflowError::FieldVerificationFailed { .. } => "FieldVerificationFailed",
            WorkflowError::SubmitUnavailable { .. } => "SubmitUnavailableError",
            WorkflowError::PublishNotConfirmed => "PublishNotConfirmedError",
            WorkflowError::NoNewTab => "NoNewTabError",
            WorkflowError::SessionTimeout => "SessionTimeoutError",
            WorkflowError::StageExhausted(_) => "RetryExhausted",
            WorkflowError::Agent(AgentError::NotInitialized) => "BrowserInitializationError",
            WorkflowError::Agent(_) => "BrowserAgentError",
        }
    }
}

/// Forward-only progress marker for one publish run. Transitions are strictly
/// monotone; a run that fails stays failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowState {
    Idle,
    Authenticating,
    Navigating,
    LocatingEditor,
    FillingTitle,
    FillingBody,
    VerifyingContent,
    AttachingMedia,
    AwaitingSubmit,
    Submitting,
    ConfirmingPublish,
    Published,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Authenticating => "authenticating",
            WorkflowState::Navigating => "navigating",
            WorkflowState::LocatingEditor => "locating-editor",
            WorkflowState::FillingTitle => "filling-title",
            WorkflowState::FillingBody => "filling-body",
            WorkflowState::VerifyingContent => "verifying-content",
            WorkflowState::AttachingMedia => "attaching-media",
            WorkflowState::AwaitingSubmit => "awaiting-submit",
            WorkflowState::Submitting => "submitting",
            WorkflowState::ConfirmingPublish => "confirming-publish",
            WorkflowState::Published => "published",
            WorkflowState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How a field is located on the page. Strategies are tried in declaration
/// order within every retry attempt; the first one whose write verifies wins.
#[derive(Debug, Clone, Copy)]
pub enum LocatorStrategy {
    /// Exact structural selector.
    Css(&'static str),
    /// Attribute-keyword scan across editable candidates.
    Heuristic(&'static [&'static str]),
    /// Nth visible editable region, last resort.
    BroadScan(usize),
}

/// One text field the workflow must fill and verify.
#[derive(Debug, Clone, Copy)]
pub struct FieldTarget {
    pub name: &'static str,
    pub class: FieldClass,
    pub strategies: &'static [LocatorStrategy],
}

/// One button the workflow must click, with its disambiguation rules.
#[derive(Debug, Clone, Copy)]
pub struct ButtonTarget {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    /// Candidates whose text contains any of these never qualify.
    pub disqualifiers: &'static [&'static str],
    /// Structural scope the candidate must live inside.
    pub scope: &'static str,
}

/// Token input accepting the post's tags, when the platform has one.
#[derive(Debug, Clone, Copy)]
pub struct TagTarget {
    pub selector: &'static str,
}

/// How the platform signals that a publish actually happened.
#[derive(Debug, Clone, Copy)]
pub enum ConfirmationMode {
    /// The live post opens in a fresh tab; its URL is the confirmation.
    NewTab,
    /// The current tab's URL sheds a draft marker once the post is live.
    InPlace { draft_marker: &'static str },
}

/// Static description of one platform's publish choreography.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowPlan {
    pub platform: Platform,
    pub site: SiteProfile,
    pub editor_url: &'static str,
    /// Any of these marks the editor surface as ready.
    pub editor_selectors: &'static [&'static str],
    pub title: FieldTarget,
    pub body: FieldTarget,
    /// Body surface selector used for media attachment.
    pub body_surface: &'static str,
    /// Opens the publish dialog or flow.
    pub trigger: ButtonTarget,
    /// Tag input inside the publish dialog, when the platform supports tags.
    pub tags: Option<TagTarget>,
    /// Commits the publish.
    pub confirm: ButtonTarget,
    pub confirmation: ConfirmationMode,
}

/// Resolve the plan for a platform.
pub fn plan_for(platform: Platform) -> WorkflowPlan {
    match platform {
        Platform::Medium => medium::plan(),
        Platform::Substack => substack::plan(),
    }
}
