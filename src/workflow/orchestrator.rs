//! Workflow execution engine.
//!
//! Drives one [`WorkflowPlan`] through a [`BrowserAgent`] as a forward-only
//! state machine. Errors never escape [`ActionOrchestrator::publish`]: every
//! failure is folded into a [`PublishResult`] carrying its classification
//! name and, when enabled, a best-effort screenshot of the page at the point
//! of failure.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::BrowserAgent;
use crate::auth::SessionAuthenticator;
use crate::config::CrosspostConfig;
use crate::logging::{LogLevel, WorkflowLogger};
use crate::retry::{pacing_pause, RetryOptions, RetryPoller};
use crate::scripts;
use crate::tabs::{TabHandleSet, TabManager};
use crate::types::{Credentials, PublishContent, PublishResult};
use crate::workflow::stage::StageRunner;
use crate::workflow::{ConfirmationMode, WorkflowError, WorkflowPlan, WorkflowState};

/// Executes publish workflows.
pub struct ActionOrchestrator {
    config: CrosspostConfig,
    logger: Arc<WorkflowLogger>,
    runner: StageRunner,
    authenticator: SessionAuthenticator,
    tabs: TabManager,
}

impl ActionOrchestrator {
    pub fn new(config: CrosspostConfig, logger: Arc<WorkflowLogger>) -> Self {
        let runner = StageRunner::new(config.clone(), Arc::clone(&logger));
        let authenticator = SessionAuthenticator::new(config.clone(), Arc::clone(&logger));
        let tabs = TabManager::new(RetryPoller::new(Arc::clone(&logger)));
        Self {
            config,
            logger,
            runner,
            authenticator,
            tabs,
        }
    }

    pub fn authenticator(&self) -> &SessionAuthenticator {
        &self.authenticator
    }

    /// Run the full publish flow. Never returns an error; failures are
    /// folded into the result.
    pub async fn publish(
        &self,
        agent: &dyn BrowserAgent,
        plan: &WorkflowPlan,
        credentials: &Credentials,
        content: &PublishContent,
    ) -> PublishResult {
        let mut state = WorkflowState::Idle;

        match self
            .run_publish(agent, plan, credentials, content, &mut state)
            .await
        {
            Ok((url, post_id)) => {
                self.advance(&mut state, WorkflowState::Published);
                self.logger.info(
                    format!("published to {} at {url}", plan.platform.label()),
                    Some("workflow"),
                    None,
                );
                PublishResult::published(url, post_id)
            }
            Err(err) => {
                let failed_in = state;
                self.advance(&mut state, WorkflowState::Failed);
                self.logger.error(
                    format!(
                        "publish on {} failed during {failed_in}: {err}",
                        plan.platform.label()
                    ),
                    Some("workflow"),
                    None,
                );
                let screenshot = self.capture_failure_screenshot(agent).await;
                PublishResult::failed(err.classification(), screenshot)
            }
        }
    }

    async fn run_publish(
        &self,
        agent: &dyn BrowserAgent,
        plan: &WorkflowPlan,
        credentials: &Credentials,
        content: &PublishContent,
        state: &mut WorkflowState,
    ) -> Result<(String, Option<String>), WorkflowError> {
        if !content.is_complete() {
            return Err(WorkflowError::IncompleteContent);
        }

        self.advance(state, WorkflowState::Authenticating);
        self.authenticator
            .authenticate(agent, &plan.site, credentials)
            .await?;

        self.advance(state, WorkflowState::Navigating);
        agent.navigate(plan.editor_url).await?;
        pacing_pause(&self.config).await;

        self.advance(state, WorkflowState::LocatingEditor);
        self.runner
            .wait_truthy(
                agent,
                "editor-ready",
                &scripts::editor_present(plan.editor_selectors),
            )
            .await
            .map_err(|_| WorkflowError::EditorNotFound)?;

        self.advance(state, WorkflowState::FillingTitle);
        self.runner
            .fill_field(agent, &plan.title, &content.title)
            .await
            .map_err(|_| WorkflowError::FieldVerificationFailed { field: "title" })?;
        pacing_pause(&self.config).await;

        self.advance(state, WorkflowState::FillingBody);
        self.runner
            .fill_field(agent, &plan.body, &content.body)
            .await
            .map_err(|_| WorkflowError::FieldVerificationFailed { field: "body" })?;
        pacing_pause(&self.config).await;

        self.advance(state, WorkflowState::VerifyingContent);
        self.runner
            .verify_content(agent, &content.title, &content.body)
            .await
            .map_err(|_| WorkflowError::FieldVerificationFailed { field: "content" })?;

        self.advance(state, WorkflowState::AttachingMedia);
        self.attach_media(agent, plan, content).await?;

        self.advance(state, WorkflowState::AwaitingSubmit);
        self.runner
            .wait_truthy(
                agent,
                "submit-enabled",
                &scripts::button_ready(
                    plan.trigger.keywords,
                    plan.trigger.disqualifiers,
                    plan.trigger.scope,
                ),
            )
            .await
            .map_err(|_| WorkflowError::SubmitUnavailable {
                name: plan.trigger.name,
            })?;

        self.advance(state, WorkflowState::Submitting);
        self.runner
            .click_button(agent, &plan.trigger)
            .await
            .map_err(|_| WorkflowError::SubmitUnavailable {
                name: plan.trigger.name,
            })?;
        pacing_pause(&self.config).await;
        self.apply_tags(agent, plan, content).await?;

        self.advance(state, WorkflowState::ConfirmingPublish);
        match plan.confirmation {
            ConfirmationMode::NewTab => self.confirm_in_new_tab(agent, plan).await,
            ConfirmationMode::InPlace { draft_marker } => {
                self.confirm_in_place(agent, plan, draft_marker).await
            }
        }
    }

    /// Media attachment is dressing: a miss is logged and tolerated.
    async fn attach_media(
        &self,
        agent: &dyn BrowserAgent,
        plan: &WorkflowPlan,
        content: &PublishContent,
    ) -> Result<(), WorkflowError> {
        let Some(url) = content.media_url() else {
            return Ok(());
        };
        let script = scripts::attach_media(url, plan.body_surface);
        let attached = agent.run_script(&script, &[]).await?;
        if attached != serde_json::Value::Bool(true) {
            self.logger.info(
                "media attachment did not land; continuing without it",
                Some("workflow"),
                None,
            );
        }
        Ok(())
    }

    /// Tags are likewise optional dressing; a tag that never commits is
    /// logged and skipped rather than failing the publish.
    async fn apply_tags(
        &self,
        agent: &dyn BrowserAgent,
        plan: &WorkflowPlan,
        content: &PublishContent,
    ) -> Result<(), WorkflowError> {
        let Some(target) = &plan.tags else {
            return Ok(());
        };
        for tag in content.capped_tags() {
            let script = scripts::add_tag(target.selector, tag);
            match self
                .runner
                .wait_truthy(agent, "apply-tag", &script)
                .await
            {
                Ok(()) => pacing_pause(&self.config).await,
                Err(_) => {
                    self.logger.info(
                        format!("tag '{tag}' could not be applied; skipping"),
                        Some("workflow"),
                        None,
                    );
                }
            }
        }
        Ok(())
    }

    /// New-tab confirmation: snapshot handles, commit, require a fresh tab,
    /// then validate its address as a real post URL.
    async fn confirm_in_new_tab(
        &self,
        agent: &dyn BrowserAgent,
        plan: &WorkflowPlan,
    ) -> Result<(String, Option<String>), WorkflowError> {
        let before = TabHandleSet::capture(agent).await?;

        self.runner
            .click_button(agent, &plan.confirm)
            .await
            .map_err(|_| WorkflowError::SubmitUnavailable {
                name: plan.confirm.name,
            })?;

        let handle = self
            .tabs
            .await_new_tab(
                agent,
                &before,
                Duration::from_millis(self.config.confirm_timeout_ms),
                Duration::from_millis(self.config.stage_interval_ms),
                self.config.stage_max_retries,
            )
            .await?;
        self.logger.debug(
            format!("confirmation tab {handle} opened"),
            Some("workflow"),
            None,
        );

        let url = self
            .runner
            .wait_for_url(agent, &self.confirm_options(), is_post_url)
            .await
            .map_err(|_| WorkflowError::PublishNotConfirmed)?;

        Ok((url.clone(), post_id_from_url(&url)))
    }

    /// In-place confirmation: poll the current tab's address until the draft
    /// marker disappears. Midway through the budget the flow re-navigates
    /// once to the non-edit form of the address, since some editors only
    /// swap the URL on a fresh load of the published resource.
    async fn confirm_in_place(
        &self,
        agent: &dyn BrowserAgent,
        plan: &WorkflowPlan,
        draft_marker: &str,
    ) -> Result<(String, Option<String>), WorkflowError> {
        self.runner
            .click_button(agent, &plan.confirm)
            .await
            .map_err(|_| WorkflowError::SubmitUnavailable {
                name: plan.confirm.name,
            })?;

        let half = RetryOptions::new(
            "confirm-url",
            Duration::from_millis(self.config.confirm_timeout_ms / 2),
            Duration::from_millis(self.config.stage_interval_ms),
            self.config.stage_max_retries,
        );
        let predicate = |url: &str| !url.contains(draft_marker) && is_post_url(url);

        let url = match self.runner.wait_for_url(agent, &half, predicate).await {
            Ok(url) => url,
            Err(_) => {
                let current = agent.current_url().await?;
                let target = current.replacen(draft_marker, "", 1);
                self.logger.debug(
                    format!("address still carries the draft marker; renavigating to {target}"),
                    Some("workflow"),
                    None,
                );
                agent.navigate(&target).await?;
                self.runner
                    .wait_for_url(agent, &half, predicate)
                    .await
                    .map_err(|_| WorkflowError::PublishNotConfirmed)?
            }
        };

        Ok((url.clone(), post_id_from_url(&url)))
    }

    fn confirm_options(&self) -> RetryOptions {
        RetryOptions::new(
            "confirm-url",
            Duration::from_millis(self.config.confirm_timeout_ms),
            Duration::from_millis(self.config.stage_interval_ms),
            self.config.stage_max_retries,
        )
    }

    async fn capture_failure_screenshot(&self, agent: &dyn BrowserAgent) -> Option<Vec<u8>> {
        if !self.config.screenshot_on_failure {
            return None;
        }
        match agent.screenshot().await {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(err) => {
                // Diagnostics must never mask the original failure.
                self.logger.debug(
                    format!("failure screenshot unavailable: {err}"),
                    Some("workflow"),
                    None,
                );
                None
            }
        }
    }

    fn advance(&self, state: &mut WorkflowState, next: WorkflowState) {
        self.logger.log(
            format!("workflow {state} -> {next}"),
            LogLevel::Debug,
            Some("workflow"),
            None,
        );
        *state = next;
    }
}

fn path_segments(url: &str) -> impl Iterator<Item = &str> {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    rest.split('/').skip(1).filter(|segment| !segment.is_empty())
}

/// Whether an address plausibly points at a published post rather than a
/// homepage or a profile root. Requires at least two path segments, e.g.
/// `/@user/my-story-3f1a` or `/p/my-post`.
pub fn is_post_url(url: &str) -> bool {
    path_segments(url).count() >= 2
}

/// Platform-specific post identifier: the last non-empty path segment.
/// Absence is tolerated by callers.
pub fn post_id_from_url(url: &str) -> Option<String> {
    path_segments(url).last().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homepage_and_profile_urls_are_not_posts() {
        assert!(!is_post_url("https://medium.com"));
        assert!(!is_post_url("https://medium.com/"));
        assert!(!is_post_url("https://medium.com/@user"));
        assert!(!is_post_url("https://medium.com/@user/"));
    }

    #[test]
    fn post_urls_are_recognised() {
        assert!(is_post_url("https://medium.com/@user/my-story-3f1a"));
        assert!(is_post_url("https://example.substack.com/p/my-post"));
        assert!(is_post_url("https://site/post/abc"));
    }

    #[test]
    fn post_id_is_the_last_nonempty_segment() {
        assert_eq!(
            post_id_from_url("https://site/post/abc").as_deref(),
            Some("abc")
        );
        assert_eq!(
            post_id_from_url("https://medium.com/@user/my-story-3f1a/").as_deref(),
            Some("my-story-3f1a")
        );
        assert_eq!(
            post_id_from_url("https://example.substack.com/p/my-post?utm=x").as_deref(),
            Some("my-post")
        );
        assert_eq!(post_id_from_url("https://medium.com/"), None);
    }
}
