//! Session establishment on a target platform.
//!
//! Two strategies, tried in this order of preference: cookie injection when
//! the credentials carry at least one usable cookie, interactive form login
//! otherwise. The two paths deliberately verify differently. Cookie logins
//! are accepted once injection succeeds, with a bounded best-effort probe for
//! a logged-in indicator; a stale session surfaces later as an editor-stage
//! failure rather than blocking here. Form logins have no such fallback: the
//! logged-in indicator is mandatory because a silently failed form submit
//! would otherwise publish nothing while reporting progress.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::agent::{AgentError, BrowserAgent, CookieParam};
use crate::config::CrosspostConfig;
use crate::logging::WorkflowLogger;
use crate::retry::{pacing_pause, within_deadline, RetryFailure, RetryOptions, RetryPoller};
use crate::scripts;
use crate::types::{Credentials, CredentialsError};
use crate::verify::{self, FieldClass};

/// Errors raised while establishing a session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("no cookie could be injected for '{domain}'")]
    NoCookiesInjected { domain: String },
    #[error("form login did not reach a logged-in state: {0}")]
    LoginNotConfirmed(RetryFailure),
    #[error("login form field '{field}' could not be filled")]
    FormFieldUnavailable { field: &'static str },
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Static site knowledge needed to authenticate and navigate one platform.
#[derive(Debug, Clone, Copy)]
pub struct SiteProfile {
    pub root_url: &'static str,
    /// Canonical cookie domain used when an exported cookie omits its own.
    pub cookie_domain: &'static str,
    /// Selectors whose presence indicates an authenticated session.
    pub logged_in_selectors: &'static [&'static str],
    /// Selectors likely to carry the signed-in user's display name.
    pub user_handle_selectors: &'static [&'static str],
    pub login: LoginFormProfile,
}

/// Shape of the platform's interactive login form.
#[derive(Debug, Clone, Copy)]
pub struct LoginFormProfile {
    pub login_url: &'static str,
    pub email_selector: &'static str,
    /// Keywords of the intermediate continue button; empty when email and
    /// password live on a single form.
    pub continue_keywords: &'static [&'static str],
    pub password_selector: &'static str,
    pub submit_keywords: &'static [&'static str],
    /// Structural scope the form buttons must live inside.
    pub form_scope: &'static str,
    /// URL fragments that mark a completed login redirect.
    pub logged_in_url_markers: &'static [&'static str],
}

/// Establishes an authenticated session through a [`BrowserAgent`].
pub struct SessionAuthenticator {
    config: CrosspostConfig,
    logger: Arc<WorkflowLogger>,
    poller: RetryPoller,
}

impl SessionAuthenticator {
    pub fn new(config: CrosspostConfig, logger: Arc<WorkflowLogger>) -> Self {
        let poller = RetryPoller::new(Arc::clone(&logger));
        Self {
            config,
            logger,
            poller,
        }
    }

    /// Log in to the platform described by `profile`.
    ///
    /// Credential preconditions are checked before any navigation, so an
    /// impossible request fails without a browser round trip.
    pub async fn authenticate(
        &self,
        agent: &dyn BrowserAgent,
        profile: &SiteProfile,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        credentials.ensure_loginable()?;

        if credentials.has_usable_cookies() {
            self.login_with_cookies(agent, profile, credentials).await
        } else {
            self.login_with_form(agent, profile, credentials).await
        }
    }

    async fn login_with_cookies(
        &self,
        agent: &dyn BrowserAgent,
        profile: &SiteProfile,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        agent.navigate(profile.root_url).await?;

        let mut injected: u32 = 0;
        for cookie in credentials.usable_cookies() {
            let param = CookieParam::from_cookie(cookie, profile.cookie_domain);
            match agent.add_cookie(&param).await {
                Ok(()) => injected += 1,
                Err(err) => {
                    // One malformed export entry must not sink the batch.
                    self.logger.debug(
                        format!("skipping cookie '{}': {err}", param.name),
                        Some("auth"),
                        None,
                    );
                }
            }
        }

        if injected == 0 {
            return Err(AuthError::NoCookiesInjected {
                domain: profile.cookie_domain.to_string(),
            });
        }

        self.logger.info(
            format!("injected {injected} cookies for {}", profile.cookie_domain),
            Some("auth"),
            None,
        );

        agent.refresh().await?;
        pacing_pause(&self.config).await;

        // Best-effort probe only. Some layouts hide every known indicator
        // while the session is perfectly valid, so a miss is logged and the
        // session is still accepted.
        let probe_budget = Duration::from_millis(self.config.login_probe_timeout_ms);
        let confirmed = within_deadline(
            probe_budget,
            self.wait_for_logged_in(agent, profile, probe_budget),
        )
        .await
        .map(|result| result.is_ok())
        .unwrap_or(false);

        if confirmed {
            self.logger
                .info("cookie session confirmed by indicator", Some("auth"), None);
        } else {
            self.logger.info(
                "no logged-in indicator found after cookie injection; proceeding",
                Some("auth"),
                None,
            );
        }

        Ok(())
    }

    async fn login_with_form(
        &self,
        agent: &dyn BrowserAgent,
        profile: &SiteProfile,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        let form = &profile.login;
        let password = credentials.password.as_deref().unwrap_or_default();

        agent.navigate(form.login_url).await?;
        pacing_pause(&self.config).await;

        self.fill_form_field(agent, "email", form.email_selector, &credentials.email)
            .await?;
        pacing_pause(&self.config).await;

        if !form.continue_keywords.is_empty() {
            self.click_form_button(agent, "continue", form.continue_keywords, form.form_scope)
                .await?;
            pacing_pause(&self.config).await;
        }

        self.fill_form_field(agent, "password", form.password_selector, password)
            .await?;
        pacing_pause(&self.config).await;

        self.click_form_button(agent, "submit", form.submit_keywords, form.form_scope)
            .await?;

        let budget = Duration::from_millis(self.config.login_probe_timeout_ms);

        // The post-login redirect is a progress signal only; a miss is
        // logged and the indicator still decides.
        let redirected = within_deadline(budget, self.wait_for_url_marker(agent, profile, budget))
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false);
        if !redirected {
            self.logger.debug(
                "no post-login redirect observed; checking the indicator",
                Some("auth"),
                None,
            );
        }

        // Unlike the cookie path, a missing indicator here is fatal. A URL
        // marker can come from a half-finished redirect, so it never
        // confirms a form login on its own.
        self.wait_for_indicator(agent, profile, budget)
            .await
            .map_err(AuthError::LoginNotConfirmed)?;

        self.logger
            .info("form login confirmed", Some("auth"), None);
        Ok(())
    }

    async fn fill_form_field(
        &self,
        agent: &dyn BrowserAgent,
        field: &'static str,
        selector: &str,
        value: &str,
    ) -> Result<(), AuthError> {
        let options = RetryOptions::new(
            format!("login-fill-{field}"),
            Duration::from_millis(self.config.stage_timeout_ms),
            Duration::from_millis(self.config.stage_interval_ms),
            self.config.stage_max_retries,
        );
        let script = scripts::fill_by_selector(selector, value);

        self.poller
            .poll(&options, || {
                let script = script.clone();
                async move {
                    let result = agent.run_script(&script, &[]).await?;
                    match result.as_str() {
                        Some(text) if verify::matches(value, text, FieldClass::Title) => {
                            Ok::<_, AgentError>(Some(()))
                        }
                        _ => Ok(None),
                    }
                }
            })
            .await
            .map_err(|_| AuthError::FormFieldUnavailable { field })
    }

    async fn click_form_button(
        &self,
        agent: &dyn BrowserAgent,
        label: &'static str,
        keywords: &[&str],
        scope: &str,
    ) -> Result<(), AuthError> {
        let options = RetryOptions::new(
            format!("login-click-{label}"),
            Duration::from_millis(self.config.stage_timeout_ms),
            Duration::from_millis(self.config.stage_interval_ms),
            self.config.stage_max_retries,
        );
        let script = scripts::click_button(keywords, &[], scope);

        self.poller
            .poll(&options, || {
                let script = script.clone();
                async move {
                    let result = agent.run_script(&script, &[]).await?;
                    Ok::<_, AgentError>(if result == JsonValue::Bool(true) {
                        Some(())
                    } else {
                        None
                    })
                }
            })
            .await
            .map_err(|_| AuthError::FormFieldUnavailable { field: label })
    }

    /// Cookie-path probe: either a post-login URL marker or a logged-in
    /// indicator element accepts the session.
    async fn wait_for_logged_in(
        &self,
        agent: &dyn BrowserAgent,
        profile: &SiteProfile,
        budget: Duration,
    ) -> Result<(), RetryFailure> {
        let options = self.probe_options("login-signal", budget);

        self.poller
            .poll(&options, || async {
                let url = agent.current_url().await?;
                if url_marker_matches(profile, &url) {
                    return Ok::<_, AgentError>(Some(()));
                }
                for selector in profile.logged_in_selectors {
                    if agent.locate(selector).await? {
                        return Ok(Some(()));
                    }
                }
                Ok(None)
            })
            .await
    }

    /// Poll the current address until a post-login URL marker appears.
    async fn wait_for_url_marker(
        &self,
        agent: &dyn BrowserAgent,
        profile: &SiteProfile,
        budget: Duration,
    ) -> Result<(), RetryFailure> {
        let options = self.probe_options("login-redirect", budget);

        self.poller
            .poll(&options, || async {
                let url = agent.current_url().await?;
                Ok::<_, AgentError>(url_marker_matches(profile, &url).then_some(()))
            })
            .await
    }

    /// Poll for a logged-in indicator element alone.
    async fn wait_for_indicator(
        &self,
        agent: &dyn BrowserAgent,
        profile: &SiteProfile,
        budget: Duration,
    ) -> Result<(), RetryFailure> {
        let options = self.probe_options("login-indicator", budget);

        self.poller
            .poll(&options, || async {
                for selector in profile.logged_in_selectors {
                    if agent.locate(selector).await? {
                        return Ok::<_, AgentError>(Some(()));
                    }
                }
                Ok(None)
            })
            .await
    }

    fn probe_options(&self, label: &str, budget: Duration) -> RetryOptions {
        RetryOptions::new(
            label,
            budget,
            Duration::from_millis(self.config.stage_interval_ms),
            self.config.stage_max_retries,
        )
    }

    /// Scrape the signed-in user's display name, if any indicator exposes one.
    pub async fn current_user(
        &self,
        agent: &dyn BrowserAgent,
        profile: &SiteProfile,
    ) -> Result<Option<String>, AgentError> {
        let script = scripts::user_handle(profile.user_handle_selectors);
        let result = agent.run_script(&script, &[]).await?;
        Ok(result
            .as_str()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string))
    }

    pub fn logger(&self) -> &Arc<WorkflowLogger> {
        &self.logger
    }
}

fn url_marker_matches(profile: &SiteProfile, url: &str) -> bool {
    profile
        .login
        .logged_in_url_markers
        .iter()
        .any(|marker| url.contains(marker))
}
