//! Top-level publish/verify/track facade.
//!
//! One [`Publisher`] owns the configuration and the orchestration machinery
//! for any number of requests. Each request borrows a caller-provided
//! [`BrowserAgent`] session; whatever happens inside, the session is closed
//! before the call returns, and cleanup failures are logged rather than
//! allowed to mask the request's outcome.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::BrowserAgent;
use crate::config::CrosspostConfig;
use crate::logging::{LogCallback, LogConfig, WorkflowLogger};
use crate::retry::{within_deadline, RetryOptions, RetryPoller};
use crate::scripts;
use crate::types::{Credentials, Platform, PublishContent, PublishResult, TrackMetrics, VerifyOutcome};
use crate::workflow::{plan_for, ActionOrchestrator, WorkflowError};

/// Entry point for publish, verify, and track requests.
pub struct Publisher {
    config: CrosspostConfig,
    logger: Arc<WorkflowLogger>,
    orchestrator: ActionOrchestrator,
    poller: RetryPoller,
}

impl Publisher {
    pub fn new(config: CrosspostConfig) -> Self {
        let mut log_config = LogConfig::new(config.verbose);
        if let Some(sink) = config.logger.clone() {
            let callback: LogCallback = Arc::new(move |record| {
                sink(&format!("[{}] {}", record.level.label(), record.message));
            });
            log_config.external_logger = Some(callback);
        }
        let logger = Arc::new(WorkflowLogger::with_config(log_config));
        let orchestrator = ActionOrchestrator::new(config.clone(), Arc::clone(&logger));
        let poller = RetryPoller::new(Arc::clone(&logger));
        Self {
            config,
            logger,
            orchestrator,
            poller,
        }
    }

    pub fn config(&self) -> &CrosspostConfig {
        &self.config
    }

    pub fn logger(&self) -> &Arc<WorkflowLogger> {
        &self.logger
    }

    fn session_budget(&self) -> Duration {
        Duration::from_millis(self.config.session_timeout_ms)
    }

    /// Publish `content` on `platform`. Infallible by contract: every
    /// failure, including a blown session budget, is folded into the result.
    pub async fn publish(
        &self,
        agent: &dyn BrowserAgent,
        platform: Platform,
        credentials: &Credentials,
        content: &PublishContent,
    ) -> PublishResult {
        let plan = plan_for(platform);
        let result = match within_deadline(
            self.session_budget(),
            self.orchestrator.publish(agent, &plan, credentials, content),
        )
        .await
        {
            Some(result) => result,
            None => {
                self.logger.error(
                    format!(
                        "session budget of {}ms exhausted while publishing to {}",
                        self.config.session_timeout_ms,
                        platform.label()
                    ),
                    Some("service"),
                    None,
                );
                PublishResult::failed(
                    WorkflowError::SessionTimeout.classification(),
                    None,
                )
            }
        };

        self.close_quietly(agent).await;
        result
    }

    /// Check that the credentials yield a working session. A user-handle
    /// scrape miss does not fail a verification that otherwise succeeded.
    pub async fn verify(
        &self,
        agent: &dyn BrowserAgent,
        platform: Platform,
        credentials: &Credentials,
    ) -> VerifyOutcome {
        let plan = plan_for(platform);
        let authenticator = self.orchestrator.authenticator();

        let outcome = match within_deadline(
            self.session_budget(),
            authenticator.authenticate(agent, &plan.site, credentials),
        )
        .await
        {
            Some(Ok(())) => {
                let user = authenticator
                    .current_user(agent, &plan.site)
                    .await
                    .unwrap_or_default();
                VerifyOutcome {
                    success: true,
                    user,
                }
            }
            Some(Err(err)) => {
                self.logger.error(
                    format!("verification on {} failed: {err}", platform.label()),
                    Some("service"),
                    None,
                );
                VerifyOutcome::default()
            }
            None => {
                self.logger.error(
                    "session budget exhausted during verification",
                    Some("service"),
                    None,
                );
                VerifyOutcome::default()
            }
        };

        self.close_quietly(agent).await;
        outcome
    }

    /// Scrape engagement counters from a published post. Counters the page
    /// does not expose come back as `None`; an exhausted scrape budget yields
    /// an empty set rather than an error.
    pub async fn track(
        &self,
        agent: &dyn BrowserAgent,
        platform: Platform,
        credentials: &Credentials,
        post_url: &str,
    ) -> Result<TrackMetrics, WorkflowError> {
        let result = match within_deadline(
            self.session_budget(),
            self.track_inner(agent, platform, credentials, post_url),
        )
        .await
        {
            Some(result) => result,
            None => Err(WorkflowError::SessionTimeout),
        };

        self.close_quietly(agent).await;
        result
    }

    async fn track_inner(
        &self,
        agent: &dyn BrowserAgent,
        platform: Platform,
        credentials: &Credentials,
        post_url: &str,
    ) -> Result<TrackMetrics, WorkflowError> {
        let plan = plan_for(platform);
        self.orchestrator
            .authenticator()
            .authenticate(agent, &plan.site, credentials)
            .await?;
        agent.navigate(post_url).await?;

        let options = RetryOptions::stage_default("scrape-metrics", &self.config);
        let script = scripts::engagement_metrics();

        let scraped = self
            .poller
            .poll(&options, || {
                let script = &script;
                async move {
                    let result = agent.run_script(script, &[]).await?;
                    let metrics = TrackMetrics {
                        views: result["views"].as_u64(),
                        reactions: result["reactions"].as_u64(),
                        comments: result["comments"].as_u64(),
                    };
                    let any = metrics.views.is_some()
                        || metrics.reactions.is_some()
                        || metrics.comments.is_some();
                    Ok::<_, crate::agent::AgentError>(if any { Some(metrics) } else { None })
                }
            })
            .await;

        match scraped {
            Ok(metrics) => Ok(metrics),
            Err(_) => {
                self.logger.info(
                    "no engagement counters found on the post page",
                    Some("service"),
                    None,
                );
                Ok(TrackMetrics::default())
            }
        }
    }

    async fn close_quietly(&self, agent: &dyn BrowserAgent) {
        if let Err(err) = agent.close().await {
            self.logger.error(
                format!("browser session cleanup failed: {err}"),
                Some("service"),
                None,
            );
        }
    }
}
