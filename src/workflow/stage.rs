//! Shared per-stage executor.
//!
//! Every workflow stage is the same shape: a retry budget wrapped around a
//! probe that manipulates the page and verifies the result in the same
//! attempt. Field stages additionally cycle through their locator strategies
//! inside each attempt, so a late-rendering testid selector and its heuristic
//! fallback compete on every poll rather than across polls.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::agent::{AgentError, BrowserAgent};
use crate::config::CrosspostConfig;
use crate::logging::WorkflowLogger;
use crate::retry::{RetryFailure, RetryOptions, RetryPoller};
use crate::scripts;
use crate::verify;
use crate::workflow::{ButtonTarget, FieldTarget, LocatorStrategy};

/// Executes individual workflow stages against a [`BrowserAgent`].
pub struct StageRunner {
    config: CrosspostConfig,
    poller: RetryPoller,
}

impl StageRunner {
    pub fn new(config: CrosspostConfig, logger: Arc<WorkflowLogger>) -> Self {
        let poller = RetryPoller::new(logger);
        Self { config, poller }
    }

    pub fn config(&self) -> &CrosspostConfig {
        &self.config
    }

    fn stage_options(&self, label: &str) -> RetryOptions {
        RetryOptions::stage_default(label, &self.config)
    }

    fn fill_script(strategy: &LocatorStrategy, value: &str) -> String {
        match strategy {
            LocatorStrategy::Css(selector) => scripts::fill_by_selector(selector, value),
            LocatorStrategy::Heuristic(hints) => scripts::fill_by_hint(hints, value),
            LocatorStrategy::BroadScan(rank) => scripts::fill_by_rank(*rank, value),
        }
    }

    /// Fill one field and verify the write through the prefix oracle.
    ///
    /// Each attempt walks the target's strategies in order; a strategy only
    /// wins when the text it reports back actually matches the expected
    /// value, so a fill landing in the wrong element keeps the stage polling.
    pub async fn fill_field(
        &self,
        agent: &dyn BrowserAgent,
        target: &FieldTarget,
        expected: &str,
    ) -> Result<(), RetryFailure> {
        let options = self.stage_options(target.name);
        let scripts: Vec<String> = target
            .strategies
            .iter()
            .map(|strategy| Self::fill_script(strategy, expected))
            .collect();

        self.poller
            .poll(&options, || {
                let scripts = &scripts;
                async move {
                    for script in scripts {
                        let result = agent.run_script(script, &[]).await?;
                        if let Some(text) = result.as_str() {
                            if verify::matches(expected, text, target.class) {
                                return Ok::<_, AgentError>(Some(()));
                            }
                        }
                    }
                    Ok(None)
                }
            })
            .await
    }

    /// Re-read both content surfaces and check them against the oracle.
    pub async fn verify_content(
        &self,
        agent: &dyn BrowserAgent,
        title: &str,
        body: &str,
    ) -> Result<(), RetryFailure> {
        let options = self.stage_options("verify-content");
        let script = scripts::read_content();

        self.poller
            .poll(&options, || {
                let script = &script;
                async move {
                    let result = agent.run_script(script, &[]).await?;
                    let title_ok = result["title"]
                        .as_str()
                        .map(|text| verify::matches(title, text, verify::FieldClass::Title))
                        .unwrap_or(false);
                    let body_ok = result["body"]
                        .as_str()
                        .map(|text| verify::matches(body, text, verify::FieldClass::Body))
                        .unwrap_or(false);
                    Ok::<_, AgentError>(if title_ok && body_ok { Some(()) } else { None })
                }
            })
            .await
    }

    /// Click a button once it qualifies under its disambiguation rules.
    pub async fn click_button(
        &self,
        agent: &dyn BrowserAgent,
        target: &ButtonTarget,
    ) -> Result<(), RetryFailure> {
        let options = self.stage_options(target.name);
        let script = scripts::click_button(target.keywords, target.disqualifiers, target.scope);

        self.poller
            .poll(&options, || {
                let script = &script;
                async move {
                    let result = agent.run_script(script, &[]).await?;
                    Ok::<_, AgentError>(if result == JsonValue::Bool(true) {
                        Some(())
                    } else {
                        None
                    })
                }
            })
            .await
    }

    /// Poll a boolean-returning script until it yields true.
    pub async fn wait_truthy(
        &self,
        agent: &dyn BrowserAgent,
        label: &str,
        script: &str,
    ) -> Result<(), RetryFailure> {
        let options = self.stage_options(label);

        self.poller
            .poll(&options, || async move {
                let result = agent.run_script(script, &[]).await?;
                Ok::<_, AgentError>(if result == JsonValue::Bool(true) {
                    Some(())
                } else {
                    None
                })
            })
            .await
    }

    /// Poll an arbitrary URL predicate against the current address.
    pub async fn wait_for_url<P>(
        &self,
        agent: &dyn BrowserAgent,
        options: &RetryOptions,
        predicate: P,
    ) -> Result<String, RetryFailure>
    where
        P: Fn(&str) -> bool,
    {
        self.poller
            .poll(options, || {
                let predicate = &predicate;
                async move {
                    let url = agent.current_url().await?;
                    Ok::<_, AgentError>(if predicate(&url) { Some(url) } else { None })
                }
            })
            .await
    }

    pub fn poller(&self) -> &RetryPoller {
        &self.poller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::CookieParam;
    use crate::config::Verbosity;
    use crate::verify::FieldClass;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn runner() -> StageRunner {
        let config = CrosspostConfig {
            stage_timeout_ms: 500,
            stage_interval_ms: 1,
            stage_max_retries: 5,
            ..CrosspostConfig::default()
        };
        StageRunner::new(config, Arc::new(WorkflowLogger::new(Verbosity::Minimal)))
    }

    /// Agent whose script results are produced by a responder closure.
    struct ScriptAgent<F>
    where
        F: Fn(&str, u32) -> JsonValue + Send + Sync,
    {
        responder: F,
        calls: AtomicU32,
    }

    impl<F> ScriptAgent<F>
    where
        F: Fn(&str, u32) -> JsonValue + Send + Sync,
    {
        fn new(responder: F) -> Self {
            Self {
                responder,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl<F> BrowserAgent for ScriptAgent<F>
    where
        F: Fn(&str, u32) -> JsonValue + Send + Sync,
    {
        async fn navigate(&self, _url: &str) -> Result<(), AgentError> {
            Ok(())
        }
        async fn locate(&self, _selector: &str) -> Result<bool, AgentError> {
            Ok(false)
        }
        async fn run_script(
            &self,
            script: &str,
            _args: &[JsonValue],
        ) -> Result<JsonValue, AgentError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((self.responder)(script, call))
        }
        async fn add_cookie(&self, _cookie: &CookieParam) -> Result<(), AgentError> {
            Ok(())
        }
        async fn refresh(&self) -> Result<(), AgentError> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String, AgentError> {
            Ok("https://example.com".to_string())
        }
        async fn window_handles(&self) -> Result<Vec<String>, AgentError> {
            Ok(vec!["main".to_string()])
        }
        async fn switch_to_window(&self, _handle: &str) -> Result<(), AgentError> {
            Ok(())
        }
        async fn screenshot(&self) -> Result<Vec<u8>, AgentError> {
            Ok(vec![])
        }
        async fn close(&self) -> Result<(), AgentError> {
            Ok(())
        }
    }

    const TITLE_TARGET: FieldTarget = FieldTarget {
        name: "fill-title",
        class: FieldClass::Title,
        strategies: &[
            LocatorStrategy::Css("h1[data-testid='title']"),
            LocatorStrategy::Heuristic(&["title", "headline"]),
        ],
    };

    #[tokio::test]
    async fn fill_succeeds_when_first_strategy_verifies() {
        let agent = ScriptAgent::new(|_script, _call| json!("My headline, decorated"));
        runner()
            .fill_field(&agent, &TITLE_TARGET, "My headline")
            .await
            .expect("first strategy verifies");
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fill_falls_through_to_next_strategy_in_same_attempt() {
        // Css strategy misses (null), heuristic lands the text.
        let agent = ScriptAgent::new(|script, _call| {
            if script.contains("querySelectorAll") {
                json!("My headline")
            } else {
                json!(null)
            }
        });
        runner()
            .fill_field(&agent, &TITLE_TARGET, "My headline")
            .await
            .expect("fallback strategy verifies");
        assert_eq!(agent.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fill_rejects_unverified_text() {
        // A fill that lands in the wrong element returns the wrong text.
        let agent = ScriptAgent::new(|_script, _call| json!("something else entirely"));
        let failure = runner()
            .fill_field(&agent, &TITLE_TARGET, "My headline")
            .await
            .expect_err("wrong text never verifies");
        assert_eq!(failure.attempts, 5);
    }

    #[tokio::test]
    async fn button_click_waits_until_a_candidate_qualifies() {
        let agent = ScriptAgent::new(|_script, call| json!(call >= 2));
        runner()
            .click_button(
                &agent,
                &ButtonTarget {
                    name: "publish-trigger",
                    keywords: &["publish"],
                    disqualifiers: &["schedule"],
                    scope: "header",
                },
            )
            .await
            .expect("third attempt clicks");
        assert_eq!(agent.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn verify_content_requires_both_fields() {
        let agent = ScriptAgent::new(|_script, _call| {
            json!({ "title": "My headline", "body": "" })
        });
        assert!(runner()
            .verify_content(&agent, "My headline", "Body text here")
            .await
            .is_err());

        let agent = ScriptAgent::new(|_script, _call| {
            json!({ "title": "My headline", "body": "Body text here, with flourish" })
        });
        runner()
            .verify_content(&agent, "My headline", "Body text here")
            .await
            .expect("both surfaces verify");
    }
}
