//! Chromiumoxide-backed [`BrowserAgent`].
//!
//! Drives a locally launched Chromium over CDP. One page is active at a
//! time; `switch_to_window` swaps the active page and brings it to the
//! front, after which every read goes through the new page.

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam as CdpCookieParam, SetCookiesParams, TimeSinceEpoch,
};
use chromiumoxide::page::{Page as ChromiumPage, ScreenshotParams};
use futures_util::StreamExt;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::agent::{AgentError, BrowserAgent, CookieParam};
use crate::config::CrosspostConfig;

struct AgentState {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    active: ChromiumPage,
}

/// Local Chromium session implementing the agent contract.
pub struct ChromiumAgent {
    state: Mutex<Option<AgentState>>,
}

impl ChromiumAgent {
    /// Launch a local browser and open a blank starting page.
    pub async fn launch(config: &CrosspostConfig) -> Result<Self, AgentError> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(AgentError::Message)?;

        let (browser, handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| AgentError::Message(err.to_string()))?;
        let browser = Arc::new(browser);
        let handler = spawn_handler(handler);

        let active = browser
            .new_page("about:blank")
            .await
            .map_err(|err| AgentError::Message(err.to_string()))?;

        Ok(Self {
            state: Mutex::new(Some(AgentState {
                browser,
                handler,
                active,
            })),
        })
    }

    async fn active_page(&self) -> Result<ChromiumPage, AgentError> {
        let guard = self.state.lock().await;
        guard
            .as_ref()
            .map(|state| state.active.clone())
            .ok_or(AgentError::NotInitialized)
    }

    async fn browser(&self) -> Result<Arc<Browser>, AgentError> {
        let guard = self.state.lock().await;
        guard
            .as_ref()
            .map(|state| Arc::clone(&state.browser))
            .ok_or(AgentError::NotInitialized)
    }
}

#[async_trait]
impl BrowserAgent for ChromiumAgent {
    async fn navigate(&self, url: &str) -> Result<(), AgentError> {
        let page = self.active_page().await?;
        match page.goto(url).await {
            Ok(_) => Ok(()),
            Err(err) => {
                // Heavy editors can keep the load event pending long past the
                // CDP timeout while the document is already usable. Treat the
                // timeout as success when the address reached the target host.
                let current = page.url().await.ok().flatten().unwrap_or_default();
                if host_of(&current) == host_of(url) && host_of(url).is_some() {
                    Ok(())
                } else {
                    Err(AgentError::Navigation {
                        url: url.to_string(),
                        message: err.to_string(),
                    })
                }
            }
        }
    }

    async fn locate(&self, selector: &str) -> Result<bool, AgentError> {
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string())
        );
        let result = self.run_script(&script, &[]).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn run_script(&self, script: &str, _args: &[JsonValue]) -> Result<JsonValue, AgentError> {
        let page = self.active_page().await?;
        let result = page
            .evaluate(script)
            .await
            .map_err(|err| AgentError::Script(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    async fn add_cookie(&self, cookie: &CookieParam) -> Result<(), AgentError> {
        let page = self.active_page().await?;
        let param = cdp_cookie(cookie)?;

        page.execute(SetCookiesParams::new(vec![param]))
            .await
            .map_err(|err| AgentError::Cookie(err.to_string()))?;
        Ok(())
    }

    async fn refresh(&self) -> Result<(), AgentError> {
        let page = self.active_page().await?;
        page.reload()
            .await
            .map_err(|err| AgentError::Message(err.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AgentError> {
        let page = self.active_page().await?;
        let url = page
            .url()
            .await
            .map_err(|err| AgentError::Message(err.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn window_handles(&self) -> Result<Vec<String>, AgentError> {
        let browser = self.browser().await?;
        let pages = browser
            .pages()
            .await
            .map_err(|err| AgentError::Message(err.to_string()))?;
        Ok(pages
            .iter()
            .map(|page| page.target_id().as_ref().to_string())
            .collect())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<(), AgentError> {
        let browser = self.browser().await?;
        let pages = browser
            .pages()
            .await
            .map_err(|err| AgentError::Message(err.to_string()))?;

        let page = pages
            .into_iter()
            .find(|page| page.target_id().as_ref() == handle)
            .ok_or_else(|| AgentError::WindowNotFound(handle.to_string()))?;

        page.bring_to_front()
            .await
            .map_err(|err| AgentError::Message(err.to_string()))?;

        let mut guard = self.state.lock().await;
        match guard.as_mut() {
            Some(state) => {
                state.active = page;
                Ok(())
            }
            None => Err(AgentError::NotInitialized),
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AgentError> {
        let page = self.active_page().await?;
        page.screenshot(ScreenshotParams::builder().full_page(false).build())
            .await
            .map_err(|err| AgentError::Screenshot(err.to_string()))
    }

    async fn close(&self) -> Result<(), AgentError> {
        let state = {
            let mut guard = self.state.lock().await;
            guard.take()
        };

        if let Some(state) = state {
            state.handler.abort();
            drop(state.browser);
        }
        Ok(())
    }
}

fn cdp_cookie(cookie: &CookieParam) -> Result<CdpCookieParam, AgentError> {
    let mut builder = CdpCookieParam::builder()
        .name(&cookie.name)
        .value(&cookie.value)
        .domain(&cookie.domain)
        .path(&cookie.path)
        .secure(cookie.secure)
        .http_only(cookie.http_only);
    if let Some(expires) = cookie.expiration {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    builder.build().map_err(AgentError::Cookie)
}

fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = handler.next().await {
            if let Err(err) = result {
                eprintln!("chromiumoxide handler error: {err}");
            }
        }
    })
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split("://").nth(1)?;
    rest.split('/').next().filter(|host| !host.is_empty())
}
