//! Tab and window lifecycle tracking.
//!
//! Some platforms confirm a publish by opening the live post in a fresh tab.
//! The workflow snapshots the handle set before submitting, diffs it after,
//! and switches exclusively into the new tab; the originating tab is never
//! read again for that run. Snapshots live only for one workflow run.

use std::time::Duration;

use thiserror::Error;

use crate::agent::{AgentError, BrowserAgent};
use crate::retry::{RetryOptions, RetryPoller};

/// Errors surfaced while resolving a newly opened tab.
#[derive(Debug, Error)]
pub enum TabError {
    #[error("no new browser tab appeared after the triggering action")]
    NoNewTab,
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Snapshot of the open window handles at one instant, in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabHandleSet {
    handles: Vec<String>,
}

impl TabHandleSet {
    pub fn new(handles: Vec<String>) -> Self {
        Self { handles }
    }

    pub async fn capture(agent: &dyn BrowserAgent) -> Result<Self, AgentError> {
        Ok(Self::new(agent.window_handles().await?))
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.handles.iter().any(|h| h == handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Identify the handle present in `after` but not in `before`.
///
/// When more than one new handle exists, the one appearing last in the
/// `after` snapshot wins: handle enumeration preserves creation order, so
/// this deterministically selects the most recently created tab.
pub fn diff_handles(before: &TabHandleSet, after: &TabHandleSet) -> Result<String, TabError> {
    after
        .handles
        .iter()
        .filter(|handle| !before.contains(handle))
        .next_back()
        .cloned()
        .ok_or(TabError::NoNewTab)
}

/// Tracks window handles across one triggering action.
pub struct TabManager {
    poller: RetryPoller,
}

impl TabManager {
    pub fn new(poller: RetryPoller) -> Self {
        Self { poller }
    }

    /// Poll until a tab beyond `before` appears, then switch to it
    /// exclusively. The switch is atomic with respect to the workflow: after
    /// this returns, every read goes through the new handle's context.
    pub async fn await_new_tab(
        &self,
        agent: &dyn BrowserAgent,
        before: &TabHandleSet,
        timeout: Duration,
        interval: Duration,
        max_retries: u32,
    ) -> Result<String, TabError> {
        let options = RetryOptions::new("await-new-tab", timeout, interval, max_retries);
        let handle = self
            .poller
            .poll(&options, || async {
                let after = TabHandleSet::capture(agent).await?;
                match diff_handles(before, &after) {
                    Ok(handle) => Ok(Some(handle)),
                    Err(TabError::NoNewTab) => Ok(None),
                    Err(other) => Err(AgentError::Message(other.to_string())),
                }
            })
            .await
            .map_err(|_| TabError::NoNewTab)?;

        agent.switch_to_window(&handle).await?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(handles: &[&str]) -> TabHandleSet {
        TabHandleSet::new(handles.iter().map(|h| h.to_string()).collect())
    }

    #[test]
    fn single_new_handle_is_returned() {
        let before = set(&["A", "B"]);
        let after = set(&["A", "B", "C"]);
        assert_eq!(diff_handles(&before, &after).unwrap(), "C");
    }

    #[test]
    fn no_new_handle_is_an_error() {
        let before = set(&["A"]);
        let after = set(&["A"]);
        assert!(matches!(
            diff_handles(&before, &after),
            Err(TabError::NoNewTab)
        ));
    }

    #[test]
    fn multiple_new_handles_pick_the_most_recent() {
        let before = set(&["A"]);
        let after = set(&["A", "B", "C"]);
        assert_eq!(diff_handles(&before, &after).unwrap(), "C");
    }

    #[test]
    fn closed_tabs_do_not_confuse_the_diff() {
        // B disappeared, D appeared: D is still the only new handle.
        let before = set(&["A", "B"]);
        let after = set(&["A", "D"]);
        assert_eq!(diff_handles(&before, &after).unwrap(), "D");
    }
}
