//! Concrete [`BrowserAgent`](crate::agent::BrowserAgent) implementations.

pub mod chromiumoxide;

pub use chromiumoxide::ChromiumAgent;
