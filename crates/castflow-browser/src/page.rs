//! The page-level surface upload procedures are written against.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::types::{LaunchRequest, LoadState, Target, WaitState};

/// One open page inside an exclusively owned browser + context.
///
/// Every method addresses elements through Playwright selectors so that
/// per-platform selector strings pass through unchanged. Implementations
/// must be usable through a shared reference; callers never issue two
/// commands concurrently.
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn goto(&self, url: &str, wait_until: LoadState, timeout: Duration) -> Result<()>;

    /// Wait until the first match of `selector` reaches `state`.
    /// Returns [`BrowserError::Timeout`](crate::BrowserError::Timeout) when it never does.
    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> Result<()>;

    /// Number of elements currently matching `selector`. Never waits.
    async fn count(&self, selector: &str) -> Result<usize>;

    async fn click(&self, target: &Target) -> Result<()>;

    async fn fill(&self, target: &Target, text: &str) -> Result<()>;

    /// Type text key by key, into `target` or wherever focus currently is.
    async fn type_text(&self, target: Option<&Target>, text: &str, delay: Duration)
    -> Result<()>;

    async fn press(&self, target: Option<&Target>, key: &str) -> Result<()>;

    async fn check(&self, target: &Target) -> Result<()>;

    async fn set_input_files(&self, target: &Target, files: &[PathBuf]) -> Result<()>;

    /// Click `trigger` and answer the native file chooser it opens.
    async fn set_files_via_chooser(&self, trigger: &Target, files: &[PathBuf]) -> Result<()>;

    async fn dispatch_event(&self, target: &Target, event: &str) -> Result<()>;

    async fn get_attribute(&self, target: &Target, name: &str) -> Result<Option<String>>;

    async fn inner_text(&self, target: &Target) -> Result<String>;

    async fn is_visible(&self, target: &Target) -> Result<bool>;

    async fn scroll_into_view(&self, target: &Target) -> Result<()>;

    /// Evaluate a JavaScript function source in the page, called with `arg`.
    async fn evaluate(&self, function: &str, arg: Value) -> Result<Value>;

    /// Tear down page, context and browser. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// Opens a fresh browser + context + page for exactly one job.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, request: LaunchRequest) -> Result<Box<dyn PageSession>>;
}
