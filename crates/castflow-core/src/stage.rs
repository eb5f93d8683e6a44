//! Page helpers shared by every platform procedure.

use castflow_browser::{PageSession, Target, WaitState};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, UploadError};
use crate::job::UploadJob;
use crate::logger::NodeLogger;
use crate::media::MediaKind;
use crate::timings::Timings;

const SET_INNER_TEXT: &str = r#"(args) => {
  const el = document.querySelector(args.selector);
  if (!el) return false;
  el.innerText = args.value;
  el.dispatchEvent(new Event("input", { bubbles: true }));
  return true;
}"#;

/// Everything a stage needs: the page, the job and how long to wait.
pub struct StageContext<'a> {
    pub page: &'a dyn PageSession,
    pub job: &'a UploadJob,
    pub timings: &'a Timings,
    pub logger: &'a dyn NodeLogger,
}

impl<'a> StageContext<'a> {
    pub fn new(
        page: &'a dyn PageSession,
        job: &'a UploadJob,
        timings: &'a Timings,
        logger: &'a dyn NodeLogger,
    ) -> Self {
        Self {
            page,
            job,
            timings,
            logger,
        }
    }

    pub fn info(&self, message: &str) {
        self.logger.info(message);
    }

    pub fn warn(&self, message: &str) {
        self.logger.warning(message);
    }

    pub async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Wait for `selector` to become visible; a timeout means the control
    /// is missing and fails the job.
    pub async fn require(&self, selector: &str, control: &str, wait: Duration) -> Result<Target> {
        self.page
            .wait_for_selector(selector, WaitState::Visible, wait)
            .await
            .map_err(|error| UploadError::missing_on_timeout(error, control))?;
        Ok(Target::first(selector))
    }

    /// Whether `selector` becomes visible within `wait`.
    pub async fn appears(&self, selector: &str, wait: Duration) -> Result<bool> {
        self.wait_state(selector, WaitState::Visible, wait).await
    }

    /// Whether `selector` leaves the page within `wait`.
    pub async fn disappears(&self, selector: &str, wait: Duration) -> Result<bool> {
        self.wait_state(selector, WaitState::Hidden, wait).await
    }

    async fn wait_state(&self, selector: &str, state: WaitState, wait: Duration) -> Result<bool> {
        match self.page.wait_for_selector(selector, state, wait).await {
            Ok(()) => Ok(true),
            Err(error) if error.is_timeout() => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    /// Whether anything matches `selector` right now.
    pub async fn present(&self, selector: &str) -> Result<bool> {
        Ok(self.page.count(selector).await? > 0)
    }

    /// Click the first match if there is one.
    pub async fn click_if_present(&self, selector: &str) -> Result<bool> {
        if !self.present(selector).await? {
            return Ok(false);
        }
        self.page.click(&Target::first(selector)).await?;
        Ok(true)
    }

    /// Click an optional control, ignoring every failure.
    pub async fn dismiss(&self, selector: &str, wait: Duration) -> bool {
        match self.appears(selector, wait).await {
            Ok(true) => match self.page.click(&Target::first(selector)).await {
                Ok(()) => true,
                Err(error) => {
                    debug!(selector, %error, "Dismissal click failed");
                    false
                }
            },
            Ok(false) => false,
            Err(error) => {
                debug!(selector, %error, "Dismissal probe failed");
                false
            }
        }
    }

    /// First match of `selector` whose visible text contains `needle`.
    pub async fn find_by_text(&self, selector: &str, needle: &str) -> Result<Option<Target>> {
        let total = self.page.count(selector).await?;
        for index in 0..total {
            let target = Target::nth(selector, index);
            if self.page.inner_text(&target).await?.contains(needle) {
                return Ok(Some(target));
            }
        }
        Ok(None)
    }

    pub async fn click_by_text(&self, selector: &str, needle: &str, control: &str) -> Result<()> {
        let target = self
            .find_by_text(selector, needle)
            .await?
            .ok_or_else(|| UploadError::control(control))?;
        self.page.click(&target).await?;
        Ok(())
    }

    /// First file input matching `selector` whose `accept` attribute takes `kind`.
    pub async fn find_file_input(&self, selector: &str, kind: MediaKind) -> Result<Option<Target>> {
        let total = self.page.count(selector).await?;
        for index in 0..total {
            let target = Target::nth(selector, index);
            let accept = self.page.get_attribute(&target, "accept").await?;
            if accept.is_some_and(|accept| kind.matches_accept(&accept)) {
                return Ok(Some(target));
            }
        }
        Ok(None)
    }

    /// Replace the text of a rich editor that ignores `fill`.
    ///
    /// `selector` must be plain CSS since it runs through `querySelector`.
    pub async fn set_inner_text(&self, selector: &str, value: &str) -> Result<bool> {
        let applied = self
            .page
            .evaluate(SET_INNER_TEXT, json!({ "selector": selector, "value": value }))
            .await?;
        Ok(applied != Value::Bool(false))
    }
}
