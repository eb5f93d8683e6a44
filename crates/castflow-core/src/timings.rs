//! Wait budgets, poll budgets and pauses used by the platform procedures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::poll::PollPolicy;

/// All fields are milliseconds unless named otherwise. Defaults match what
/// the platforms' pages have needed in practice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timings {
    pub navigation_ms: u64,
    pub quick_wait_ms: u64,
    /// Budget for a form control to appear.
    pub element_wait_ms: u64,
    /// Budget for controls behind a slow first render.
    pub long_element_wait_ms: u64,
    /// Budget for one probe of an optional overlay or dialog.
    pub probe_wait_ms: u64,
    pub dialog_close_wait_ms: u64,
    /// Budget for the platform to finish first-pass processing.
    pub processing_wait_ms: u64,
    /// Budget for the late readiness marker before publishing.
    pub readiness_wait_ms: u64,

    pub poll_interval_ms: u64,
    pub upload_attempts: u32,
    pub extended_upload_attempts: u32,
    pub cover_attempts: u32,

    pub title_attempts: u32,
    pub retry_pause_ms: u64,
    /// Rounds of guided-tour and popup dismissal.
    pub overlay_rounds: u32,
    pub not_now_rounds: u32,
    pub preset_tag_rounds: u32,
    /// Refills of an editor that drops text typed too early.
    pub description_attempts: u32,
    /// "Continue" clicks through an upload wizard.
    pub wizard_steps: u32,

    /// Pause after file attachment and after the final submit click.
    pub settle_ms: u64,
    pub step_pause_ms: u64,
    pub short_pause_ms: u64,
    pub keystroke_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            navigation_ms: 60_000,
            quick_wait_ms: 10_000,
            element_wait_ms: 15_000,
            long_element_wait_ms: 20_000,
            probe_wait_ms: 1_000,
            dialog_close_wait_ms: 5_000,
            processing_wait_ms: 60_000,
            readiness_wait_ms: 120_000,
            poll_interval_ms: 2_000,
            upload_attempts: 60,
            extended_upload_attempts: 120,
            cover_attempts: 60,
            title_attempts: 3,
            retry_pause_ms: 2_000,
            overlay_rounds: 10,
            not_now_rounds: 6,
            preset_tag_rounds: 10,
            description_attempts: 5,
            wizard_steps: 3,
            settle_ms: 5_000,
            step_pause_ms: 1_000,
            short_pause_ms: 500,
            keystroke_delay_ms: 0,
        }
    }
}

impl Timings {
    /// Same budgets and attempt counts with every pause and interval at
    /// zero. Used for mocked pages.
    pub fn instant() -> Self {
        Self {
            poll_interval_ms: 0,
            retry_pause_ms: 0,
            settle_ms: 0,
            step_pause_ms: 0,
            short_pause_ms: 0,
            keystroke_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn upload_poll(&self) -> PollPolicy {
        PollPolicy::new(self.poll_interval_ms, self.upload_attempts)
    }

    pub fn extended_upload_poll(&self) -> PollPolicy {
        PollPolicy::new(self.poll_interval_ms, self.extended_upload_attempts)
    }

    pub fn cover_poll(&self) -> PollPolicy {
        PollPolicy::new(self.poll_interval_ms, self.cover_attempts)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn quick_wait(&self) -> Duration {
        Duration::from_millis(self.quick_wait_ms)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn long_element_wait(&self) -> Duration {
        Duration::from_millis(self.long_element_wait_ms)
    }

    pub fn probe_wait(&self) -> Duration {
        Duration::from_millis(self.probe_wait_ms)
    }

    pub fn dialog_close_wait(&self) -> Duration {
        Duration::from_millis(self.dialog_close_wait_ms)
    }

    pub fn processing_wait(&self) -> Duration {
        Duration::from_millis(self.processing_wait_ms)
    }

    pub fn readiness_wait(&self) -> Duration {
        Duration::from_millis(self.readiness_wait_ms)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn step_pause(&self) -> Duration {
        Duration::from_millis(self.step_pause_ms)
    }

    pub fn short_pause(&self) -> Duration {
        Duration::from_millis(self.short_pause_ms)
    }

    pub fn keystroke_delay(&self) -> Duration {
        Duration::from_millis(self.keystroke_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let timings: Timings =
            serde_json::from_str(r#"{"upload_attempts": 90, "poll_interval_ms": 3000}"#).unwrap();
        assert_eq!(timings.upload_attempts, 90);
        assert_eq!(timings.upload_poll(), PollPolicy::new(3000, 90));
        assert_eq!(timings.readiness_wait_ms, 120_000);
    }

    #[test]
    fn instant_keeps_attempt_budgets() {
        let timings = Timings::instant();
        assert_eq!(timings.upload_attempts, Timings::default().upload_attempts);
        assert_eq!(timings.poll_interval_ms, 0);
        assert_eq!(timings.wizard_steps, 3);
    }

    #[test]
    fn dialog_and_retry_rounds_are_configurable() {
        let defaults = Timings::default();
        assert_eq!(
            (
                defaults.not_now_rounds,
                defaults.preset_tag_rounds,
                defaults.description_attempts,
                defaults.wizard_steps
            ),
            (6, 10, 5, 3)
        );

        let timings: Timings =
            serde_json::from_str(r#"{"wizard_steps": 1, "preset_tag_rounds": 2}"#).unwrap();
        assert_eq!(timings.wizard_steps, 1);
        assert_eq!(timings.preset_tag_rounds, 2);
        assert_eq!(timings.not_now_rounds, 6);
    }
}
