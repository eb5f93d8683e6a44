//! Per-platform procedure contract and static platform facts.

use async_trait::async_trait;
use castflow_browser::LoadState;
use serde::Serialize;

use crate::error::UploadError;
use crate::media::MediaKind;
use crate::stage::StageContext;
use crate::tags::TagPolicy;

/// Optional switches a platform's node exposes beyond the common inputs.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobOption {
    /// `is_original`: declare the post as original content.
    DeclareOriginal,
    /// `made_for_kids`: audience declaration.
    MadeForKids,
    /// `publish_time`: schedule instead of publishing immediately.
    PublishTime,
}

impl JobOption {
    pub fn input_key(self) -> &'static str {
        match self {
            Self::DeclareOriginal => "is_original",
            Self::MadeForKids => "made_for_kids",
            Self::PublishTime => "publish_time",
        }
    }
}

/// Static facts about one publishing target.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformProfile {
    /// Registry key, also used on the command line.
    pub id: &'static str,
    pub node_name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub summary: &'static str,
    pub publish_url: &'static str,
    #[serde(skip)]
    pub wait_until: LoadState,
    pub media: MediaKind,
    /// Input key carrying the media path(s).
    pub media_field: &'static str,
    /// Input key carrying the description, if the form has one.
    pub description_field: Option<&'static str>,
    pub description_required: bool,
    pub tags: TagPolicy,
    pub tags_required: bool,
    pub title_limit: Option<usize>,
    pub options: &'static [JobOption],
    /// Where the user should look to confirm the post went live.
    pub verify_on: &'static str,
}

impl PlatformProfile {
    pub fn supports(&self, option: JobOption) -> bool {
        self.options.contains(&option)
    }

    pub fn success_message(&self) -> String {
        let noun = match self.media {
            MediaKind::Video => "Video",
            MediaKind::Images => "Post",
        };
        format!(
            "{noun} upload process completed. Please verify on {}.",
            self.verify_on
        )
    }
}

/// What a stage did, for the stage log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub detail: String,
}

impl StepOutcome {
    pub fn done(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    pub fn skipped() -> Self {
        Self::done("nothing to do")
    }
}

pub type StepResult = std::result::Result<StepOutcome, UploadError>;

/// The five stages of one upload, in the order the pipeline runs them.
///
/// Stages only return `Err` for terminal failures. Optional controls that
/// are missing should be logged and skipped inside the stage.
#[async_trait]
pub trait Platform: Send + Sync {
    fn profile(&self) -> &'static PlatformProfile;

    async fn open(&self, cx: &StageContext<'_>) -> StepResult {
        let profile = self.profile();
        cx.page
            .goto(profile.publish_url, profile.wait_until, cx.timings.navigation())
            .await?;
        cx.info(&format!("Opened {} publishing page", profile.display_name));
        Ok(StepOutcome::done(profile.publish_url))
    }

    async fn upload(&self, cx: &StageContext<'_>) -> StepResult;

    async fn fill_form(&self, cx: &StageContext<'_>) -> StepResult;

    async fn await_ready(&self, _cx: &StageContext<'_>) -> StepResult {
        Ok(StepOutcome::skipped())
    }

    async fn publish(&self, cx: &StageContext<'_>) -> StepResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::{weixin, xiaohongshu, youtube};

    #[test]
    fn success_message_names_where_to_verify() {
        assert_eq!(
            youtube::PROFILE.success_message(),
            "Video upload process completed. Please verify on YouTube Studio."
        );
        assert!(
            xiaohongshu::IMAGES_PROFILE
                .success_message()
                .starts_with("Post upload")
        );
    }

    #[test]
    fn options_are_declared_per_platform() {
        assert!(weixin::PROFILE.supports(JobOption::DeclareOriginal));
        assert!(!weixin::PROFILE.supports(JobOption::MadeForKids));
        assert_eq!(JobOption::PublishTime.input_key(), "publish_time");
    }
}
