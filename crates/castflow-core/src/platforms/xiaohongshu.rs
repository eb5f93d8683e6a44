use async_trait::async_trait;
use castflow_browser::{LoadState, Target};
use serde_json::Value;
use tracing::debug;

use crate::error::UploadError;
use crate::media::MediaKind;
use crate::platform::{Platform, PlatformProfile, StepOutcome, StepResult};
use crate::stage::StageContext;
use crate::tags::{TagDelimiter, TagPlacement, TagPolicy};

const PUBLISH_URL: &str = "https://creator.xiaohongshu.com/publish/publish?source=official";

pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "xiaohongshu",
    node_name: "Xiaohongshu Video Upload",
    display_name: "Xiaohongshu",
    category: "Xiaohongshu",
    summary: "Publish a video note on Xiaohongshu using browser automation.",
    publish_url: PUBLISH_URL,
    wait_until: LoadState::DomContentLoaded,
    media: MediaKind::Video,
    media_field: "video_path",
    description_field: Some("desc"),
    description_required: true,
    tags: TagPolicy::new(TagDelimiter::Comma, TagPlacement::Unsupported),
    tags_required: false,
    title_limit: None,
    options: &[],
    verify_on: "Xiaohongshu",
};

pub const IMAGES_PROFILE: PlatformProfile = PlatformProfile {
    id: "xiaohongshu_images",
    node_name: "Xiaohongshu Image Post Upload",
    summary: "Publish a multi-image note on Xiaohongshu using browser automation.",
    media: MediaKind::Images,
    media_field: "pics",
    ..PROFILE
};

const MAXIMIZE_WINDOW: &str = "() => { window.moveTo(0, 0); window.resizeTo(screen.width, screen.height); }";
const UPLOAD_INPUT: &str = "input.upload-input";
const TITLE_INPUT: &str = "input.d-text";
const DESCRIPTION_EDITOR: &str = "div.ql-editor";
const PUBLISH_BUTTON: &str = "button.publishBtn";

/// Video notes and image notes share one publishing page with a tab each.
pub struct Xiaohongshu {
    profile: &'static PlatformProfile,
}

impl Xiaohongshu {
    pub fn video() -> Self {
        Self { profile: &PROFILE }
    }

    pub fn images() -> Self {
        Self {
            profile: &IMAGES_PROFILE,
        }
    }

    fn tab(&self) -> &'static str {
        match self.profile.media {
            MediaKind::Video => r#"text="上传视频""#,
            MediaKind::Images => r#"text="上传图文""#,
        }
    }
}

#[async_trait]
impl Platform for Xiaohongshu {
    fn profile(&self) -> &'static PlatformProfile {
        self.profile
    }

    async fn open(&self, cx: &StageContext<'_>) -> StepResult {
        if let Err(error) = cx.page.evaluate(MAXIMIZE_WINDOW, Value::Null).await {
            debug!(%error, "Window resize refused");
        }
        cx.page
            .goto(self.profile.publish_url, self.profile.wait_until, cx.timings.navigation())
            .await?;

        match cx.click_if_present(self.tab()).await {
            Ok(true) => cx.info("Switched to upload tab"),
            Ok(false) => cx.warn("Upload tab not found, staying on the default tab"),
            Err(error) => debug!(%error, "Upload tab click failed"),
        }
        Ok(StepOutcome::done(self.profile.publish_url))
    }

    async fn upload(&self, cx: &StageContext<'_>) -> StepResult {
        cx.require(UPLOAD_INPUT, "upload input", cx.timings.element_wait())
            .await?;
        let kind = self.profile.media;
        let input = cx
            .find_file_input(UPLOAD_INPUT, kind)
            .await?
            .ok_or_else(|| UploadError::control(format!("{} upload input", kind.label())))?;
        cx.page.set_input_files(&input, cx.job.media()).await?;
        cx.info(&format!("Attached {} {}(s)", cx.job.media().len(), kind.label()));
        cx.pause(cx.timings.settle()).await;
        Ok(StepOutcome::done(format!(
            "{} file(s) attached to input #{}",
            cx.job.media().len(),
            input.nth
        )))
    }

    async fn fill_form(&self, cx: &StageContext<'_>) -> StepResult {
        let title = cx
            .require(TITLE_INPUT, "title input", cx.timings.quick_wait())
            .await?;
        cx.page.fill(&title, cx.job.title()).await?;

        let editor = cx
            .require(DESCRIPTION_EDITOR, "description editor", cx.timings.quick_wait())
            .await?;
        cx.page.click(&editor).await?;
        if !cx.set_inner_text(DESCRIPTION_EDITOR, cx.job.description()).await? {
            return Err(UploadError::control("description editor"));
        }
        cx.info("Title and description filled");
        Ok(StepOutcome::done("title and description"))
    }

    async fn publish(&self, cx: &StageContext<'_>) -> StepResult {
        let button = cx
            .require(PUBLISH_BUTTON, "publish button", cx.timings.quick_wait())
            .await?;
        cx.page.click(&button).await?;
        cx.info("Publish button clicked");
        cx.pause(cx.timings.settle()).await;
        Ok(StepOutcome::done("publish clicked"))
    }
}

impl Default for Xiaohongshu {
    fn default() -> Self {
        Self::video()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::test_support::{Fixture, run};
    use crate::testing::MockPage;

    fn publish_page() -> MockPage {
        MockPage::new()
            .elements(UPLOAD_INPUT, &["", ""])
            .attribute(UPLOAD_INPUT, 0, "accept", ".jpg,.jpeg,.png,.webp")
            .attribute(UPLOAD_INPUT, 1, "accept", ".mp4,.mov,.flv")
            .element(TITLE_INPUT)
            .element(DESCRIPTION_EDITOR)
            .element(PUBLISH_BUTTON)
    }

    #[tokio::test]
    async fn video_goes_to_the_video_input() {
        let fixture = Fixture::video(&PROFILE);
        let page = publish_page().element(r#"text="上传视频""#);

        let report = run(&Xiaohongshu::video(), &fixture, &page).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(page.clicks(r#"text="上传视频""#), 1);
        assert!(page.calls().iter().any(|call| matches!(
            call,
            crate::testing::PageCall::SetInputFiles(target, _) if target.nth == 1
        )));
    }

    #[tokio::test]
    async fn images_are_attached_together_in_order() {
        let fixture = Fixture::images(&IMAGES_PROFILE, 3);
        let page = publish_page();

        let report = run(&Xiaohongshu::images(), &fixture, &page).await;
        assert!(report.succeeded(), "{report:?}");
        let names: Vec<String> = page
            .attached_files()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["1.jpg", "2.jpg", "3.jpg"]);
    }

    #[tokio::test]
    async fn no_matching_input_is_terminal() {
        let fixture = Fixture::video(&PROFILE);
        let page = MockPage::new()
            .element(UPLOAD_INPUT)
            .attribute(UPLOAD_INPUT, 0, "accept", "image/*");

        let report = run(&Xiaohongshu::video(), &fixture, &page).await;
        assert_eq!(
            report.failure().unwrap().to_string(),
            "video file upload input not found"
        );
    }

    #[test]
    fn image_profile_shares_the_publishing_page() {
        assert_eq!(IMAGES_PROFILE.publish_url, PROFILE.publish_url);
        assert_eq!(IMAGES_PROFILE.media_field, "pics");
        assert_eq!(IMAGES_PROFILE.description_field, Some("desc"));
        assert!(!IMAGES_PROFILE.tags.accepts_tags());
    }
}
