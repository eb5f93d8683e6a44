use async_trait::async_trait;
use castflow_browser::{LoadState, Target};

use crate::error::UploadError;
use crate::media::MediaKind;
use crate::platform::{Platform, PlatformProfile, StepOutcome, StepResult};
use crate::stage::StageContext;
use crate::tags::{TagDelimiter, TagPlacement, TagPolicy, hashtag_line};

pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "douyin",
    node_name: "Douyin Video Upload",
    display_name: "Douyin",
    category: "Douyin",
    summary: "Upload a video to Douyin using browser automation.",
    publish_url: "https://creator.douyin.com/creator-micro/home",
    wait_until: LoadState::Load,
    media: MediaKind::Video,
    media_field: "video_path",
    description_field: Some("description"),
    description_required: true,
    tags: TagPolicy::new(TagDelimiter::Comma, TagPlacement::Hashtags),
    tags_required: false,
    title_limit: None,
    options: &[],
    verify_on: "Douyin",
};

const UPLOAD_ENTRY: &str = "div.title-HvY9Az";
const UPLOAD_CONTAINER: &str = "div.container-drag-title-p6mssi";
const FILE_INPUT: &str = r#"input[type="file"]"#;
const TITLE_INPUT: &str = "input.semi-input.semi-input-default";
const DESCRIPTION_EDITOR: &str = "div.zone-container.editor-kit-container.editor.editor-comp-publish.notranslate.chrome.window.chrome88";
const PREVIEW_READY: &str = r#"div:has-text("预览视频")"#;
const PUBLISH_BUTTON: &str = "button.button-dhlUZE.primary-cECiOJ.fixed-J9O8Yw";

pub struct Douyin;

#[async_trait]
impl Platform for Douyin {
    fn profile(&self) -> &'static PlatformProfile {
        &PROFILE
    }

    async fn open(&self, cx: &StageContext<'_>) -> StepResult {
        cx.page
            .goto(PROFILE.publish_url, PROFILE.wait_until, cx.timings.navigation())
            .await?;

        if cx.appears(UPLOAD_ENTRY, cx.timings.quick_wait()).await? {
            cx.page.click(&Target::first(UPLOAD_ENTRY)).await?;
            cx.info("Clicked upload entry button");
            Ok(StepOutcome::done("entered upload page from creator home"))
        } else {
            cx.info("Already on upload page or using different layout");
            Ok(StepOutcome::done("upload page already open"))
        }
    }

    async fn upload(&self, cx: &StageContext<'_>) -> StepResult {
        cx.require(UPLOAD_CONTAINER, "upload container", cx.timings.long_element_wait())
            .await?;
        if !cx.present(FILE_INPUT).await? {
            return Err(UploadError::control("file input"));
        }
        cx.page
            .set_input_files(&Target::first(FILE_INPUT), cx.job.media())
            .await?;
        cx.info("Video file upload started");
        Ok(StepOutcome::done("video attached"))
    }

    async fn fill_form(&self, cx: &StageContext<'_>) -> StepResult {
        let attempts = cx.timings.title_attempts.max(1);
        let mut attempt = 1;
        let title = loop {
            match cx
                .require(TITLE_INPUT, "title input", cx.timings.long_element_wait())
                .await
            {
                Ok(target) => break target,
                Err(UploadError::ControlNotFound { .. }) if attempt < attempts => {
                    attempt += 1;
                    cx.pause(cx.timings.retry_pause()).await;
                }
                Err(error) => return Err(error),
            }
        };
        cx.page.click(&title).await?;
        cx.page.fill(&title, cx.job.title()).await?;
        cx.info("Title filled");

        let editor = cx
            .require(DESCRIPTION_EDITOR, "description input", cx.timings.long_element_wait())
            .await?;
        cx.page.click(&editor).await?;
        cx.page.fill(&editor, cx.job.description()).await?;
        if !cx.job.tags().is_empty() {
            let suffix = format!(" {}", hashtag_line(cx.job.tags()));
            cx.page
                .type_text(Some(&editor), &suffix, cx.timings.keystroke_delay())
                .await?;
        }
        cx.info("Description and tags filled");
        Ok(StepOutcome::done(format!(
            "title after {attempt} attempt(s), {} hashtag(s)",
            cx.job.tags().len()
        )))
    }

    async fn await_ready(&self, cx: &StageContext<'_>) -> StepResult {
        if !cx.appears(PREVIEW_READY, cx.timings.readiness_wait()).await? {
            return Err(UploadError::timeout("video preview"));
        }
        cx.info("Video preview available");
        cx.pause(cx.timings.retry_pause()).await;
        Ok(StepOutcome::done("preview available"))
    }

    async fn publish(&self, cx: &StageContext<'_>) -> StepResult {
        let button = cx
            .require(PUBLISH_BUTTON, "publish button", cx.timings.long_element_wait())
            .await?;
        let label = cx.page.inner_text(&button).await?;
        if !label.contains("发布") {
            return Err(UploadError::control("publish button labelled 发布"));
        }
        cx.page.click(&button).await?;
        cx.info("Publish button clicked");
        cx.pause(cx.timings.settle()).await;
        Ok(StepOutcome::done("publish clicked"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::test_support::{Fixture, run};
    use crate::testing::{MockPage, PageCall};

    fn ready_page() -> MockPage {
        MockPage::new()
            .element(UPLOAD_CONTAINER)
            .element(FILE_INPUT)
            .element(TITLE_INPUT)
            .element(DESCRIPTION_EDITOR)
            .element(PREVIEW_READY)
            .elements(PUBLISH_BUTTON, &["发布"])
    }

    #[tokio::test]
    async fn hashtags_are_typed_after_description() {
        let fixture = Fixture::video(&PROFILE).with_tags(&["rust", "#cli"]);
        let page = ready_page();

        let report = run(&Douyin, &fixture, &page).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(page.filled(TITLE_INPUT).as_deref(), Some("title"));
        assert_eq!(page.typed(), vec![" #rust #cli".to_string()]);
        assert_eq!(page.clicks(PUBLISH_BUTTON), 1);
    }

    #[tokio::test]
    async fn missing_entry_button_is_not_fatal() {
        let fixture = Fixture::video(&PROFILE);
        let page = ready_page();
        run(&Douyin, &fixture, &page).await;
        assert!(
            page.calls()
                .contains(&PageCall::WaitFor(UPLOAD_ENTRY.to_string(), Default::default()))
        );
        assert_eq!(page.clicks(UPLOAD_ENTRY), 0);
    }

    #[tokio::test]
    async fn title_lookup_retries_before_failing() {
        let fixture = Fixture::video(&PROFILE);
        let page = MockPage::new()
            .element(UPLOAD_CONTAINER)
            .element(FILE_INPUT);

        let report = run(&Douyin, &fixture, &page).await;
        let failure = report.failure().unwrap();
        assert_eq!(failure.to_string(), "title input not found");
        let title_waits = page
            .calls()
            .iter()
            .filter(|call| matches!(call, PageCall::WaitFor(selector, _) if selector == TITLE_INPUT))
            .count();
        assert_eq!(title_waits, 3);
    }

    #[tokio::test]
    async fn mislabelled_publish_button_fails() {
        let fixture = Fixture::video(&PROFILE);
        let page = ready_page().elements(PUBLISH_BUTTON, &["保存"]);
        let report = run(&Douyin, &fixture, &page).await;
        assert!(!report.succeeded());
        assert_eq!(page.clicks(PUBLISH_BUTTON), 0);
    }
}
