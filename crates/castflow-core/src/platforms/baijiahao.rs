use async_trait::async_trait;
use castflow_browser::{LoadState, Target};
use serde_json::Value;

use crate::error::UploadError;
use crate::media::MediaKind;
use crate::platform::{Platform, PlatformProfile, StepOutcome, StepResult};
use crate::poll::{PollOutcome, Probe, poll_until};
use crate::stage::StageContext;
use crate::tags::{TagDelimiter, TagPlacement, TagPolicy};

pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "baijiahao",
    node_name: "Baijiahao Video Upload",
    display_name: "Baijiahao",
    category: "Baijiahao",
    summary: "Upload a video to Baijiahao using browser automation.",
    publish_url: "https://baijiahao.baidu.com/builder/rc/edit?type=videoV2",
    wait_until: LoadState::Load,
    media: MediaKind::Video,
    media_field: "video_path",
    description_field: Some("description"),
    description_required: true,
    tags: TagPolicy::new(TagDelimiter::Comma, TagPlacement::KeyedEntry),
    tags_required: false,
    title_limit: Some(30),
    options: &[],
    verify_on: "Baijiahao",
};

pub(crate) const FILE_INPUT: &str = "div[class^='video-main-container'] input[type='file']";
pub(crate) const UPLOADING: &str = r#"div .cover-overlay:has-text("上传中")"#;
pub(crate) const UPLOAD_FAILED: &str = r#"div .cover-overlay:has-text("上传失败")"#;
pub(crate) const TITLE_INPUT: &str = "input[placeholder='添加标题获得更多推荐']";
pub(crate) const DESCRIPTION_INPUT: &str = "textarea[placeholder='让别人更懂你']";
const TAG_INPUT: &str =
    "input.cheetah-ui-pro-tag-input-container-tag-input[placeholder='获得精准推荐']";
pub(crate) const COVER_IMAGE: &str = "div.cheetah-spin-container img";
pub(crate) const PUBLISH_WRAPPER: &str = "div.op-btn-outter-content";

const SCROLL_TO_BOTTOM: &str = "() => window.scrollTo(0, document.body.scrollHeight)";

pub struct Baijiahao;

#[async_trait]
impl Platform for Baijiahao {
    fn profile(&self) -> &'static PlatformProfile {
        &PROFILE
    }

    async fn upload(&self, cx: &StageContext<'_>) -> StepResult {
        if !cx.present(FILE_INPUT).await? {
            return Err(UploadError::control("video upload input"));
        }
        cx.page
            .set_input_files(&Target::first(FILE_INPUT), cx.job.media())
            .await?;
        cx.info("Video file selected");

        let policy = cx.timings.extended_upload_poll();
        let outcome = poll_until::<(), UploadError, _, _>(policy, move |_| async move {
            if cx.page.count(UPLOAD_FAILED).await? > 0 {
                return Ok(Probe::Failed("视频上传失败".to_string()));
            }
            if cx.page.count(UPLOADING).await? == 0 {
                return Ok(Probe::Ready(()));
            }
            Ok(Probe::Pending)
        })
        .await?;
        let attempts = outcome.attempts();
        outcome.into_result("video upload")?;

        cx.info("Video upload finished");
        Ok(StepOutcome::done(format!(
            "upload finished after {attempts} poll(s)"
        )))
    }

    async fn fill_form(&self, cx: &StageContext<'_>) -> StepResult {
        // The title input only renders once the lower half of the form is in view.
        cx.page.evaluate(SCROLL_TO_BOTTOM, Value::Null).await?;
        cx.pause(cx.timings.step_pause()).await;

        let title = cx
            .require(TITLE_INPUT, "title input", cx.timings.element_wait())
            .await?;
        cx.page.fill(&title, cx.job.title()).await?;
        cx.info("Title filled");

        let description = cx
            .require(DESCRIPTION_INPUT, "description input", cx.timings.element_wait())
            .await?;
        cx.page.fill(&description, cx.job.description()).await?;
        cx.info("Description filled");

        if !cx.job.tags().is_empty() {
            let input = cx
                .require(TAG_INPUT, "tag input", cx.timings.quick_wait())
                .await?;
            for tag in cx.job.tags() {
                cx.page.fill(&input, tag).await?;
                cx.page.press(Some(&input), "Enter").await?;
                cx.pause(cx.timings.short_pause()).await;
            }
            cx.info("Tags filled");
        }
        Ok(StepOutcome::done(format!("{} tag(s)", cx.job.tags().len())))
    }

    /// The cover is generated server-side; publishing without it still
    /// works, so a timeout only warns.
    async fn await_ready(&self, cx: &StageContext<'_>) -> StepResult {
        let policy = cx.timings.cover_poll();
        let outcome = poll_until::<(), UploadError, _, _>(policy, move |_| async move {
            Ok(if cx.page.count(COVER_IMAGE).await? > 0 {
                Probe::Ready(())
            } else {
                Probe::Pending
            })
        })
        .await?;

        match outcome {
            PollOutcome::Ready { attempts, .. } => {
                cx.info("Cover generated");
                Ok(StepOutcome::done(format!("cover ready after {attempts} poll(s)")))
            }
            _ => {
                cx.warn("Cover generation timed out, publishing anyway");
                Ok(StepOutcome::done("cover not generated"))
            }
        }
    }

    async fn publish(&self, cx: &StageContext<'_>) -> StepResult {
        let total = cx.page.count(PUBLISH_WRAPPER).await?;
        for index in 0..total {
            let wrapper = Target::nth(PUBLISH_WRAPPER, index);
            if !cx.page.inner_text(&wrapper).await?.contains("发布") {
                continue;
            }
            let button = wrapper.within("button");
            if cx.present(&button.selector).await? {
                cx.page.click(&button).await?;
                cx.info("Publish button clicked");
                cx.pause(cx.timings.settle()).await;
                return Ok(StepOutcome::done("publish clicked"));
            }
        }
        Err(UploadError::control("publish button"))
    }
}
