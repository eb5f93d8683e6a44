use async_trait::async_trait;
use castflow_browser::{LoadState, Target};
use serde_json::Value;
use tracing::debug;

use crate::error::UploadError;
use crate::job::PUBLISH_TIME_FORMAT;
use crate::media::MediaKind;
use crate::platform::{JobOption, Platform, PlatformProfile, StepOutcome, StepResult};
use crate::poll::{Probe, poll_until};
use crate::stage::StageContext;
use crate::tags::{TagDelimiter, TagPlacement, TagPolicy, hashtag};

pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "kuaishou",
    node_name: "Kuaishou Video Upload",
    display_name: "Kuaishou",
    category: "Kuaishou",
    summary: "Upload a video to Kuaishou using browser automation.",
    publish_url: "https://cp.kuaishou.com/article/publish/video",
    wait_until: LoadState::Load,
    media: MediaKind::Video,
    media_field: "video_path",
    description_field: None,
    description_required: false,
    tags: TagPolicy::new(TagDelimiter::Comma, TagPlacement::Hashtags).with_max(3),
    tags_required: false,
    title_limit: None,
    options: &[JobOption::PublishTime],
    verify_on: "Kuaishou",
};

const UPLOAD_BUTTON: &str = "button[class^='_upload-btn']";
const ACKNOWLEDGE: &str = r#"button[type="button"] span:text("我知道了")"#;
const TOUR_SKIP: &str = "div[role='button']:has-text('跳过')";
const TOUR_NEXT: &str = "div:has-text('下一步')";
const TOUR_OVERLAY: &str = ".react-joyride__overlay";
const REMOVE_TOUR: &str = "() => { document.querySelectorAll('.react-joyride__spotlight, .react-joyride__overlay').forEach(e => e.remove()); }";
const DESCRIPTION_EDITOR: &str = "div._description_1axiz_59#work-description-edit";
const UPLOADING: &str = "text=上传中";
const SCHEDULE_RADIO: &str =
    "label:text('发布时间') >> xpath=following-sibling::div >> .ant-radio-input";
const DATE_INPUT: &str = r#"div.ant-picker-input input[placeholder="选择日期时间"]"#;
const PUBLISH_BUTTON: &str = r#"text="发布""#;
const CONFIRM_PUBLISH: &str = "text=确认发布";

pub struct Kuaishou;

impl Kuaishou {
    /// Click through or strip the guided tour covering the form.
    async fn clear_guide(&self, cx: &StageContext<'_>) {
        for round in 0..cx.timings.overlay_rounds {
            if let Ok(true) = cx.click_if_present(TOUR_SKIP).await {
                cx.pause(cx.timings.step_pause()).await;
                continue;
            }
            if let Ok(true) = cx.click_if_present(TOUR_NEXT).await {
                cx.pause(cx.timings.step_pause()).await;
                continue;
            }
            if let Err(error) = cx.page.evaluate(REMOVE_TOUR, Value::Null).await {
                debug!(round, %error, "Guide overlay removal failed");
            }
            match cx.present(TOUR_OVERLAY).await {
                Ok(false) => break,
                Ok(true) => {}
                Err(error) => debug!(round, %error, "Guide overlay check failed"),
            }
            cx.pause(cx.timings.step_pause()).await;
        }
    }

    async fn schedule(&self, cx: &StageContext<'_>, when: &str) -> crate::error::Result<()> {
        cx.page.click(&Target::nth(SCHEDULE_RADIO, 1)).await?;
        cx.pause(cx.timings.step_pause()).await;

        let input = cx
            .require(DATE_INPUT, "publish time input", cx.timings.element_wait())
            .await?;
        cx.page.click(&input).await?;
        cx.pause(cx.timings.step_pause()).await;
        cx.page.press(None, "Control+A").await?;
        cx.page
            .type_text(None, when, cx.timings.keystroke_delay())
            .await?;
        cx.page.press(None, "Enter").await?;
        cx.pause(cx.timings.step_pause()).await;
        Ok(())
    }
}

#[async_trait]
impl Platform for Kuaishou {
    fn profile(&self) -> &'static PlatformProfile {
        &PROFILE
    }

    async fn upload(&self, cx: &StageContext<'_>) -> StepResult {
        let trigger = cx
            .require(UPLOAD_BUTTON, "upload button", cx.timings.element_wait())
            .await?;
        cx.page
            .set_files_via_chooser(&trigger, cx.job.media())
            .await?;
        cx.info("Video file selected");
        cx.pause(cx.timings.retry_pause()).await;

        match cx.click_if_present(ACKNOWLEDGE).await {
            Ok(true) => cx.info("Dismissed notice popup"),
            Ok(false) => {}
            Err(error) => debug!(%error, "Notice popup dismissal failed"),
        }
        cx.info("Handling guide overlay");
        self.clear_guide(cx).await;
        Ok(StepOutcome::done("video attached through file chooser"))
    }

    /// The description editor holds the title line followed by hashtags.
    async fn fill_form(&self, cx: &StageContext<'_>) -> StepResult {
        let editor = cx
            .require(DESCRIPTION_EDITOR, "description editor", cx.timings.element_wait())
            .await?;
        cx.page.click(&editor).await?;
        cx.page.press(None, "Control+A").await?;
        cx.page.press(None, "Delete").await?;
        cx.page
            .type_text(None, cx.job.title(), cx.timings.keystroke_delay())
            .await?;
        cx.page.press(None, "Enter").await?;

        for tag in cx.job.tags() {
            cx.page
                .type_text(None, &format!("{} ", hashtag(tag)), cx.timings.keystroke_delay())
                .await?;
            cx.pause(cx.timings.step_pause()).await;
        }
        cx.info("Title and tags filled");
        Ok(StepOutcome::done(format!("{} hashtag(s)", cx.job.tags().len())))
    }

    async fn await_ready(&self, cx: &StageContext<'_>) -> StepResult {
        cx.info("Waiting for upload completion");
        let policy = cx.timings.upload_poll();
        let outcome = poll_until::<(), UploadError, _, _>(policy, move |_| async move {
            Ok(if cx.page.count(UPLOADING).await? == 0 {
                Probe::Ready(())
            } else {
                Probe::Pending
            })
        })
        .await?;
        let attempts = outcome.attempts();
        outcome.into_result("video upload")?;
        cx.info("Video upload completed");
        Ok(StepOutcome::done(format!(
            "upload finished after {attempts} poll(s)"
        )))
    }

    async fn publish(&self, cx: &StageContext<'_>) -> StepResult {
        let scheduled = cx
            .job
            .scheduled_at()
            .map(|at| at.format(PUBLISH_TIME_FORMAT).to_string());
        if let Some(when) = &scheduled {
            cx.info("Setting scheduled publish time");
            self.schedule(cx, when).await?;
        }

        if !cx.click_if_present(PUBLISH_BUTTON).await? {
            return Err(UploadError::control("publish button"));
        }
        cx.pause(cx.timings.step_pause()).await;
        if cx.click_if_present(CONFIRM_PUBLISH).await? {
            cx.info("Confirmed publish");
        }
        cx.pause(cx.timings.settle()).await;

        Ok(StepOutcome::done(match scheduled {
            Some(when) => format!("scheduled for {when}"),
            None => "published immediately".to_string(),
        }))
    }
}
