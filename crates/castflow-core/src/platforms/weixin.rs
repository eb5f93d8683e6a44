use async_trait::async_trait;
use castflow_browser::{LoadState, Target};

use crate::error::{Result, UploadError};
use crate::media::MediaKind;
use crate::platform::{JobOption, Platform, PlatformProfile, StepOutcome, StepResult};
use crate::stage::StageContext;
use crate::tags::{TagDelimiter, TagPlacement, TagPolicy};

pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "weixin_channels",
    node_name: "Weixin Video Uploader",
    display_name: "WeChat Channels",
    category: "WeChat",
    summary: "Upload a video to WeChat Channels using browser automation.",
    publish_url: "https://channels.weixin.qq.com/platform/post/create",
    wait_until: LoadState::Load,
    media: MediaKind::Video,
    media_field: "video_path",
    description_field: Some("description"),
    description_required: false,
    tags: TagPolicy::new(TagDelimiter::Newline, TagPlacement::DescriptionSuffix),
    tags_required: false,
    title_limit: None,
    options: &[JobOption::DeclareOriginal],
    verify_on: "WeChat Channels",
};

const DROP_ZONE: &str = "div.ant-upload.ant-upload-drag";
const FILE_INPUT: &str = r#"input[type="file"][accept="video/mp4,video/x-m4v,video/*"]"#;
const PROCESSED: &str = "div.post-album-display-wrap";
const TITLE_INPUT: &str = r#"input.weui-desktop-form__input[placeholder*="概括视频主要内容"]"#;
const DESCRIPTION_EDITOR: &str = "div.post-desc-box div.input-editor";
const ORIGINAL_CHECKBOX: &str = "div.declare-original-checkbox input[type='checkbox']";
const ORIGINAL_MODAL_TITLE: &str = r#"h3.weui-desktop-dialog__title:text("原创权益")"#;
const ORIGINAL_MODAL: &str =
    r#"div.weui-desktop-dialog:has(h3.weui-desktop-dialog__title:text("原创权益"))"#;
const PRIMARY_BUTTON: &str = "button.weui-desktop-btn.weui-desktop-btn_primary";
const UPLOAD_CONFIRMED: &str = r#"div.finder-tag-wrap .tag-inner:text("删除")"#;

pub struct WeixinChannels;

/// Description with tags appended on their own line.
fn description_with_tags(description: &str, tags: &[String]) -> String {
    if tags.is_empty() {
        description.to_string()
    } else {
        format!("{description}\n{}", tags.join(" "))
    }
}

impl WeixinChannels {
    /// Agree to the originality terms in the dialog that the declaration
    /// checkbox opens.
    ///
    /// A dialog that never shows up only warns. Once it is up, a missing
    /// agreement checkbox or confirm button fails the job.
    async fn resolve_original_modal(&self, cx: &StageContext<'_>) -> Result<bool> {
        if !cx
            .appears(ORIGINAL_MODAL_TITLE, cx.timings.element_wait())
            .await?
        {
            cx.warn("Original content modal did not appear");
            return Ok(false);
        }

        let missing_agreement = || UploadError::control("agreement checkbox in originality dialog");
        let wrappers = format!("{ORIGINAL_MODAL} div.original-proto-wrapper");
        let agreement = cx
            .find_by_text(&wrappers, "我已阅读并同意")
            .await?
            .map(|wrapper| wrapper.within("input.ant-checkbox-input[type='checkbox']"))
            .ok_or_else(missing_agreement)?;
        if !cx.present(&agreement.selector).await? {
            return Err(missing_agreement());
        }
        cx.page.check(&agreement).await?;

        cx.click_by_text(
            &format!("{ORIGINAL_MODAL} {PRIMARY_BUTTON}"),
            "声明原创",
            "'声明原创' button in originality dialog",
        )
        .await?;

        if cx
            .disappears(ORIGINAL_MODAL_TITLE, cx.timings.dialog_close_wait())
            .await?
        {
            cx.info("Original content modal handled");
        } else {
            cx.warn("Original content modal is still open");
        }
        Ok(true)
    }
}

#[async_trait]
impl Platform for WeixinChannels {
    fn profile(&self) -> &'static PlatformProfile {
        &PROFILE
    }

    async fn upload(&self, cx: &StageContext<'_>) -> StepResult {
        cx.require(DROP_ZONE, "upload area", cx.timings.element_wait())
            .await?;
        if !cx.present(FILE_INPUT).await? {
            return Err(UploadError::control("file input"));
        }
        cx.page
            .set_input_files(&Target::first(FILE_INPUT), cx.job.media())
            .await?;
        cx.info("Video file selected");

        if !cx.appears(PROCESSED, cx.timings.processing_wait()).await? {
            return Err(UploadError::timeout("video processing"));
        }
        cx.info("Video processed");
        Ok(StepOutcome::done("video processed"))
    }

    async fn fill_form(&self, cx: &StageContext<'_>) -> StepResult {
        let title = cx
            .require(TITLE_INPUT, "title input", cx.timings.element_wait())
            .await?;
        cx.page.click(&title).await?;
        cx.page.fill(&title, cx.job.title()).await?;
        cx.info("Title filled");

        let editor = cx
            .require(DESCRIPTION_EDITOR, "description input", cx.timings.element_wait())
            .await?;
        cx.page.click(&editor).await?;
        cx.page
            .fill(&editor, &description_with_tags(cx.job.description(), cx.job.tags()))
            .await?;
        cx.info("Description and tags filled");

        if !cx.job.options().declare_original {
            return Ok(StepOutcome::done("not declared original"));
        }
        let checkbox = cx
            .require(ORIGINAL_CHECKBOX, "original declaration checkbox", cx.timings.element_wait())
            .await?;
        cx.page.check(&checkbox).await?;
        cx.info("Original content declaration checked");

        let agreed = self.resolve_original_modal(cx).await?;
        Ok(StepOutcome::done(if agreed {
            "declared original"
        } else {
            "declared original without dialog"
        }))
    }

    async fn await_ready(&self, cx: &StageContext<'_>) -> StepResult {
        if !cx
            .appears(UPLOAD_CONFIRMED, cx.timings.readiness_wait())
            .await?
        {
            return Err(UploadError::timeout("upload confirmation"));
        }
        cx.pause(cx.timings.settle()).await;
        cx.info("Video upload confirmed");
        Ok(StepOutcome::done("attached to draft"))
    }

    async fn publish(&self, cx: &StageContext<'_>) -> StepResult {
        cx.click_by_text(PRIMARY_BUTTON, "发表", "'发表' button")
            .await?;
        cx.info("Submit button clicked");
        cx.pause(cx.timings.settle()).await;
        Ok(StepOutcome::done("submitted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::job::JobOptions;
    use crate::logger::LogLevel;
    use crate::platforms::test_support::{Fixture, run, run_logged};
    use crate::testing::{MockPage, PageCall};

    const MODAL_WRAPPERS: &str = r#"div.weui-desktop-dialog:has(h3.weui-desktop-dialog__title:text("原创权益")) div.original-proto-wrapper"#;
    const MODAL_BUTTONS: &str = r#"div.weui-desktop-dialog:has(h3.weui-desktop-dialog__title:text("原创权益")) button.weui-desktop-btn.weui-desktop-btn_primary"#;

    fn post_page() -> MockPage {
        MockPage::new()
            .element(DROP_ZONE)
            .element(FILE_INPUT)
            .element(PROCESSED)
            .element(TITLE_INPUT)
            .element(DESCRIPTION_EDITOR)
            .element(ORIGINAL_CHECKBOX)
            .element(UPLOAD_CONFIRMED)
            .elements(PRIMARY_BUTTON, &["保存草稿", "发表"])
    }

    fn with_modal(page: MockPage) -> MockPage {
        page.element(ORIGINAL_MODAL_TITLE)
            .elements(MODAL_WRAPPERS, &["原创说明", "我已阅读并同意《原创声明须知》"])
            .element(&format!(
                "{MODAL_WRAPPERS} >> nth=1 >> input.ant-checkbox-input[type='checkbox']"
            ))
            .elements(MODAL_BUTTONS, &["取消", "声明原创"])
    }

    #[test]
    fn tags_go_on_their_own_line() {
        let tags = vec!["#旅行".to_string(), "#日常".to_string()];
        assert_eq!(description_with_tags("周末", &tags), "周末\n#旅行 #日常");
        assert_eq!(description_with_tags("周末", &[]), "周末");
    }

    #[tokio::test]
    async fn originality_dialog_is_agreed_inline() {
        let fixture = Fixture::video(&PROFILE);
        let page = with_modal(post_page());

        let (report, logger) = run_logged(&WeixinChannels, &fixture, &page).await;
        assert!(report.succeeded(), "{report:?}");
        assert!(page.calls().contains(&PageCall::Check(Target::first(format!(
            "{MODAL_WRAPPERS} >> nth=1 >> input.ant-checkbox-input[type='checkbox']"
        )))));
        assert!(
            page.calls()
                .contains(&PageCall::Click(Target::nth(MODAL_BUTTONS, 1)))
        );
        assert!(
            page.calls()
                .contains(&PageCall::Click(Target::nth(PRIMARY_BUTTON, 1)))
        );
        // The dialog stays in the mock DOM, so closing it is only warned about.
        assert_eq!(
            logger.messages(LogLevel::Warning),
            vec!["Original content modal is still open"]
        );
    }

    #[tokio::test]
    async fn absent_dialog_only_warns() {
        let fixture = Fixture::video(&PROFILE);
        let (report, logger) = run_logged(&WeixinChannels, &fixture, &post_page()).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(
            logger.messages(LogLevel::Warning),
            vec!["Original content modal did not appear"]
        );
    }

    #[tokio::test]
    async fn dialog_without_agreement_checkbox_fails() {
        let fixture = Fixture::video(&PROFILE);
        let page = post_page()
            .element(ORIGINAL_MODAL_TITLE)
            .elements(MODAL_WRAPPERS, &["原创说明"]);

        let report = run(&WeixinChannels, &fixture, &page).await;
        assert_eq!(
            report.failure().unwrap().to_string(),
            "agreement checkbox in originality dialog not found"
        );
        assert_eq!(page.clicks(PRIMARY_BUTTON), 0);
    }

    #[tokio::test]
    async fn dialog_without_confirm_button_fails() {
        let fixture = Fixture::video(&PROFILE);
        let page = post_page()
            .element(ORIGINAL_MODAL_TITLE)
            .elements(MODAL_WRAPPERS, &["原创说明", "我已阅读并同意《原创声明须知》"])
            .element(&format!(
                "{MODAL_WRAPPERS} >> nth=1 >> input.ant-checkbox-input[type='checkbox']"
            ))
            .elements(MODAL_BUTTONS, &["取消"]);

        let report = run(&WeixinChannels, &fixture, &page).await;
        assert_eq!(report.failed_stage(), Some(Stage::FormFill));
        assert_eq!(
            report.failure().unwrap().to_string(),
            "'声明原创' button in originality dialog not found"
        );
        assert_eq!(page.clicks(MODAL_BUTTONS), 0);
        assert_eq!(page.clicks(PRIMARY_BUTTON), 0);
    }

    #[tokio::test]
    async fn declaration_is_skipped_when_not_original() {
        let fixture = Fixture::video(&PROFILE).with_options(JobOptions {
            declare_original: false,
            ..Default::default()
        });
        let page = post_page();
        let report = run(&WeixinChannels, &fixture, &page).await;
        assert!(report.succeeded(), "{report:?}");
        assert!(
            !page
                .calls()
                .iter()
                .any(|call| matches!(call, PageCall::Check(_)))
        );
    }

    #[tokio::test]
    async fn tags_are_appended_to_the_description() {
        let fixture = Fixture::video(&PROFILE).with_tags(&["#a", "#b"]);
        let page = post_page();
        run(&WeixinChannels, &fixture, &page).await;
        assert_eq!(
            page.filled(DESCRIPTION_EDITOR).as_deref(),
            Some("description\n#a #b")
        );
    }
}
