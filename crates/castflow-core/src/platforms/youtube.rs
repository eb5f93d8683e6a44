use async_trait::async_trait;
use castflow_browser::{LoadState, Target};

use crate::error::UploadError;
use crate::media::MediaKind;
use crate::platform::{JobOption, Platform, PlatformProfile, StepOutcome, StepResult};
use crate::stage::StageContext;
use crate::tags::{TagDelimiter, TagPlacement, TagPolicy};

pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "youtube",
    node_name: "YouTube Video Upload",
    display_name: "YouTube",
    category: "YouTube",
    summary: "Upload a video to YouTube using browser automation.",
    publish_url: "https://studio.youtube.com",
    wait_until: LoadState::Load,
    media: MediaKind::Video,
    media_field: "video_path",
    description_field: Some("description"),
    description_required: true,
    tags: TagPolicy::new(TagDelimiter::Comma, TagPlacement::FieldList),
    tags_required: false,
    title_limit: Some(100),
    options: &[JobOption::MadeForKids],
    verify_on: "YouTube Studio",
};

const CREATE_BUTTON: &str = r#"div.ytcp-button-shape-impl__button-text-content:text("创建")"#;
const UPLOAD_MENU_ITEM: &str = r#"tp-yt-paper-item[test-id="upload-beta"]"#;
const FILE_INPUT: &str = r#"input[type="file"]"#;
const TITLE_BOX: &str =
    r#"div#textbox[contenteditable="true"][aria-label*="添加一个可描述你视频的标题"]"#;
const DESCRIPTION_BOX: &str =
    r#"div#textbox[contenteditable="true"][aria-label*="向观看者介绍你的视频"]"#;
const SHOW_MORE: &str = r#"ytcp-button[aria-label="Show more"]"#;
const TAG_INPUT: &str = r#"input[aria-label="Tags"]"#;
const MADE_FOR_KIDS: &str = r#"tp-yt-paper-radio-button[name="VIDEO_MADE_FOR_KIDS_MFK"]"#;
const NOT_MADE_FOR_KIDS: &str = r#"tp-yt-paper-radio-button[name="VIDEO_MADE_FOR_KIDS_NOT_MFK"]"#;
const CONTINUE_BUTTON: &str = r#"div.ytcp-button-shape-impl__button-text-content:text("继续")"#;
const PUBLIC_RADIO: &str = r#"tp-yt-paper-radio-button[name="PUBLIC"]"#;
const PUBLISH_BUTTON: &str = r#"div.ytcp-button-shape-impl__button-text-content:text("发布")"#;

pub struct Youtube;

impl Youtube {
    /// Title and description are contenteditable boxes that ignore `fill`.
    async fn fill_textbox(
        &self,
        cx: &StageContext<'_>,
        selector: &str,
        value: &str,
    ) -> crate::error::Result<bool> {
        cx.page.click(&Target::first(selector)).await?;
        cx.set_inner_text(selector, value).await
    }

    async fn fill_tags(&self, cx: &StageContext<'_>) -> crate::error::Result<()> {
        if !cx.click_if_present(SHOW_MORE).await? {
            cx.warn("Show more button not found");
            return Ok(());
        }
        cx.pause(cx.timings.step_pause()).await;

        if cx.present(TAG_INPUT).await? {
            cx.page
                .fill(&Target::first(TAG_INPUT), &cx.job.tags().join(","))
                .await?;
            cx.info("Tags filled");
        } else {
            cx.warn("Tag input not found");
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for Youtube {
    fn profile(&self) -> &'static PlatformProfile {
        &PROFILE
    }

    async fn open(&self, cx: &StageContext<'_>) -> StepResult {
        cx.page
            .goto(PROFILE.publish_url, PROFILE.wait_until, cx.timings.navigation())
            .await?;
        cx.info("Opening upload dialog");

        if cx.click_if_present(CREATE_BUTTON).await? {
            cx.pause(cx.timings.step_pause()).await;
            cx.info("Clicked create button");
        } else {
            cx.warn("Create button not found");
        }
        if cx.click_if_present(UPLOAD_MENU_ITEM).await? {
            cx.pause(cx.timings.step_pause()).await;
            cx.info("Clicked upload menu item");
        } else {
            cx.warn("Upload menu item not found");
        }
        Ok(StepOutcome::done("upload dialog requested"))
    }

    async fn upload(&self, cx: &StageContext<'_>) -> StepResult {
        if !cx.present(FILE_INPUT).await? {
            return Err(UploadError::control("upload input"));
        }
        cx.page
            .set_input_files(&Target::first(FILE_INPUT), cx.job.media())
            .await?;
        cx.info("Video file selected");
        Ok(StepOutcome::done("video attached"))
    }

    async fn fill_form(&self, cx: &StageContext<'_>) -> StepResult {
        // The details page renders once the upload has been accepted.
        cx.require(TITLE_BOX, "title input", cx.timings.processing_wait())
            .await?;
        if !self.fill_textbox(cx, TITLE_BOX, cx.job.title()).await? {
            return Err(UploadError::control("title input"));
        }
        cx.info("Title filled");

        if cx.present(DESCRIPTION_BOX).await? {
            self.fill_textbox(cx, DESCRIPTION_BOX, cx.job.description())
                .await?;
            cx.info("Description filled");
        } else {
            cx.warn("Description input not found");
        }

        if !cx.job.tags().is_empty() {
            self.fill_tags(cx).await?;
        }

        let (audience, label) = if cx.job.options().made_for_kids {
            (MADE_FOR_KIDS, "Made for kids")
        } else {
            (NOT_MADE_FOR_KIDS, "Not made for kids")
        };
        if cx.click_if_present(audience).await? {
            cx.info(&format!("Selected '{label}'"));
        } else {
            cx.warn(&format!("'{label}' option not found"));
        }
        Ok(StepOutcome::done(format!("audience: {label}")))
    }

    async fn publish(&self, cx: &StageContext<'_>) -> StepResult {
        // Details, video elements and checks pages precede visibility.
        let mut steps = 0;
        while steps < cx.timings.wizard_steps {
            if !cx.click_if_present(CONTINUE_BUTTON).await? {
                cx.warn(&format!("Continue button {} not found", steps + 1));
                break;
            }
            steps += 1;
            cx.info(&format!("Clicked continue {steps}"));
            cx.pause(cx.timings.retry_pause()).await;
        }

        if cx.click_if_present(PUBLIC_RADIO).await? {
            cx.pause(cx.timings.step_pause()).await;
            cx.info("Selected public visibility");
        } else {
            cx.warn("Public visibility option not found");
        }

        if !cx.click_if_present(PUBLISH_BUTTON).await? {
            return Err(UploadError::control("publish button"));
        }
        cx.info("Clicked publish button");
        // Studio keeps processing after the click; give it time before teardown.
        cx.pause(cx.timings.settle() * 2).await;
        Ok(StepOutcome::done(format!(
            "published after {steps} wizard step(s)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::job::JobOptions;
    use crate::logger::LogLevel;
    use crate::platforms::test_support::{Fixture, run, run_logged, run_with};
    use crate::report::report_pipeline;
    use crate::timings::Timings;
    use crate::testing::{MockPage, PageCall};

    fn studio_page() -> MockPage {
        MockPage::new()
            .element(CREATE_BUTTON)
            .element(UPLOAD_MENU_ITEM)
            .element(FILE_INPUT)
            .element(TITLE_BOX)
            .element(DESCRIPTION_BOX)
            .element(SHOW_MORE)
            .element(TAG_INPUT)
            .element(MADE_FOR_KIDS)
            .element(NOT_MADE_FOR_KIDS)
            .count_sequence(CONTINUE_BUTTON, &[1, 1, 1, 0])
            .element(PUBLIC_RADIO)
            .element(PUBLISH_BUTTON)
    }

    #[tokio::test]
    async fn walks_the_wizard_and_publishes_publicly() {
        let fixture = Fixture::video(&PROFILE).with_tags(&["rust", "cli"]);
        let page = studio_page();

        let report = run(&Youtube, &fixture, &page).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(page.clicks(CONTINUE_BUTTON), 3);
        assert_eq!(page.clicks(PUBLIC_RADIO), 1);
        assert_eq!(page.clicks(PUBLISH_BUTTON), 1);
        assert_eq!(page.filled(TAG_INPUT).as_deref(), Some("rust,cli"));
        assert_eq!(page.clicks(NOT_MADE_FOR_KIDS), 1);
    }

    #[tokio::test]
    async fn made_for_kids_selects_the_matching_radio() {
        let fixture = Fixture::video(&PROFILE).with_options(JobOptions {
            made_for_kids: true,
            ..Default::default()
        });
        let page = studio_page();
        run(&Youtube, &fixture, &page).await;
        assert_eq!(page.clicks(MADE_FOR_KIDS), 1);
        assert_eq!(page.clicks(NOT_MADE_FOR_KIDS), 0);
    }

    #[tokio::test]
    async fn title_is_written_through_inner_text() {
        let fixture = Fixture::video(&PROFILE);
        let page = studio_page();
        run(&Youtube, &fixture, &page).await;

        let wrote_title = page.calls().iter().any(|call| {
            matches!(call, PageCall::Evaluate(_, arg) if arg["selector"] == TITLE_BOX && arg["value"] == "title")
        });
        assert!(wrote_title);
    }

    #[tokio::test]
    async fn missing_publish_button_fails_the_job() {
        let fixture = Fixture::video(&PROFILE);
        let page = studio_page().count_sequence(PUBLISH_BUTTON, &[0]);

        let (report, logger) = run_logged(&Youtube, &fixture, &page).await;
        assert_eq!(
            report.failure().unwrap().to_string(),
            "publish button not found"
        );
        assert_eq!(report.failed_stage(), Some(Stage::Publish));

        let result = report_pipeline(&PROFILE, report, &logger);
        assert!(!result.success);
        assert_eq!(result.stage, Some(Stage::Publish));
        assert!(
            logger
                .messages(LogLevel::Error)
                .iter()
                .any(|message| message.contains("publish button not found"))
        );
    }

    #[tokio::test]
    async fn wizard_step_budget_comes_from_timings() {
        let fixture = Fixture::video(&PROFILE);
        let page = studio_page();
        let timings = Timings {
            wizard_steps: 1,
            ..Timings::instant()
        };

        let (report, _) = run_with(&Youtube, &fixture, &page, timings).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(page.clicks(CONTINUE_BUTTON), 1);
        assert_eq!(page.clicks(PUBLISH_BUTTON), 1);
    }

    #[tokio::test]
    async fn optional_controls_only_warn() {
        let fixture = Fixture::video(&PROFILE).with_tags(&["x"]);
        let page = MockPage::new()
            .element(FILE_INPUT)
            .element(TITLE_BOX)
            .element(PUBLISH_BUTTON);

        let (report, logger) = run_logged(&Youtube, &fixture, &page).await;
        assert!(report.succeeded(), "{report:?}");
        let warnings = logger.messages(LogLevel::Warning);
        assert!(warnings.contains(&"Create button not found".to_string()));
        assert!(warnings.contains(&"Show more button not found".to_string()));
        assert!(warnings.contains(&"Continue button 1 not found".to_string()));
    }
}
