use async_trait::async_trait;
use castflow_browser::{LoadState, Target};
use tracing::debug;

use crate::error::UploadError;
use crate::media::MediaKind;
use crate::platform::{Platform, PlatformProfile, StepOutcome, StepResult};
use crate::stage::StageContext;
use crate::tags::{TagDelimiter, TagPlacement, TagPolicy};

pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "bilibili",
    node_name: "Bilibili Video Upload",
    display_name: "Bilibili",
    category: "Bilibili",
    summary: "Upload a video to Bilibili using browser automation.",
    publish_url: "https://member.bilibili.com/platform/home",
    wait_until: LoadState::Load,
    media: MediaKind::Video,
    media_field: "video_path",
    description_field: Some("description"),
    description_required: true,
    tags: TagPolicy::new(TagDelimiter::Comma, TagPlacement::KeyedEntry),
    tags_required: true,
    title_limit: None,
    options: &[],
    verify_on: "Bilibili",
};

const NAV_UPLOAD: &str = "#nav_upload_btn";
const UPLOAD_BUTTON: &str = "div.upload-btn";
const FILE_INPUT: &str = "input[type='file']";
const NOT_NOW_BUTTON: &str = "button:has-text('暂不设置')";
const NOT_NOW_SPAN: &str = "span:has-text('暂不设置')";
const PRESET_TAG_CLOSE: &str = ".input-container .tag-pre-wrp .close.icon-sprite.icon-sprite-off";
const TAG_INPUT: &str = "input[placeholder*='标签']";
const TITLE_INPUT: &str = "input[placeholder*='标题']";
const DESCRIPTION_EDITOR: &str = "div.ql-editor";
const SUBMIT: &str = "span:has-text('立即投稿')";

pub struct Bilibili;

impl Bilibili {
    async fn dismiss_not_now(&self, cx: &StageContext<'_>) -> bool {
        for _ in 0..cx.timings.not_now_rounds {
            if cx.dismiss(NOT_NOW_BUTTON, cx.timings.probe_wait()).await
                || cx.dismiss(NOT_NOW_SPAN, cx.timings.probe_wait() / 2).await
            {
                return true;
            }
            cx.pause(cx.timings.step_pause()).await;
        }
        false
    }

    /// Remove tags the page pre-fills from its own suggestions.
    async fn clear_preset_tags(&self, cx: &StageContext<'_>) -> crate::error::Result<usize> {
        let mut removed = 0;
        for _ in 0..cx.timings.preset_tag_rounds {
            let total = cx.page.count(PRESET_TAG_CLOSE).await?;
            if total == 0 {
                break;
            }
            // Removing a tag shifts later indices, so walk backwards.
            for index in (0..total).rev() {
                let close = Target::nth(PRESET_TAG_CLOSE, index);
                match cx.page.is_visible(&close).await {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(error) => {
                        debug!(%error, "Preset tag visibility check failed");
                        continue;
                    }
                }
                match cx.page.click(&close).await {
                    Ok(()) => removed += 1,
                    Err(error) => debug!(%error, "Preset tag removal failed"),
                }
                cx.pause(cx.timings.short_pause()).await;
            }
            cx.pause(cx.timings.short_pause()).await;
        }
        Ok(removed)
    }
}

#[async_trait]
impl Platform for Bilibili {
    fn profile(&self) -> &'static PlatformProfile {
        &PROFILE
    }

    async fn open(&self, cx: &StageContext<'_>) -> StepResult {
        cx.page
            .goto(PROFILE.publish_url, PROFILE.wait_until, cx.timings.navigation())
            .await?;
        let nav = cx
            .require(NAV_UPLOAD, "upload navigation button", cx.timings.element_wait())
            .await?;
        cx.page.click(&nav).await?;

        let upload = cx
            .require(UPLOAD_BUTTON, "upload button", cx.timings.element_wait())
            .await?;
        cx.page.scroll_into_view(&upload).await?;
        cx.page.click(&upload).await?;
        cx.info("Opened Bilibili upload form");
        Ok(StepOutcome::done("upload form open"))
    }

    async fn upload(&self, cx: &StageContext<'_>) -> StepResult {
        // Several hidden inputs exist; the first that takes the file wins.
        let total = cx.page.count(FILE_INPUT).await?;
        let mut attached = None;
        for index in 0..total {
            let input = Target::nth(FILE_INPUT, index);
            match cx.page.set_input_files(&input, cx.job.media()).await {
                Ok(()) => {
                    cx.page.dispatch_event(&input, "change").await?;
                    attached = Some(index);
                    break;
                }
                Err(error) => debug!(index, %error, "File input rejected the video"),
            }
        }
        let Some(index) = attached else {
            return Err(UploadError::control("usable file input"));
        };
        cx.info("Video file selected");
        cx.pause(cx.timings.settle()).await;

        if self.dismiss_not_now(cx).await {
            cx.info("Dismissed setup prompt");
        }
        Ok(StepOutcome::done(format!("video attached to file input #{index}")))
    }

    async fn fill_form(&self, cx: &StageContext<'_>) -> StepResult {
        let removed = self.clear_preset_tags(cx).await?;
        if removed > 0 {
            cx.info(&format!("Removed {removed} preset tag(s)"));
        }

        for tag in cx.job.tags() {
            let input = cx
                .require(TAG_INPUT, "tag input", cx.timings.quick_wait())
                .await?;
            cx.page.fill(&input, tag).await?;
            cx.page.press(Some(&input), "Enter").await?;
            cx.pause(cx.timings.short_pause()).await;
        }

        let title = cx
            .require(TITLE_INPUT, "title input", cx.timings.quick_wait())
            .await?;
        cx.page.fill(&title, cx.job.title()).await?;

        let editor = cx
            .require(DESCRIPTION_EDITOR, "description editor", cx.timings.quick_wait())
            .await?;
        let wanted = cx.job.description().trim();
        let mut settled = false;
        for _ in 0..cx.timings.description_attempts {
            cx.page.click(&editor).await?;
            cx.page.fill(&editor, cx.job.description()).await?;
            if cx.page.inner_text(&editor).await?.trim() == wanted {
                settled = true;
                break;
            }
            cx.pause(cx.timings.short_pause()).await;
        }
        if !settled {
            cx.warn("Description editor did not keep the text");
        }

        cx.info("Title, description and tags filled");
        Ok(StepOutcome::done(format!(
            "{} tag(s), {removed} preset tag(s) removed",
            cx.job.tags().len()
        )))
    }

    async fn publish(&self, cx: &StageContext<'_>) -> StepResult {
        let submit = cx
            .require(SUBMIT, "submit button", cx.timings.quick_wait())
            .await?;
        cx.page.click(&submit).await?;
        cx.info("Submit button clicked");
        cx.pause(cx.timings.retry_pause()).await;
        Ok(StepOutcome::done("submitted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::test_support::{Fixture, run, run_with};
    use crate::testing::{MockPage, PageCall};
    use crate::timings::Timings;

    fn form_page() -> MockPage {
        MockPage::new()
            .element(NAV_UPLOAD)
            .element(UPLOAD_BUTTON)
            .elements(FILE_INPUT, &["", ""])
            .element(TAG_INPUT)
            .element(TITLE_INPUT)
            .element(DESCRIPTION_EDITOR)
            .element(SUBMIT)
    }

    #[tokio::test]
    async fn falls_through_to_an_input_that_accepts_the_file() {
        let fixture = Fixture::video(&PROFILE).with_tags(&["vlog"]);
        let page = form_page().rejecting_files(FILE_INPUT, 0);

        let report = run(&Bilibili, &fixture, &page).await;
        assert!(report.succeeded(), "{report:?}");
        assert!(page.calls().contains(&PageCall::DispatchEvent(
            Target::nth(FILE_INPUT, 1),
            "change".to_string()
        )));
    }

    #[tokio::test]
    async fn no_usable_input_is_terminal() {
        let fixture = Fixture::video(&PROFILE).with_tags(&["vlog"]);
        let page = form_page()
            .rejecting_files(FILE_INPUT, 0)
            .rejecting_files(FILE_INPUT, 1);

        let report = run(&Bilibili, &fixture, &page).await;
        assert_eq!(
            report.failure().unwrap().to_string(),
            "usable file input not found"
        );
        assert_eq!(page.clicks(SUBMIT), 0);
    }

    #[tokio::test]
    async fn each_tag_is_confirmed_with_enter() {
        let fixture = Fixture::video(&PROFILE).with_tags(&["a", "b"]);
        let page = form_page();
        run(&Bilibili, &fixture, &page).await;

        let enters = page
            .calls()
            .iter()
            .filter(|call| matches!(call, PageCall::Press(_, key) if key == "Enter"))
            .count();
        assert_eq!(enters, 2);
    }

    #[tokio::test]
    async fn preset_tags_are_removed_last_first() {
        let fixture = Fixture::video(&PROFILE).with_tags(&["a"]);
        let page = form_page().count_sequence(PRESET_TAG_CLOSE, &[2, 0]);
        run(&Bilibili, &fixture, &page).await;

        let removed: Vec<usize> = page
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                PageCall::Click(target) if target.selector == PRESET_TAG_CLOSE => Some(target.nth),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec![1, 0]);
    }

    #[tokio::test]
    async fn preset_tag_rounds_come_from_timings() {
        let fixture = Fixture::video(&PROFILE).with_tags(&["a"]);
        // The close button never goes away, so only the round budget stops the loop.
        let page = form_page().element(PRESET_TAG_CLOSE);
        let timings = Timings {
            preset_tag_rounds: 2,
            ..Timings::instant()
        };

        let (report, _) = run_with(&Bilibili, &fixture, &page, timings).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(page.clicks(PRESET_TAG_CLOSE), 2);
    }
}
