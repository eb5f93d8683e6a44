//! Publishing procedures, one module per platform.

pub mod baijiahao;
pub mod bilibili;
pub mod douyin;
pub mod kuaishou;
pub mod weixin;
pub mod xiaohongshu;
pub mod youtube;

use std::sync::Arc;

use crate::platform::Platform;

pub use baijiahao::Baijiahao;
pub use bilibili::Bilibili;
pub use douyin::Douyin;
pub use kuaishou::Kuaishou;
pub use weixin::WeixinChannels;
pub use xiaohongshu::Xiaohongshu;
pub use youtube::Youtube;

/// Every built-in platform, image-post variant included.
pub fn all() -> Vec<Arc<dyn Platform>> {
    vec![
        Arc::new(Douyin),
        Arc::new(Bilibili),
        Arc::new(Baijiahao),
        Arc::new(Youtube),
        Arc::new(Kuaishou),
        Arc::new(Xiaohongshu::video()),
        Arc::new(Xiaohongshu::images()),
        Arc::new(WeixinChannels),
    ]
}

pub fn find(id: &str) -> Option<Arc<dyn Platform>> {
    all().into_iter().find(|platform| platform.profile().id == id)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDateTime;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::job::{JobOptions, JobRequest, UploadJob};
    use crate::logger::RecordingLogger;
    use crate::pipeline::{PipelineReport, RunSettings, run_job};
    use crate::platform::{Platform, PlatformProfile};
    use crate::testing::{MockLauncher, MockPage};
    use crate::timings::Timings;

    /// Media and cookie files on disk plus the request pointing at them.
    pub struct Fixture {
        _dir: TempDir,
        profile: &'static PlatformProfile,
        request: JobRequest,
    }

    impl Fixture {
        pub fn video(profile: &'static PlatformProfile) -> Self {
            Self::with_media(profile, &["clip.mp4".to_string()])
        }

        pub fn images(profile: &'static PlatformProfile, count: usize) -> Self {
            let names: Vec<String> = (1..=count).map(|index| format!("{index}.jpg")).collect();
            Self::with_media(profile, &names)
        }

        fn with_media(profile: &'static PlatformProfile, names: &[String]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let credential = dir.path().join("cookies.json");
            std::fs::write(&credential, r#"{"cookies": [], "origins": []}"#).unwrap();
            let media: Vec<PathBuf> = names
                .iter()
                .map(|name| {
                    let path = dir.path().join(name);
                    std::fs::write(&path, b"media").unwrap();
                    path
                })
                .collect();

            Self {
                _dir: dir,
                profile,
                request: JobRequest {
                    media,
                    title: "title".to_string(),
                    description: "description".to_string(),
                    credential,
                    ..Default::default()
                },
            }
        }

        pub fn with_tags(mut self, tags: &[&str]) -> Self {
            self.request.tags = tags.iter().map(|tag| tag.to_string()).collect();
            self
        }

        pub fn with_options(mut self, options: JobOptions) -> Self {
            self.request.options = options;
            self
        }

        pub fn with_schedule(mut self, at: NaiveDateTime) -> Self {
            self.request.scheduled_at = Some(at);
            self
        }

        pub fn job(&self) -> UploadJob {
            UploadJob::prepare(self.request.clone(), self.profile).unwrap()
        }
    }

    pub async fn run_logged(
        platform: &dyn Platform,
        fixture: &Fixture,
        page: &MockPage,
    ) -> (PipelineReport, RecordingLogger) {
        run_with(platform, fixture, page, Timings::instant()).await
    }

    /// Runs with `timings` in place of the instant defaults.
    pub async fn run_with(
        platform: &dyn Platform,
        fixture: &Fixture,
        page: &MockPage,
        timings: Timings,
    ) -> (PipelineReport, RecordingLogger) {
        let launcher = MockLauncher::new(page.clone());
        let logger = RecordingLogger::new();
        let settings = RunSettings {
            timings,
            ..RunSettings::default()
        };
        let report = run_job(platform, &fixture.job(), &launcher, &settings, &logger).await;
        (report, logger)
    }

    pub async fn run(platform: &dyn Platform, fixture: &Fixture, page: &MockPage) -> PipelineReport {
        run_logged(platform, fixture, page).await.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_resolvable() {
        let ids: Vec<&str> = all().iter().map(|platform| platform.profile().id).collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 8);
        assert_eq!(unique.len(), ids.len());
        assert!(find("xiaohongshu_images").is_some());
        assert!(find("tiktok").is_none());
    }
}
