//! Runs one upload job through its stages on an exclusively owned page.

use castflow_browser::{BrowserLauncher, LaunchRequest, Viewport};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::credentials::load_session_seed;
use crate::error::{Stage, UploadError};
use crate::job::UploadJob;
use crate::logger::NodeLogger;
use crate::platform::{Platform, StepResult};
use crate::stage::StageContext;
use crate::timings::Timings;

/// Page-driving stages in execution order.
pub const STAGES: [Stage; 5] = [
    Stage::Open,
    Stage::Upload,
    Stage::FormFill,
    Stage::Readiness,
    Stage::Publish,
];

/// How jobs are run, shared by every node of a registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunSettings {
    /// Upload pages are run visibly unless asked otherwise.
    pub headless: bool,
    pub viewport: Option<Viewport>,
    pub timings: Timings,
}

impl RunSettings {
    pub fn instant() -> Self {
        Self {
            timings: Timings::instant(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub detail: String,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: UploadError,
}

/// What happened to one job, stage by stage.
#[derive(Debug)]
pub struct PipelineReport {
    pub platform: &'static str,
    pub job_id: Uuid,
    pub stages: Vec<StageReport>,
    failure: Option<StageFailure>,
}

impl PipelineReport {
    fn new(platform: &'static str, job_id: Uuid) -> Self {
        Self {
            platform,
            job_id,
            stages: Vec::new(),
            failure: None,
        }
    }

    fn fail(mut self, stage: Stage, error: UploadError) -> Self {
        self.failure = Some(StageFailure { stage, error });
        self
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failure(&self) -> Option<&UploadError> {
        self.failure.as_ref().map(|failure| &failure.error)
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        self.failure.as_ref().map(|failure| failure.stage)
    }

    pub fn into_failure(self) -> Option<StageFailure> {
        self.failure
    }
}

/// Seed a session from the job's credential blob, launch a page, run every
/// stage in order and close the page on every exit path.
///
/// Never returns an error: failures are recorded in the report together
/// with the stage that produced them.
///
/// A stage that panics skips `close`. The page is dropped while unwinding
/// instead, and the Playwright driver is spawned with `kill_on_drop`, so the
/// browser process still goes away with it.
pub async fn run_job(
    platform: &dyn Platform,
    job: &UploadJob,
    launcher: &dyn BrowserLauncher,
    settings: &RunSettings,
    logger: &dyn NodeLogger,
) -> PipelineReport {
    let profile = platform.profile();
    let report = PipelineReport::new(profile.id, job.id());

    let seed = match load_session_seed(job.credential()) {
        Ok(seed) => seed,
        Err(error) => return report.fail(Stage::Session, error.into()),
    };
    info!(platform = profile.id, job = %job.id(), seed = seed.kind(), "Launching browser");

    let request = LaunchRequest {
        headless: settings.headless,
        seed,
        viewport: settings.viewport,
    };
    let page = match launcher.launch(request).await {
        Ok(page) => page,
        Err(error) => return report.fail(Stage::Session, error.into()),
    };

    let cx = StageContext::new(page.as_ref(), job, &settings.timings, logger);
    let report = run_stages(platform, &cx, report).await;

    if let Err(error) = page.close().await {
        warn!(platform = profile.id, job = %job.id(), %error, "Failed to close browser");
    }
    report
}

async fn run_stages(
    platform: &dyn Platform,
    cx: &StageContext<'_>,
    mut report: PipelineReport,
) -> PipelineReport {
    for stage in STAGES {
        let started = Instant::now();
        let result: StepResult = match stage {
            Stage::Open => platform.open(cx).await,
            Stage::Upload => platform.upload(cx).await,
            Stage::FormFill => platform.fill_form(cx).await,
            Stage::Readiness => platform.await_ready(cx).await,
            Stage::Publish => platform.publish(cx).await,
            Stage::Validate | Stage::Session => continue,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(outcome) => {
                info!(
                    platform = report.platform,
                    job = %report.job_id,
                    stage = %stage,
                    elapsed_ms,
                    detail = %outcome.detail,
                    "Stage completed"
                );
                report.stages.push(StageReport {
                    stage,
                    detail: outcome.detail,
                    elapsed_ms,
                });
            }
            Err(error) => {
                warn!(
                    platform = report.platform,
                    job = %report.job_id,
                    stage = %stage,
                    elapsed_ms,
                    %error,
                    "Stage failed"
                );
                return report.fail(stage, error);
            }
        }
    }
    report
}
