//! Uniform `{success, message}` result handed back to the workflow host.

use serde::{Deserialize, Serialize};

use crate::error::{Stage, UploadError};
use crate::logger::NodeLogger;
use crate::pipeline::PipelineReport;
use crate::platform::PlatformProfile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeResult {
    pub success: bool,
    pub message: String,
    /// Stage the failure is attributed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl NodeResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            stage: None,
        }
    }

    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            stage: Some(stage),
        }
    }
}

/// Turn a job failure into a result, narrating it on the logging sink.
pub fn report_failure(
    profile: &PlatformProfile,
    stage: Stage,
    error: &UploadError,
    logger: &dyn NodeLogger,
) -> NodeResult {
    logger.error(&format!("{} upload failed: {error}", profile.display_name));
    let mut message = error.to_string();
    if message.trim().is_empty() {
        message = format!("{} upload failed during {stage}", profile.display_name);
    }
    NodeResult::failure(stage, message)
}

/// Success only means no stage failed; nothing confirms the post went live.
pub fn report_pipeline(
    profile: &PlatformProfile,
    report: PipelineReport,
    logger: &dyn NodeLogger,
) -> NodeResult {
    match report.into_failure() {
        None => {
            let message = profile.success_message();
            logger.info(&message);
            NodeResult::success(message)
        }
        Some(failure) => report_failure(profile, failure.stage, &failure.error, logger),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogLevel, RecordingLogger};
    use crate::platforms::kuaishou;
    use serde_json::json;

    #[test]
    fn failures_always_carry_a_message() {
        let logger = RecordingLogger::new();
        let result = report_failure(
            &kuaishou::PROFILE,
            Stage::Publish,
            &UploadError::ProcessingFailed(String::new()),
            &logger,
        );
        assert!(!result.success);
        assert_eq!(result.message, "Kuaishou upload failed during publish");
        assert_eq!(logger.messages(LogLevel::Error).len(), 1);
    }

    #[test]
    fn stage_is_serialized_only_on_failure() {
        assert_eq!(
            serde_json::to_value(NodeResult::success("ok")).unwrap(),
            json!({ "success": true, "message": "ok" })
        );
        assert_eq!(
            serde_json::to_value(NodeResult::failure(Stage::Upload, "boom")).unwrap(),
            json!({ "success": false, "message": "boom", "stage": "upload" })
        );
    }
}
