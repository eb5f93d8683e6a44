//! Workflow-node contract: declared schemas plus one async entry point.

use async_trait::async_trait;
use castflow_browser::BrowserLauncher;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Result, Stage, UploadError};
use crate::job::{JobOptions, JobRequest, PUBLISH_TIME_FORMAT, UploadJob, parse_publish_time};
use crate::logger::NodeLogger;
use crate::media::{MediaKind, parse_media_paths};
use crate::pipeline::{RunSettings, run_job};
use crate::platform::{JobOption, Platform, PlatformProfile};
use crate::report::{NodeResult, report_failure, report_pipeline};
use crate::tags::{TagDelimiter, parse_tags};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Boolean,
}

/// Rendering hint for the host's input form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Widget {
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputField {
    pub key: String,
    pub label: String,
    pub description: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<Widget>,
}

impl InputField {
    fn new(key: &str, label: &str, description: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            description: description.into(),
            field_type,
            required: false,
            default: None,
            widget: None,
        }
    }

    pub fn string(key: &str, label: &str, description: impl Into<String>) -> Self {
        Self::new(key, label, description, FieldType::String)
    }

    pub fn boolean(key: &str, label: &str, description: impl Into<String>) -> Self {
        Self::new(key, label, description, FieldType::Boolean)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn file(mut self) -> Self {
        self.widget = Some(Widget::File);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputField {
    pub key: String,
    pub label: String,
    pub description: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSchema {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub inputs: Vec<InputField>,
    pub outputs: Vec<OutputField>,
}

/// A node the workflow host can list, render and execute.
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    /// Registry key.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn category(&self) -> &str;

    fn inputs(&self) -> Vec<InputField>;

    fn outputs(&self) -> Vec<OutputField>;

    fn schema(&self) -> NodeSchema {
        NodeSchema {
            id: self.id().to_string(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            category: self.category().to_string(),
            inputs: self.inputs(),
            outputs: self.outputs(),
        }
    }

    /// Run the node to completion. Never panics on bad input and never
    /// returns an error; every failure becomes a failed [`NodeResult`].
    async fn execute(&self, inputs: &Value, logger: &dyn NodeLogger) -> NodeResult;
}

/// Outputs shared by every upload node.
pub fn result_outputs() -> Vec<OutputField> {
    vec![
        OutputField {
            key: "success".to_string(),
            label: "Success".to_string(),
            description: "Whether the upload was successful.".to_string(),
            field_type: FieldType::Boolean,
        },
        OutputField {
            key: "message".to_string(),
            label: "Message".to_string(),
            description: "Result message or error.".to_string(),
            field_type: FieldType::String,
        },
    ]
}

/// Upload node for one platform.
pub struct UploaderNode {
    platform: Arc<dyn Platform>,
    launcher: Arc<dyn BrowserLauncher>,
    settings: RunSettings,
}

impl UploaderNode {
    pub fn new(
        platform: Arc<dyn Platform>,
        launcher: Arc<dyn BrowserLauncher>,
        settings: RunSettings,
    ) -> Self {
        Self {
            platform,
            launcher,
            settings,
        }
    }

    pub fn profile(&self) -> &'static PlatformProfile {
        self.platform.profile()
    }

    fn media_input(profile: &PlatformProfile) -> InputField {
        match profile.media {
            MediaKind::Video => InputField::string(
                profile.media_field,
                "Video File Path",
                "Path to the video file to upload.",
            ),
            MediaKind::Images => InputField::string(
                profile.media_field,
                "Image Files",
                "Image paths separated by commas or whitespace, or a JSON array.",
            ),
        }
        .required(true)
        .file()
    }

    fn option_input(option: JobOption) -> InputField {
        match option {
            JobOption::DeclareOriginal => InputField::boolean(
                option.input_key(),
                "Declare Original",
                "Whether to declare the video as original content.",
            )
            .with_default(json!(true)),
            JobOption::MadeForKids => InputField::boolean(
                option.input_key(),
                "Made for Kids",
                "Whether the video is made for kids.",
            )
            .with_default(json!(false)),
            JobOption::PublishTime => InputField::string(
                option.input_key(),
                "Publish Time",
                "Scheduled publish time (YYYY-MM-DD HH:MM:SS). Leave empty to publish immediately.",
            ),
        }
    }

    /// Turn raw node inputs into a job request. Limits are applied later by
    /// [`UploadJob::prepare`].
    fn parse_request(&self, inputs: &Value, logger: &dyn NodeLogger) -> Result<JobRequest> {
        let profile = self.profile();
        let empty = Map::new();
        let fields = match inputs {
            Value::Object(fields) => fields,
            Value::Null => &empty,
            _ => return Err(UploadError::invalid("inputs", "expected an object")),
        };

        let media = match profile.media {
            MediaKind::Video => vec![PathBuf::from(required_text(fields, profile.media_field)?.trim())],
            MediaKind::Images => parse_media_paths(present(fields, profile.media_field)?),
        };
        let title = required_text(fields, "title")?;
        let description = match profile.description_field {
            Some(key) if profile.description_required => required_text(fields, key)?,
            Some(key) => optional_text(fields, key)?.unwrap_or_default(),
            None => String::new(),
        };

        let tags = if profile.tags.accepts_tags() {
            let absent = Value::Null;
            let raw = if profile.tags_required {
                present(fields, "tags")?
            } else {
                fields.get("tags").unwrap_or(&absent)
            };
            parse_tags(raw, profile.tags.delimiter)
        } else {
            Vec::new()
        };

        let defaults = JobOptions::default();
        let options = JobOptions {
            declare_original: if profile.supports(JobOption::DeclareOriginal) {
                flag(fields, JobOption::DeclareOriginal.input_key(), defaults.declare_original)?
            } else {
                defaults.declare_original
            },
            made_for_kids: if profile.supports(JobOption::MadeForKids) {
                flag(fields, JobOption::MadeForKids.input_key(), defaults.made_for_kids)?
            } else {
                defaults.made_for_kids
            },
        };

        let scheduled_at = if profile.supports(JobOption::PublishTime) {
            match optional_text(fields, JobOption::PublishTime.input_key())? {
                Some(raw) if !raw.trim().is_empty() => match parse_publish_time(&raw) {
                    Ok(at) => Some(at),
                    Err(error) => {
                        logger.warning(&format!(
                            "Invalid publish time format ({error}), expected {PUBLISH_TIME_FORMAT}. Will publish immediately."
                        ));
                        None
                    }
                },
                _ => None,
            }
        } else {
            None
        };

        Ok(JobRequest {
            media,
            title,
            description,
            tags,
            scheduled_at,
            credential: PathBuf::from(required_text(fields, "cookie_file")?.trim()),
            options,
        })
    }
}

#[async_trait]
impl WorkflowNode for UploaderNode {
    fn id(&self) -> &str {
        self.profile().id
    }

    fn name(&self) -> &str {
        self.profile().node_name
    }

    fn description(&self) -> &str {
        self.profile().summary
    }

    fn category(&self) -> &str {
        self.profile().category
    }

    fn inputs(&self) -> Vec<InputField> {
        let profile = self.profile();
        let mut inputs = vec![Self::media_input(profile)];

        let title_hint = match profile.title_limit {
            Some(limit) => format!("Title of the post (max {limit} characters)."),
            None => "Title of the post.".to_string(),
        };
        inputs.push(InputField::string("title", "Title", title_hint).required(true));

        if let Some(key) = profile.description_field {
            let field = InputField::string(key, "Description", "Description of the post.")
                .required(profile.description_required);
            inputs.push(if profile.description_required {
                field
            } else {
                field.with_default(json!(""))
            });
        }

        if profile.tags.accepts_tags() {
            let mut hint = match profile.tags.delimiter {
                TagDelimiter::Comma => "Tags, comma separated or a JSON array.".to_string(),
                TagDelimiter::Newline => "Tags, one per line.".to_string(),
            };
            if let Some(max) = profile.tags.max_tags {
                hint.push_str(&format!(" At most {max} are used."));
            }
            inputs.push(InputField::string("tags", "Tags", hint).required(profile.tags_required));
        }

        inputs.extend(profile.options.iter().copied().map(Self::option_input));

        inputs.push(
            InputField::string(
                "cookie_file",
                "Cookie File Path",
                format!("Path to the {} cookies JSON file.", profile.display_name),
            )
            .required(true)
            .file(),
        );
        inputs
    }

    fn outputs(&self) -> Vec<OutputField> {
        result_outputs()
    }

    async fn execute(&self, inputs: &Value, logger: &dyn NodeLogger) -> NodeResult {
        let profile = self.profile();
        let job = match self
            .parse_request(inputs, logger)
            .and_then(|request| UploadJob::prepare(request, profile))
        {
            Ok(job) => job,
            Err(error) => return report_failure(profile, Stage::Validate, &error, logger),
        };

        logger.info(&format!(
            "Starting {} upload of {} file(s)",
            profile.display_name,
            job.media().len()
        ));
        let report = run_job(
            self.platform.as_ref(),
            &job,
            self.launcher.as_ref(),
            &self.settings,
            logger,
        )
        .await;
        report_pipeline(profile, report, logger)
    }
}

fn present<'v>(fields: &'v Map<String, Value>, key: &str) -> Result<&'v Value> {
    match fields.get(key) {
        None | Some(Value::Null) => Err(UploadError::invalid(key, "is required")),
        Some(value) => Ok(value),
    }
}

fn text_of(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(UploadError::invalid(key, "expected a string")),
    }
}

fn required_text(fields: &Map<String, Value>, key: &str) -> Result<String> {
    text_of(key, present(fields, key)?)
}

fn optional_text(fields: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => text_of(key, value).map(Some),
    }
}

/// Booleans may arrive as JSON booleans or as text from a command line.
fn flag(fields: &Map<String, Value>, key: &str, default: bool) -> Result<bool> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(UploadError::invalid(key, format!("expected a boolean, got `{text}`"))),
        },
        Some(_) => Err(UploadError::invalid(key, "expected a boolean")),
    }
}
