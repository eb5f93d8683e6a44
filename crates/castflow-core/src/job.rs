//! Upload job model.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Result, UploadError};
use crate::media::MediaKind;
use crate::platform::PlatformProfile;

/// Format accepted for scheduled publish times.
pub const PUBLISH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Platform switches that only some forms expose.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobOptions {
    /// Declare the post as original content.
    pub declare_original: bool,
    /// Audience flag for child-directed content.
    pub made_for_kids: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            declare_original: true,
            made_for_kids: false,
        }
    }
}

/// Raw job parameters before platform limits are applied.
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    pub media: Vec<PathBuf>,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub credential: PathBuf,
    pub options: JobOptions,
}

/// A validated, platform-normalized upload job. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct UploadJob {
    id: Uuid,
    media: Vec<PathBuf>,
    title: String,
    description: String,
    tags: Vec<String>,
    scheduled_at: Option<NaiveDateTime>,
    credential: PathBuf,
    options: JobOptions,
}

impl UploadJob {
    /// Validate inputs against the filesystem and apply `profile` limits.
    ///
    /// Runs before any browser is opened so missing files fail fast.
    pub fn prepare(request: JobRequest, profile: &PlatformProfile) -> Result<Self> {
        if request.media.is_empty() {
            return Err(UploadError::invalid("media", "no media file given"));
        }
        if profile.media == MediaKind::Video && request.media.len() > 1 {
            return Err(UploadError::invalid(
                "media",
                format!("expected one video file, got {}", request.media.len()),
            ));
        }
        for path in &request.media {
            ensure_file(path, profile.media.label())?;
        }
        ensure_file(&request.credential, "cookie file")?;

        if request.title.trim().is_empty() {
            return Err(UploadError::invalid("title", "must not be empty"));
        }
        let title = match profile.title_limit {
            Some(limit) => truncate_chars(&request.title, limit),
            None => request.title,
        };

        Ok(Self {
            id: Uuid::new_v4(),
            media: request.media,
            title,
            description: request.description,
            tags: profile.tags.apply(request.tags),
            scheduled_at: request.scheduled_at,
            credential: request.credential,
            options: request.options,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn media(&self) -> &[PathBuf] {
        &self.media
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        self.scheduled_at
    }

    pub fn credential(&self) -> &Path {
        &self.credential
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }
}

fn ensure_file(path: &Path, what: &'static str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(UploadError::MissingFile {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// Keep at most `limit` characters (not bytes).
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

pub fn parse_publish_time(raw: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), PUBLISH_TIME_FORMAT)
}
