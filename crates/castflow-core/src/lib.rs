//! CastFlow Core - browser-driven publishing for workflow hosts.
//!
//! Each supported platform is exposed as a workflow node that takes a media
//! file, post metadata and a saved login session, then drives the
//! platform's web publishing page through [`castflow_browser`]:
//! - job validation and per-platform normalization (titles, tags, options)
//! - session seeding from cookie or storage-state blobs
//! - staged upload pipeline with bounded polling and guaranteed page cleanup
//! - uniform `{success, message}` results with stage attribution

pub mod credentials;
pub mod error;
pub mod job;
pub mod logger;
pub mod media;
pub mod node;
pub mod pipeline;
pub mod platform;
pub mod platforms;
pub mod poll;
pub mod registry;
pub mod report;
pub mod stage;
pub mod tags;
pub mod timings;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// ── Top-level re-exports ─────────────────────────────────────────────

pub use error::{CredentialError, Result, Stage, UploadError};
pub use job::{JobOptions, JobRequest, UploadJob};
pub use logger::{NodeLogger, TracingLogger};
pub use node::{FieldType, InputField, NodeSchema, OutputField, UploaderNode, Widget, WorkflowNode};
pub use pipeline::{PipelineReport, RunSettings, run_job};
pub use platform::{Platform, PlatformProfile};
pub use registry::{NodeRegistry, RegistryError};
pub use report::NodeResult;
pub use timings::Timings;
