//! Browser boundary for CastFlow upload nodes.
//!
//! Upload procedures are written against [`PageSession`], a selector-level
//! page surface, and obtain pages through a [`BrowserLauncher`]. The
//! production launcher runs a generated Playwright script under Node.js and
//! talks to it over a line-delimited JSON protocol:
//! - one driver process per job, killed when the page is dropped
//! - per-command timeouts enforced on both sides of the pipe
//! - runtime probing for Node.js and the Playwright package

pub mod error;
pub mod page;
pub mod playwright;
pub mod protocol;
pub mod script;
pub mod types;

pub use error::{BrowserError, Result};
pub use page::{BrowserLauncher, PageSession};
pub use playwright::{PlaywrightConfig, PlaywrightLauncher, PlaywrightPage, RuntimeProbe};
pub use types::{
    Cookie, LaunchRequest, LoadState, SameSite, SessionSeed, Target, Viewport, WaitState,
};
