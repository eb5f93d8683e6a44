//! Playwright-backed [`BrowserLauncher`] driving a Node.js child process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{BrowserError, Result};
use crate::page::{BrowserLauncher, PageSession};
use crate::protocol::{CommandEnvelope, DriverCommand, parse_reply_line};
use crate::script::build_driver_script;
use crate::types::{LaunchRequest, LoadState, SessionSeed, Target, WaitState};

const DEFAULT_NODE_BINARY: &str = "node";
const DEFAULT_LAUNCH_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_GRACE_MS: u64 = 5_000;
const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;
const CLOSE_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaywrightConfig {
    /// Node.js executable used to run the driver.
    #[serde(default = "default_node_binary")]
    pub node_binary: String,
    /// Directory the driver runs in; `playwright` must be resolvable from it.
    #[serde(default)]
    pub driver_dir: Option<PathBuf>,
    #[serde(default = "default_launch_timeout_ms")]
    pub launch_timeout_ms: u64,
    /// Extra time granted on top of a command's own timeout before the
    /// reply is considered lost.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    /// Budget for commands that carry no explicit timeout (count, evaluate).
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default = "default_probe_before_launch")]
    pub probe_before_launch: bool,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            node_binary: default_node_binary(),
            driver_dir: None,
            launch_timeout_ms: default_launch_timeout_ms(),
            grace_ms: default_grace_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            probe_before_launch: default_probe_before_launch(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeProbe {
    pub node_available: bool,
    pub node_version: Option<String>,
    pub playwright_package_available: bool,
    pub chromium_cache_detected: bool,
    pub ready: bool,
    pub notes: Vec<String>,
}

impl RuntimeProbe {
    fn empty() -> Self {
        Self {
            node_available: false,
            node_version: None,
            playwright_package_available: false,
            chromium_cache_detected: false,
            ready: false,
            notes: Vec::new(),
        }
    }
}

pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl Default for PlaywrightLauncher {
    fn default() -> Self {
        Self::new(PlaywrightConfig::default())
    }
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    pub async fn probe_runtime(&self) -> RuntimeProbe {
        let mut probe = RuntimeProbe::empty();
        let cwd = self.config.driver_dir.as_deref();

        let node_probe = run_command_capture(
            &self.config.node_binary,
            &["--version".to_string()],
            cwd,
            10,
        )
        .await;

        if let Ok(output) = node_probe
            && output.exit_code == 0
        {
            probe.node_available = true;
            probe.node_version = Some(output.stdout.trim().to_string());
        }

        if probe.node_available {
            let playwright_probe = run_command_capture(
                &self.config.node_binary,
                &[
                    "-e".to_string(),
                    "require('playwright'); process.exit(0);".to_string(),
                ],
                cwd,
                15,
            )
            .await;
            match playwright_probe {
                Ok(output) if output.exit_code == 0 => probe.playwright_package_available = true,
                Ok(output) => {
                    if let Some(reason) = stderr_summary(&output.stderr) {
                        probe.notes.push(format!("Playwright check failed: {reason}"));
                    }
                }
                Err(error) => probe.notes.push(format!("Playwright check failed: {error}")),
            }
        }

        probe.chromium_cache_detected = detect_chromium_cache();
        probe.ready = probe.node_available && probe.playwright_package_available;

        if !probe.node_available {
            probe.notes.push(
                "Node.js not found. Install Node.js 20+ to enable browser runtime.".to_string(),
            );
        }

        if probe.node_available && !probe.playwright_package_available {
            probe.notes.push(
                "Playwright npm package not found. Run `npm i playwright` in the driver directory."
                    .to_string(),
            );
        }

        if probe.ready && !probe.chromium_cache_detected {
            probe.notes.push(
                "Chromium browser binary not found in Playwright cache. Run: npx playwright install chromium".to_string(),
            );
        }

        probe
    }

    async fn spawn_driver(&self, headless: bool) -> Result<PlaywrightPage> {
        let work_dir = tempfile::Builder::new()
            .prefix("castflow-driver-")
            .tempdir()?;
        let script_path = work_dir
            .path()
            .join(format!("driver-{}.mjs", Uuid::new_v4().simple()));
        std::fs::write(&script_path, build_driver_script())?;

        let cwd = match &self.config.driver_dir {
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(BrowserError::RuntimeUnavailable(format!(
                        "driver directory does not exist: {}",
                        dir.display()
                    )));
                }
                dir.clone()
            }
            None => std::env::current_dir()?,
        };

        let mut command = Command::new(&self.config.node_binary);
        command
            .arg(&script_path)
            .current_dir(&cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|error| {
            BrowserError::RuntimeUnavailable(format!(
                "failed to start {}: {}",
                self.config.node_binary, error
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BrowserError::Protocol("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrowserError::Protocol("driver stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "castflow_browser::driver", "{}", line);
                }
            });
        }

        info!(headless, cwd = %cwd.display(), "Playwright driver started");

        Ok(PlaywrightPage {
            io: Mutex::new(DriverIo {
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
                next_id: 0,
                closed: false,
            }),
            grace: Duration::from_millis(self.config.grace_ms),
            command_timeout_ms: self.config.command_timeout_ms,
            _work_dir: work_dir,
        })
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<Box<dyn PageSession>> {
        if self.config.probe_before_launch {
            let probe = self.probe_runtime().await;
            if !probe.ready {
                return Err(BrowserError::RuntimeUnavailable(probe.notes.join(" ")));
            }
        }

        let page = self.spawn_driver(request.headless).await?;
        let seed_kind = request.seed.kind();
        let (storage_state, cookies) = match request.seed {
            SessionSeed::StorageState(state) => (Some(state), Vec::new()),
            SessionSeed::Cookies(cookies) => (None, cookies),
            SessionSeed::Anonymous => (None, Vec::new()),
        };

        let launch = DriverCommand::Launch {
            headless: request.headless,
            storage_state,
            cookies,
            viewport: request.viewport,
        };
        if let Err(error) = page.send(&launch, self.config.launch_timeout_ms).await {
            page.kill().await;
            return Err(error);
        }

        info!(seed = seed_kind, "Browser context ready");
        Ok(Box::new(page))
    }
}

struct DriverIo {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,
}

/// A page owned by one driver process. Dropping it kills the process.
pub struct PlaywrightPage {
    io: Mutex<DriverIo>,
    grace: Duration,
    command_timeout_ms: u64,
    _work_dir: tempfile::TempDir,
}

impl PlaywrightPage {
    async fn send(&self, command: &DriverCommand, timeout_ms: u64) -> Result<Value> {
        let mut io = self.io.lock().await;
        if io.closed {
            return Err(BrowserError::Closed);
        }

        io.next_id += 1;
        let id = io.next_id;
        let mut line = serde_json::to_string(&CommandEnvelope {
            id,
            timeout_ms,
            command,
        })?;
        line.push('\n');

        let action = command.label();
        debug!(id, action = %action, "driver command");

        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let budget = Duration::from_millis(timeout_ms) + self.grace;
        let reply = match timeout(budget, read_reply(&mut io.stdout, id)).await {
            Ok(reply) => reply?,
            Err(_) => {
                warn!(id, action = %action, "driver reply not received in time");
                return Err(BrowserError::Timeout { action, timeout_ms });
            }
        };

        reply.into_result(&action, timeout_ms)
    }

    async fn send_untimed(&self, command: DriverCommand) -> Result<Value> {
        self.send(&command, self.command_timeout_ms).await
    }

    async fn kill(&self) {
        let mut io = self.io.lock().await;
        io.closed = true;
        if let Err(error) = io.child.kill().await {
            debug!(error = %error, "driver process already gone");
        }
    }
}

async fn read_reply(
    stdout: &mut Lines<BufReader<ChildStdout>>,
    id: u64,
) -> Result<crate::protocol::DriverReply> {
    loop {
        let Some(line) = stdout.next_line().await? else {
            return Err(BrowserError::Closed);
        };

        match parse_reply_line(&line) {
            Some(Ok(reply)) if reply.id == id => return Ok(reply),
            Some(Ok(reply)) if reply.id == 0 => {
                return reply.into_result("driver", 0).map(|_| reply_placeholder(id));
            }
            Some(Ok(reply)) => {
                debug!(expected = id, got = reply.id, "discarding stale driver reply");
            }
            Some(Err(error)) => return Err(error),
            None => debug!(target: "castflow_browser::driver", "{}", line),
        }
    }
}

// Unsolicited replies (id 0) only ever report failures; a successful one is
// treated as an empty answer for the pending command.
fn reply_placeholder(id: u64) -> crate::protocol::DriverReply {
    crate::protocol::DriverReply {
        id,
        ok: true,
        value: Value::Null,
        kind: Default::default(),
        error: None,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn path_strings(files: &[PathBuf]) -> Vec<String> {
    files.iter().map(|path| path.display().to_string()).collect()
}

#[async_trait]
impl PageSession for PlaywrightPage {
    async fn goto(&self, url: &str, wait_until: LoadState, timeout: Duration) -> Result<()> {
        let command = DriverCommand::Goto {
            url: url.to_string(),
            wait_until,
        };
        self.send(&command, millis(timeout)).await.map(|_| ())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> Result<()> {
        let command = DriverCommand::WaitForSelector {
            selector: selector.to_string(),
            state,
        };
        self.send(&command, millis(timeout)).await.map(|_| ())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let value = self
            .send_untimed(DriverCommand::Count {
                selector: selector.to_string(),
            })
            .await?;
        value
            .as_u64()
            .map(|count| count as usize)
            .ok_or_else(|| BrowserError::Protocol(format!("count returned {value}")))
    }

    async fn click(&self, target: &Target) -> Result<()> {
        self.send_untimed(DriverCommand::Click {
            target: target.clone(),
        })
        .await
        .map(|_| ())
    }

    async fn fill(&self, target: &Target, text: &str) -> Result<()> {
        self.send_untimed(DriverCommand::Fill {
            target: target.clone(),
            text: text.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn type_text(
        &self,
        target: Option<&Target>,
        text: &str,
        delay: Duration,
    ) -> Result<()> {
        let delay_ms = millis(delay);
        let budget = self.command_timeout_ms + delay_ms * text.chars().count() as u64;
        let command = DriverCommand::Type {
            target: target.cloned(),
            text: text.to_string(),
            delay_ms,
        };
        self.send(&command, budget).await.map(|_| ())
    }

    async fn press(&self, target: Option<&Target>, key: &str) -> Result<()> {
        self.send_untimed(DriverCommand::Press {
            target: target.cloned(),
            key: key.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn check(&self, target: &Target) -> Result<()> {
        self.send_untimed(DriverCommand::Check {
            target: target.clone(),
        })
        .await
        .map(|_| ())
    }

    async fn set_input_files(&self, target: &Target, files: &[PathBuf]) -> Result<()> {
        self.send_untimed(DriverCommand::SetInputFiles {
            target: target.clone(),
            files: path_strings(files),
        })
        .await
        .map(|_| ())
    }

    async fn set_files_via_chooser(&self, trigger: &Target, files: &[PathBuf]) -> Result<()> {
        self.send_untimed(DriverCommand::SetFilesViaChooser {
            trigger: trigger.clone(),
            files: path_strings(files),
        })
        .await
        .map(|_| ())
    }

    async fn dispatch_event(&self, target: &Target, event: &str) -> Result<()> {
        self.send_untimed(DriverCommand::DispatchEvent {
            target: target.clone(),
            event: event.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn get_attribute(&self, target: &Target, name: &str) -> Result<Option<String>> {
        let value = self
            .send_untimed(DriverCommand::GetAttribute {
                target: target.clone(),
                name: name.to_string(),
            })
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn inner_text(&self, target: &Target) -> Result<String> {
        let value = self
            .send_untimed(DriverCommand::InnerText {
                target: target.clone(),
            })
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_visible(&self, target: &Target) -> Result<bool> {
        let value = self
            .send_untimed(DriverCommand::IsVisible {
                target: target.clone(),
            })
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn scroll_into_view(&self, target: &Target) -> Result<()> {
        self.send_untimed(DriverCommand::ScrollIntoView {
            target: target.clone(),
        })
        .await
        .map(|_| ())
    }

    async fn evaluate(&self, function: &str, arg: Value) -> Result<Value> {
        self.send_untimed(DriverCommand::Evaluate {
            function: function.to_string(),
            arg,
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let result = {
            let already_closed = self.io.lock().await.closed;
            if already_closed {
                return Ok(());
            }
            self.send(&DriverCommand::Close, CLOSE_TIMEOUT_MS).await
        };

        let mut io = self.io.lock().await;
        io.closed = true;
        match timeout(Duration::from_millis(CLOSE_TIMEOUT_MS), io.child.wait()).await {
            Ok(Ok(status)) => debug!(status = %status, "Playwright driver exited"),
            _ => {
                if let Err(error) = io.child.kill().await {
                    debug!(error = %error, "driver process already gone");
                }
            }
        }

        result.map(|_| ())
    }
}

struct CommandCapture {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

async fn run_command_capture(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout_secs: u64,
) -> Result<CommandCapture> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let output = match timeout(Duration::from_secs(timeout_secs), command.output()).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(BrowserError::Timeout {
                action: program.to_string(),
                timeout_ms: timeout_secs * 1000,
            });
        }
    };

    Ok(CommandCapture {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// The line of a Node failure worth showing: the thrown error if there is one.
fn stderr_summary(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let thrown = lines.iter().find(|line| line.contains("Error: "));
    thrown.or(lines.first()).map(|line| line.to_string())
}

fn detect_chromium_cache() -> bool {
    if let Ok(path) = std::env::var("PLAYWRIGHT_BROWSERS_PATH") {
        let parsed = PathBuf::from(path);
        if parsed.exists() {
            return true;
        }
    }

    let mut candidates = Vec::new();

    if let Ok(home) = std::env::var("HOME") {
        candidates.push(PathBuf::from(&home).join(".cache/ms-playwright"));
        candidates.push(PathBuf::from(&home).join("Library/Caches/ms-playwright"));
    }

    if let Ok(user_profile) = std::env::var("USERPROFILE") {
        candidates.push(PathBuf::from(user_profile).join("AppData/Local/ms-playwright"));
    }

    candidates.into_iter().any(|path| path.exists())
}

fn default_node_binary() -> String {
    DEFAULT_NODE_BINARY.to_string()
}

fn default_launch_timeout_ms() -> u64 {
    DEFAULT_LAUNCH_TIMEOUT_MS
}

fn default_grace_ms() -> u64 {
    DEFAULT_GRACE_MS
}

fn default_command_timeout_ms() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_MS
}

fn default_probe_before_launch() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: PlaywrightConfig = serde_json::from_str(r#"{"node_binary":"node20"}"#).unwrap();
        assert_eq!(config.node_binary, "node20");
        assert_eq!(config.launch_timeout_ms, DEFAULT_LAUNCH_TIMEOUT_MS);
        assert_eq!(config.grace_ms, DEFAULT_GRACE_MS);
        assert!(config.probe_before_launch);
        assert!(config.driver_dir.is_none());
    }

    #[test]
    fn stderr_summary_prefers_the_thrown_error() {
        let stderr = "node:internal/modules/cjs/loader:1228\n  throw err;\n  ^\n\nError: Cannot find module 'playwright'\nRequire stack:\n- /tmp/[eval]\n";
        assert_eq!(
            stderr_summary(stderr).as_deref(),
            Some("Error: Cannot find module 'playwright'")
        );
        assert_eq!(
            stderr_summary("\n  segfault\n").as_deref(),
            Some("segfault")
        );
        assert_eq!(stderr_summary("  \n"), None);
    }

    #[tokio::test]
    async fn probe_reports_missing_node_binary() {
        let launcher = PlaywrightLauncher::new(PlaywrightConfig {
            node_binary: "castflow-definitely-missing-node".to_string(),
            ..Default::default()
        });

        let probe = launcher.probe_runtime().await;
        assert!(!probe.node_available);
        assert!(!probe.ready);
        assert!(probe.notes.iter().any(|note| note.contains("Node.js not found")));
    }

    #[tokio::test]
    async fn launch_fails_fast_when_runtime_missing() {
        let launcher = PlaywrightLauncher::new(PlaywrightConfig {
            node_binary: "castflow-definitely-missing-node".to_string(),
            ..Default::default()
        });

        let result = launcher.launch(LaunchRequest::default()).await;
        assert!(matches!(result, Err(BrowserError::RuntimeUnavailable(_))));
    }

    #[tokio::test]
    async fn missing_driver_dir_is_reported() {
        let launcher = PlaywrightLauncher::new(PlaywrightConfig {
            driver_dir: Some(PathBuf::from("/definitely/missing/castflow")),
            probe_before_launch: false,
            ..Default::default()
        });

        let result = launcher.launch(LaunchRequest::default()).await;
        assert!(matches!(result, Err(BrowserError::RuntimeUnavailable(_))));
    }
}
