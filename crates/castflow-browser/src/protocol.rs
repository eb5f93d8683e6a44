//! Line-delimited JSON protocol spoken with the Node.js driver process.
//!
//! Rust writes one [`CommandEnvelope`] per line on the driver's stdin. The
//! driver answers each command with exactly one stdout line prefixed by
//! [`REPLY_MARKER`]; any other stdout line is page/driver console noise.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BrowserError;
use crate::types::{Cookie, LoadState, Target, Viewport, WaitState};

pub const REPLY_MARKER: &str = "__CASTFLOW_DRIVER_REPLY__=";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverCommand {
    Launch {
        headless: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        storage_state: Option<Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        cookies: Vec<Cookie>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        viewport: Option<Viewport>,
    },
    Goto {
        url: String,
        wait_until: LoadState,
    },
    WaitForSelector {
        selector: String,
        state: WaitState,
    },
    Count {
        selector: String,
    },
    Click {
        target: Target,
    },
    Fill {
        target: Target,
        text: String,
    },
    Type {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Target>,
        text: String,
        delay_ms: u64,
    },
    Press {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Target>,
        key: String,
    },
    Check {
        target: Target,
    },
    SetInputFiles {
        target: Target,
        files: Vec<String>,
    },
    SetFilesViaChooser {
        trigger: Target,
        files: Vec<String>,
    },
    DispatchEvent {
        target: Target,
        event: String,
    },
    GetAttribute {
        target: Target,
        name: String,
    },
    InnerText {
        target: Target,
    },
    IsVisible {
        target: Target,
    },
    ScrollIntoView {
        target: Target,
    },
    Evaluate {
        function: String,
        arg: Value,
    },
    Close,
}

impl DriverCommand {
    /// Short label used in logs and error messages.
    pub fn label(&self) -> String {
        match self {
            Self::Launch { .. } => "launch".to_string(),
            Self::Goto { url, .. } => format!("goto {url}"),
            Self::WaitForSelector { selector, .. } => format!("wait_for_selector {selector}"),
            Self::Count { selector } => format!("count {selector}"),
            Self::Click { target } => format!("click {}", target.selector),
            Self::Fill { target, .. } => format!("fill {}", target.selector),
            Self::Type { .. } => "type".to_string(),
            Self::Press { key, .. } => format!("press {key}"),
            Self::Check { target } => format!("check {}", target.selector),
            Self::SetInputFiles { target, .. } => format!("set_input_files {}", target.selector),
            Self::SetFilesViaChooser { trigger, .. } => {
                format!("set_files_via_chooser {}", trigger.selector)
            }
            Self::DispatchEvent { event, .. } => format!("dispatch_event {event}"),
            Self::GetAttribute { name, .. } => format!("get_attribute {name}"),
            Self::InnerText { target } => format!("inner_text {}", target.selector),
            Self::IsVisible { target } => format!("is_visible {}", target.selector),
            Self::ScrollIntoView { target } => format!("scroll_into_view {}", target.selector),
            Self::Evaluate { .. } => "evaluate".to_string(),
            Self::Close => "close".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandEnvelope<'a> {
    pub id: u64,
    pub timeout_ms: u64,
    #[serde(flatten)]
    pub command: &'a DriverCommand,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    #[default]
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverReply {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub kind: FailureKind,
    #[serde(default)]
    pub error: Option<String>,
}

impl DriverReply {
    pub fn into_result(self, action: &str, timeout_ms: u64) -> Result<Value, BrowserError> {
        if self.ok {
            return Ok(self.value);
        }

        let message = self
            .error
            .unwrap_or_else(|| "driver reported failure without a message".to_string());
        match self.kind {
            FailureKind::Timeout => Err(BrowserError::Timeout {
                action: action.to_string(),
                timeout_ms,
            }),
            FailureKind::Error => Err(BrowserError::Driver {
                action: action.to_string(),
                message,
            }),
        }
    }
}

/// Parse a stdout line into a reply when it carries the reply marker.
pub fn parse_reply_line(line: &str) -> Option<Result<DriverReply, BrowserError>> {
    let rest = line.strip_prefix(REPLY_MARKER)?;
    Some(serde_json::from_str::<DriverReply>(rest.trim()).map_err(BrowserError::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_flattens_command_fields() {
        let command = DriverCommand::Click {
            target: Target::nth("button.publish", 1),
        };
        let line = serde_json::to_value(CommandEnvelope {
            id: 7,
            timeout_ms: 5000,
            command: &command,
        })
        .unwrap();

        assert_eq!(
            line,
            json!({
                "id": 7,
                "timeout_ms": 5000,
                "type": "click",
                "target": { "selector": "button.publish", "nth": 1 }
            })
        );
    }

    #[test]
    fn launch_omits_empty_seed_fields() {
        let command = DriverCommand::Launch {
            headless: true,
            storage_state: None,
            cookies: Vec::new(),
            viewport: None,
        };
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value, json!({ "type": "launch", "headless": true }));
    }

    #[test]
    fn non_marker_lines_are_ignored() {
        assert!(parse_reply_line("console noise").is_none());
    }

    #[test]
    fn timeout_reply_maps_to_timeout_error() {
        let line = format!(
            "{}{}",
            REPLY_MARKER,
            r#"{"id":3,"ok":false,"kind":"timeout","error":"Timeout 10000ms exceeded"}"#
        );
        let reply = parse_reply_line(&line).unwrap().unwrap();
        assert_eq!(reply.id, 3);

        let error = reply.into_result("click #publish", 10_000).unwrap_err();
        assert!(error.is_timeout());
    }

    #[test]
    fn error_reply_keeps_driver_message() {
        let line = format!(
            "{}{}",
            REPLY_MARKER, r#"{"id":4,"ok":false,"error":"Element is not attached"}"#
        );
        let reply = parse_reply_line(&line).unwrap().unwrap();
        let error = reply.into_result("fill input", 1000).unwrap_err();
        assert!(error.to_string().contains("Element is not attached"));
    }

    #[test]
    fn ok_reply_returns_value() {
        let line = format!("{}{}", REPLY_MARKER, r#"{"id":1,"ok":true,"value":4}"#);
        let reply = parse_reply_line(&line).unwrap().unwrap();
        assert_eq!(reply.into_result("count", 0).unwrap(), json!(4));
    }
}
