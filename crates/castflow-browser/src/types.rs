use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One element among the matches of a Playwright selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub selector: String,
    #[serde(default)]
    pub nth: usize,
}

impl Target {
    pub fn first(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            nth: 0,
        }
    }

    pub fn nth(selector: impl Into<String>, nth: usize) -> Self {
        Self {
            selector: selector.into(),
            nth,
        }
    }

    /// Scope a child selector to this exact element.
    pub fn within(&self, child: &str) -> Target {
        Target::first(format!("{} >> nth={} >> {}", self.selector, self.nth, child))
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::first(selector)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    Attached,
    Detached,
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
    Commit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    /// Accepts both Playwright spellings and browser-extension export
    /// spellings (`no_restriction`, `lax`, `unspecified`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "none" | "no_restriction" => Some(Self::None),
            _ => None,
        }
    }
}

/// A single cookie record in the shape Playwright's `addCookies` expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

/// Initial state of the browsing context a session starts from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionSeed {
    /// Whole browsing-state snapshot (`{cookies, origins}`) restored as-is.
    StorageState(Value),
    /// Individual cookies injected into an empty context.
    Cookies(Vec<Cookie>),
    #[default]
    Anonymous,
}

impl SessionSeed {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StorageState(_) => "storage_state",
            Self::Cookies(_) => "cookies",
            Self::Anonymous => "anonymous",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub headless: bool,
    pub seed: SessionSeed,
    pub viewport: Option<Viewport>,
}

impl Default for LaunchRequest {
    fn default() -> Self {
        Self {
            headless: false,
            seed: SessionSeed::Anonymous,
            viewport: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn within_scopes_child_to_nth_match() {
        let wrapper = Target::nth("div.op-btn-outter-content", 2);
        assert_eq!(
            wrapper.within("button").selector,
            "div.op-btn-outter-content >> nth=2 >> button"
        );
    }

    #[test]
    fn same_site_accepts_extension_spellings() {
        assert_eq!(SameSite::parse("no_restriction"), Some(SameSite::None));
        assert_eq!(SameSite::parse("Lax"), Some(SameSite::Lax));
        assert_eq!(SameSite::parse("unspecified"), None);
    }

    #[test]
    fn cookie_serializes_in_playwright_shape() {
        let cookie = Cookie {
            name: "sid".to_string(),
            value: "abc".to_string(),
            url: None,
            domain: Some(".example.com".to_string()),
            path: Some("/".to_string()),
            expires: None,
            http_only: Some(true),
            secure: None,
            same_site: Some(SameSite::Lax),
        };
        let value = serde_json::to_value(&cookie).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "sid",
                "value": "abc",
                "domain": ".example.com",
                "path": "/",
                "httpOnly": true,
                "sameSite": "Lax"
            })
        );
    }
}
