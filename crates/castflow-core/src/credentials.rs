//! Session Builder: credential blob to browser session seed.

use castflow_browser::{Cookie, SameSite, SessionSeed};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::CredentialError;

/// Read a credential blob and decide how the browsing context is seeded.
///
/// A missing file or malformed JSON is an error; an unrecognized shape is not.
pub fn load_session_seed(path: &Path) -> Result<SessionSeed, CredentialError> {
    if !path.is_file() {
        return Err(CredentialError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let blob: Value =
        serde_json::from_str(&content).map_err(|source| CredentialError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    let seed = classify_blob(blob);
    debug!(path = %path.display(), seed = seed.kind(), "Credential blob classified");
    Ok(seed)
}

/// Route a parsed blob by shape.
///
/// - object with `cookies` or `origins` → whole-state restore
/// - array → per-cookie injection (records that are not cookies are skipped)
/// - anything else → anonymous context
pub fn classify_blob(blob: Value) -> SessionSeed {
    match blob {
        Value::Object(map) if map.contains_key("cookies") || map.contains_key("origins") => {
            SessionSeed::StorageState(Value::Object(map))
        }
        Value::Array(records) => {
            let total = records.len();
            let cookies: Vec<Cookie> = records.iter().filter_map(cookie_from_record).collect();
            if cookies.len() < total {
                warn!(
                    skipped = total - cookies.len(),
                    "Ignored credential records without name/value"
                );
            }
            SessionSeed::Cookies(cookies)
        }
        _ => {
            warn!("Unrecognized credential blob shape, using an unauthenticated context");
            SessionSeed::Anonymous
        }
    }
}

/// Normalize one exported cookie record into Playwright's shape.
///
/// Accepts browser-extension exports (`expirationDate`, `hostOnly`,
/// lowercase `sameSite`) as well as Playwright's own `storageState` records.
pub fn cookie_from_record(record: &Value) -> Option<Cookie> {
    let map = record.as_object()?;
    let name = map.get("name")?.as_str()?.to_string();
    let value = string_field(map, "value").unwrap_or_default();

    let url = string_field(map, "url");
    let domain = string_field(map, "domain");
    let path = match (&url, &domain) {
        (None, Some(_)) => Some(string_field(map, "path").unwrap_or_else(|| "/".to_string())),
        _ => string_field(map, "path"),
    };

    let expires = map
        .get("expires")
        .or_else(|| map.get("expirationDate"))
        .and_then(Value::as_f64)
        .filter(|expires| *expires > 0.0);

    Some(Cookie {
        name,
        value,
        url,
        domain,
        path,
        expires,
        http_only: map
            .get("httpOnly")
            .or_else(|| map.get("http_only"))
            .and_then(Value::as_bool),
        secure: map.get("secure").and_then(Value::as_bool),
        same_site: map
            .get("sameSite")
            .or_else(|| map.get("same_site"))
            .and_then(Value::as_str)
            .and_then(SameSite::parse),
    })
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn storage_state_shapes_restore_wholesale() {
        let with_cookies = json!({ "cookies": [], "origins": [] });
        assert!(matches!(
            classify_blob(with_cookies.clone()),
            SessionSeed::StorageState(state) if state == with_cookies
        ));

        let origins_only = json!({ "origins": [{ "origin": "https://a.example", "localStorage": [] }] });
        assert!(matches!(
            classify_blob(origins_only),
            SessionSeed::StorageState(_)
        ));
    }

    #[test]
    fn bare_array_injects_cookies() {
        let seed = classify_blob(json!([
            { "name": "sid", "value": "1", "domain": ".douyin.com" },
            { "name": "uid", "value": "2", "url": "https://creator.douyin.com" }
        ]));
        let SessionSeed::Cookies(cookies) = seed else {
            panic!("expected cookie seed");
        };
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].path.as_deref(), Some("/"));
        assert_eq!(cookies[1].path, None);
    }

    #[test]
    fn other_shapes_fall_back_to_anonymous() {
        assert_eq!(classify_blob(json!({ "token": "x" })), SessionSeed::Anonymous);
        assert_eq!(classify_blob(json!("cookie=1")), SessionSeed::Anonymous);
        assert_eq!(classify_blob(Value::Null), SessionSeed::Anonymous);
    }

    #[test]
    fn extension_exports_are_normalized() {
        let cookie = cookie_from_record(&json!({
            "name": "sessionid",
            "value": "abc",
            "domain": ".bilibili.com",
            "hostOnly": false,
            "expirationDate": 1893456000.5,
            "sameSite": "no_restriction",
            "secure": true,
            "storeId": "0"
        }))
        .unwrap();

        assert_eq!(cookie.expires, Some(1893456000.5));
        assert_eq!(cookie.same_site, Some(SameSite::None));
        assert_eq!(cookie.secure, Some(true));
    }

    #[test]
    fn records_without_name_are_skipped() {
        let SessionSeed::Cookies(cookies) = classify_blob(json!([{ "value": "x" }, 42])) else {
            panic!("expected cookie seed");
        };
        assert!(cookies.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "{ not json").unwrap();

        let error = load_session_seed(&path).unwrap_err();
        assert!(matches!(error, CredentialError::Malformed { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let error = load_session_seed(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(error, CredentialError::NotFound(_)));
    }

    #[test]
    fn file_is_classified_after_parsing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"cookies":[{"name":"a","value":"b","domain":"x.com","path":"/"}],"origins":[]}"#)
            .unwrap();

        assert_eq!(load_session_seed(&path).unwrap().kind(), "storage_state");
    }
}
