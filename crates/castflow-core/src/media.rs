//! Media path parsing and upload-control matching.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Exactly one video file.
    Video,
    /// One or more image files posted together.
    Images,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Video => "video file",
            Self::Images => "image file",
        }
    }

    /// Whether a file input's `accept` attribute takes this kind of media.
    pub fn matches_accept(self, accept: &str) -> bool {
        let accept = accept.to_ascii_lowercase();
        let markers: &[&str] = match self {
            Self::Video => &[".mp4", ".mov", "video"],
            Self::Images => &["image", ".jpg", ".jpeg", ".png", ".webp"],
        };
        markers.iter().any(|marker| accept.contains(marker))
    }
}

/// Parse a media field: a JSON array (structured or as text) of paths, or a
/// comma/whitespace separated list.
pub fn parse_media_paths(raw: &Value) -> Vec<PathBuf> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(PathBuf::from)
            .collect(),
        Value::String(text) => {
            if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(text) {
                return parse_media_paths(&value);
            }
            text.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|item| !item.is_empty())
                .map(PathBuf::from)
                .collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_list_accepts_commas_and_whitespace() {
        let paths = parse_media_paths(&json!("/a/1.jpg, /a/2.png\n/a/3.webp"));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/a/1.jpg"),
                PathBuf::from("/a/2.png"),
                PathBuf::from("/a/3.webp")
            ]
        );
    }

    #[test]
    fn json_text_array_is_parsed() {
        let paths = parse_media_paths(&json!(r#"["/x/a b.jpg", "/x/c.jpg"]"#));
        assert_eq!(
            paths,
            vec![PathBuf::from("/x/a b.jpg"), PathBuf::from("/x/c.jpg")]
        );
    }

    #[test]
    fn accept_attribute_matching() {
        assert!(MediaKind::Video.matches_accept("video/mp4,video/x-m4v,video/*"));
        assert!(MediaKind::Video.matches_accept(".mp4,.mov,.flv"));
        assert!(!MediaKind::Video.matches_accept(".jpg,.jpeg,.png"));
        assert!(MediaKind::Images.matches_accept(".jpg,.jpeg,.png,.webp"));
        assert!(MediaKind::Images.matches_accept("image/*"));
    }
}
