//! YouTube URL recognition for the video field and its embed preview.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Recognised URL shapes, tried in order. Each captures the 11 character id.
static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // https://www.youtube.com/watch?v=ID
        r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([^&=%?]{11})",
        // https://youtu.be/ID
        r"^(?:https?://)?youtu\.be/([^&=%?]{11})",
        // https://www.youtube.com/embed/ID
        r"^(?:https?://)?(?:www\.)?youtube\.com/embed/([^&=%?]{11})",
        // https://www.youtube-nocookie.com/embed/ID
        r"^(?:https?://)?(?:www\.)?youtube-nocookie\.com/embed/([^&=%?]{11})",
        // https://m.youtube.com/watch?v=ID
        r"^(?:https?://)?m\.youtube\.com/watch\?v=([^&=%?]{11})",
        // https://www.youtube.com/watch?feature=share&v=ID
        r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?.*v=([^&=%?]{11})",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("video URL pattern is valid"))
    .collect()
});

/// An 11 character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL used for the inline preview iframe.
    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the video id from any of the recognised URL shapes.
pub fn resolve(url: &str) -> Option<VideoId> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_string()))
}

pub fn is_valid(url: &str) -> bool {
    resolve(url).is_some()
}
