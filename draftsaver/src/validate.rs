//! Client-side checks run before an explicit submit and when a file is picked.
//!
//! Auto-saves store drafts and skip these checks entirely.

use serde::Serialize;

use crate::form::{fields, Attachment, FormSnapshot};
use crate::video;

pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 255;
pub const CONTENT_MIN_CHARS: usize = 10;
pub const EXCERPT_MAX_CHARS: usize = 500;

/// Largest accepted upload (5 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];

/// A single failed check, keyed by field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Check the fields required before a draft can be submitted.
///
/// Returns every failing field rather than stopping at the first.
pub fn validate_for_submit(snapshot: &FormSnapshot) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    let title = snapshot.text(fields::TITLE).trim().chars().count();
    if title < TITLE_MIN_CHARS {
        errors.push(FieldError::new(
            fields::TITLE,
            format!("Title must be at least {TITLE_MIN_CHARS} characters"),
        ));
    } else if title > TITLE_MAX_CHARS {
        errors.push(FieldError::new(
            fields::TITLE,
            format!("Title must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }

    if snapshot.text(fields::CONTENT).trim().chars().count() < CONTENT_MIN_CHARS {
        errors.push(FieldError::new(
            fields::CONTENT,
            format!("Content must be at least {CONTENT_MIN_CHARS} characters"),
        ));
    }

    if snapshot.get(fields::CATEGORY).map_or(true, |v| v.is_blank()) {
        errors.push(FieldError::new(fields::CATEGORY, "A category must be selected"));
    }

    if excerpt_remaining(snapshot.text(fields::EXCERPT)) < 0 {
        errors.push(FieldError::new(
            fields::EXCERPT,
            format!("Excerpt must be at most {EXCERPT_MAX_CHARS} characters"),
        ));
    }

    let video_url = snapshot.text(fields::VIDEO_URL).trim();
    if !video_url.is_empty() && !video::is_valid(video_url) {
        errors.push(FieldError::new(fields::VIDEO_URL, "Not a valid YouTube URL"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check a picked file before it is placed in the form.
pub fn check_attachment(attachment: &Attachment) -> Result<(), FieldError> {
    if attachment.size() > MAX_ATTACHMENT_BYTES {
        return Err(FieldError::new(
            fields::COVER_IMAGE,
            format!(
                "{} is too large ({} bytes, maximum is 5MB)",
                attachment.file_name,
                attachment.size()
            ),
        ));
    }

    let content_type = attachment.content_type.to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(FieldError::new(
            fields::COVER_IMAGE,
            format!(
                "{} has unsupported type {}; use JPG, PNG, WebP or GIF",
                attachment.file_name, attachment.content_type
            ),
        ));
    }

    Ok(())
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Characters left before the excerpt limit; negative once it is exceeded.
pub fn excerpt_remaining(text: &str) -> i64 {
    EXCERPT_MAX_CHARS as i64 - text.chars().count() as i64
}

/// Suggested URL slug for a title.
///
/// Lowercases, drops anything outside `a-z`, `0-9`, whitespace and `-`, then
/// joins the remaining words with single hyphens. Empty when nothing is left.
pub fn slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut separator = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if separator && !slug.is_empty() {
                slug.push('-');
            }
            separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            separator = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldValue;
    use rstest::rstest;

    fn complete_form() -> FormSnapshot {
        FormSnapshot::new()
            .with(fields::TITLE, FieldValue::Text("A proper title".into()))
            .with(fields::CONTENT, FieldValue::Text("Long enough body text".into()))
            .with(fields::CATEGORY, FieldValue::Choice(Some("2".into())))
    }

    #[test]
    fn test_complete_form_passes() {
        assert_eq!(validate_for_submit(&complete_form()), Ok(()));
    }

    #[test]
    fn test_reports_every_missing_field() {
        let errors = validate_for_submit(&FormSnapshot::new()).unwrap_err();
        let names: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(names, vec![fields::TITLE, fields::CONTENT, fields::CATEGORY]);
    }

    #[test]
    fn test_title_is_trimmed_before_counting() {
        let form = complete_form().with(fields::TITLE, FieldValue::Text("  abcd   ".into()));
        let errors = validate_for_submit(&form).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, fields::TITLE);
    }

    #[test]
    fn test_long_excerpt_and_bad_video_url() {
        let form = complete_form()
            .with(fields::EXCERPT, FieldValue::Text("x".repeat(501)))
            .with(fields::VIDEO_URL, FieldValue::Text("https://vimeo.com/123".into()));
        let errors = validate_for_submit(&form).unwrap_err();
        let names: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(names, vec![fields::EXCERPT, fields::VIDEO_URL]);
    }

    #[test]
    fn test_valid_video_url_passes() {
        let form = complete_form().with(
            fields::VIDEO_URL,
            FieldValue::Text("https://youtu.be/dQw4w9WgXcQ".into()),
        );
        assert!(validate_for_submit(&form).is_ok());
    }

    #[test]
    fn test_attachment_checks() {
        assert!(check_attachment(&Attachment::new("a.webp", "image/webp", vec![1u8; 10])).is_ok());
        assert!(check_attachment(&Attachment::new("a.JPG", "IMAGE/JPEG", vec![1u8; 10])).is_ok());

        let pdf = check_attachment(&Attachment::new("a.pdf", "application/pdf", vec![1u8; 10])).unwrap_err();
        assert!(pdf.message.contains("unsupported type"));

        let exact = Attachment::new("a.png", "image/png", vec![0u8; MAX_ATTACHMENT_BYTES]);
        assert!(check_attachment(&exact).is_ok());
        let over = Attachment::new("a.png", "image/png", vec![0u8; MAX_ATTACHMENT_BYTES + 1]);
        assert!(check_attachment(&over).unwrap_err().message.contains("too large"));
    }

    #[rstest]
    #[case("Hello World", "hello-world")]
    #[case("  Berita   Terkini  Hari Ini ", "berita-terkini-hari-ini")]
    #[case("Rust 2024: what's new?", "rust-2024-whats-new")]
    #[case("pre--- dashed -- title-", "pre-dashed-title")]
    #[case("Café Olé", "caf-ol")]
    #[case("!!!", "")]
    #[case("", "")]
    fn test_slug(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(slug(title), expected);
    }

    #[test]
    fn test_counters() {
        assert_eq!(word_count("  one two\tthree\nfour  "), 4);
        assert_eq!(word_count("   "), 0);
        assert_eq!(excerpt_remaining("abc"), 497);
        assert_eq!(excerpt_remaining(&"é".repeat(502)), -2);
    }
}
