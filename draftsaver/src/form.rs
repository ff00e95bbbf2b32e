//! Form state and point-in-time snapshots.
//!
//! The saver never reads field values when an edit happens. It asks its
//! [`FormSource`] for a [`FormSnapshot`] at the moment a save is triggered, so
//! the snapshot always reflects the latest edit.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::validate;

/// Field names used by the content editing form.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const SLUG: &str = "slug";
    pub const EXCERPT: &str = "excerpt";
    pub const CONTENT: &str = "content";
    pub const CATEGORY: &str = "category_id";
    pub const COVER_IMAGE: &str = "cover_image";
    pub const VIDEO_URL: &str = "youtube_url";
}

/// A file selected in an upload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Attachment(format!("{} has no usable file name", path.display())))?
            .to_string();
        let content_type = mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string();

        Ok(Self::new(file_name, content_type, data))
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Current value of a single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Free text input or textarea
    Text(String),
    /// Select box; `None` when nothing is chosen
    Choice(Option<String>),
    /// File input; `None` when no file is selected
    File(Option<Attachment>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Choice(c) => c.as_deref(),
            FieldValue::File(_) => None,
        }
    }

    pub fn as_attachment(&self) -> Option<&Attachment> {
        match self {
            FieldValue::File(f) => f.as_ref(),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Choice(c) => c.as_deref().map_or(true, |c| c.trim().is_empty()),
            FieldValue::File(f) => f.is_none(),
        }
    }
}

/// Field values captured at a single point in time, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    fields: Vec<(String, FieldValue)>,
}

impl FormSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, keeping its original position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Text of a text or choice field, empty when absent.
    pub fn text(&self, name: &str) -> &str {
        self.get(name).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Accessor the saver uses to read the live form.
pub trait FormSource: Send + Sync + 'static {
    /// Capture the current value of every field.
    fn snapshot(&self) -> FormSnapshot;
}

impl FormSource for FormSnapshot {
    fn snapshot(&self) -> FormSnapshot {
        self.clone()
    }
}

/// Live, shareable form state.
///
/// Clones share the same underlying fields, so an editor front end can hold one
/// handle while the saver holds another.
#[derive(Debug, Clone, Default)]
pub struct SharedForm {
    state: Arc<RwLock<FormSnapshot>>,
}

impl SharedForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&self, name: &str, value: impl Into<String>) {
        self.state.write().set(name, FieldValue::Text(value.into()));
    }

    pub fn select(&self, name: &str, choice: Option<String>) {
        self.state.write().set(name, FieldValue::Choice(choice));
    }

    /// Attach a file after checking its size and type.
    ///
    /// A refused file leaves the field empty.
    pub fn attach(&self, name: &str, attachment: Attachment) -> Result<()> {
        if let Err(e) = validate::check_attachment(&attachment) {
            self.clear_file(name);
            return Err(Error::Attachment(e.message));
        }
        self.state.write().set(name, FieldValue::File(Some(attachment)));
        Ok(())
    }

    pub fn clear_file(&self, name: &str) {
        self.state.write().set(name, FieldValue::File(None));
    }
}

impl FormSource for SharedForm {
    fn snapshot(&self) -> FormSnapshot {
        self.state.read().clone()
    }
}
