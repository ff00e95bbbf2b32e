use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SaveError;
use crate::form::FormSnapshot;

/// Identifies one saver instance, and therefore one form.
///
/// Displayed in a short, readable format like "form_abc123xy".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(Uuid);

impl FormId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn to_short_string(&self) -> String {
        let hex = format!("{:032x}", self.0.as_u128());
        format!("form_{}", &hex[..8])
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for FormId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_short_string())
    }
}

/// Which button an explicit submit came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitIntent {
    /// Keep the content as a draft (`save_draft=1`)
    #[default]
    Draft,
    /// Hand the content to editors (`submit_review=1`)
    Review,
}

impl SubmitIntent {
    /// Form field that tells the server which action was taken.
    pub fn form_field(self) -> &'static str {
        match self {
            SubmitIntent::Draft => "save_draft",
            SubmitIntent::Review => "submit_review",
        }
    }
}

/// What triggered a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveKind {
    /// Quiet period elapsed after editing
    AutoSave,
    /// The user asked to save
    Submit(SubmitIntent),
}

impl SaveKind {
    pub fn is_auto_save(self) -> bool {
        matches!(self, SaveKind::AutoSave)
    }
}

impl std::fmt::Display for SaveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveKind::AutoSave => write!(f, "auto-save"),
            SaveKind::Submit(SubmitIntent::Draft) => write!(f, "save-draft"),
            SaveKind::Submit(SubmitIntent::Review) => write!(f, "submit-review"),
        }
    }
}

/// A snapshot on its way to the save endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub form_id: FormId,
    /// Increases by one for every request a saver issues
    pub seq: u64,
    pub kind: SaveKind,
    pub snapshot: FormSnapshot,
}

impl SaveRequest {
    pub fn is_auto_save(&self) -> bool {
        self.kind.is_auto_save()
    }
}

/// Server acknowledgement of a persisted draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveAck {
    pub saved_at: DateTime<Utc>,
}

pub type SaveOutcome = std::result::Result<SaveAck, SaveError>;

/// Outcome of one issued (or locally refused) save, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub form_id: FormId,
    pub seq: u64,
    pub kind: SaveKind,
    pub outcome: SaveOutcome,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Text for the save indicator or notification banner.
    pub fn status_line(&self) -> String {
        match (&self.outcome, self.kind) {
            (Ok(ack), SaveKind::AutoSave) => {
                format!("Draft auto-saved at {}", ack.saved_at.with_timezone(&chrono::Local).format("%H:%M:%S"))
            }
            (Ok(ack), SaveKind::Submit(SubmitIntent::Draft)) => {
                format!("Draft saved at {}", ack.saved_at.with_timezone(&chrono::Local).format("%H:%M:%S"))
            }
            (Ok(ack), SaveKind::Submit(SubmitIntent::Review)) => {
                format!("Submitted for review at {}", ack.saved_at.with_timezone(&chrono::Local).format("%H:%M:%S"))
            }
            (Err(e), _) => e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_id_short_string() {
        let id = FormId::from(Uuid::from_u128(0xabcdef12_0000_0000_0000_000000000000));
        assert_eq!(id.to_string(), "form_abcdef12");

        let small = FormId::from(Uuid::from_u128(1));
        assert_eq!(small.to_string(), "form_00000000");
    }

    #[test]
    fn test_submit_intent_fields_and_display() {
        assert_eq!(SubmitIntent::Draft.form_field(), "save_draft");
        assert_eq!(SubmitIntent::Review.form_field(), "submit_review");
        assert_eq!(SaveKind::AutoSave.to_string(), "auto-save");
        assert_eq!(SaveKind::Submit(SubmitIntent::Review).to_string(), "submit-review");
        assert!(!SaveKind::Submit(SubmitIntent::Draft).is_auto_save());
    }

    #[test]
    fn test_status_line() {
        let report = SaveReport {
            form_id: FormId::new(),
            seq: 1,
            kind: SaveKind::AutoSave,
            outcome: Ok(SaveAck { saved_at: Utc::now() }),
        };
        assert!(report.status_line().starts_with("Draft auto-saved at "));

        let review = SaveReport {
            kind: SaveKind::Submit(SubmitIntent::Review),
            ..report.clone()
        };
        assert!(review.status_line().starts_with("Submitted for review at "));

        let report = SaveReport {
            outcome: Err(SaveError::Rejected {
                status: Some(400),
                reason: "Slug already taken".to_string(),
            }),
            ..report
        };
        assert_eq!(report.status_line(), "Slug already taken");
        assert!(!report.is_success());
    }
}
