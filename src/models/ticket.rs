//! Ticket models for the ConnectWise Manage API.
//!
//! Tickets are kept mostly opaque: a handful of well-known fields are
//! typed, every other field is preserved as raw JSON.

use serde::{Deserialize, Serialize};

use super::{RecordInfo, Reference};

/// A service ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket number.
    pub id: u64,

    /// One-line summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Board the ticket is filed on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<Reference>,

    /// Current workflow status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Reference>,

    /// Customer company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Reference>,

    /// Email of the contact the ticket was raised for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email_address: Option<String>,

    /// Audit metadata.
    #[serde(default, rename = "_info", skip_serializing_if = "Option::is_none")]
    pub info: Option<RecordInfo>,

    /// Every field not modeled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Ticket {
    /// Returns the summary or a placeholder.
    pub fn display_summary(&self) -> &str {
        self.summary.as_deref().unwrap_or("(No summary)")
    }

    /// Returns the status name or "Unknown".
    pub fn display_status(&self) -> String {
        self.status
            .as_ref()
            .map(Reference::display)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Returns the board name or "Unknown".
    pub fn display_board(&self) -> String {
        self.board
            .as_ref()
            .map(Reference::display)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Returns the company name or "Unknown".
    pub fn display_company(&self) -> String {
        self.company
            .as_ref()
            .map(Reference::display)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// ID of the board the ticket is filed on, if present.
    pub fn board_id(&self) -> Option<u64> {
        self.board.as_ref().and_then(|b| b.id)
    }

    /// When the ticket was entered, if present.
    pub fn date_entered(&self) -> Option<&str> {
        self.info.as_ref().and_then(|i| i.date_entered.as_deref())
    }
}

/// A single operation in a JSON patch-style update body.
///
/// The API takes a list of these: `[{"op":"replace","path":"status/id","value":696}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Operation kind, e.g. `replace`.
    pub op: String,

    /// Slash-separated field path, e.g. `status/id`.
    pub path: String,

    /// New value.
    pub value: serde_json::Value,
}

impl PatchOperation {
    /// Creates a `replace` operation.
    pub fn replace(path: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            op: "replace".to_string(),
            path: path.into(),
            value: value.into(),
        }
    }
}
