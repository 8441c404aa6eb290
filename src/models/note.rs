//! Note models for the ConnectWise Manage API.

use serde::{Deserialize, Serialize};

/// Request body for adding a note to a ticket.
///
/// The flag is sent as the string `"true"`, which the API accepts for its
/// boolean note flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    /// The note content.
    pub text: String,

    /// Marks the note as internal analysis (hidden from the customer).
    #[serde(rename = "internalAnalysisFlag")]
    pub internal_analysis_flag: String,
}

impl CreateNoteRequest {
    /// Creates an internal-only note.
    pub fn internal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            internal_analysis_flag: "true".to_string(),
        }
    }
}
