//! Board and status models for the ConnectWise Manage API.
//!
//! Status IDs are board-specific, so moving a ticket to a named status
//! requires resolving the name on the ticket's board first.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A service board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Board ID.
    pub id: u64,

    /// Board name.
    #[serde(default)]
    pub name: Option<String>,
}

/// A workflow status defined on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStatus {
    /// Status ID, unique across boards.
    pub id: u64,

    /// Status name, e.g. `>Closed`.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether tickets in this status count as closed.
    #[serde(default)]
    pub closed_status: Option<bool>,
}

/// The status a ticket should be moved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTarget {
    /// A status ID, used as-is.
    Id(u64),
    /// A status name, resolved on the ticket's board.
    Name(String),
}

impl StatusTarget {
    /// Parses a status setting: all digits is an ID, anything else a name.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value.parse::<u64>() {
            Ok(id) if value.bytes().all(|b| b.is_ascii_digit()) => StatusTarget::Id(id),
            _ => StatusTarget::Name(value.to_string()),
        }
    }
}

impl fmt::Display for StatusTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusTarget::Id(id) => write!(f, "status #{}", id),
            StatusTarget::Name(name) => write!(f, "status '{}'", name),
        }
    }
}
