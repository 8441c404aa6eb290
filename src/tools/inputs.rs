//! Tool input parameter structs for MCP tools.
//!
//! This module defines the input types for each MCP tool, with
//! JSON Schema derivation for MCP tool discovery.
//!
//! # Input Sanitization
//!
//! Input structs with string fields implement `sanitize()`, which trims
//! whitespace. This should be called before processing input.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;

/// Helper function to trim an optional string.
fn trim_option(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Input parameters for the lookup_company tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LookupCompanyInput {
    /// Email address of a contact belonging to the customer.
    pub email: String,
}

impl LookupCompanyInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
        }
    }
}

/// Input parameters for the list_backup_tickets tool.
///
/// Provide either the company ID or a contact email.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListBackupTicketsInput {
    /// Internal numeric company ID (as returned by lookup_company).
    #[serde(default)]
    pub company_id: Option<String>,

    /// Email of a contact at the company; used when company_id is not given.
    #[serde(default)]
    pub email: Option<String>,
}

impl ListBackupTicketsInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            company_id: trim_option(&self.company_id),
            email: trim_option(&self.email),
        }
    }
}

/// Input parameters for the get_ticket tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTicketInput {
    /// The ticket number.
    pub ticket_id: u64,
}

/// Input parameters for the close_ticket tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CloseTicketInput {
    /// The ticket number.
    pub ticket_id: u64,
}

/// Input parameters for the add_internal_note tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddInternalNoteInput {
    /// The ticket number.
    pub ticket_id: u64,

    /// The note text. Internal notes are never shown to the customer.
    pub message: String,
}

impl AddInternalNoteInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            ticket_id: self.ticket_id,
            message: self.message.trim().to_string(),
        }
    }
}
