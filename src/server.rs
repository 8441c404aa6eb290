//! MCP server implementation for cwdesk.
//!
//! This module defines the `CwDeskServer` struct that implements the MCP
//! `ServerHandler` trait, exposing backup ticket triage operations as tools.

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};

use crate::cw_client::CwClient;
use crate::error::CwError;
use crate::models::Ticket;
use crate::tools::{
    AddInternalNoteInput, CloseTicketInput, GetTicketInput, ListBackupTicketsInput,
    LookupCompanyInput,
};

/// The cwdesk MCP server.
///
/// This server exposes ConnectWise backup ticket operations as MCP tools.
#[derive(Clone)]
pub struct CwDeskServer {
    /// ConnectWise client for API operations.
    cw_client: CwClient,
    /// Tool router for MCP tool dispatch.
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CwDeskServer {
    /// Creates a new server instance.
    ///
    /// # Arguments
    ///
    /// * `cw_client` - The ConnectWise client for API operations
    pub fn new(cw_client: CwClient) -> Self {
        Self {
            cw_client,
            tool_router: Self::tool_router(),
        }
    }

    /// A simple ping tool to verify the server is running.
    ///
    /// Returns "pong" on success.
    #[tool(description = "Test connectivity to the cwdesk MCP server. Returns 'pong' if the server is running correctly.")]
    fn ping(&self) -> String {
        tracing::debug!("ping tool called");
        "pong".to_string()
    }

    /// Verify that ConnectWise is reachable and the credentials are accepted.
    #[tool(description = "Verify that ConnectWise Manage is reachable and the API credentials are accepted.")]
    async fn check_connection(&self) -> Result<String, String> {
        tracing::debug!("check_connection tool called");

        self.cw_client.check_connection().await.map_err(|e| {
            let sanitized = self.sanitize_error(&e);
            tracing::error!(error = %sanitized, "Connection check failed");
            sanitized
        })?;

        Ok("Connection to ConnectWise Manage is working.".to_string())
    }

    /// Find the internal company ID for a contact email.
    #[tool(description = "Find the internal ConnectWise company ID of the customer a contact email belongs to. Use the ID with list_backup_tickets.")]
    async fn lookup_company(
        &self,
        Parameters(input): Parameters<LookupCompanyInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!("lookup_company tool called");

        let company_id = self
            .cw_client
            .lookup_company_id_by_email(&input.email)
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, "Failed to look up company");
                format!("Failed to look up company for {}: {}", input.email, sanitized)
            })?;

        Ok(match company_id {
            Some(id) => format!("Company ID for {}: {}", input.email, id),
            None => format!("No company found for {}.", input.email),
        })
    }

    /// List the most recent backup tickets of one company.
    #[tool(description = "List the 50 most recent tickets on the backup board for one company. Provide company_id, or email to look the company up first.")]
    async fn list_backup_tickets(
        &self,
        Parameters(input): Parameters<ListBackupTicketsInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(?input, "list_backup_tickets tool called");

        let company_id = match (input.company_id, input.email) {
            (Some(id), _) => id,
            (None, Some(email)) => self
                .cw_client
                .lookup_company_id_by_email(&email)
                .await
                .map_err(|e| {
                    let sanitized = self.sanitize_error(&e);
                    tracing::error!(error = %sanitized, "Failed to look up company");
                    format!("Failed to look up company for {}: {}", email, sanitized)
                })?
                .ok_or_else(|| format!("No company found for {}.", email))?,
            (None, None) => {
                return Err("Either company_id or email must be provided.".to_string());
            }
        };

        let tickets = self
            .cw_client
            .list_backup_tickets(&company_id)
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, company_id = %company_id, "Failed to list backup tickets");
                format!("Failed to list backup tickets for company {}: {}", company_id, sanitized)
            })?;

        Ok(format_ticket_list(&tickets))
    }

    /// List open backup tickets across all companies.
    #[tool(description = "List backup board tickets in status 'New' or 'In Progress' across all companies, most recent first (max 1000).")]
    async fn list_open_backup_tickets(&self) -> Result<String, String> {
        tracing::debug!("list_open_backup_tickets tool called");

        let tickets = self
            .cw_client
            .list_open_backup_tickets()
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, "Failed to list open backup tickets");
                format!("Failed to list open backup tickets: {}", sanitized)
            })?;

        Ok(format_ticket_list(&tickets))
    }

    /// Get details of a single ticket.
    #[tool(description = "Get details of a single ticket by number, including board, status, company and a link to the ticket in ConnectWise.")]
    async fn get_ticket(
        &self,
        Parameters(input): Parameters<GetTicketInput>,
    ) -> Result<String, String> {
        tracing::debug!(ticket_id = input.ticket_id, "get_ticket tool called");

        let ticket = self
            .cw_client
            .get_ticket(input.ticket_id)
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, ticket_id = input.ticket_id, "Failed to get ticket");
                format!("Failed to get ticket {}: {}", input.ticket_id, sanitized)
            })?;

        let web_url = self.cw_client.ticket_web_url(ticket.id);
        Ok(format_ticket_details(&ticket, &web_url))
    }

    /// Close a ticket.
    #[tool(description = "Close a backup ticket by moving it to the configured closed status.")]
    async fn close_ticket(
        &self,
        Parameters(input): Parameters<CloseTicketInput>,
    ) -> Result<String, String> {
        tracing::debug!(ticket_id = input.ticket_id, "close_ticket tool called");

        self.cw_client
            .close_ticket(input.ticket_id)
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, ticket_id = input.ticket_id, "Failed to close ticket");
                format!("Failed to close ticket {}: {}", input.ticket_id, sanitized)
            })?;

        Ok(format!("Successfully closed ticket #{}.", input.ticket_id))
    }

    /// Add an internal note to a ticket.
    #[tool(description = "Add an internal note to a ticket. Internal notes are visible to staff only, never to the customer. Ticket ID and message are required.")]
    async fn add_internal_note(
        &self,
        Parameters(input): Parameters<AddInternalNoteInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(ticket_id = input.ticket_id, "add_internal_note tool called");

        if input.message.is_empty() {
            return Err("Note message is required and cannot be empty.".to_string());
        }

        self.cw_client
            .add_internal_note(input.ticket_id, &input.message)
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, ticket_id = input.ticket_id, "Failed to add note");
                format!("Failed to add note to ticket {}: {}", input.ticket_id, sanitized)
            })?;

        Ok(format!(
            "Successfully added internal note to ticket #{}.",
            input.ticket_id
        ))
    }

    /// Sanitizes an error message to remove credentials.
    fn sanitize_error(&self, error: &CwError) -> String {
        error.sanitized_display(&self.cw_client.secrets_for_sanitization())
    }
}

#[tool_handler]
impl ServerHandler for CwDeskServer {
    /// Returns server information for the MCP initialize handshake.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "cwdesk provides access to backup tickets in ConnectWise Manage. \
                 Use list_open_backup_tickets for triage across customers, \
                 lookup_company and list_backup_tickets for one customer's history, \
                 and get_ticket for details. Close tickets with close_ticket and \
                 record findings with add_internal_note. Start with 'ping' to verify \
                 the server and check_connection to verify ConnectWise access."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Maximum length for description fields before truncation.
const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Truncates a string if it exceeds the maximum length.
///
/// If truncated, appends "... [truncated]" to indicate the content was cut.
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }

    let mut end = max_length.saturating_sub(15);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    // Prefer a word boundary
    if let Some(space_pos) = text[..end].rfind(char::is_whitespace) {
        end = space_pos;
    }
    format!("{}... [truncated]", &text[..end])
}

/// Formats a list of tickets as human-readable text.
fn format_ticket_list(tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return "No tickets found matching the criteria.".to_string();
    }

    let mut output = format!("Found {} ticket(s):\n\n", tickets.len());

    for ticket in tickets {
        output.push_str(&format!("#{} - {}\n", ticket.id, ticket.display_summary()));
        output.push_str(&format!(
            "   Status: {} | Company: {}\n",
            ticket.display_status(),
            ticket.display_company()
        ));

        if let Some(entered) = ticket.date_entered() {
            output.push_str(&format!("   Entered: {}\n", entered));
        }

        output.push('\n');
    }

    output
}

/// Formats full ticket details as human-readable text.
fn format_ticket_details(ticket: &Ticket, web_url: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Ticket #{}: {}\n",
        ticket.id,
        ticket.display_summary()
    ));
    output.push_str(&"=".repeat(60));
    output.push('\n');

    output.push_str(&format!("\nBoard: {}\n", ticket.display_board()));
    output.push_str(&format!("Status: {}\n", ticket.display_status()));
    output.push_str(&format!("Company: {}\n", ticket.display_company()));

    if let Some(email) = &ticket.contact_email_address {
        output.push_str(&format!("Contact: {}\n", email));
    }

    if let Some(info) = &ticket.info {
        if let Some(entered) = &info.date_entered {
            output.push_str(&format!("Entered: {}\n", entered));
        }
        if let Some(updated) = &info.last_updated {
            output.push_str(&format!("Last Updated: {}\n", updated));
        }
    }

    if let Some(description) = ticket
        .extra
        .get("initialDescription")
        .and_then(|d| d.as_str())
    {
        output.push_str("\n--- Description ---\n");
        output.push_str(&truncate_text(description, MAX_DESCRIPTION_LENGTH));
        output.push('\n');
    }

    output.push_str(&format!("\nView in ConnectWise: {}\n", web_url));

    output
}
