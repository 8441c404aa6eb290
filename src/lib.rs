//! # cwdesk
//!
//! cwdesk is a client for the ConnectWise Manage REST API, scoped to triaging
//! backup job tickets, plus an MCP (Model Context Protocol) server exposing
//! the client operations as tools.
//!
//! ## Features
//!
//! - **Lookup**: Resolve a contact email to the customer's internal company ID
//! - **Read operations**: List a company's backup tickets, sweep open backup
//!   tickets across companies, fetch a single ticket
//! - **Write operations**: Close tickets, add internal notes
//! - **Status resolution**: Close to a named status, resolved per board
//! - **Security**: Credentials are never logged and are scrubbed from errors
//!
//! Every operation issues a single request. Failures are logged with the
//! response body and returned unchanged; nothing is retried.
//!
//! ## Architecture
//!
//! - [`config`] - Credentials and client configuration, loadable from the environment
//! - [`error`] - Error type with credential-scrubbing helpers
//! - [`cw_client`] - HTTP client for the ConnectWise Manage API
//! - [`server`] - MCP server implementation with tool routing
//! - [`models`] - Records, request bodies and condition builders
//! - [`tools`] - Tool input parameter structs
//!
//! ## Configuration
//!
//! - `CW_COMPANY`, `CW_PUBLIC_KEY`, `CW_PRIVATE_KEY`, `CW_CLIENT_ID`: required
//! - `CW_BASE_URL`: API endpoint (default: North America cloud)
//! - `CW_CHECK_EMAIL`: contact email filter for the connection test
//! - `CW_BACKUP_BOARD`: backup board name (default: `Backup Tickets`)
//! - `CW_CLOSED_STATUS`: closed status ID or name (default: `696`)
//! - `RUST_LOG`: log level (e.g., `cwdesk=debug`)
//!
//! ## Example
//!
//! ```ignore
//! use cwdesk::config::{Config, Credentials};
//! use cwdesk::cw_client::CwClient;
//!
//! async fn example() -> Result<(), cwdesk::error::CwError> {
//!     let config = Config::new(Credentials::new("acme", "public", "private", "client-id"));
//!     let client = CwClient::connect(&config).await?;
//!
//!     for ticket in client.list_open_backup_tickets().await? {
//!         println!("#{}: {}", ticket.id, ticket.display_summary());
//!     }
//!
//!     client.add_internal_note(999, "Re-ran the job, succeeded").await?;
//!     client.close_ticket(999).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod cw_client;
pub mod error;
pub mod models;
pub mod server;
pub mod tools;
