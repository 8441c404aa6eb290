//! MCP tool inputs for cwdesk.
//!
//! This module contains the input types for the MCP tools that expose
//! ConnectWise operations.

mod inputs;

pub use inputs::*;
