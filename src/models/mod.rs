//! Data models for the ConnectWise Manage API.
//!
//! This module contains type definitions for the records this crate reads
//! (tickets, contacts, boards and statuses), the request bodies it writes
//! (JSON patch operations and notes), and the condition strings used to
//! filter list endpoints.

mod board;
mod common;
mod contact;
mod note;
mod ticket;

pub use board::*;
pub use common::*;
pub use contact::*;
pub use note::*;
pub use ticket::*;
