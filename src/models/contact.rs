//! Contact lookup helpers.
//!
//! Contact records are not modeled; only the company reference of the
//! first search result is read.

use serde_json::Value;

/// Extracts `[0].company.id` from a contact search result as a string.
///
/// Returns `None` for an empty list or any other shape, including a
/// non-array body or a contact without a company.
pub fn first_company_id(contacts: &Value) -> Option<String> {
    let id = contacts.get(0)?.get("company")?.get("id")?;
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
