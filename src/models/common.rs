//! Common types shared across ConnectWise API models.
//!
//! This module defines record references, audit info, pagination, and the
//! condition expressions accepted by the `conditions` and `childconditions`
//! query parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to another record, as embedded in most ConnectWise responses.
///
/// For example a ticket's board is `{"id": 12, "name": "Backup Tickets"}`
/// and its company is `{"id": 42, "identifier": "ACME", "name": "Acme Inc"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Record ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Short identifier (companies only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Every field not modeled above (e.g. `_info` with the record href).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Reference {
    /// Returns the name, falling back to the identifier, then the ID.
    pub fn display(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.identifier.clone())
            .or_else(|| self.id.map(|id| format!("#{}", id)))
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Audit metadata carried in the `_info` field of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInfo {
    /// When the record was created (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_entered: Option<String>,

    /// When the record was last changed (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Member identifier that created the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_by: Option<String>,

    /// Member identifier that last changed the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,

    /// Every field not modeled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Page selector for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// A 1-based page number.
    Number(u32),
    /// The last page of results.
    Last,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Number(n) => write!(f, "{}", n),
            Page::Last => f.write_str("Last"),
        }
    }
}

/// The right-hand side of an equality condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    /// A string literal, rendered in single quotes.
    Text(String),
    /// A numeric literal, rendered bare.
    Number(u64),
}

/// A filter expression for the `conditions`/`childconditions` parameters.
///
/// Renders to the ConnectWise condition syntax, e.g.
/// `board/name='Backup Tickets'` or `(status/name='New' or status/name='In Progress')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `field=value`.
    Equals {
        /// Field path (e.g. `company/id`).
        field: String,
        /// Value to compare against.
        value: ConditionValue,
    },
    /// Any of the nested conditions, joined with `or`.
    AnyOf(Vec<Condition>),
}

impl Condition {
    /// Creates a `field='value'` condition.
    pub fn equals_str(field: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::Equals {
            field: field.into(),
            value: ConditionValue::Text(value.into()),
        }
    }

    /// Creates a `field=value` condition with a numeric value.
    pub fn equals_num(field: impl Into<String>, value: u64) -> Self {
        Condition::Equals {
            field: field.into(),
            value: ConditionValue::Number(value),
        }
    }

    /// Creates an `or` group over the given conditions.
    pub fn any_of(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::AnyOf(conditions.into_iter().collect())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals {
                field,
                value: ConditionValue::Text(text),
            } => write!(f, "{}='{}'", field, text),
            Condition::Equals {
                field,
                value: ConditionValue::Number(n),
            } => write!(f, "{}={}", field, n),
            Condition::AnyOf(conditions) => {
                let parts: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
                if parts.len() == 1 {
                    f.write_str(&parts[0])
                } else {
                    write!(f, "({})", parts.join(" or "))
                }
            }
        }
    }
}

/// Joins conditions with ` and `, the way the API expects multiple filters.
pub fn join_conditions(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" and ")
}
