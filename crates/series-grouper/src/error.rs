//! Grouping Error Types

use serde::Serialize;
use thiserror::Error;

/// Which input role a column plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Id,
    Kind,
    Value,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Id => "id",
            Role::Kind => "kind",
            Role::Value => "value",
        }
    }
}

/// Errors building a frame or resolving column roles.
///
/// All of these are configuration errors: they surface before any chunk
/// is formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    /// Role names a column the frame does not have
    #[error("{} column {column:?} not found", .role.as_str())]
    Unresolved { role: Role, column: String },

    /// Role names a column of the wrong type
    #[error("{} column {column:?} must hold {expected}", .role.as_str())]
    WrongType {
        role: Role,
        column: String,
        expected: &'static str,
    },

    /// Columns of different lengths
    #[error("column {column:?} has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Two columns share a name
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
}

/// Why a single (id, kind) key was left out of the chunk set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum FaultReason {
    /// Kind label is empty or contains the `__` separator
    #[error("invalid kind label")]
    InvalidKind,

    /// Distinct typed ids render to the same string key
    #[error("string key shared by distinct ids")]
    KeyCollision,
}

/// Non-fatal failure to form one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("grouping fault for ({entity_key}, {kind:?}): {reason}")]
pub struct GroupingFault {
    /// Derived string form of the entity id
    pub entity_key: String,
    pub kind: String,
    pub reason: FaultReason,
}
