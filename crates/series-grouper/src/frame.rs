//! Long-format Input Frame and Column Roles

use crate::error::{Role, RoleError};
use crate::records::NormalizedRecord;
use serde::{Deserialize, Serialize};

/// A named column of the normalized input
#[derive(Debug, Clone, PartialEq)]
pub enum Column<I> {
    /// Typed entity ids
    Ids(Vec<I>),
    /// Text labels (series kinds)
    Text(Vec<String>),
    /// Observed values
    Float(Vec<f64>),
}

impl<I> Column<I> {
    pub fn len(&self) -> usize {
        match self {
            Column::Ids(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which columns hold the id, kind and value roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRoles {
    pub id: String,
    pub kind: String,
    pub value: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            kind: "kind".to_string(),
            value: "value".to_string(),
        }
    }
}

impl ColumnRoles {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Columns picked out by a [`ColumnRoles`] resolution
#[derive(Debug, Clone, Copy)]
pub struct ResolvedColumns<'a, I> {
    pub ids: &'a [I],
    pub kinds: &'a [String],
    pub values: &'a [f64],
}

impl<'a, I> ResolvedColumns<'a, I> {
    /// Rows in input order
    pub fn rows(&self) -> impl Iterator<Item = (&'a I, &'a str, f64)> + 'a {
        let (ids, kinds, values) = (self.ids, self.kinds, self.values);
        ids.iter()
            .zip(kinds.iter())
            .zip(values.iter())
            .map(|((id, kind), &value)| (id, kind.as_str(), value))
    }
}

/// Normalized long-format input: equal-length named columns, one row per
/// observation, rows already time-ordered within each series.
#[derive(Debug, Clone, PartialEq)]
pub struct LongFrame<I> {
    columns: Vec<(String, Column<I>)>,
    rows: usize,
}

impl<I> LongFrame<I> {
    /// Build a frame, rejecting duplicate names and ragged columns
    pub fn new(columns: Vec<(String, Column<I>)>) -> Result<Self, RoleError> {
        let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        for (i, (name, column)) in columns.iter().enumerate() {
            if columns[..i].iter().any(|(other, _)| other == name) {
                return Err(RoleError::DuplicateColumn(name.clone()));
            }
            if column.len() != rows {
                return Err(RoleError::RaggedColumn {
                    column: name.clone(),
                    expected: rows,
                    actual: column.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Frame with `id`, `kind` and `value` columns from records
    pub fn from_records(records: impl IntoIterator<Item = NormalizedRecord<I>>) -> Self {
        let mut ids = Vec::new();
        let mut kinds = Vec::new();
        let mut values = Vec::new();
        for record in records {
            ids.push(record.entity_id);
            kinds.push(record.kind);
            values.push(record.value);
        }
        let rows = ids.len();
        let roles = ColumnRoles::default();
        Self {
            columns: vec![
                (roles.id, Column::Ids(ids)),
                (roles.kind, Column::Text(kinds)),
                (roles.value, Column::Float(values)),
            ],
            rows,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column(&self, name: &str) -> Option<&Column<I>> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    fn lookup(&self, role: Role, name: &str) -> Result<&Column<I>, RoleError> {
        self.column(name).ok_or_else(|| RoleError::Unresolved {
            role,
            column: name.to_string(),
        })
    }

    /// Pick the id, kind and value columns named by `roles`
    pub fn resolve(&self, roles: &ColumnRoles) -> Result<ResolvedColumns<'_, I>, RoleError> {
        let wrong_type = |role: Role, column: &str, expected: &'static str| RoleError::WrongType {
            role,
            column: column.to_string(),
            expected,
        };

        let ids = match self.lookup(Role::Id, &roles.id)? {
            Column::Ids(ids) => ids.as_slice(),
            _ => return Err(wrong_type(Role::Id, &roles.id, "entity ids")),
        };
        let kinds = match self.lookup(Role::Kind, &roles.kind)? {
            Column::Text(kinds) => kinds.as_slice(),
            _ => return Err(wrong_type(Role::Kind, &roles.kind, "text")),
        };
        let values = match self.lookup(Role::Value, &roles.value)? {
            Column::Float(values) => values.as_slice(),
            _ => return Err(wrong_type(Role::Value, &roles.value, "floats")),
        };

        Ok(ResolvedColumns { ids, kinds, values })
    }
}
