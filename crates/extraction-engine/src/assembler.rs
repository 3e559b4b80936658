//! Result Assembler
//!
//! Folds feature records into an entity-by-feature table. The fold is a
//! keyed set union, so the table does not depend on the order in which
//! records arrive.

use crate::error::ExtractionError;
use crate::processor::FeatureRecord;
use serde::Serialize;
use series_grouper::EntityId;
use std::collections::{BTreeMap, BTreeSet};

/// One table cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Value(f64),
    /// No record was emitted for this (entity, feature) pair
    Missing,
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Value(v) => Some(*v),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Missing, Cell::Value)
    }
}

/// Entity-by-feature table.
///
/// Rows hold typed entity ids sorted ascending, columns hold feature names
/// sorted ascending. Cells are stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable<I> {
    rows: Vec<I>,
    columns: Vec<String>,
    cells: Vec<Option<f64>>,
}

impl<I> Default for ResultTable<I> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            columns: Vec::new(),
            cells: Vec::new(),
        }
    }
}

impl<I: EntityId> ResultTable<I> {
    pub fn rows(&self) -> &[I] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn row_index(&self, id: &I) -> Option<usize> {
        self.rows.binary_search(id).ok()
    }

    fn column_index(&self, variable: &str) -> Option<usize> {
        self.columns
            .binary_search_by(|c| c.as_str().cmp(variable))
            .ok()
    }

    /// Cell at (id, variable); `None` if either axis lacks the key
    pub fn cell(&self, id: &I, variable: &str) -> Option<Cell> {
        let r = self.row_index(id)?;
        let c = self.column_index(variable)?;
        Some(self.cells[r * self.columns.len() + c].into())
    }

    /// Every (feature, cell) pair of one entity, in column order
    pub fn row(&self, id: &I) -> Option<Vec<(&str, Cell)>> {
        let r = self.row_index(id)?;
        let width = self.columns.len();
        Some(
            self.columns
                .iter()
                .zip(&self.cells[r * width..(r + 1) * width])
                .map(|(name, v)| (name.as_str(), Cell::from(*v)))
                .collect(),
        )
    }

    /// Every (entity, cell) pair of one feature, in row order
    pub fn column(&self, variable: &str) -> Option<Vec<(&I, Cell)>> {
        let c = self.column_index(variable)?;
        let width = self.columns.len();
        Some(
            self.rows
                .iter()
                .enumerate()
                .map(|(r, id)| (id, Cell::from(self.cells[r * width + c])))
                .collect(),
        )
    }

    /// Populated cells as (id, variable, value) triples
    pub fn triples(&self) -> impl Iterator<Item = (&I, &str, f64)> + '_ {
        let width = self.columns.len();
        self.cells.iter().enumerate().filter_map(move |(i, v)| {
            v.map(|value| (&self.rows[i / width], self.columns[i % width].as_str(), value))
        })
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|v| v.is_none()).count()
    }

    /// Equality of the populated (id, variable, value) sets, ignoring axis
    /// order and treating NaN as equal to NaN
    pub fn content_eq(&self, other: &ResultTable<I>) -> bool {
        let ours: BTreeMap<(&I, &str), f64> = self.triples().map(|(i, v, x)| ((i, v), x)).collect();
        let theirs: BTreeMap<(&I, &str), f64> = other.triples().map(|(i, v, x)| ((i, v), x)).collect();

        ours.len() == theirs.len()
            && ours.iter().all(|(key, a)| {
                theirs
                    .get(key)
                    .is_some_and(|b| a == b || (a.is_nan() && b.is_nan()))
            })
    }
}

/// Build a table from feature records
pub fn assemble<I: EntityId>(records: Vec<FeatureRecord<I>>) -> Result<ResultTable<I>, ExtractionError> {
    assemble_with_rows(records, std::iter::empty())
}

/// Build a table whose rows also include `entities`, so an entity with no
/// records still gets a row of missing cells.
///
/// Fails with [`ExtractionError::Integrity`] when two records target the
/// same cell.
pub fn assemble_with_rows<I: EntityId>(
    records: Vec<FeatureRecord<I>>,
    entities: impl IntoIterator<Item = I>,
) -> Result<ResultTable<I>, ExtractionError> {
    let mut row_set: BTreeSet<I> = entities.into_iter().collect();
    let mut column_set: BTreeSet<&str> = BTreeSet::new();
    for record in &records {
        if !row_set.contains(&record.entity_id) {
            row_set.insert(record.entity_id.clone());
        }
        column_set.insert(&record.variable);
    }

    let rows: Vec<I> = row_set.into_iter().collect();
    let columns: Vec<String> = column_set.into_iter().map(str::to_string).collect();
    let width = columns.len();
    let mut cells = vec![None; rows.len() * width];

    for record in records {
        let (Ok(r), Ok(c)) = (
            rows.binary_search(&record.entity_id),
            columns.binary_search(&record.variable),
        ) else {
            continue;
        };

        let slot = &mut cells[r * width + c];
        if slot.is_some() {
            return Err(ExtractionError::Integrity {
                entity_key: record.entity_id.to_string(),
                variable: record.variable,
            });
        }
        *slot = Some(record.value);
    }

    Ok(ResultTable { rows, columns, cells })
}
