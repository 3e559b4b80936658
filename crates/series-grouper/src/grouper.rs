//! Grouper
//!
//! Splits normalized rows into one chunk per (entity id, kind) pair,
//! keeping each series in input order.

use crate::error::{FaultReason, GroupingFault, RoleError};
use crate::frame::{ColumnRoles, LongFrame};
use crate::records::{Chunk, EntityId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Chunks formed from one input plus the keys that had to be left out
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping<I> {
    /// Chunks in first-seen key order
    pub chunks: Vec<Chunk<I>>,
    pub faults: Vec<GroupingFault>,
    /// Input rows consumed
    pub rows: usize,
}

impl<I> Grouping<I> {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn fault_count(&self) -> usize {
        self.faults.len()
    }
}

/// Incremental grouper over (id, kind, value) rows
#[derive(Debug)]
pub struct Grouper<I> {
    /// id → kind → chunk index
    index: HashMap<I, HashMap<String, usize>>,
    chunks: Vec<Chunk<I>>,
    rows: usize,
}

impl<I: EntityId> Default for Grouper<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: EntityId> Grouper<I> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            chunks: Vec::new(),
            rows: 0,
        }
    }

    /// Append one row to its series
    pub fn push(&mut self, id: &I, kind: &str, value: f64) {
        self.rows += 1;
        if let Some(&idx) = self.index.get(id).and_then(|kinds| kinds.get(kind)) {
            self.chunks[idx].values.push(value);
            return;
        }

        let idx = self.chunks.len();
        self.chunks.push(Chunk::new(id.clone(), kind, vec![value]));
        self.index
            .entry(id.clone())
            .or_default()
            .insert(kind.to_string(), idx);
    }

    /// Validate keys and hand back the chunks
    pub fn finish(self) -> Grouping<I> {
        // String key → distinct typed ids rendering to it
        let mut by_key: BTreeMap<&str, BTreeSet<&I>> = BTreeMap::new();
        for chunk in &self.chunks {
            by_key.entry(&chunk.entity_key).or_default().insert(&chunk.entity_id);
        }
        let colliding: BTreeSet<String> = by_key
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(key, _)| key.to_string())
            .collect();

        let mut chunks = Vec::with_capacity(self.chunks.len());
        let mut faults = Vec::new();
        for chunk in self.chunks {
            let reason = if !is_valid_kind(&chunk.kind) {
                Some(FaultReason::InvalidKind)
            } else if colliding.contains(&chunk.entity_key) {
                Some(FaultReason::KeyCollision)
            } else {
                None
            };

            match reason {
                Some(reason) => faults.push(GroupingFault {
                    entity_key: chunk.entity_key,
                    kind: chunk.kind,
                    reason,
                }),
                None => chunks.push(chunk),
            }
        }

        if !faults.is_empty() {
            warn!("Omitted {} series while grouping", faults.len());
        }
        debug!("Grouped {} rows into {} chunks", self.rows, chunks.len());

        Grouping {
            chunks,
            faults,
            rows: self.rows,
        }
    }
}

/// Separator used in feature names
const KIND_SEPARATOR: &str = "__";

/// Kind labels become the first part of feature names
fn is_valid_kind(kind: &str) -> bool {
    !kind.is_empty() && !kind.contains(KIND_SEPARATOR)
}

/// Group rows of `frame` by the columns `roles` names
pub fn group<I: EntityId>(frame: &LongFrame<I>, roles: &ColumnRoles) -> Result<Grouping<I>, RoleError> {
    let columns = frame.resolve(roles)?;
    let mut grouper = Grouper::new();
    for (id, kind, value) in columns.rows() {
        grouper.push(id, kind, value);
    }
    Ok(grouper.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::NormalizedRecord;
    use std::fmt;

    fn frame(rows: &[(u32, &str, f64)]) -> LongFrame<u32> {
        LongFrame::from_records(rows.iter().map(|&(id, kind, v)| NormalizedRecord::new(id, kind, v)))
    }

    #[test]
    fn test_one_chunk_per_pair_in_order() {
        let frame = frame(&[
            (1, "x", 1.0),
            (2, "x", 4.0),
            (1, "y", 9.0),
            (1, "x", 2.0),
            (2, "x", 5.0),
            (1, "x", 3.0),
        ]);
        let grouping = group(&frame, &ColumnRoles::default()).unwrap();

        assert_eq!(grouping.len(), 3);
        assert_eq!(grouping.rows, 6);
        assert!(grouping.faults.is_empty());

        let first = &grouping.chunks[0];
        assert_eq!((first.entity_id, first.kind.as_str()), (1, "x"));
        assert_eq!(first.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(grouping.chunks[1].values, vec![4.0, 5.0]);
        assert_eq!(grouping.chunks[2].kind, "y");
    }

    #[test]
    fn test_empty_frame_gives_no_chunks() {
        let grouping = group(&frame(&[]), &ColumnRoles::default()).unwrap();
        assert!(grouping.is_empty());
        assert_eq!(grouping.fault_count(), 0);
    }

    #[test]
    fn test_invalid_kinds_are_reported_not_fatal() {
        let frame = frame(&[(1, "x", 1.0), (1, "a__b", 2.0), (2, "", 3.0)]);
        let grouping = group(&frame, &ColumnRoles::default()).unwrap();

        assert_eq!(grouping.len(), 1);
        assert_eq!(grouping.fault_count(), 2);
        assert!(grouping.faults.iter().all(|f| f.reason == FaultReason::InvalidKind));
        assert_eq!(grouping.faults[0].entity_key, "1");
    }

    /// Id whose display drops the second field
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    struct Tagged(u8, u8);

    impl fmt::Display for Tagged {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[test]
    fn test_string_key_collisions_are_omitted() {
        let mut grouper = Grouper::new();
        grouper.push(&Tagged(1, 0), "x", 1.0);
        grouper.push(&Tagged(1, 1), "x", 2.0);
        grouper.push(&Tagged(2, 0), "x", 3.0);
        let grouping = grouper.finish();

        assert_eq!(grouping.len(), 1);
        assert_eq!(grouping.chunks[0].entity_id, Tagged(2, 0));
        assert_eq!(grouping.fault_count(), 2);
        assert!(grouping.faults.iter().all(|f| f.reason == FaultReason::KeyCollision));
    }

    #[test]
    fn test_typed_ids_survive_grouping() {
        let frame = LongFrame::from_records(vec![
            NormalizedRecord::new(-3i64, "x", 1.0),
            NormalizedRecord::new(10i64, "x", 2.0),
        ]);
        let grouping = group(&frame, &ColumnRoles::default()).unwrap();
        let ids: Vec<i64> = grouping.chunks.iter().map(|c| c.entity_id).collect();
        assert_eq!(ids, vec![-3, 10]);
        assert_eq!(grouping.chunks[0].entity_key, "-3");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn one_chunk_per_distinct_pair(
                rows in prop::collection::vec(
                    (0u8..5, prop::sample::select(vec!["x", "y", "z"]), -10.0..10.0f64),
                    0..60,
                )
            ) {
                let frame = LongFrame::from_records(
                    rows.iter().map(|&(id, kind, v)| NormalizedRecord::new(id, kind, v)),
                );
                let grouping = group(&frame, &ColumnRoles::default()).unwrap();

                let distinct: BTreeSet<(u8, &str)> = rows.iter().map(|&(id, kind, _)| (id, kind)).collect();
                prop_assert_eq!(grouping.len(), distinct.len());

                for chunk in &grouping.chunks {
                    let expected: Vec<f64> = rows
                        .iter()
                        .filter(|r| r.0 == chunk.entity_id && r.1 == chunk.kind)
                        .map(|r| r.2)
                        .collect();
                    prop_assert_eq!(&chunk.values, &expected);
                }
            }
        }
    }
}
