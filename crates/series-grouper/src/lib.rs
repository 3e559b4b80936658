//! Series Grouping
//!
//! Resolves the id/kind/value roles of a normalized long-format frame and
//! partitions its rows into one chunk per (entity id, kind) series.

mod error;
mod frame;
mod grouper;
mod records;

pub use error::{FaultReason, GroupingFault, Role, RoleError};
pub use frame::{Column, ColumnRoles, LongFrame, ResolvedColumns};
pub use grouper::{group, Grouper, Grouping};
pub use records::{Chunk, EntityId, NormalizedRecord};
