//! # Shelf Core
//!
//! Pure reconciliation logic for Shelfsync: the record model, canonical
//! content hashing, identity assignment, snapshot differencing, and
//! document flattening. No I/O lives here; the store and graph crates
//! feed this logic and persist its results.

pub mod diff;
pub mod error;
pub mod flatten;
pub mod hash;
pub mod identity;
pub mod record;
pub mod report;

pub use diff::{diff_and_merge, DiffOutcome, DiffResult, RecordChange};
pub use error::{ShelfError, ShelfResult, SkipReason, SkippedRecord};
pub use flatten::{flatten, strip_nested, FieldMapping, FieldPath};
pub use record::{Record, HASH_FIELD, ID_FIELD};
pub use report::{EntityReport, RunReport};
