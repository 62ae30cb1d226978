//! Stable synthetic identifier assignment.
//!
//! Identity is first-seen-wins: an identifier is generated the first time
//! a record is seen and preserved verbatim on every later sync. A record
//! that is removed and later reappears with the same business key is a new
//! entity and receives a new identifier.

use uuid::Uuid;

use crate::record::Record;

/// Generate a fresh globally-unique identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Make sure a record carries an identifier. Returns `true` when one was
/// newly assigned, `false` when the existing identifier was preserved.
pub fn ensure_id(record: &mut Record) -> bool {
    match record.id() {
        Some(_) => false,
        None => {
            record.set_id(new_id());
            true
        }
    }
}
