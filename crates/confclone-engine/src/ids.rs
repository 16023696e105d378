//! Unique-identifier generation.

use uuid::Uuid;

/// A freshly generated identifier, new on every call. 128 random bits, so
/// collisions within a run are not a practical concern.
pub fn fresh() -> String {
    Uuid::new_v4().to_string()
}
