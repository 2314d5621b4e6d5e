//! Common utility types.

use std::collections::HashMap;

/// Unique identifier type.
pub type Id = String;

/// Metadata map type.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Generates a new random identifier.
pub fn new_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
