//! Todo item domain model.
//!
//! # Responsibility
//! - Define the record stored in the ordered collection.
//!
//! # Invariants
//! - `id` is stable and never reused.
//! - `rank` is unique across the collection and is the only field reordering
//!   operations change.

use crate::lexorank::Rank;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one todo item.
pub type TodoId = Uuid;

/// One entry of the ordered todo collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Serialized as `todo_id` to match the persisted column name.
    #[serde(rename = "todo_id")]
    pub id: TodoId,
    /// Free-form user text.
    pub description: String,
    /// Position key; serialized as its wire string.
    pub rank: Rank,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms timestamp of the last description or rank change.
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::TodoItem;
    use crate::lexorank::parse;
    use uuid::Uuid;

    #[test]
    fn serializes_with_wire_field_names_and_rank_string() {
        let id = Uuid::new_v4();
        let item = TodoItem {
            id,
            description: "ship it".to_string(),
            rank: parse("1i").unwrap(),
            created_at: 1_000,
            updated_at: 2_000,
        };

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["todo_id"], id.to_string());
        assert_eq!(value["rank"], "1i");
        assert_eq!(value["description"], "ship it");

        let back: TodoItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn rejects_malformed_rank_on_deserialize() {
        let raw = format!(
            r#"{{"todo_id":"{}","description":"x","rank":"3a","created_at":0,"updated_at":0}}"#,
            Uuid::new_v4()
        );
        assert!(serde_json::from_str::<TodoItem>(&raw).is_err());
    }
}
