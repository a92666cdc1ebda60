/// Drag-and-drop payload carried between card and column drop targets.
use serde::{Deserialize, Serialize};

use crate::store::Mutation;

/// JSON `{cardId, fromColumnId}` placed on the platform's drag-data channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    pub card_id: String,
    pub from_column_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Drag payload is empty")]
    Empty,

    #[error("Drag payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl DragPayload {
    pub fn new(card_id: &str, from_column_id: &str) -> Self {
        Self {
            card_id: card_id.to_string(),
            from_column_id: from_column_id.to_string(),
        }
    }

    pub fn encode(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, PayloadError> {
        if raw.trim().is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(serde_json::from_str(raw)?)
    }

    /// The move a drop onto `to_column_id` at `to_index` performs, or `None`
    /// when the card is dropped back onto its own column.
    pub fn drop_mutation(&self, project_id: &str, to_column_id: &str, to_index: usize) -> Option<Mutation> {
        if self.from_column_id == to_column_id {
            return None;
        }
        Some(Mutation::MoveCard {
            project_id: project_id.to_string(),
            from_column_id: self.from_column_id.clone(),
            to_column_id: to_column_id.to_string(),
            card_id: self.card_id.clone(),
            to_index,
        })
    }
}
