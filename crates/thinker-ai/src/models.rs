//! Model registry: the chat models offered for selection.

/// A selectable chat model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    /// Identifier sent in the request's `model` field
    pub id: &'static str,
    /// Human-readable name
    pub name: &'static str,
}

/// Model used when a session has not picked one
pub const DEFAULT_MODEL: &str = "grok-3";

const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "grok-3-mini",
        name: "Grok-3-mini",
    },
    ModelInfo {
        id: "grok-3",
        name: "Grok 3 (Standard)",
    },
    ModelInfo {
        id: "grok-4",
        name: "Grok-4 (New)",
    },
];

/// Get all registered models.
pub fn get_all_models() -> &'static [ModelInfo] {
    MODELS
}

/// Look up a model by exact ID.
pub fn get_model(id: &str) -> Option<ModelInfo> {
    MODELS.iter().find(|m| m.id == id).copied()
}

/// Resolve a user query to a model: exact id, then partial id, then name.
pub fn find_model(query: &str) -> Option<ModelInfo> {
    let query_lower = query.to_lowercase();

    if let Some(model) = MODELS.iter().find(|m| m.id == query_lower) {
        return Some(*model);
    }

    if let Some(model) = MODELS.iter().find(|m| m.id.contains(&query_lower)) {
        return Some(*model);
    }

    MODELS
        .iter()
        .find(|m| m.name.to_lowercase().contains(&query_lower))
        .copied()
}
