//! Token accounting for awakening layers.
//!
//! Each layer is estimated as `ceil(bytes / 4)` of its compact JSON form.
//! Empty or absent layers count 0. Budgets are advisory and only logged.

use agentdb_core::text::estimate_json_tokens;
use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT_BUDGET: u32 = 500;
pub const TODO_BUDGET: u32 = 200;
pub const SKILL_BUDGET: u32 = 1000;
pub const MEMORY_BUDGET: u32 = 3000;

/// Per-layer token estimates for one awakening.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTokens {
    pub system_prompt: u32,
    pub todos: u32,
    pub skills: u32,
    pub memories: u32,
    pub buffer_refs: u32,
    pub tool_history: u32,
}

impl LayerTokens {
    /// Sum of all layers, saturating at `u32::MAX`.
    pub fn total(&self) -> u32 {
        [
            self.system_prompt,
            self.todos,
            self.skills,
            self.memories,
            self.buffer_refs,
            self.tool_history,
        ]
        .into_iter()
        .fold(0u32, u32::saturating_add)
    }

    /// Layers whose estimate exceeds their budget, as `(layer, estimate, budget)`.
    pub fn over_budget(&self) -> Vec<(&'static str, u32, u32)> {
        [
            ("system_prompt", self.system_prompt, SYSTEM_PROMPT_BUDGET),
            ("todos", self.todos, TODO_BUDGET),
            ("skills_catalog", self.skills, SKILL_BUDGET),
            ("memories", self.memories, MEMORY_BUDGET),
        ]
        .into_iter()
        .filter(|(_, estimate, budget)| estimate > budget)
        .collect()
    }
}

/// Estimate an optional layer; `None` counts 0.
pub fn estimate_optional<T: Serialize>(layer: Option<&T>) -> u32 {
    layer.map_or(0, estimate_json_tokens)
}

/// Estimate a collection layer; an empty collection counts 0.
pub fn estimate_collection<T: Serialize>(layer: &T, is_empty: bool) -> u32 {
    if is_empty {
        0
    } else {
        estimate_json_tokens(layer)
    }
}
