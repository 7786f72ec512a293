use crate::models::{AiAgentEntry, TagEntry};
use axum::{extract::State, Json};

/// All available tags.
pub async fn tags(State(state): State<crate::AppState>) -> Json<Vec<TagEntry>> {
    let entries = state
        .store
        .tags()
        .iter()
        .map(|tag| TagEntry {
            id: tag.id,
            name: tag.name.clone(),
        })
        .collect();
    Json(entries)
}

/// All AI agents prompts can be tested against.
pub async fn ai_agents(State(state): State<crate::AppState>) -> Json<Vec<AiAgentEntry>> {
    let entries = state
        .store
        .ai_agents()
        .iter()
        .map(|agent| AiAgentEntry {
            id: agent.id,
            name: agent.name.clone(),
        })
        .collect();
    Json(entries)
}
