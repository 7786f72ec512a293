use crate::{
    auth::AuthWallet,
    models::{
        ApiKeyListEntry, CreateApiKeyRequest, CreateApiKeyResponse, SuccessResponse,
    },
    utils::ApiResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

/// Create a new API key. The raw key appears in this response only;
/// every later read is masked.
pub async fn create(
    State(state): State<crate::AppState>,
    Extension(wallet): Extension<AuthWallet>,
    Json(request): Json<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<CreateApiKeyResponse>)> {
    request.validate()?;

    let created = state
        .api_keys
        .create(&wallet.address, &request.name, request.expires_in_days);

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            id: created.id,
            name: created.name,
            key: created.key,
            expires_at: created.expires_at,
            created_at: created.created_at,
        }),
    ))
}

/// List the caller's API keys, newest first, keys masked.
pub async fn list(
    State(state): State<crate::AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Json<Vec<ApiKeyListEntry>> {
    let entries = state
        .api_keys
        .list(&wallet.address)
        .into_iter()
        .map(|summary| ApiKeyListEntry {
            id: summary.id,
            name: summary.name,
            key: summary.key,
            is_active: summary.is_active,
            expires_at: summary.expires_at,
            last_used_at: summary.last_used_at,
            created_at: summary.created_at,
        })
        .collect();

    Json(entries)
}

/// Revoke an API key owned by the caller.
pub async fn revoke(
    State(state): State<crate::AppState>,
    Extension(wallet): Extension<AuthWallet>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    state.api_keys.revoke(&wallet.address, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
