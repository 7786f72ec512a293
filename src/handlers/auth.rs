use crate::{
    auth::AuthWallet,
    models::{MeResponse, NonceRequest, NonceResponse, TokenResponse, VerifySignatureRequest},
    utils::ApiResult,
};
use axum::{extract::State, Extension, Json};
use validator::Validate;

/// Issue a signing nonce. With a wallet address the challenge is stored
/// against that address and the ready-to-sign SIWE message is included;
/// without one only a bare nonce is returned.
pub async fn nonce(
    State(state): State<crate::AppState>,
    Json(request): Json<NonceRequest>,
) -> ApiResult<Json<NonceResponse>> {
    request.validate()?;

    let response = match request.wallet_address.as_deref() {
        Some(wallet_address) => {
            let issued = state.auth_service.issue_wallet_nonce(wallet_address);
            NonceResponse {
                nonce: issued.challenge.nonce,
                expires_at: issued.challenge.expires_at,
                message: Some(issued.message),
            }
        }
        None => {
            let challenge = state.auth_service.issue_bare_nonce();
            NonceResponse {
                nonce: challenge.nonce,
                expires_at: challenge.expires_at,
                message: None,
            }
        }
    };

    Ok(Json(response))
}

/// Verify a signed SIWE message and issue a session token.
pub async fn verify(
    State(state): State<crate::AppState>,
    Json(request): Json<VerifySignatureRequest>,
) -> ApiResult<Json<TokenResponse>> {
    request.validate()?;

    let token = state.auth_service.verify_signature(
        &request.address,
        &request.signature,
        &request.nonce,
        &request.message,
    )?;

    Ok(Json(TokenResponse { token }))
}

/// Current authenticated wallet.
pub async fn me(Extension(wallet): Extension<AuthWallet>) -> Json<MeResponse> {
    Json(MeResponse {
        wallet_address: wallet.address,
    })
}
