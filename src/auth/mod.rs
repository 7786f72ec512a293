pub mod api_keys;
pub mod nonce;
pub mod siwe;

use crate::{
    state::AppState,
    utils::{ApiError, ApiResult, Config},
};
use api_keys::ApiKeyStore;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use nonce::{NonceChallenge, NonceStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Issuer claim stamped into every session token.
const TOKEN_ISSUER: &str = "wiseprompt-api";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // wallet address, lowercased
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
}

/// Authenticated identity resolved by the dispatcher, attached to the
/// request for downstream ownership checks. Request-scoped only.
#[derive(Debug, Clone)]
pub struct AuthWallet {
    pub address: String,
}

/// Wallet-bound nonce issue result, carrying the ready-to-sign message.
pub struct WalletNonce {
    pub challenge: NonceChallenge,
    pub message: String,
}

/// Authentication service: nonce issuance, SIWE verification, and session
/// token minting/resolution.
pub struct AuthService {
    config: Arc<Config>,
    nonces: NonceStore,
    api_keys: Arc<ApiKeyStore>,
}

impl AuthService {
    pub fn new(config: Arc<Config>, api_keys: Arc<ApiKeyStore>) -> Self {
        let nonces = NonceStore::new(config.nonce.ttl_minutes);
        Self {
            config,
            nonces,
            api_keys,
        }
    }

    /// Issue a nonce bound to a wallet address, along with the exact SIWE
    /// message string the wallet must sign.
    pub fn issue_wallet_nonce(&self, wallet_address: &str) -> WalletNonce {
        let challenge = self.nonces.issue_for_wallet(wallet_address);
        let message = siwe::build_message(
            wallet_address,
            &challenge.nonce,
            Utc::now(),
            &self.config.siwe,
        );
        WalletNonce { challenge, message }
    }

    /// Issue a bare nonce with no stored wallet binding.
    pub fn issue_bare_nonce(&self) -> NonceChallenge {
        self.nonces.issue_bare()
    }

    /// Verify a signed SIWE message and mint a session token. The nonce
    /// is consumed before any cryptographic work so it can never be
    /// replayed, even if a later check were skipped. Every failure is the
    /// same generic 401.
    pub fn verify_signature(
        &self,
        address: &str,
        signature: &str,
        nonce: &str,
        message: &str,
    ) -> ApiResult<String> {
        self.nonces.consume(address, nonce).map_err(|_| {
            tracing::debug!(wallet = %address, "nonce rejected");
            ApiError::authentication_error("Signature verification failed")
        })?;

        siwe::verify_message(message, signature, address, nonce, &self.config.siwe).map_err(
            |err| {
                tracing::debug!(wallet = %address, error = %err, "SIWE verification failed");
                ApiError::authentication_error("Signature verification failed")
            },
        )?;

        self.issue_session(address)
    }

    /// Mint a signed session token with subject = lowercased wallet
    /// address. Stateless: validity is bounded entirely by the embedded
    /// expiry, so early revocation requires secret rotation.
    pub fn issue_session(&self, wallet_address: &str) -> ApiResult<String> {
        let now = Utc::now();
        let expires_at: DateTime<Utc> = now + Duration::days(self.config.jwt.expiration_days);
        let claims = Claims {
            sub: wallet_address.to_lowercase(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt.secret.as_ref()),
        )
        .map_err(|_| ApiError::internal_error("Failed to generate token"))
    }

    /// Verify a session token's signature and expiry and extract the
    /// authenticated wallet address.
    pub fn resolve_session(&self, token: &str) -> ApiResult<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt.secret.as_ref()),
            &validation,
        )
        .map_err(|_| ApiError::authentication_error("Please authenticate"))?;

        Ok(token_data.claims.sub)
    }
}

/// Extract a bearer token from the Authorization header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|auth_header| auth_header.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Extract an API key from the X-API-Key header or an
/// `Authorization: ApiKey <key>` header, in that order.
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(key) = headers.get("X-API-Key").and_then(|value| value.to_str().ok()) {
        return Some(key.to_string());
    }

    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|auth_header| auth_header.strip_prefix("ApiKey "))
        .map(|key| key.to_string())
}

/// Session-only middleware: a valid bearer token is required.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::authentication_error("Please authenticate"))?;
    let address = state.auth_service.resolve_session(&token)?;

    request.extensions_mut().insert(AuthWallet { address });
    Ok(next.run(request).await)
}

/// Loose session middleware: absence of a credential resolves to
/// anonymous, but a present-but-invalid token still fails.
pub async fn optional_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_bearer_token(request.headers()) {
        let address = state.auth_service.resolve_session(&token)?;
        request.extensions_mut().insert(AuthWallet { address });
    }

    Ok(next.run(request).await)
}

/// API-key-only middleware: validate, resolve the owning wallet, and
/// record last use.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = extract_api_key(request.headers())
        .ok_or_else(|| ApiError::authentication_error("API key is missing"))?;
    let address = resolve_api_key(&state.api_keys, &key)?;

    request.extensions_mut().insert(AuthWallet { address });
    Ok(next.run(request).await)
}

/// Either-credential middleware: a combinator over the session and API
/// key strategies, failing only when neither resolves an identity.
pub async fn require_session_or_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_wallet = extract_bearer_token(request.headers())
        .and_then(|token| state.auth_service.resolve_session(&token).ok());

    let address = match session_wallet {
        Some(address) => address,
        None => extract_api_key(request.headers())
            .and_then(|key| resolve_api_key(&state.api_keys, &key).ok())
            .ok_or_else(|| {
                ApiError::authentication_error(
                    "Authentication required. Use either JWT or API Key.",
                )
            })?,
    };

    request.extensions_mut().insert(AuthWallet { address });
    Ok(next.run(request).await)
}

fn resolve_api_key(api_keys: &ApiKeyStore, key: &str) -> ApiResult<String> {
    if !api_keys.validate(key) {
        return Err(ApiError::authentication_error("Invalid API key"));
    }

    let address = api_keys
        .resolve_owner(key)
        .ok_or_else(|| ApiError::authentication_error("Invalid API key"))?;

    // Best effort; a failed touch never fails the request.
    api_keys.touch(key);

    Ok(address)
}
