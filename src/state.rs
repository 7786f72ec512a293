use crate::{auth::api_keys::ApiKeyStore, auth::AuthService, store::Store, utils::Config};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub auth_service: Arc<AuthService>,
    pub api_keys: Arc<ApiKeyStore>,
    pub config: Arc<Config>,
}
