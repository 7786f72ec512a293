use crate::utils::{ApiError, ApiResult};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Stored API key record. The raw key is kept for exact-match lookup and
/// never serialized; list responses only ever expose the masked form.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub wallet_address: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One-time creation result carrying the raw key.
#[derive(Debug, Clone)]
pub struct CreatedApiKey {
    pub id: Uuid,
    pub name: String,
    pub key: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Listing entry with the key irreversibly masked.
#[derive(Debug, Clone)]
pub struct ApiKeySummary {
    pub id: Uuid,
    pub name: String,
    pub key: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Long-lived opaque credentials bound to a wallet address, independent of
/// the session-token flow. Keys are revoked by flipping the active flag;
/// records are never physically deleted by normal flows.
pub struct ApiKeyStore {
    keys: RwLock<HashMap<Uuid, ApiKeyRecord>>,
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new key for a wallet. `expires_in_days` of 0 (or None)
    /// means the key never expires. The raw key is returned here exactly
    /// once; every later read is masked.
    pub fn create(
        &self,
        wallet_address: &str,
        name: &str,
        expires_in_days: Option<u32>,
    ) -> CreatedApiKey {
        let now = Utc::now();
        let expires_at = match expires_in_days {
            Some(days) if days > 0 => Some(now + Duration::days(i64::from(days))),
            _ => None,
        };

        let record = ApiKeyRecord {
            id: Uuid::new_v4(),
            key: generate_key(),
            name: name.to_string(),
            wallet_address: wallet_address.to_lowercase(),
            is_active: true,
            expires_at,
            last_used_at: None,
            created_at: now,
        };

        let created = CreatedApiKey {
            id: record.id,
            name: record.name.clone(),
            key: record.key.clone(),
            expires_at: record.expires_at,
            created_at: record.created_at,
        };

        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.insert(record.id, record);
        created
    }

    /// List all keys owned by a wallet, newest first.
    pub fn list(&self, wallet_address: &str) -> Vec<ApiKeySummary> {
        let normalized = wallet_address.to_lowercase();
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());

        let mut owned: Vec<&ApiKeyRecord> = keys
            .values()
            .filter(|record| record.wallet_address == normalized)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        owned
            .into_iter()
            .map(|record| ApiKeySummary {
                id: record.id,
                name: record.name.clone(),
                key: mask_key(&record.key),
                is_active: record.is_active,
                expires_at: record.expires_at,
                last_used_at: record.last_used_at,
                created_at: record.created_at,
            })
            .collect()
    }

    /// Revoke a key. Existence is checked before ownership, so a
    /// non-owner receives 403 for a key that exists and 404 otherwise.
    /// Revoking an already-revoked key succeeds again without corrupting
    /// state.
    pub fn revoke(&self, wallet_address: &str, id: Uuid) -> ApiResult<()> {
        let normalized = wallet_address.to_lowercase();
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());

        let record = keys
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found_error("API key not found"))?;

        if record.wallet_address != normalized {
            return Err(ApiError::authorization_error(
                "You are not authorized to revoke this API key",
            ));
        }

        record.is_active = false;
        Ok(())
    }

    /// True iff a record with this exact key exists, is active, and has
    /// no expiry or an expiry in the future.
    pub fn validate(&self, raw_key: &str) -> bool {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.values().any(|record| {
            record.key == raw_key
                && record.is_active
                && record.expires_at.map_or(true, |exp| exp > Utc::now())
        })
    }

    /// Update the last-used timestamp. Best effort: a missing record is
    /// simply ignored so a stale touch never fails the request.
    pub fn touch(&self, raw_key: &str) {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = keys.values_mut().find(|record| record.key == raw_key) {
            record.last_used_at = Some(Utc::now());
        }
    }

    /// Wallet address owning a key, if any.
    pub fn resolve_owner(&self, raw_key: &str) -> Option<String> {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.values()
            .find(|record| record.key == raw_key)
            .map(|record| record.wallet_address.clone())
    }
}

/// Generate a 256-bit random key, hex encoded.
fn generate_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Mask a raw key for display: first 8 and last 4 characters visible,
/// the middle replaced by an ellipsis marker.
pub fn mask_key(key: &str) -> String {
    if key.len() <= 12 {
        return "...".to_string();
    }
    format!("{}...{}", &key[..8], &key[key.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0xAbCd000000000000000000000000000000000001";
    const OTHER_WALLET: &str = "0x0000000000000000000000000000000000000002";

    #[test]
    fn create_returns_raw_key_and_list_masks_it() {
        let store = ApiKeyStore::new();
        let created = store.create(WALLET, "ci server", None);

        assert_eq!(created.key.len(), 64);
        assert!(created.expires_at.is_none());

        let listed = store.list(WALLET);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, mask_key(&created.key));
        assert_ne!(listed[0].key, created.key);
        assert!(listed[0].is_active);
    }

    #[test]
    fn mask_is_stable_and_irreversible() {
        let key = "abcdefgh-middle-segment-that-stays-hidden-wxyz";
        let masked = mask_key(key);
        assert_eq!(masked, "abcdefgh...wxyz");
        assert_eq!(mask_key(key), masked);
        assert!(!masked.contains("middle"));
    }

    #[test]
    fn mask_hides_everything_for_short_keys() {
        assert_eq!(mask_key("short"), "...");
    }

    #[test]
    fn list_is_scoped_to_owner_and_newest_first() {
        let store = ApiKeyStore::new();
        let first = store.create(WALLET, "first", None);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.create(WALLET, "second", None);
        store.create(OTHER_WALLET, "theirs", None);

        let listed = store.list(WALLET);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn validate_requires_active_unexpired_exact_match() {
        let store = ApiKeyStore::new();
        let created = store.create(WALLET, "key", Some(30));

        assert!(store.validate(&created.key));
        assert!(!store.validate("no-such-key"));
    }

    #[test]
    fn zero_expiry_days_means_never_expires() {
        let store = ApiKeyStore::new();
        let created = store.create(WALLET, "forever", Some(0));

        assert!(created.expires_at.is_none());
        assert!(store.validate(&created.key));
        assert_eq!(store.list(WALLET)[0].expires_at, None);
    }

    #[test]
    fn expired_key_fails_validation_but_owner_still_resolves() {
        let store = ApiKeyStore::new();
        let created = store.create(WALLET, "old", Some(30));

        // Back-date the expiry past due
        {
            let mut keys = store.keys.write().unwrap();
            keys.get_mut(&created.id).unwrap().expires_at = Some(Utc::now() - Duration::days(1));
        }

        assert!(!store.validate(&created.key));
        // The record itself survives: ownership and listing still work
        assert_eq!(store.resolve_owner(&created.key), Some(WALLET.to_lowercase()));
        let listed = store.list(WALLET);
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_active);
    }

    #[test]
    fn revoke_deactivates_and_is_idempotent_in_effect() {
        let store = ApiKeyStore::new();
        let created = store.create(WALLET, "key", None);

        assert!(store.validate(&created.key));
        store.revoke(WALLET, created.id).unwrap();
        assert!(!store.validate(&created.key));

        // A second revoke still succeeds at the storage level
        store.revoke(WALLET, created.id).unwrap();
        assert!(!store.validate(&created.key));
    }

    #[test]
    fn revoke_unknown_id_is_not_found() {
        let store = ApiKeyStore::new();
        let err = store.revoke(WALLET, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.error, "NotFoundError");
    }

    #[test]
    fn revoke_foreign_key_is_forbidden() {
        let store = ApiKeyStore::new();
        let created = store.create(WALLET, "key", None);

        let err = store.revoke(OTHER_WALLET, created.id).unwrap_err();
        assert_eq!(err.error, "AuthorizationError");
        // The key remains usable by its owner
        assert!(store.validate(&created.key));
    }

    #[test]
    fn revoke_ownership_compare_is_case_insensitive() {
        let store = ApiKeyStore::new();
        let created = store.create(WALLET, "key", None);
        store.revoke(&WALLET.to_uppercase().replacen("0X", "0x", 1), created.id).unwrap();
        assert!(!store.validate(&created.key));
    }

    #[test]
    fn touch_updates_last_used_and_ignores_unknown_keys() {
        let store = ApiKeyStore::new();
        let created = store.create(WALLET, "key", None);

        assert_eq!(store.list(WALLET)[0].last_used_at, None);
        store.touch(&created.key);
        assert!(store.list(WALLET)[0].last_used_at.is_some());

        // Unknown key is a no-op, not an error
        store.touch("no-such-key");
    }

    #[test]
    fn resolve_owner_returns_lowercased_wallet() {
        let store = ApiKeyStore::new();
        let created = store.create(WALLET, "key", None);

        assert_eq!(store.resolve_owner(&created.key), Some(WALLET.to_lowercase()));
        assert_eq!(store.resolve_owner("no-such-key"), None);
    }
}
