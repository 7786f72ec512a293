use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Mutex;

/// A single-use challenge value bound to a wallet address.
#[derive(Debug, Clone)]
pub struct NonceChallenge {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

/// Opaque rejection for any failed consume. Missing, mismatched, and
/// expired nonces all produce this same value so a caller cannot probe
/// which condition occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRejected;

/// In-process store of live nonce challenges, keyed by lowercased wallet
/// address. At most one live nonce per address: a new issue replaces any
/// prior unexpired one. Two concurrent issues for the same address race
/// and the loser's nonce becomes unconsumable; the caller simply retries
/// the sign-in flow.
pub struct NonceStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, NonceChallenge>>,
}

impl NonceStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            ttl: Duration::minutes(ttl_minutes),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a nonce bound to a wallet address, replacing any prior
    /// challenge for that address.
    pub fn issue_for_wallet(&self, wallet_address: &str) -> NonceChallenge {
        let challenge = self.fresh_challenge();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(wallet_address.to_lowercase(), challenge.clone());
        challenge
    }

    /// Issue a bare nonce with no stored wallet binding, for flows that do
    /// not pre-bind an address.
    pub fn issue_bare(&self) -> NonceChallenge {
        self.fresh_challenge()
    }

    /// Consume the stored challenge for a wallet. Succeeds only if a
    /// record exists, the supplied nonce matches exactly, and the expiry
    /// has not passed; success deletes the record so the nonce is single
    /// use. Failure deletes nothing live, except that a challenge already
    /// past its expiry is dropped on the way out.
    pub fn consume(&self, wallet_address: &str, supplied_nonce: &str) -> Result<(), NonceRejected> {
        let key = wallet_address.to_lowercase();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let stored = entries.get(&key).ok_or(NonceRejected)?;

        if stored.expires_at < Utc::now() {
            // Lazy cleanup of garbage; still an opaque rejection.
            entries.remove(&key);
            return Err(NonceRejected);
        }

        if stored.nonce != supplied_nonce {
            return Err(NonceRejected);
        }

        entries.remove(&key);
        Ok(())
    }

    fn fresh_challenge(&self) -> NonceChallenge {
        NonceChallenge {
            nonce: generate_nonce(),
            expires_at: Utc::now() + self.ttl,
        }
    }
}

/// Generate a 256-bit random nonce, hex encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
