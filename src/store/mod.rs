use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Stored prompt record. `content` is the purchasable prompt text and is
/// only exposed in full to the author or a purchaser.
#[derive(Debug, Clone)]
pub struct PromptRecord {
    pub id: Uuid,
    pub name: String,
    pub goal: String,
    pub description: String,
    pub content: String,
    pub prompt_version: String,
    pub price: f64,
    pub currency: String,
    pub tested_ai_agents: Vec<i64>,
    pub tags: Vec<i64>,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase record. The transaction hash is recorded as supplied by the
/// client; it is not verified against a chain.
#[derive(Debug, Clone)]
pub struct PurchaseRecord {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub wallet_address: String,
    pub transaction_hash: String,
    pub price: f64,
    pub currency: String,
    pub purchase_date: DateTime<Utc>,
}

/// Rating record, unique per (prompt, wallet).
#[derive(Debug, Clone)]
pub struct RatingRecord {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub wallet_address: String,
    pub rating_score: u8,
    pub rating_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AiAgentRecord {
    pub id: i64,
    pub name: String,
}

/// In-process marketplace store. Lock scopes are short and never held
/// across awaits; persistence engine design is out of scope.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    prompts: RwLock<HashMap<Uuid, PromptRecord>>,
    purchases: RwLock<Vec<PurchaseRecord>>,
    ratings: RwLock<Vec<RatingRecord>>,
    tags: Vec<TagRecord>,
    ai_agents: Vec<AiAgentRecord>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                prompts: RwLock::new(HashMap::new()),
                purchases: RwLock::new(Vec::new()),
                ratings: RwLock::new(Vec::new()),
                tags: seed_tags(),
                ai_agents: seed_ai_agents(),
            }),
        }
    }

    pub fn insert_prompt(&self, prompt: PromptRecord) {
        let mut prompts = self.inner.prompts.write().unwrap_or_else(|e| e.into_inner());
        prompts.insert(prompt.id, prompt);
    }

    pub fn get_prompt(&self, id: Uuid) -> Option<PromptRecord> {
        let prompts = self.inner.prompts.read().unwrap_or_else(|e| e.into_inner());
        prompts.get(&id).cloned()
    }

    pub fn all_prompts(&self) -> Vec<PromptRecord> {
        let prompts = self.inner.prompts.read().unwrap_or_else(|e| e.into_inner());
        prompts.values().cloned().collect()
    }

    pub fn insert_purchase(&self, purchase: PurchaseRecord) {
        let mut purchases = self
            .inner
            .purchases
            .write()
            .unwrap_or_else(|e| e.into_inner());
        purchases.push(purchase);
    }

    pub fn purchase_count(&self, prompt_id: Uuid) -> usize {
        let purchases = self
            .inner
            .purchases
            .read()
            .unwrap_or_else(|e| e.into_inner());
        purchases.iter().filter(|p| p.prompt_id == prompt_id).count()
    }

    pub fn has_purchased(&self, prompt_id: Uuid, wallet_address: &str) -> bool {
        let normalized = wallet_address.to_lowercase();
        let purchases = self
            .inner
            .purchases
            .read()
            .unwrap_or_else(|e| e.into_inner());
        purchases
            .iter()
            .any(|p| p.prompt_id == prompt_id && p.wallet_address == normalized)
    }

    /// Insert or update the rating for (prompt, wallet). Returns the
    /// stored record.
    pub fn upsert_rating(
        &self,
        prompt_id: Uuid,
        wallet_address: &str,
        rating_score: u8,
        rating_description: Option<String>,
    ) -> RatingRecord {
        let normalized = wallet_address.to_lowercase();
        let mut ratings = self.inner.ratings.write().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = ratings
            .iter_mut()
            .find(|r| r.prompt_id == prompt_id && r.wallet_address == normalized)
        {
            existing.rating_score = rating_score;
            existing.rating_description = rating_description;
            return existing.clone();
        }

        let record = RatingRecord {
            id: Uuid::new_v4(),
            prompt_id,
            wallet_address: normalized,
            rating_score,
            rating_description,
            created_at: Utc::now(),
        };
        ratings.push(record.clone());
        record
    }

    pub fn ratings_for(&self, prompt_id: Uuid) -> Vec<RatingRecord> {
        let ratings = self.inner.ratings.read().unwrap_or_else(|e| e.into_inner());
        ratings
            .iter()
            .filter(|r| r.prompt_id == prompt_id)
            .cloned()
            .collect()
    }

    pub fn tags(&self) -> &[TagRecord] {
        &self.inner.tags
    }

    pub fn ai_agents(&self) -> &[AiAgentRecord] {
        &self.inner.ai_agents
    }
}

fn seed_tags() -> Vec<TagRecord> {
    [
        "writing",
        "coding",
        "marketing",
        "productivity",
        "research",
        "design",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| TagRecord {
        id: i as i64 + 1,
        name: name.to_string(),
    })
    .collect()
}

fn seed_ai_agents() -> Vec<AiAgentRecord> {
    ["ChatGPT", "Claude", "Gemini", "Llama", "Mistral"]
        .iter()
        .enumerate()
        .map(|(i, name)| AiAgentRecord {
            id: i as i64 + 1,
            name: name.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_prompt(author: &str) -> PromptRecord {
        let now = Utc::now();
        PromptRecord {
            id: Uuid::new_v4(),
            name: "Email assistant".to_string(),
            goal: "Write professional emails".to_string(),
            description: "Helps with tone and structure".to_string(),
            content: "You are an email writing assistant...".to_string(),
            prompt_version: "1".to_string(),
            price: 5.0,
            currency: "USDC".to_string(),
            tested_ai_agents: vec![1],
            tags: vec![1],
            wallet_address: author.to_lowercase(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn purchase_lookup_is_case_insensitive() {
        let store = Store::new();
        let prompt = sample_prompt("0xaaa0000000000000000000000000000000000001");
        let prompt_id = prompt.id;
        store.insert_prompt(prompt);

        store.insert_purchase(PurchaseRecord {
            id: Uuid::new_v4(),
            prompt_id,
            wallet_address: "0xbbb0000000000000000000000000000000000002".to_string(),
            transaction_hash: "0xhash".to_string(),
            price: 5.0,
            currency: "USDC".to_string(),
            purchase_date: Utc::now(),
        });

        assert!(store.has_purchased(prompt_id, "0xBBB0000000000000000000000000000000000002"));
        assert!(!store.has_purchased(prompt_id, "0xccc0000000000000000000000000000000000003"));
        assert_eq!(store.purchase_count(prompt_id), 1);
    }

    #[test]
    fn rating_upsert_replaces_prior_score() {
        let store = Store::new();
        let prompt_id = Uuid::new_v4();

        let first = store.upsert_rating(prompt_id, "0xABC", 8, None);
        let second = store.upsert_rating(prompt_id, "0xabc", 3, Some("changed my mind".into()));

        assert_eq!(first.id, second.id);
        let ratings = store.ratings_for(prompt_id);
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].rating_score, 3);
    }

    #[test]
    fn lookup_tables_are_seeded() {
        let store = Store::new();
        assert!(!store.tags().is_empty());
        assert!(!store.ai_agents().is_empty());
    }
}
