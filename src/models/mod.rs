use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request for a signing nonce. The wallet address is optional: flows
/// that pre-bind an address also receive the ready-to-sign SIWE message.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    #[validate(custom(function = validate_eth_address))]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignatureRequest {
    #[validate(custom(function = validate_eth_address_required))]
    pub address: String,
    #[validate(length(min = 1, max = 200))]
    pub signature: String,
    #[validate(length(min = 1, max = 100))]
    pub nonce: String,
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub wallet_address: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Expiration in days; 0 or absent means the key never expires.
    #[validate(range(min = 0, max = 365))]
    pub expires_in_days: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    /// The raw key, returned exactly once.
    pub key: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyListEntry {
    pub id: Uuid,
    pub name: String,
    /// Masked form: first 8 and last 4 characters only.
    pub key: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Sort options for prompt search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOption {
    #[default]
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "popular")]
    Popular,
    #[serde(rename = "top-rated")]
    TopRated,
    #[serde(rename = "price-low")]
    PriceLow,
    #[serde(rename = "price-high")]
    PriceHigh,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchPromptsQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[validate(range(min = 0, max = 10))]
    #[serde(default)]
    pub min_rating: Option<u8>,
    #[serde(default)]
    pub sort: SortOption,
    #[validate(range(min = 1))]
    #[serde(default)]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 50))]
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromptRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub goal: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    /// The actual prompt text; gated to the author and purchasers.
    #[validate(length(min = 1))]
    pub prompt: String,
    #[validate(length(min = 1))]
    pub tested_ai_agents: Vec<i64>,
    pub prompt_version: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub currency: Option<String>,
    pub tags: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSummary {
    pub id: Uuid,
    pub name: String,
    pub goal: String,
    pub description: String,
    pub rating: Option<f64>,
    pub rating_count: usize,
    pub purchase_count: usize,
    pub price: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDetail {
    pub id: Uuid,
    pub name: String,
    pub goal: String,
    pub description: String,
    /// Full content for the author or a purchaser; truncated otherwise.
    pub prompt: String,
    pub tested_ai_agents: Vec<LabeledId>,
    pub tags: Vec<LabeledId>,
    pub rating: Option<f64>,
    pub rating_count: usize,
    pub price: f64,
    pub currency: String,
    pub prompt_version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_purchased: bool,
    pub is_author: bool,
    pub has_rated: bool,
    pub author: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LabeledId {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub pages: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchPromptsResponse {
    pub results: Vec<PromptSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePromptRequest {
    /// Transaction hash of the payment, recorded as supplied.
    #[validate(length(equal = 66))]
    pub transaction_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePromptResponse {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub price: f64,
    pub currency: String,
    pub prompt: PromptName,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptName {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RatePromptRequest {
    #[validate(range(min = 0, max = 10))]
    pub rating_score: u8,
    #[validate(length(max = 2000))]
    pub rating_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePromptResponse {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub rating_score: u8,
    pub rating_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub prompt: PromptName,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagEntry {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AiAgentEntry {
    pub id: i64,
    pub name: String,
}

fn validate_eth_address(address: &str) -> Result<(), validator::ValidationError> {
    validate_eth_address_required(address)
}

/// 0x-prefixed, 40 hex characters.
fn validate_eth_address_required(address: &str) -> Result<(), validator::ValidationError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| validator::ValidationError::new("eth_address"))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(validator::ValidationError::new("eth_address"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_address_validation() {
        let valid = NonceRequest {
            wallet_address: Some("0x71C7656EC7ab88b098defB751B7401B5f6d8976F".to_string()),
        };
        assert!(valid.validate().is_ok());

        let absent = NonceRequest {
            wallet_address: None,
        };
        assert!(absent.validate().is_ok());

        let missing_prefix = NonceRequest {
            wallet_address: Some("71C7656EC7ab88b098defB751B7401B5f6d8976F".to_string()),
        };
        assert!(missing_prefix.validate().is_err());

        let too_short = NonceRequest {
            wallet_address: Some("0x71C7".to_string()),
        };
        assert!(too_short.validate().is_err());

        let not_hex = NonceRequest {
            wallet_address: Some("0xZZZ7656EC7ab88b098defB751B7401B5f6d8976F".to_string()),
        };
        assert!(not_hex.validate().is_err());
    }

    #[test]
    fn sort_option_deserializes_from_kebab_case() {
        let sort: SortOption = serde_json::from_str("\"top-rated\"").unwrap();
        assert_eq!(sort, SortOption::TopRated);
        let sort: SortOption = serde_json::from_str("\"newest\"").unwrap();
        assert_eq!(sort, SortOption::Newest);
    }

    #[test]
    fn verify_request_rejects_empty_fields() {
        let request = VerifySignatureRequest {
            address: "0x71C7656EC7ab88b098defB751B7401B5f6d8976F".to_string(),
            signature: String::new(),
            nonce: "abc".to_string(),
            message: "msg".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn purchase_request_requires_full_length_hash() {
        let request = PurchasePromptRequest {
            transaction_hash: "0x1234".to_string(),
        };
        assert!(request.validate().is_err());

        let request = PurchasePromptRequest {
            transaction_hash: format!("0x{}", "ab".repeat(32)),
        };
        assert!(request.validate().is_ok());
    }
}
