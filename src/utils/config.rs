use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// SIWE relying-party configuration
    pub siwe: SiweConfig,
    /// JWT session token configuration
    pub jwt: JwtConfig,
    /// Nonce challenge configuration
    pub nonce: NonceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Values embedded in every SIWE message. These come from deployment
/// configuration so the same build serves multiple environments; they are
/// passed explicitly into the message builder and verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiweConfig {
    pub domain: String,
    pub uri: String,
    pub statement: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceConfig {
    pub ttl_minutes: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3001".to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid PORT value"))?,
                cors_origins: env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| {
                        "http://localhost:3000,https://wiseprompt.io".to_string()
                    })
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            siwe: SiweConfig {
                domain: env::var("DOMAIN").unwrap_or_else(|_| "wiseprompt.io".to_string()),
                uri: env::var("ORIGIN").unwrap_or_else(|_| "https://wiseprompt.io".to_string()),
                statement: env::var("SIWE_STATEMENT")
                    .unwrap_or_else(|_| "Sign in with Ethereum to WisePrompt".to_string()),
                chain_id: env::var("CHAIN_ID")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid CHAIN_ID value"))?,
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                    // Generate a random secret if not provided (dev only)
                    use rand::Rng;
                    let mut rng = rand::thread_rng();
                    (0..32)
                        .map(|_| rng.gen::<u8>())
                        .map(|b| format!("{:02x}", b))
                        .collect()
                }),
                expiration_days: env::var("JWT_EXPIRATION_DAYS")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse()
                    .unwrap_or(7),
            },
            nonce: NonceConfig {
                ttl_minutes: env::var("NONCE_TTL_MINUTES")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
        };

        Ok(config)
    }
}
