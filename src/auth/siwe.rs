use crate::utils::SiweConfig;
use chrono::{DateTime, SecondsFormat, Utc};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use std::fmt;
use tiny_keccak::{Hasher, Keccak};

/// Failure detail for SIWE parsing and verification. The detail is logged
/// server-side only; callers see a generic rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiweError {
    EmptyMessage,
    InvalidHeader,
    MissingField(&'static str),
    UnsupportedVersion(String),
    DomainMismatch,
    ChainIdMismatch,
    NonceMismatch,
    AddressMismatch,
    InvalidSignature(String),
    SignatureRecovery(String),
}

impl fmt::Display for SiweError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "SIWE message is empty"),
            Self::InvalidHeader => write!(f, "invalid SIWE header line"),
            Self::MissingField(field) => write!(f, "missing SIWE field: {}", field),
            Self::UnsupportedVersion(v) => write!(f, "unsupported SIWE version: {}", v),
            Self::DomainMismatch => write!(f, "SIWE domain mismatch"),
            Self::ChainIdMismatch => write!(f, "SIWE chain id mismatch"),
            Self::NonceMismatch => write!(f, "SIWE nonce mismatch"),
            Self::AddressMismatch => write!(f, "recovered address does not match"),
            Self::InvalidSignature(reason) => write!(f, "invalid signature format: {}", reason),
            Self::SignatureRecovery(reason) => write!(f, "signature recovery failed: {}", reason),
        }
    }
}

impl std::error::Error for SiweError {}

/// Parsed fields of an EIP-4361 message.
#[derive(Debug, Clone)]
pub struct SiweMessage {
    pub domain: String,
    pub address: String,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: String,
}

/// Build the canonical EIP-4361 message string for a wallet to sign. The
/// exact bytes matter: the signature covers this string, so the server
/// must reconstruct it byte-for-byte when showing it to the client.
pub fn build_message(
    address: &str,
    nonce: &str,
    issued_at: DateTime<Utc>,
    config: &SiweConfig,
) -> String {
    format!(
        "{domain} wants you to sign in with your Ethereum account:\n\
         {address}\n\
         \n\
         {statement}\n\
         \n\
         URI: {uri}\n\
         Version: 1\n\
         Chain ID: {chain_id}\n\
         Nonce: {nonce}\n\
         Issued At: {issued_at}",
        domain = config.domain,
        address = address,
        statement = config.statement,
        uri = config.uri,
        chain_id = config.chain_id,
        nonce = nonce,
        issued_at = issued_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

impl SiweMessage {
    /// Parse a SIWE message from its plain-text EIP-4361 representation.
    pub fn parse(message: &str) -> Result<Self, SiweError> {
        let lines: Vec<&str> = message.lines().collect();
        if lines.is_empty() {
            return Err(SiweError::EmptyMessage);
        }

        let domain = lines[0]
            .strip_suffix(" wants you to sign in with your Ethereum account:")
            .ok_or(SiweError::InvalidHeader)?
            .to_string();

        let address = lines
            .get(1)
            .ok_or(SiweError::MissingField("address"))?
            .trim()
            .to_string();

        let mut statement = None;
        let mut uri = None;
        let mut version = None;
        let mut chain_id = None;
        let mut nonce = None;
        let mut issued_at = None;

        for raw_line in lines.iter().skip(2) {
            let line = raw_line.trim_end();
            if line.is_empty() {
                continue;
            }

            if let Some(value) = line.strip_prefix("URI: ") {
                uri = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("Version: ") {
                version = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("Chain ID: ") {
                chain_id = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| SiweError::MissingField("Chain ID"))?,
                );
            } else if let Some(value) = line.strip_prefix("Nonce: ") {
                nonce = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("Issued At: ") {
                issued_at = Some(value.to_string());
            } else if statement.is_none() {
                statement = Some(line.to_string());
            }
        }

        Ok(Self {
            domain,
            address,
            statement,
            uri: uri.ok_or(SiweError::MissingField("URI"))?,
            version: version.ok_or(SiweError::MissingField("Version"))?,
            chain_id: chain_id.ok_or(SiweError::MissingField("Chain ID"))?,
            nonce: nonce.ok_or(SiweError::MissingField("Nonce"))?,
            issued_at: issued_at.ok_or(SiweError::MissingField("Issued At"))?,
        })
    }
}

/// Verify a submitted SIWE message against the claimed address, the nonce
/// just consumed, and the relying-party configuration. Returns the
/// recovered signer address (lowercased) on success.
pub fn verify_message(
    message: &str,
    signature: &str,
    claimed_address: &str,
    expected_nonce: &str,
    config: &SiweConfig,
) -> Result<String, SiweError> {
    let parsed = SiweMessage::parse(message)?;

    if parsed.version != "1" {
        return Err(SiweError::UnsupportedVersion(parsed.version));
    }
    if parsed.domain != config.domain {
        return Err(SiweError::DomainMismatch);
    }
    if parsed.chain_id != config.chain_id {
        return Err(SiweError::ChainIdMismatch);
    }
    if parsed.nonce != expected_nonce {
        return Err(SiweError::NonceMismatch);
    }
    if !parsed.address.eq_ignore_ascii_case(claimed_address) {
        return Err(SiweError::AddressMismatch);
    }

    let recovered = recover_personal_sign(message, signature)?;
    if !recovered.eq_ignore_ascii_case(claimed_address) {
        return Err(SiweError::AddressMismatch);
    }

    Ok(recovered)
}

/// Recover the signing address of an EIP-191 personal_sign signature.
///
/// The message is prefixed with `"\x19Ethereum Signed Message:\n{len}"`
/// before hashing with Keccak-256 and recovering the public key.
pub fn recover_personal_sign(message: &str, signature_hex: &str) -> Result<String, SiweError> {
    let sig_bytes = hex::decode(signature_hex.trim_start_matches("0x"))
        .map_err(|e| SiweError::InvalidSignature(e.to_string()))?;

    if sig_bytes.len() != 65 {
        return Err(SiweError::InvalidSignature(format!(
            "expected 65 bytes, got {}",
            sig_bytes.len()
        )));
    }

    // Split into r+s (64 bytes) and v (1 byte)
    let (rs, v_byte) = sig_bytes.split_at(64);
    let v = match v_byte[0] {
        0 | 27 => 0u8,
        1 | 28 => 1u8,
        v => {
            return Err(SiweError::InvalidSignature(format!(
                "invalid recovery id: {}",
                v
            )))
        }
    };

    let signature =
        Signature::from_slice(rs).map_err(|e| SiweError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::new(v != 0, false);

    let digest = eip191_hash(message);
    let verifying_key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| SiweError::SignatureRecovery(e.to_string()))?;

    // Address is the last 20 bytes of the keccak of the uncompressed
    // public key (the 0x04 prefix byte excluded).
    let encoded = verifying_key.to_encoded_point(false);
    let pubkey_hash = keccak256(&encoded.as_bytes()[1..]);
    Ok(format!("0x{}", hex::encode(&pubkey_hash[12..])))
}

/// EIP-191 prefixed Keccak-256 digest of a message.
pub fn eip191_hash(message: &str) -> [u8; 32] {
    let prefixed = format!("\x19Ethereum Signed Message:\n{}{}", message.len(), message);
    keccak256(prefixed.as_bytes())
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn test_config() -> SiweConfig {
        SiweConfig {
            domain: "wiseprompt.io".to_string(),
            uri: "https://wiseprompt.io".to_string(),
            statement: "Sign in with Ethereum to WisePrompt".to_string(),
            chain_id: 1,
        }
    }

    fn test_signer() -> (SigningKey, String) {
        let key = SigningKey::from_slice(&[0x42u8; 32]).expect("valid secret");
        let encoded = key.verifying_key().to_encoded_point(false);
        let hash = keccak256(&encoded.as_bytes()[1..]);
        let address = format!("0x{}", hex::encode(&hash[12..]));
        (key, address)
    }

    fn sign_message(key: &SigningKey, message: &str) -> String {
        let digest = eip191_hash(message);
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&digest)
            .expect("signing succeeds");
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    #[test]
    fn build_and_parse_roundtrip() {
        let config = test_config();
        let message = build_message(
            "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B",
            "deadbeef",
            Utc::now(),
            &config,
        );

        let parsed = SiweMessage::parse(&message).unwrap();
        assert_eq!(parsed.domain, "wiseprompt.io");
        assert_eq!(parsed.address, "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B");
        assert_eq!(parsed.uri, "https://wiseprompt.io");
        assert_eq!(parsed.version, "1");
        assert_eq!(parsed.chain_id, 1);
        assert_eq!(parsed.nonce, "deadbeef");
        assert_eq!(
            parsed.statement.as_deref(),
            Some("Sign in with Ethereum to WisePrompt")
        );
    }

    #[test]
    fn verify_accepts_valid_signature() {
        let config = test_config();
        let (key, address) = test_signer();
        let message = build_message(&address, "nonce-1", Utc::now(), &config);
        let signature = sign_message(&key, &message);

        let recovered = verify_message(&message, &signature, &address, "nonce-1", &config)
            .expect("verification should succeed");
        assert_eq!(recovered, address.to_lowercase());
    }

    #[test]
    fn verify_accepts_uppercased_claimed_address() {
        let config = test_config();
        let (key, address) = test_signer();
        let message = build_message(&address, "nonce-1", Utc::now(), &config);
        let signature = sign_message(&key, &message);

        assert!(
            verify_message(&message, &signature, &address.to_uppercase().replacen("0X", "0x", 1), "nonce-1", &config).is_ok()
        );
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let config = test_config();
        let (key, address) = test_signer();
        let message = build_message(&address, "nonce-1", Utc::now(), &config);
        let signature = sign_message(&key, &message);

        // Any byte difference between signed and submitted message fails
        let tampered = message.replace("nonce-1", "nonce-2");
        assert!(verify_message(&tampered, &signature, &address, "nonce-2", &config).is_err());
    }

    #[test]
    fn verify_rejects_wrong_nonce() {
        let config = test_config();
        let (key, address) = test_signer();
        let message = build_message(&address, "nonce-1", Utc::now(), &config);
        let signature = sign_message(&key, &message);

        let err = verify_message(&message, &signature, &address, "other", &config).unwrap_err();
        assert_eq!(err, SiweError::NonceMismatch);
    }

    #[test]
    fn verify_rejects_signature_from_other_key() {
        let config = test_config();
        let (_, address) = test_signer();
        let other = SigningKey::from_slice(&[0x07u8; 32]).unwrap();
        let message = build_message(&address, "nonce-1", Utc::now(), &config);
        let signature = sign_message(&other, &message);

        let err = verify_message(&message, &signature, &address, "nonce-1", &config).unwrap_err();
        assert_eq!(err, SiweError::AddressMismatch);
    }

    #[test]
    fn verify_rejects_domain_mismatch() {
        let mut config = test_config();
        let (key, address) = test_signer();
        let message = build_message(&address, "nonce-1", Utc::now(), &config);
        let signature = sign_message(&key, &message);

        config.domain = "other.example.com".to_string();
        let err = verify_message(&message, &signature, &address, "nonce-1", &config).unwrap_err();
        assert_eq!(err, SiweError::DomainMismatch);
    }

    #[test]
    fn verify_rejects_chain_mismatch() {
        let mut config = test_config();
        let (key, address) = test_signer();
        let message = build_message(&address, "nonce-1", Utc::now(), &config);
        let signature = sign_message(&key, &message);

        config.chain_id = 10;
        let err = verify_message(&message, &signature, &address, "nonce-1", &config).unwrap_err();
        assert_eq!(err, SiweError::ChainIdMismatch);
    }

    #[test]
    fn recover_rejects_malformed_signature() {
        assert!(recover_personal_sign("hello", "0x1234").is_err());
        assert!(recover_personal_sign("hello", "not hex").is_err());
    }

    #[test]
    fn eip191_hash_is_deterministic() {
        assert_eq!(eip191_hash("hello"), eip191_hash("hello"));
        assert_ne!(eip191_hash("hello"), eip191_hash("hello!"));
    }
}
