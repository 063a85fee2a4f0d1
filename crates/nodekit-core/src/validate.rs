//! Format checks for addresses, private keys and job identifiers

use std::fmt;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::error::{Error, Result};

/// Length of a hex-encoded 20 byte address, without the `0x` prefix
const ADDRESS_HEX_LEN: usize = 40;

/// Length of a hex-encoded 32 byte private key
const PRIVATE_KEY_HEX_LEN: usize = 64;

/// Length of a job id once its hyphens are removed
const JOB_ID_HEX_LEN: usize = 32;

/// `^0x[a-fA-F0-9]{40}$`
pub fn is_valid_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == ADDRESS_HEX_LEN && is_hex(hex))
}

/// Parse a `0x`-prefixed address, rejecting anything [`is_valid_address`] rejects.
pub fn parse_address(value: &str) -> Result<Address> {
    if !is_valid_address(value) {
        return Err(Error::Validation(format!(
            "'{}' is not an address (expected 0x followed by 40 hex characters)",
            value
        )));
    }
    value
        .parse()
        .map_err(|e| Error::Validation(format!("Invalid address: {}", e)))
}

/// Exactly 64 hex characters, no `0x` prefix.
pub fn is_valid_private_key(value: &str) -> bool {
    value.len() == PRIVATE_KEY_HEX_LEN && hex::decode(value).is_ok()
}

/// Derive the account address that signs with `private_key`.
pub fn signer_address(private_key: &str) -> Result<Address> {
    if !is_valid_private_key(private_key) {
        return Err(Error::Validation(
            "private key must be exactly 64 hex characters without a 0x prefix".into(),
        ));
    }

    let signer: PrivateKeySigner = format!("0x{}", private_key)
        .parse()
        .map_err(|e| Error::Validation(format!("Invalid private key: {}", e)))?;

    Ok(signer.address())
}

fn is_hex(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_hexdigit())
}

/// A node job identifier, usually a hyphenated UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(String);

impl JobId {
    /// Accept a job id as written by the job setup step. Placeholders are
    /// accepted here and reported through [`JobId::is_placeholder`].
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let job = JobId(value.to_string());

        if job.is_placeholder() {
            return Ok(job);
        }

        let compact = job.without_hyphens();
        if compact.len() != JOB_ID_HEX_LEN || !is_hex(&compact) {
            return Err(Error::Validation(format!(
                "'{}' is not a job id (expected 32 hex characters, hyphens allowed)",
                value
            )));
        }
        Ok(job)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id with every hyphen removed, as embedded in the migration script
    pub fn without_hyphens(&self) -> String {
        self.0.replace('-', "")
    }

    /// True for ids left behind by a skipped job setup: empty, all zeros or
    /// literally containing "placeholder".
    pub fn is_placeholder(&self) -> bool {
        let compact = self.without_hyphens();
        compact.is_empty()
            || compact.chars().all(|c| c == '0')
            || self.0.to_ascii_lowercase().contains("placeholder")
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_address("0x1111111111111111111111111111111111111111"));
        assert!(is_valid_address("0xAbCdEf1234567890abcdef1234567890ABCDEF12"));
    }

    #[test]
    fn test_invalid_addresses() {
        // Missing prefix
        assert!(!is_valid_address("1111111111111111111111111111111111111111"));
        // Too short / too long
        assert!(!is_valid_address("0x111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0x11111111111111111111111111111111111111111"));
        // Non-hex
        assert!(!is_valid_address("0xg111111111111111111111111111111111111111"));
        // Uppercase prefix and whitespace
        assert!(!is_valid_address("0X1111111111111111111111111111111111111111"));
        assert!(!is_valid_address(" 0x1111111111111111111111111111111111111111"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_parse_address() {
        let address = parse_address("0xabcdef1234567890abcdef1234567890abcdef12").unwrap();
        assert_eq!(
            format!("{:?}", address),
            "0xabcdef1234567890abcdef1234567890abcdef12"
        );
        assert!(parse_address("abcdef1234567890abcdef1234567890abcdef12").is_err());
    }

    #[test]
    fn test_private_key_format() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert!(is_valid_private_key(key));
        assert!(is_valid_private_key(&key.to_uppercase()));

        assert!(!is_valid_private_key(&format!("0x{}", key)));
        assert!(!is_valid_private_key(&key[..63]));
        assert!(!is_valid_private_key(&format!("{}0", key)));
        assert!(!is_valid_private_key(&key.replace('a', "z")));
    }

    #[test]
    fn test_signer_address() {
        // Well-known first dev account
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let address = signer_address(key).unwrap();

        assert_eq!(
            format!("{:?}", address),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert!(signer_address("0xdeadbeef").is_err());
    }

    #[test]
    fn test_job_id_without_hyphens() {
        let job = JobId::parse("abcdef12-3456-7890-1234-567890123456").unwrap();

        assert_eq!(job.without_hyphens(), "abcdef12345678901234567890123456");
        assert!(!job.is_placeholder());
    }

    #[test]
    fn test_job_id_placeholders() {
        assert!(JobId::parse("00000000-0000-0000-0000-000000000000")
            .unwrap()
            .is_placeholder());
        assert!(JobId::parse("PLACEHOLDER_JOB_ID").unwrap().is_placeholder());
        assert!(JobId::parse("").unwrap().is_placeholder());
    }

    #[test]
    fn test_job_id_rejects_garbage() {
        assert!(JobId::parse("not-a-job").is_err());
        assert!(JobId::parse("abcdef1234567890123456789012345").is_err());
    }
}
