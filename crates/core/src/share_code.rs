//! Human-enterable join tokens for shared travel plans.
//!
//! Format: `TRAVEL-` followed by 8 uppercase alphanumerics.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::error::CoreError;

pub const SHARE_CODE_PREFIX: &str = "TRAVEL-";

const SHARE_CODE_BODY_LEN: usize = 8;

const SHARE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static SHARE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TRAVEL-[A-Z0-9]{8}$").expect("valid regex"));

/// A validated, canonical (uppercase) share code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShareCode(String);

impl ShareCode {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let body: String = (0..SHARE_CODE_BODY_LEN)
            .map(|_| SHARE_CODE_ALPHABET[rng.random_range(0..SHARE_CODE_ALPHABET.len())] as char)
            .collect();
        Self(format!("{SHARE_CODE_PREFIX}{body}"))
    }

    /// Trim and uppercase user input without validating it.
    pub fn normalize(input: &str) -> String {
        input.trim().to_uppercase()
    }

    /// Normalize and validate user input.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let normalized = Self::normalize(input);
        if SHARE_CODE_RE.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(CoreError::InvalidPayload(format!(
                "Share code '{input}' must look like {SHARE_CODE_PREFIX}XXXXXXXX"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ShareCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn generated_codes_match_format() {
        for _ in 0..200 {
            let code = ShareCode::generate();
            assert!(SHARE_CODE_RE.is_match(code.as_str()), "bad code {code}");
        }
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let code = ShareCode::parse("  travel-ab12cd34 ").unwrap();
        assert_eq!(code.as_str(), "TRAVEL-AB12CD34");
        assert_eq!(ShareCode::parse("TrAvEl-Ab12cD34").unwrap(), code);
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        assert_matches!(ShareCode::parse("TRAVEL-SHORT"), Err(CoreError::InvalidPayload(_)));
        assert_matches!(ShareCode::parse("TRIP-AB12CD34"), Err(CoreError::InvalidPayload(_)));
        assert_matches!(ShareCode::parse("TRAVEL-AB12CD3!"), Err(CoreError::InvalidPayload(_)));
    }
}
