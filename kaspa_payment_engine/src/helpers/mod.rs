//! Format validation and normalization for chain-facing strings.
//!
//! The validation rules here are structural only (prefix + length + charset). Anything that
//! passes them is safe to hand to the indexer API; whether the address actually belongs to the
//! merchant's wallet is the deriver's concern.
use std::sync::OnceLock;

use regex::Regex;

/// Kaspa addresses are bech32-encoded with a mandatory `kaspa:` prefix and a 61-63 character
/// payload.
pub fn is_valid_kaspa_address(address: &str) -> bool {
    static ADDRESS_RE: OnceLock<Regex> = OnceLock::new();
    let re = ADDRESS_RE.get_or_init(|| Regex::new(r"^kaspa:[a-z0-9]{61,63}$").expect("hardcoded regex is valid"));
    re.is_match(address)
}

/// Structural check for a watch-only extended public key. A kpub starts with the `kpub` prefix
/// and is ~111 characters; we accept anything from 100 up.
pub fn is_valid_kpub(kpub: &str) -> bool {
    kpub.len() >= 100 && kpub.starts_with("kpub") && kpub.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// The indexer API requires the chain prefix on address parameters. Adds it when missing and
/// lowercases the payload.
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim().to_ascii_lowercase();
    if trimmed.starts_with("kaspa:") {
        trimmed
    } else {
        format!("kaspa:{trimmed}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn address_validation() {
        let body = "q".repeat(61);
        assert!(is_valid_kaspa_address(&format!("kaspa:{body}")));
        assert!(is_valid_kaspa_address(&format!("kaspa:{}", "a2".repeat(31)))); // 62 chars
        assert!(!is_valid_kaspa_address(&body));
        assert!(!is_valid_kaspa_address("kaspa:SHOUTY"));
        assert!(!is_valid_kaspa_address(&format!("kaspa:{}", "q".repeat(60))));
        assert!(!is_valid_kaspa_address(&format!("kaspa:{}", "q".repeat(64))));
    }

    #[test]
    fn kpub_validation() {
        let kpub = format!("kpub{}", "A1b2".repeat(27)); // 112 chars
        assert!(is_valid_kpub(&kpub));
        assert!(!is_valid_kpub("kpubtooshort"));
        assert!(!is_valid_kpub(&format!("xpub{}", "A1b2".repeat(27))));
        assert!(!is_valid_kpub(&format!("kpub{} ", "A1b2".repeat(27))));
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_address("kaspa:qqq"), "kaspa:qqq");
        assert_eq!(normalize_address("qqq"), "kaspa:qqq");
        assert_eq!(normalize_address(" KASPA:QQQ "), "kaspa:qqq");
    }
}
