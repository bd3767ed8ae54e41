//! Capability tokens for emailed action links.
//!
//! A token is the first `length` hex characters of HMAC-SHA1(secret, id).
//! Holding one authorizes verify/update/delete on that single feed for as long
//! as the secret stays the same; nothing is stored per token, so tokens never
//! expire and cannot be revoked individually.
//!
//! Truncation is a deliberate trade of brute-force resistance for short links.
//! At the default of 8 hex characters a token has 32 bits, so an attacker who
//! can make unthrottled guesses against one id will eventually hit it. Anyone
//! holding the secret can mint a token for any id; it must never leave the
//! server.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const DEFAULT_TOKEN_LENGTH: usize = 8;
pub const MIN_TOKEN_LENGTH: usize = 4;
/// Full hex length of a SHA-1 MAC.
pub const MAX_TOKEN_LENGTH: usize = 40;

#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
    length: usize,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self::with_length(secret, DEFAULT_TOKEN_LENGTH)
    }

    /// `length` is clamped to `MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH` and rounded
    /// up to whole bytes.
    pub fn with_length(secret: impl Into<Vec<u8>>, length: usize) -> Self {
        let length = length.clamp(MIN_TOKEN_LENGTH, MAX_TOKEN_LENGTH);
        Self {
            secret: secret.into(),
            length: length + length % 2,
        }
    }

    pub fn token_length(&self) -> usize {
        self.length
    }

    pub fn sign(&self, id: &str) -> String {
        let mut token = hex::encode(self.mac(id).finalize().into_bytes());
        token.truncate(self.length);
        token
    }

    /// A missing token fails exactly like a wrong one. Only the lowercase hex
    /// produced by [`Signer::sign`] is accepted.
    pub fn verify(&self, id: &str, token: Option<&str>) -> bool {
        let Some(token) = token else {
            return false;
        };
        let canonical = token.len() == self.length
            && token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !canonical {
            return false;
        }
        match hex::decode(token) {
            Ok(tag) => self.mac(id).verify_truncated_left(&tag).is_ok(),
            Err(_) => false,
        }
    }

    fn mac(&self, id: &str) -> HmacSha1 {
        let mut mac =
            HmacSha1::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(id.as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_is_deterministic_and_short() {
        let signer = Signer::new("s3cret");
        let token = signer.sign("0a1b2c3d");
        assert_eq!(token.len(), DEFAULT_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token, Signer::new("s3cret").sign("0a1b2c3d"));
    }

    #[test]
    fn token_is_bound_to_id_and_secret() {
        let signer = Signer::new("s3cret");
        assert_ne!(signer.sign("0a1b2c3d"), signer.sign("0a1b2c3e"));
        assert_ne!(signer.sign("0a1b2c3d"), Signer::new("other").sign("0a1b2c3d"));
    }

    #[test]
    fn verifies_own_tokens() {
        let signer = Signer::new("s3cret");
        for id in ["a", "0a1b2c3d", "ffffffff", ""] {
            assert!(signer.verify(id, Some(&signer.sign(id))));
        }
    }

    #[test]
    fn rejects_everything_else() {
        let signer = Signer::new("s3cret");
        let good = signer.sign("0a1b2c3d");
        assert!(!signer.verify("0a1b2c3d", None));
        assert!(!signer.verify("0a1b2c3d", Some("")));
        assert!(!signer.verify("0a1b2c3d", Some(&good[..7])));
        assert!(!signer.verify("0a1b2c3d", Some(&format!("{good}0"))));
        assert!(!signer.verify("0a1b2c3e", Some(&good)));

        let wrong = (0..1000u32)
            .map(|n| format!("{n:08x}"))
            .filter(|t| *t != good)
            .filter(|t| signer.verify("0a1b2c3d", Some(t)))
            .count();
        assert_eq!(wrong, 0);
    }

    #[test]
    fn length_is_configurable_and_clamped() {
        assert_eq!(Signer::with_length("k", 16).sign("id").len(), 16);
        assert_eq!(Signer::with_length("k", 1).token_length(), MIN_TOKEN_LENGTH);
        assert_eq!(Signer::with_length("k", 99).sign("id").len(), MAX_TOKEN_LENGTH);
        assert_eq!(Signer::with_length("k", 9).token_length(), 10);
    }

    #[test]
    fn rejects_non_canonical_spellings() {
        let signer = Signer::new("s3cret");
        let good = signer.sign("0a1b2c3d");
        let upper = good.to_uppercase();
        if upper != good {
            assert!(!signer.verify("0a1b2c3d", Some(&upper)));
        }
        assert!(!signer.verify("0a1b2c3d", Some("zzzzzzzz")));
        assert!(!signer.verify("0a1b2c3d", Some(&format!(" {}", &good[1..]))));

        let long = Signer::with_length("s3cret", 40);
        let full = long.sign("0a1b2c3d");
        assert!(long.verify("0a1b2c3d", Some(&full)));
        assert!(!long.verify("0a1b2c3d", Some(&full[..38])));
    }

    #[test]
    fn debug_hides_secret() {
        assert!(!format!("{:?}", Signer::new("s3cret")).contains("s3cret"));
    }
}
