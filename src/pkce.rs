//! PKCE (RFC 7636) verifier/challenge generation, one pair per login attempt.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Unreserved characters allowed in a code verifier.
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Verifier length; RFC 7636 accepts 43..=128.
pub const VERIFIER_LEN: usize = 64;

pub const CHALLENGE_METHOD: &str = "S256";

/// Everything a single login attempt needs to bind its authorization code.
///
/// Never persisted. Dropped when the attempt resolves or is superseded.
pub struct PkceAttempt {
    /// Correlates the log lines of one attempt.
    pub id: Uuid,
    pub verifier: String,
    pub challenge: String,
    pub redirect_uri: String,
    /// Opaque value echoed back by the provider, checked on completion.
    pub state: String,
    pub created_at: DateTime<Utc>,
}

impl PkceAttempt {
    /// Creates a fresh, unpredictable verifier/challenge pair and state.
    pub fn generate(redirect_uri: &str) -> Self {
        let verifier = generate_verifier();
        let challenge = challenge_for(&verifier);
        PkceAttempt {
            id: Uuid::new_v4(),
            verifier,
            challenge,
            redirect_uri: redirect_uri.to_string(),
            state: generate_state(),
            created_at: Utc::now(),
        }
    }
}

// Keep the verifier out of Debug output.
impl std::fmt::Debug for PkceAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceAttempt")
            .field("id", &self.id)
            .field("challenge", &self.challenge)
            .field("redirect_uri", &self.redirect_uri)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

fn generate_verifier() -> String {
    let mut rng = rand::thread_rng();
    (0..VERIFIER_LEN)
        .map(|_| VERIFIER_CHARSET[rng.gen_range(0..VERIFIER_CHARSET.len())] as char)
        .collect()
}

fn generate_state() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `BASE64URL(SHA256(verifier))` without padding.
pub fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn verifier_uses_unreserved_charset_and_valid_length() {
        let attempt = PkceAttempt::generate("app://auth/callback");
        assert!((43..=128).contains(&attempt.verifier.len()));
        assert!(attempt
            .verifier
            .bytes()
            .all(|b| VERIFIER_CHARSET.contains(&b)));
    }

    #[test]
    fn challenge_matches_rfc7636_appendix_b() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn challenge_is_derived_from_verifier() {
        let attempt = PkceAttempt::generate("app://auth/callback");
        assert_eq!(attempt.challenge, challenge_for(&attempt.verifier));
        assert_eq!(attempt.redirect_uri, "app://auth/callback");
    }

    #[test]
    fn every_attempt_is_fresh() {
        let mut verifiers = HashSet::new();
        let mut states = HashSet::new();
        for _ in 0..200 {
            let attempt = PkceAttempt::generate("app://cb");
            assert!(verifiers.insert(attempt.verifier));
            assert!(states.insert(attempt.state));
        }
    }

    #[test]
    fn debug_output_hides_verifier() {
        let attempt = PkceAttempt::generate("app://cb");
        let rendered = format!("{:?}", attempt);
        assert!(!rendered.contains(&attempt.verifier));
        assert!(!rendered.contains(&attempt.state));
    }
}
