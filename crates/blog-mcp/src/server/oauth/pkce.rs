//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements RFC 7636 `S256` and `plain`. Comparisons are constant-time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::types::CodeChallengeMethod;

/// Compute the `S256` challenge for a verifier: `BASE64URL(SHA256(verifier))`.
#[must_use]
pub fn s256_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

/// Verify a code verifier against the stored challenge.
///
/// `CodeChallengeMethod::None` never verifies; callers skip PKCE entirely for
/// grants issued without a challenge.
#[must_use]
pub fn verify(code_verifier: &str, code_challenge: &str, method: CodeChallengeMethod) -> bool {
    match method {
        CodeChallengeMethod::S256 => {
            let computed = s256_challenge(code_verifier);
            computed.as_bytes().ct_eq(code_challenge.as_bytes()).into()
        }
        CodeChallengeMethod::Plain => code_verifier.as_bytes().ct_eq(code_challenge.as_bytes()).into(),
        CodeChallengeMethod::None => false,
    }
}
