//! Property-based tests for PKCE, JSON-RPC classification and tool inputs.

use proptest::prelude::*;
use serde_json::{Value, json};

use blog_mcp::models::{ReadPostInput, UpdatePostInput};
use blog_mcp::server::jsonrpc::{Inbound, parse_payload};
use blog_mcp::server::oauth::CodeChallengeMethod;
use blog_mcp::server::oauth::pkce::{s256_challenge, verify};

/// RFC 7636 unreserved characters, 43 to 128 long.
fn arb_verifier() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._~-]{43,128}"
}

proptest! {
    /// A verifier always satisfies its own S256 challenge.
    #[test]
    fn s256_accepts_own_verifier(verifier in arb_verifier()) {
        let challenge = s256_challenge(&verifier);
        prop_assert_eq!(challenge.len(), 43);
        prop_assert!(!challenge.contains('='));
        prop_assert!(verify(&verifier, &challenge, CodeChallengeMethod::S256));
    }

    /// Any other verifier fails.
    #[test]
    fn s256_rejects_other_verifier(a in arb_verifier(), b in arb_verifier()) {
        prop_assume!(a != b);
        prop_assert!(!verify(&b, &s256_challenge(&a), CodeChallengeMethod::S256));
    }

    /// Plain requires exact equality.
    #[test]
    fn plain_is_exact_match(a in arb_verifier(), b in arb_verifier()) {
        prop_assert!(verify(&a, &a, CodeChallengeMethod::Plain));
        prop_assert_eq!(verify(&a, &b, CodeChallengeMethod::Plain), a == b);
    }

    /// The payload parser never panics on arbitrary bytes.
    #[test]
    fn parse_payload_total(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = parse_payload(&bytes);
    }

    /// Every batch element is classified, and requests keep their ids.
    #[test]
    fn batch_classification_preserves_ids(ids in proptest::collection::vec(any::<i64>(), 1..20)) {
        let batch: Vec<Value> = ids
            .iter()
            .map(|id| json!({"jsonrpc": "2.0", "id": id, "method": "ping"}))
            .collect();
        let items = parse_payload(Value::Array(batch).to_string().as_bytes()).unwrap();

        prop_assert_eq!(items.len(), ids.len());
        for (item, id) in items.iter().zip(&ids) {
            match item {
                Inbound::Request(request) => prop_assert_eq!(&request.id, &json!(id)),
                other => prop_assert!(false, "unexpected element {:?}", other),
            }
        }
    }

    /// Notifications never expect a response.
    #[test]
    fn notifications_expect_no_response(method in "[a-z/]{1,30}") {
        let body = json!({"jsonrpc": "2.0", "method": method}).to_string();
        let items = parse_payload(body.as_bytes()).unwrap();
        prop_assert!(items.iter().all(|i| !i.expects_response()));
    }

    /// Post ids decode the same from numbers and numeric strings.
    #[test]
    fn post_id_number_or_string(id in any::<u64>()) {
        let a: ReadPostInput = serde_json::from_value(json!({"blog_post_id": id})).unwrap();
        let b: ReadPostInput = serde_json::from_value(json!({"blog_post_id": id.to_string()})).unwrap();
        prop_assert_eq!(a.blog_post_id, id);
        prop_assert_eq!(b.blog_post_id, id);
    }

    /// Update inputs carry content through unchanged.
    #[test]
    fn update_input_keeps_content(content in ".{0,200}") {
        let input: UpdatePostInput =
            serde_json::from_value(json!({"blog_post_id": 1, "new_content": content})).unwrap();
        prop_assert_eq!(input.new_content, content);
    }
}
