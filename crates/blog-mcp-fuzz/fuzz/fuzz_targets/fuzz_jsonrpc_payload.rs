#![no_main]

use blog_mcp::server::jsonrpc::{Inbound, parse_payload};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(items) = parse_payload(data) {
        // Every parsed payload yields at least one element
        assert!(!items.is_empty());
        for item in items {
            if let Inbound::Request(request) = &item {
                assert!(item.expects_response());
                assert!(!request.id.is_object() && !request.id.is_array());
            }
        }
    }
});
