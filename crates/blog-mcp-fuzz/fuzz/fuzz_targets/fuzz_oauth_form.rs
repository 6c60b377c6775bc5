#![no_main]

use blog_mcp::server::oauth::{AuthorizeParams, LoginParams, TokenRequest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_urlencoded::from_bytes::<AuthorizeParams>(data);
    let _ = serde_urlencoded::from_bytes::<LoginParams>(data);
    let _ = serde_urlencoded::from_bytes::<TokenRequest>(data);
});
