#![no_main]

use blog_mcp::models::{CreatePostInput, ListPostsInput, ReadPostInput, UpdatePostInput};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = serde_json::from_value::<ReadPostInput>(json.clone());
        let _ = serde_json::from_value::<CreatePostInput>(json.clone());
        let _ = serde_json::from_value::<UpdatePostInput>(json.clone());
        let _ = serde_json::from_value::<ListPostsInput>(json);
    }
});
