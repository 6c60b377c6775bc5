//! Fuzzing library for blog-mcp.
//!
//! This crate provides fuzzing targets for the untrusted inputs of the server:
//! JSON-RPC payloads, tool arguments and OAuth form bodies.
//!
//! # Usage
//!
//! ```bash
//! cd crates/blog-mcp-fuzz
//! cargo +nightly fuzz run fuzz_jsonrpc_payload -- -max_total_time=60
//! ```

pub use blog_mcp::models;
pub use blog_mcp::server::jsonrpc;
