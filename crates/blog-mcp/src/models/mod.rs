//! Data models shared by the OAuth server, the stores and the MCP tools.
//!
//! Tool inputs use `#[serde(default)]` for optional fields and accept post
//! ids either as JSON numbers or numeric strings.

mod inputs;
mod post;
mod user;

pub use inputs::*;
pub use post::{BlogPost, PostId};
pub use user::{Identity, User, UserId, UserProfile};
