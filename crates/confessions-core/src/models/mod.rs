//! Data models for Confessions

mod confession;
mod identity;
mod like;

pub use confession::{validate_confession_text, Confession, ConfessionId, MAX_CONFESSION_CHARS};
pub use identity::{generate_anonymous_token, Identity, ANONYMOUS_TOKEN_PREFIX};
pub use like::LikeRecord;
