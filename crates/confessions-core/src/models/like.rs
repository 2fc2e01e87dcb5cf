//! Like record model

use serde::{Deserialize, Serialize};

use super::{ConfessionId, Identity};

/// One identity liking one confession.
///
/// Exactly one of `anonymous_user_id` and `fid` is set; the constructor is the
/// only way to build one from an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeRecord {
    pub confession_id: ConfessionId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub anonymous_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fid: Option<i64>,
}

impl LikeRecord {
    #[must_use]
    pub fn new(confession_id: ConfessionId, identity: &Identity) -> Self {
        match identity {
            Identity::Generated(token) => Self {
                confession_id,
                anonymous_user_id: Some(token.clone()),
                fid: None,
            },
            Identity::Platform(fid) => Self {
                confession_id,
                anonymous_user_id: None,
                fid: Some(*fid),
            },
        }
    }
}
