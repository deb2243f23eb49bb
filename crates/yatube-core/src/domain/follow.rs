use serde::{Deserialize, Serialize};

use super::user::UserId;

pub type FollowId = i64;

/// Directed edge: `user_id` follows `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: FollowId,
    pub user_id: UserId,
    pub author_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewFollow {
    pub user_id: UserId,
    pub author_id: UserId,
}

impl NewFollow {
    /// Self-follow edges are rejected by every store.
    pub fn is_self_follow(&self) -> bool {
        self.user_id == self.author_id
    }
}
