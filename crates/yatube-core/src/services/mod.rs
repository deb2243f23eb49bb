//! Application services: the operations exposed to the transport layer.

pub mod authorization;
mod feed;
mod groups;
mod home_feed;
mod posts;
mod subscription;

pub use feed::{FeedService, GroupFeed, PostDetail, ProfileFeed};
pub use groups::GroupService;
pub use home_feed::{CachedHomeFeed, HOME_FEED_CACHE_KEY, HOME_FEED_TTL, JsonPageRenderer, PageRenderer};
pub use posts::PostService;
pub use subscription::SubscriptionService;

use crate::domain::PostId;

/// Where the caller should be sent after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Profile(String),
    PostDetail(PostId),
    Groups,
}

impl Redirect {
    pub fn location(&self) -> String {
        match self {
            Redirect::Profile(username) => format!("/profile/{username}/"),
            Redirect::PostDetail(id) => format!("/posts/{id}/"),
            Redirect::Groups => "/groups/".to_string(),
        }
    }
}
