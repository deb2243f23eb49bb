//! Domain entities - the core business objects.

mod comment;
mod follow;
mod group;
mod post;
mod principal;
mod user;

pub use comment::{Comment, CommentId, NewComment};
pub use follow::{Follow, FollowId, NewFollow};
pub use group::{Group, GroupId, NewGroup};
pub use post::{ImageChange, NewPost, POST_LABEL_LEN, Post, PostChanges, PostId};
pub use principal::{Identity, Principal};
pub use user::{NewUser, User, UserId};
