//! Entity store ports.
//!
//! Every implementation enforces the storage invariants itself: unique
//! group slugs and usernames, unique follow pairs, no self-follow,
//! comments removed with their post, posts detached from a deleted group.
//! Violations surface as [`RepoError::Constraint`].

use async_trait::async_trait;

use crate::domain::{
    Comment, Follow, Group, GroupId, NewComment, NewFollow, NewGroup, NewPost, NewUser, Post,
    PostChanges, PostId, User, UserId,
};
use crate::error::RepoError;

/// Which posts a feed is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(GroupId),
    Author(UserId),
    /// Posts by every author the given user follows.
    FollowedBy(UserId),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create_group(&self, group: NewGroup) -> Result<Group, RepoError>;

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    async fn list_groups(&self) -> Result<Vec<Group>, RepoError>;

    /// Delete a group and clear `group_id` on its posts, atomically.
    async fn delete_group(&self, id: GroupId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: NewPost) -> Result<Post, RepoError>;

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepoError>;

    /// Persist the editable fields of a post.
    async fn update_post(&self, id: PostId, changes: PostChanges) -> Result<Post, RepoError>;

    /// Delete a post together with its comments, atomically.
    async fn delete_post(&self, id: PostId) -> Result<(), RepoError>;

    async fn count_posts(&self, filter: PostFilter) -> Result<usize, RepoError>;

    /// Newest first (`created_at` desc, then id desc), windowed.
    async fn list_posts(
        &self,
        filter: PostFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, RepoError>;

    /// Comments of a post, oldest first.
    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, RepoError>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    async fn create_follow(&self, follow: NewFollow) -> Result<Follow, RepoError>;

    async fn follow_exists(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError>;

    /// Remove the edge; returns whether one existed.
    async fn delete_follow(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError>;
}
