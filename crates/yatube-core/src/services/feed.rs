use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Comment, Group, Post, PostId, Principal, User};
use crate::error::DomainError;
use crate::pagination::{POSTS_PER_PAGE, Page, PageNumber, PageWindow};
use crate::ports::{
    CommentRepository, FollowRepository, GroupRepository, PostFilter, PostRepository,
    UserRepository,
};

/// Posts of one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<Post>,
}

/// Posts of one author, plus whether the viewer follows them.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileFeed {
    pub author: User,
    pub following: bool,
    pub page: Page<Post>,
}

/// A single post with its comments.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub author: User,
    pub group: Option<Group>,
    pub comments: Vec<Comment>,
}

/// Feed composer. Each feed is a [`PostFilter`] plus an existence lookup;
/// ordering and slicing belong to the store and [`PageWindow`].
pub struct FeedService {
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    follows: Arc<dyn FollowRepository>,
    page_size: usize,
}

impl FeedService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        follows: Arc<dyn FollowRepository>,
    ) -> Self {
        Self {
            users,
            groups,
            posts,
            comments,
            follows,
            page_size: POSTS_PER_PAGE,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Every post, newest first.
    pub async fn home(&self, page: PageNumber) -> Result<Page<Post>, DomainError> {
        self.page_of(PostFilter::All, page).await
    }

    pub async fn group(&self, slug: &str, page: PageNumber) -> Result<GroupFeed, DomainError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Group", slug))?;
        let page = self.page_of(PostFilter::Group(group.id), page).await?;

        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        viewer: &Principal,
        username: &str,
        page: PageNumber,
    ) -> Result<ProfileFeed, DomainError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("User", username))?;

        let following = match viewer.identity() {
            Some(identity) => self.follows.follow_exists(identity.user_id, author.id).await?,
            None => false,
        };
        let page = self.page_of(PostFilter::Author(author.id), page).await?;

        Ok(ProfileFeed {
            author,
            following,
            page,
        })
    }

    /// Posts by everyone the principal follows.
    pub async fn following(
        &self,
        principal: &Principal,
        page: PageNumber,
    ) -> Result<Page<Post>, DomainError> {
        let identity = principal.require()?;
        self.page_of(PostFilter::FollowedBy(identity.user_id), page)
            .await
    }

    pub async fn post_detail(&self, post_id: PostId) -> Result<PostDetail, DomainError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))?;

        let author = self.users.find_user(post.author_id).await?.ok_or_else(|| {
            DomainError::Internal(format!("author {} of post {post_id} is missing", post.author_id))
        })?;
        let group = match post.group_id {
            Some(group_id) => self.groups.find_group(group_id).await?,
            None => None,
        };
        let comments = self.comments.list_comments(post_id).await?;

        Ok(PostDetail {
            post,
            author,
            group,
            comments,
        })
    }

    pub async fn groups(&self) -> Result<Vec<Group>, DomainError> {
        Ok(self.groups.list_groups().await?)
    }

    async fn page_of(&self, filter: PostFilter, page: PageNumber) -> Result<Page<Post>, DomainError> {
        let total = self.posts.count_posts(filter).await?;
        let window = PageWindow::resolve(total, page, self.page_size);
        let items = self
            .posts
            .list_posts(filter, window.offset, window.limit)
            .await?;

        tracing::debug!(
            ?filter,
            page = window.number,
            num_pages = window.num_pages,
            items = items.len(),
            "Feed page composed"
        );

        Ok(Page::new(items, window, total))
    }
}
