//! Domain values rendered as wire DTOs.

use yatube_core::DomainError;
use yatube_core::domain::{Comment, Group, Post, User};
use yatube_core::services::{GroupFeed, PageRenderer, PostDetail, ProfileFeed};
use yatube_core::Page;
use yatube_shared::dto::{
    CommentResponse, GroupFeedResponse, GroupResponse, PageResponse, PostDetailResponse,
    PostResponse, ProfileResponse, UserResponse,
};

pub fn user(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        is_staff: user.is_staff,
    }
}

pub fn group(group: Group) -> GroupResponse {
    GroupResponse {
        id: group.id,
        title: group.title,
        slug: group.slug,
        description: group.description,
    }
}

pub fn post(post: Post) -> PostResponse {
    PostResponse {
        label: post.label(),
        id: post.id,
        text: post.text,
        created_at: post.created_at,
        author_id: post.author_id,
        group_id: post.group_id,
        image: post.image,
    }
}

pub fn comment(comment: Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        author_id: comment.author_id,
        text: comment.text,
        created_at: comment.created_at,
    }
}

pub fn page<T, U>(page: Page<T>, f: impl FnMut(T) -> U) -> PageResponse<U> {
    let (has_next, has_previous) = (page.has_next(), page.has_previous());
    let (next_page, previous_page) = (page.next_page_number(), page.previous_page_number());
    let page = page.map(f);

    PageResponse {
        items: page.items,
        number: page.number,
        num_pages: page.num_pages,
        total: page.total,
        has_next,
        has_previous,
        next_page,
        previous_page,
    }
}

pub fn posts(posts: Page<Post>) -> PageResponse<PostResponse> {
    page(posts, post)
}

pub fn group_feed(feed: GroupFeed) -> GroupFeedResponse {
    GroupFeedResponse {
        group: group(feed.group),
        page: posts(feed.page),
    }
}

pub fn profile(feed: ProfileFeed) -> ProfileResponse {
    ProfileResponse {
        author: user(&feed.author),
        following: feed.following,
        page: posts(feed.page),
    }
}

pub fn post_detail(detail: PostDetail) -> PostDetailResponse {
    PostDetailResponse {
        post: post(detail.post),
        author: user(&detail.author),
        group: detail.group.map(group),
        comments: detail.comments.into_iter().map(comment).collect(),
    }
}

/// Renders cached home feed pages in the same shape as every other feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPageRenderer;

impl PageRenderer for ApiPageRenderer {
    fn render(&self, page: &Page<Post>) -> Result<String, DomainError> {
        serde_json::to_string(&posts(page.clone()))
            .map_err(|e| DomainError::Internal(e.to_string()))
    }
}
