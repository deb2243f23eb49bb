use std::sync::Arc;

use crate::domain::{Comment, NewComment, NewPost, Post, PostId, Principal};
use crate::error::DomainError;
use crate::ports::{Clock, CommentRepository, GroupRepository, PostRepository};
use crate::validation::{CommentForm, FieldErrors, PostForm};

use super::Redirect;
use super::authorization::authorize_post_write;

const UNKNOWN_GROUP: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Post and comment writes.
///
/// Authentication is checked before anything is looked up, so an anonymous
/// caller is sent to log in even for a post that does not exist.
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    groups: Arc<dyn GroupRepository>,
    clock: Arc<dyn Clock>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        groups: Arc<dyn GroupRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            posts,
            comments,
            groups,
            clock,
        }
    }

    pub async fn create_post(
        &self,
        principal: &Principal,
        form: PostForm,
    ) -> Result<Redirect, DomainError> {
        let identity = principal.require()?;
        self.validate_post_form(&form).await?;

        let changes = form.into_changes();
        let post = self
            .posts
            .create_post(NewPost {
                text: changes.text,
                author_id: identity.user_id,
                group_id: changes.group_id,
                image: changes.image.resolve(None),
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!(post_id = post.id, author_id = post.author_id, "Post created");
        Ok(Redirect::Profile(identity.username.clone()))
    }

    /// The post as its author is about to edit it.
    pub async fn post_for_edit(
        &self,
        principal: &Principal,
        post_id: PostId,
    ) -> Result<Post, DomainError> {
        principal.require()?;
        let post = self.find(post_id).await?;
        authorize_post_write(principal, &post)?;
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        principal: &Principal,
        post_id: PostId,
        form: PostForm,
    ) -> Result<Redirect, DomainError> {
        let post = self.post_for_edit(principal, post_id).await?;
        self.validate_post_form(&form).await?;

        self.posts.update_post(post.id, form.into_changes()).await?;
        tracing::info!(post_id = post.id, "Post edited");

        Ok(Redirect::PostDetail(post.id))
    }

    /// Delete a post and, with it, its comments.
    pub async fn delete_post(
        &self,
        principal: &Principal,
        post_id: PostId,
    ) -> Result<Redirect, DomainError> {
        principal.require()?;
        let post = self.find(post_id).await?;
        let identity = authorize_post_write(principal, &post)?;

        self.posts.delete_post(post.id).await?;
        tracing::info!(post_id = post.id, "Post deleted");

        Ok(Redirect::Profile(identity.username.clone()))
    }

    pub async fn add_comment(
        &self,
        principal: &Principal,
        post_id: PostId,
        form: CommentForm,
    ) -> Result<(Comment, Redirect), DomainError> {
        let identity = principal.require()?;
        let post = self.find(post_id).await?;
        form.validate().map_err(DomainError::Validation)?;

        let comment = self
            .comments
            .create_comment(NewComment {
                post_id: post.id,
                author_id: identity.user_id,
                text: form.text,
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!(comment_id = comment.id, post_id = post.id, "Comment added");
        Ok((comment, Redirect::PostDetail(post.id)))
    }

    async fn find(&self, post_id: PostId) -> Result<Post, DomainError> {
        self.posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))
    }

    async fn validate_post_form(&self, form: &PostForm) -> Result<(), DomainError> {
        let mut errors = match form.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => errors,
        };
        if let Some(group_id) = form.group {
            if self.groups.find_group(group_id).await?.is_none() {
                errors.add("group", UNKNOWN_GROUP);
            }
        }
        errors.into_result().map_err(DomainError::Validation)
    }
}
