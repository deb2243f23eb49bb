use std::sync::Arc;

use crate::domain::{NewFollow, Principal, User};
use crate::error::{DomainError, RepoError};
use crate::ports::{FollowRepository, UserRepository};

use super::Redirect;

/// Subscription manager: follow and unfollow, both idempotent.
pub struct SubscriptionService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl SubscriptionService {
    pub fn new(users: Arc<dyn UserRepository>, follows: Arc<dyn FollowRepository>) -> Self {
        Self { users, follows }
    }

    /// Follow `username`. Following yourself or someone already followed
    /// changes nothing.
    pub async fn follow(&self, actor: &Principal, username: &str) -> Result<Redirect, DomainError> {
        let identity = actor.require()?;
        let author = self.author(username).await?;
        let redirect = Redirect::Profile(author.username.clone());

        let edge = NewFollow {
            user_id: identity.user_id,
            author_id: author.id,
        };
        if edge.is_self_follow() {
            tracing::debug!(user_id = identity.user_id, "Ignoring self-follow");
            return Ok(redirect);
        }
        if self.follows.follow_exists(edge.user_id, edge.author_id).await? {
            return Ok(redirect);
        }

        match self.follows.create_follow(edge).await {
            Ok(follow) => {
                tracing::info!(
                    follow_id = follow.id,
                    user_id = follow.user_id,
                    author_id = follow.author_id,
                    "Follow created"
                );
            }
            // A concurrent request inserted the same edge first.
            Err(RepoError::Constraint(msg)) => {
                tracing::debug!(error = %msg, "Follow already exists");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(redirect)
    }

    /// Unfollow `username`. Missing edges are not an error.
    pub async fn unfollow(&self, actor: &Principal, username: &str) -> Result<Redirect, DomainError> {
        let identity = actor.require()?;
        let author = self.author(username).await?;

        let removed = self.follows.delete_follow(identity.user_id, author.id).await?;
        tracing::debug!(
            user_id = identity.user_id,
            author_id = author.id,
            removed,
            "Unfollow processed"
        );

        Ok(Redirect::Profile(author.username))
    }

    async fn author(&self, username: &str) -> Result<User, DomainError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("User", username))
    }
}
