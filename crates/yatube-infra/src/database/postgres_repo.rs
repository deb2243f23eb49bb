//! PostgreSQL entity store.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbConn, DbErr, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};

use yatube_core::domain::{
    Comment, Follow, Group, GroupId, ImageChange, NewComment, NewFollow, NewGroup, NewPost,
    NewUser, Post, PostChanges, PostId, User, UserId,
};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    CommentRepository, FollowRepository, GroupRepository, PostFilter, PostRepository,
    UserRepository,
};

use super::entity::{comment, follow, group, post, user};

/// Entity store backed by PostgreSQL. Uniqueness, the self-follow check and
/// foreign keys are enforced by the schema; cascades run in transactions.
#[derive(Clone)]
pub struct PostgresStore {
    db: DbConn,
}

impl PostgresStore {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DbConn {
        &self.db
    }
}

fn repo_err(e: DbErr) -> RepoError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg))
        | Some(SqlErr::ForeignKeyConstraintViolation(msg)) => RepoError::Constraint(msg),
        _ => match e {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(e.to_string()),
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => RepoError::NotFound,
            _ => {
                let msg = e.to_string();
                if msg.contains("check constraint") || msg.contains("duplicate") {
                    RepoError::Constraint(msg)
                } else {
                    RepoError::Query(msg)
                }
            }
        },
    }
}

fn post_condition(filter: PostFilter) -> Condition {
    match filter {
        PostFilter::All => Condition::all(),
        PostFilter::Group(group_id) => Condition::all().add(post::Column::GroupId.eq(group_id)),
        PostFilter::Author(author_id) => Condition::all().add(post::Column::AuthorId.eq(author_id)),
        PostFilter::FollowedBy(user_id) => Condition::all().add(
            post::Column::AuthorId.in_subquery(
                Query::select()
                    .column(follow::Column::AuthorId)
                    .from(follow::Entity)
                    .and_where(follow::Column::UserId.eq(user_id))
                    .to_owned(),
            ),
        ),
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn create_user(&self, new: NewUser) -> Result<User, RepoError> {
        tracing::debug!(username = %new.username, "Creating user");

        let model = user::ActiveModel {
            id: NotSet,
            username: Set(new.username),
            password_hash: Set(new.password_hash),
            is_staff: Set(new.is_staff),
            created_at: Set(new.created_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(repo_err)?;

        Ok(model.into())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let result = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl GroupRepository for PostgresStore {
    async fn create_group(&self, new: NewGroup) -> Result<Group, RepoError> {
        let model = group::ActiveModel {
            id: NotSet,
            title: Set(new.title),
            slug: Set(new.slug),
            description: Set(new.description),
        }
        .insert(&self.db)
        .await
        .map_err(repo_err)?;

        Ok(model.into())
    }

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>, RepoError> {
        let result = group::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(result.map(Into::into))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let result = group::Entity::find()
            .filter(group::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(result.map(Into::into))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, RepoError> {
        let result = group::Entity::find()
            .order_by_asc(group::Column::Title)
            .order_by_asc(group::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), RepoError> {
        let txn = self.db.begin().await.map_err(repo_err)?;

        let detached = post::Entity::update_many()
            .col_expr(post::Column::GroupId, Expr::value(Option::<i64>::None))
            .filter(post::Column::GroupId.eq(id))
            .exec(&txn)
            .await
            .map_err(repo_err)?;

        let deleted = group::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(repo_err)?;
        if deleted.rows_affected == 0 {
            txn.rollback().await.map_err(repo_err)?;
            return Err(RepoError::NotFound);
        }

        txn.commit().await.map_err(repo_err)?;
        tracing::debug!(
            group_id = id,
            detached = detached.rows_affected,
            "Group removed, posts detached"
        );
        Ok(())
    }
}

#[async_trait]
impl PostRepository for PostgresStore {
    async fn create_post(&self, new: NewPost) -> Result<Post, RepoError> {
        let model = post::ActiveModel {
            id: NotSet,
            text: Set(new.text),
            created_at: Set(new.created_at.into()),
            author_id: Set(new.author_id),
            group_id: Set(new.group_id),
            image: Set(new.image),
        }
        .insert(&self.db)
        .await
        .map_err(repo_err)?;

        Ok(model.into())
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepoError> {
        let result = post::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(result.map(Into::into))
    }

    async fn update_post(&self, id: PostId, changes: PostChanges) -> Result<Post, RepoError> {
        let image = match changes.image {
            ImageChange::Keep => NotSet,
            ImageChange::Clear => Set(None),
            ImageChange::Set(image) => Set(Some(image)),
        };
        let model = post::ActiveModel {
            id: Set(id),
            text: Set(changes.text),
            group_id: Set(changes.group_id),
            image,
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(repo_err)?;

        Ok(model.into())
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let txn = self.db.begin().await.map_err(repo_err)?;

        let comments = comment::Entity::delete_many()
            .filter(comment::Column::PostId.eq(id))
            .exec(&txn)
            .await
            .map_err(repo_err)?;

        let deleted = post::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(repo_err)?;
        if deleted.rows_affected == 0 {
            txn.rollback().await.map_err(repo_err)?;
            return Err(RepoError::NotFound);
        }

        txn.commit().await.map_err(repo_err)?;
        tracing::debug!(
            post_id = id,
            comments = comments.rows_affected,
            "Post removed with its comments"
        );
        Ok(())
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<usize, RepoError> {
        let count = post::Entity::find()
            .filter(post_condition(filter))
            .count(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError> {
        let result = post::Entity::find()
            .filter(post_condition(filter))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .offset(offset as u64)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresStore {
    async fn create_comment(&self, new: NewComment) -> Result<Comment, RepoError> {
        let model = comment::ActiveModel {
            id: NotSet,
            post_id: Set(new.post_id),
            author_id: Set(new.author_id),
            text: Set(new.text),
            created_at: Set(new.created_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(repo_err)?;

        Ok(model.into())
    }

    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, RepoError> {
        let result = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl FollowRepository for PostgresStore {
    async fn create_follow(&self, new: NewFollow) -> Result<Follow, RepoError> {
        if new.is_self_follow() {
            return Err(RepoError::Constraint(
                "cant_subscribe_to_self: user and author must differ".to_string(),
            ));
        }

        let model = follow::ActiveModel {
            id: NotSet,
            user_id: Set(new.user_id),
            author_id: Set(new.author_id),
        }
        .insert(&self.db)
        .await
        .map_err(repo_err)?;

        Ok(model.into())
    }

    async fn follow_exists(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let count = follow::Entity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(count > 0)
    }

    async fn delete_follow(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let result = follow::Entity::delete_many()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(result.rows_affected > 0)
    }
}
