//! In-memory entity store - used when no database is configured, and by tests.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use yatube_core::domain::{
    Comment, CommentId, Follow, FollowId, Group, GroupId, NewComment, NewFollow, NewGroup,
    NewPost, NewUser, Post, PostChanges, PostId, User, UserId,
};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    CommentRepository, FollowRepository, GroupRepository, PostFilter, PostRepository,
    UserRepository,
};

#[derive(Debug, Default)]
struct Sequence(i64);

impl Sequence {
    fn next(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    follows: BTreeMap<FollowId, Follow>,
    user_ids: Sequence,
    group_ids: Sequence,
    post_ids: Sequence,
    comment_ids: Sequence,
    follow_ids: Sequence,
}

impl Tables {
    fn require_user(&self, id: UserId) -> Result<(), RepoError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(RepoError::Constraint(format!("user {id} does not exist")))
        }
    }

    fn require_group(&self, id: Option<GroupId>) -> Result<(), RepoError> {
        match id {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(RepoError::Constraint(format!("group {id} does not exist")))
            }
            _ => Ok(()),
        }
    }

    fn matching_posts(&self, filter: PostFilter) -> Vec<&Post> {
        let followed: HashSet<UserId> = match filter {
            PostFilter::FollowedBy(user_id) => self
                .follows
                .values()
                .filter(|f| f.user_id == user_id)
                .map(|f| f.author_id)
                .collect(),
            _ => HashSet::new(),
        };

        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| match filter {
                PostFilter::All => true,
                PostFilter::Group(group_id) => post.group_id == Some(group_id),
                PostFilter::Author(author_id) => post.author_id == author_id,
                PostFilter::FollowedBy(_) => followed.contains(&post.author_id),
            })
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }
}

/// Entity store kept in process memory.
///
/// All tables sit behind one lock, so every operation (including the
/// cascading deletes) is atomic with respect to every other.
/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint(format!(
                "username '{}' is taken",
                user.username
            )));
        }

        let user = User {
            id: tables.user_ids.next(),
            username: user.username,
            password_hash: user.password_hash,
            is_staff: user.is_staff,
            created_at: user.created_at,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn create_group(&self, group: NewGroup) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint(format!(
                "group slug '{}' already exists",
                group.slug
            )));
        }

        let group = Group {
            id: tables.group_ids.next(),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>, RepoError> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }

        let mut detached = 0usize;
        for post in tables.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
                detached += 1;
            }
        }
        tracing::debug!(group_id = id, detached, "Group removed, posts detached");
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn create_post(&self, post: NewPost) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_user(post.author_id)?;
        tables.require_group(post.group_id)?;

        let post = Post {
            id: tables.post_ids.next(),
            text: post.text,
            created_at: post.created_at,
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn update_post(&self, id: PostId, changes: PostChanges) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_group(changes.group_id)?;

        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.apply(changes);
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }

        let before = tables.comments.len();
        tables.comments.retain(|_, c| c.post_id != id);
        tracing::debug!(
            post_id = id,
            comments = before - tables.comments.len(),
            "Post removed with its comments"
        );
        Ok(())
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<usize, RepoError> {
        Ok(self.tables.read().await.matching_posts(filter).len())
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .matching_posts(filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_user(comment.author_id)?;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepoError::Constraint(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }

        let comment = Comment {
            id: tables.comment_ids.next(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: comment.created_at,
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }
}

#[async_trait]
impl FollowRepository for InMemoryStore {
    async fn create_follow(&self, follow: NewFollow) -> Result<Follow, RepoError> {
        if follow.is_self_follow() {
            return Err(RepoError::Constraint(
                "cant_subscribe_to_self: user and author must differ".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        tables.require_user(follow.user_id)?;
        tables.require_user(follow.author_id)?;
        if tables
            .follows
            .values()
            .any(|f| f.user_id == follow.user_id && f.author_id == follow.author_id)
        {
            return Err(RepoError::Constraint(format!(
                "user {} already follows {}",
                follow.user_id, follow.author_id
            )));
        }

        let follow = Follow {
            id: tables.follow_ids.next(),
            user_id: follow.user_id,
            author_id: follow.author_id,
        };
        tables.follows.insert(follow.id, follow.clone());
        Ok(follow)
    }

    async fn follow_exists(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn delete_follow(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(tables.follows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    async fn user(store: &InMemoryStore, name: &str) -> User {
        store
            .create_user(NewUser::new(name, "hash", Utc::now()))
            .await
            .unwrap()
    }

    fn new_post(author_id: UserId, group_id: Option<GroupId>, offset_secs: i64) -> NewPost {
        NewPost {
            text: format!("post at {offset_secs}"),
            author_id,
            group_id,
            image: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_constraint_violation() {
        let store = InMemoryStore::new();
        let news = NewGroup {
            title: "News".to_string(),
            slug: "news".to_string(),
            description: "All the news".to_string(),
        };
        store.create_group(news.clone()).await.unwrap();

        let err = store.create_group(news).await.unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_follow_constraints() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;

        let edge = NewFollow {
            user_id: alice.id,
            author_id: bob.id,
        };
        store.create_follow(edge).await.unwrap();
        assert!(matches!(
            store.create_follow(edge).await,
            Err(RepoError::Constraint(_))
        ));
        assert!(matches!(
            store
                .create_follow(NewFollow {
                    user_id: alice.id,
                    author_id: alice.id
                })
                .await,
            Err(RepoError::Constraint(_))
        ));

        assert!(store.delete_follow(alice.id, bob.id).await.unwrap());
        assert!(!store.delete_follow(alice.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_post_cascades_to_comments() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let kept = store.create_post(new_post(alice.id, None, 0)).await.unwrap();
        let doomed = store.create_post(new_post(alice.id, None, 1)).await.unwrap();

        for (post_id, text) in [(doomed.id, "first"), (doomed.id, "second"), (kept.id, "stays")] {
            store
                .create_comment(NewComment {
                    post_id,
                    author_id: alice.id,
                    text: text.to_string(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        store.delete_post(doomed.id).await.unwrap();

        assert!(store.list_comments(doomed.id).await.unwrap().is_empty());
        assert_eq!(store.list_comments(kept.id).await.unwrap().len(), 1);
        assert!(matches!(
            store.delete_post(doomed.id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_group_detaches_posts() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let group = store
            .create_group(NewGroup {
                title: "Cats".to_string(),
                slug: "cats".to_string(),
                description: "Cats only".to_string(),
            })
            .await
            .unwrap();
        let post = store
            .create_post(new_post(alice.id, Some(group.id), 0))
            .await
            .unwrap();

        store.delete_group(group.id).await.unwrap();

        let post = store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.group_id, None);
        assert!(store.find_by_slug("cats").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_posts_listed_newest_first_with_id_tiebreak() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let at = Utc::now();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut post = new_post(alice.id, None, 0);
            post.created_at = at;
            ids.push(store.create_post(post).await.unwrap().id);
        }
        let newest = store.create_post(new_post(alice.id, None, 60)).await.unwrap();

        let listed: Vec<PostId> = store
            .list_posts(PostFilter::All, 0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(listed, vec![newest.id, ids[2], ids[1], ids[0]]);
    }

    #[tokio::test]
    async fn test_post_requires_existing_author() {
        let store = InMemoryStore::new();
        let err = store.create_post(new_post(42, None, 0)).await.unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }
}
