//! End-to-end service flows over the in-memory store, cache and clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use yatube_core::domain::{Identity, NewGroup, NewPost, NewUser, Post, Principal, User};
use yatube_core::ports::{
    Cache, Clock, CommentRepository, FollowRepository, GroupRepository, PostRepository,
    UserRepository,
};
use yatube_core::services::{
    CachedHomeFeed, FeedService, GroupService, PostService, Redirect, SubscriptionService,
};
use yatube_core::validation::{CommentForm, GroupForm, PostForm};
use yatube_core::{DomainError, PageNumber};
use yatube_infra::{InMemoryCache, InMemoryStore, ManualClock};

struct Blog {
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
    cache: Arc<dyn Cache>,
    feed: Arc<FeedService>,
    home: CachedHomeFeed,
    posts: PostService,
    groups: GroupService,
    subscriptions: SubscriptionService,
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

impl Blog {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(epoch()));
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::with_clock(clock.clone()));

        let feed = Arc::new(FeedService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));

        Self {
            home: CachedHomeFeed::new(feed.clone(), cache.clone()),
            posts: PostService::new(store.clone(), store.clone(), store.clone(), clock.clone()),
            groups: GroupService::new(store.clone()),
            subscriptions: SubscriptionService::new(store.clone(), store.clone()),
            feed,
            store,
            clock,
            cache,
        }
    }

    async fn user(&self, username: &str) -> (User, Principal) {
        let user = self
            .store
            .create_user(NewUser::new(username, "hash", self.clock.now()))
            .await
            .unwrap();
        let principal = Principal::from(Identity::from(&user));
        (user, principal)
    }

    async fn group(&self, slug: &str) -> i64 {
        self.store
            .create_group(NewGroup {
                title: format!("Group {slug}"),
                slug: slug.to_string(),
                description: "test group".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    /// One post per call, each a minute newer than the last.
    async fn post(&self, author: &User, group_id: Option<i64>) -> Post {
        self.clock.advance(Duration::from_secs(60));
        self.store
            .create_post(NewPost {
                text: format!("post by {}", author.username),
                author_id: author.id,
                group_id,
                image: None,
                created_at: self.clock.now(),
            })
            .await
            .unwrap()
    }
}

fn form(text: &str) -> PostForm {
    PostForm {
        text: text.to_string(),
        ..PostForm::default()
    }
}

#[tokio::test]
async fn test_thirteen_posts_split_into_ten_and_three() {
    let blog = Blog::new();
    let (leo, _) = blog.user("leo").await;
    let cats = blog.group("cats").await;
    let mut created = Vec::new();
    for _ in 0..13 {
        created.push(blog.post(&leo, Some(cats)).await.id);
    }
    created.reverse();

    let first = blog.feed.home(PageNumber::new(1)).await.unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.num_pages, 2);
    assert!(first.has_next());

    let second = blog.feed.home(PageNumber::new(2)).await.unwrap();
    assert_eq!(second.items.len(), 3);

    let past_end = blog.feed.home(PageNumber::new(3)).await.unwrap();
    assert_eq!(past_end.number, 2);
    assert_eq!(past_end.items, second.items);

    let garbage = blog.feed.home(PageNumber::parse(Some("abc"))).await.unwrap();
    assert_eq!(garbage.number, 1);

    let shown: Vec<i64> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|p| p.id)
        .collect();
    assert_eq!(shown, created);

    let group_feed = blog.feed.group("cats", PageNumber::new(2)).await.unwrap();
    assert_eq!(group_feed.page.items.len(), 3);

    let profile = blog
        .feed
        .profile(&Principal::Anonymous, "leo", PageNumber::FIRST)
        .await
        .unwrap();
    assert_eq!(profile.page.total, 13);
    assert!(!profile.following);
}

#[tokio::test]
async fn test_post_in_other_group_stays_out_of_empty_group() {
    let blog = Blog::new();
    let (leo, _) = blog.user("leo").await;
    let cats = blog.group("cats").await;
    blog.group("news").await;
    blog.post(&leo, Some(cats)).await;

    let news = blog.feed.group("news", PageNumber::FIRST).await.unwrap();
    assert!(news.page.items.is_empty());
    assert_eq!(news.page.num_pages, 1);

    let missing = blog.feed.group("nope", PageNumber::FIRST).await;
    assert!(matches!(missing, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_following_feed_shows_only_followed_authors() {
    let blog = Blog::new();
    let (a, a_principal) = blog.user("a").await;
    let (_, b_principal) = blog.user("b").await;
    let (c, c_principal) = blog.user("c").await;

    blog.subscriptions.follow(&a_principal, "c").await.unwrap();
    let post = blog.post(&c, None).await;
    blog.post(&a, None).await;

    let a_feed = blog.feed.following(&a_principal, PageNumber::FIRST).await.unwrap();
    assert_eq!(a_feed.items, vec![post]);

    let b_feed = blog.feed.following(&b_principal, PageNumber::FIRST).await.unwrap();
    assert!(b_feed.items.is_empty());

    let c_feed = blog.feed.following(&c_principal, PageNumber::FIRST).await.unwrap();
    assert!(c_feed.items.is_empty());

    let anonymous = blog.feed.following(&Principal::Anonymous, PageNumber::FIRST).await;
    assert!(matches!(anonymous, Err(DomainError::Unauthenticated)));
}

#[tokio::test]
async fn test_follow_is_idempotent_and_ignores_self() {
    let blog = Blog::new();
    let (a, a_principal) = blog.user("a").await;
    let (c, _) = blog.user("c").await;

    let redirect = blog.subscriptions.follow(&a_principal, "c").await.unwrap();
    assert_eq!(redirect, Redirect::Profile("c".to_string()));
    blog.subscriptions.follow(&a_principal, "c").await.unwrap();
    assert!(blog.store.follow_exists(a.id, c.id).await.unwrap());

    blog.subscriptions.follow(&a_principal, "a").await.unwrap();
    assert!(!blog.store.follow_exists(a.id, a.id).await.unwrap());

    let profile = blog
        .feed
        .profile(&a_principal, "c", PageNumber::FIRST)
        .await
        .unwrap();
    assert!(profile.following);

    blog.subscriptions.unfollow(&a_principal, "c").await.unwrap();
    assert!(!blog.store.follow_exists(a.id, c.id).await.unwrap());
    blog.subscriptions.unfollow(&a_principal, "c").await.unwrap();

    let missing = blog.subscriptions.follow(&a_principal, "ghost").await;
    assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    let anonymous = blog.subscriptions.follow(&Principal::Anonymous, "c").await;
    assert!(matches!(anonymous, Err(DomainError::Unauthenticated)));
}

#[tokio::test]
async fn test_only_author_may_edit_or_delete() {
    let blog = Blog::new();
    let (_, leo) = blog.user("leo").await;
    let (_, mia) = blog.user("mia").await;

    let redirect = blog.posts.create_post(&leo, form("first draft")).await.unwrap();
    assert_eq!(redirect.location(), "/profile/leo/");
    let post_id = blog.feed.home(PageNumber::FIRST).await.unwrap().items[0].id;

    let denied = blog.posts.edit_post(&mia, post_id, form("hijacked")).await;
    assert!(matches!(denied, Err(DomainError::PermissionDenied)));
    let anonymous = blog
        .posts
        .edit_post(&Principal::Anonymous, post_id, form("hijacked"))
        .await;
    assert!(matches!(anonymous, Err(DomainError::Unauthenticated)));
    let anonymous_missing = blog.posts.delete_post(&Principal::Anonymous, 999).await;
    assert!(matches!(anonymous_missing, Err(DomainError::Unauthenticated)));

    let redirect = blog.posts.edit_post(&leo, post_id, form("final")).await.unwrap();
    assert_eq!(redirect, Redirect::PostDetail(post_id));
    let detail = blog.feed.post_detail(post_id).await.unwrap();
    assert_eq!(detail.post.text, "final");
    assert_eq!(detail.author.username, "leo");

    assert!(matches!(
        blog.posts.delete_post(&mia, post_id).await,
        Err(DomainError::PermissionDenied)
    ));
    blog.posts.delete_post(&leo, post_id).await.unwrap();
    assert!(matches!(
        blog.feed.post_detail(post_id).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_text_edit_keeps_image_until_cleared() {
    let blog = Blog::new();
    let (_, leo) = blog.user("leo").await;

    let with_image = PostForm {
        text: "a cat".to_string(),
        image: Some(Some("posts/cat.png".to_string())),
        ..PostForm::default()
    };
    blog.posts.create_post(&leo, with_image).await.unwrap();
    let post_id = blog.feed.home(PageNumber::FIRST).await.unwrap().items[0].id;

    blog.posts
        .edit_post(&leo, post_id, form("a cat, typo fixed"))
        .await
        .unwrap();
    let edited = blog.store.find_post(post_id).await.unwrap().unwrap();
    assert_eq!(edited.text, "a cat, typo fixed");
    assert_eq!(edited.image.as_deref(), Some("posts/cat.png"));

    let cleared = PostForm {
        text: "no cat after all".to_string(),
        image: Some(None),
        ..PostForm::default()
    };
    blog.posts.edit_post(&leo, post_id, cleared).await.unwrap();
    let edited = blog.store.find_post(post_id).await.unwrap().unwrap();
    assert_eq!(edited.image, None);
}

#[tokio::test]
async fn test_invalid_post_form_reports_fields() {
    let blog = Blog::new();
    let (_, leo) = blog.user("leo").await;

    let result = blog
        .posts
        .create_post(
            &leo,
            PostForm {
                text: "   ".to_string(),
                group: Some(404),
                image: None,
            },
        )
        .await;

    let errors = match result {
        Err(DomainError::Validation(errors)) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert!(!errors.get("text").is_empty());
    assert!(!errors.get("group").is_empty());
    assert_eq!(blog.feed.home(PageNumber::FIRST).await.unwrap().total, 0);
}

/// Whether the post shows up in the `news` group, `leo`'s profile and the
/// viewer's following feed, in that order.
async fn listed_in_feeds(blog: &Blog, viewer: &Principal, post_id: i64) -> Vec<bool> {
    let group = blog.feed.group("news", PageNumber::FIRST).await.unwrap();
    let profile = blog
        .feed
        .profile(viewer, "leo", PageNumber::FIRST)
        .await
        .unwrap();
    let following = blog.feed.following(viewer, PageNumber::FIRST).await.unwrap();

    [group.page, profile.page, following]
        .iter()
        .map(|page| page.items.iter().any(|p| p.id == post_id))
        .collect()
}

#[tokio::test]
async fn test_deleting_post_removes_its_comments() {
    let blog = Blog::new();
    let (leo, leo_principal) = blog.user("leo").await;
    let (_, mia) = blog.user("mia").await;
    let news = blog.group("news").await;
    let post = blog.post(&leo, Some(news)).await;
    blog.subscriptions.follow(&mia, "leo").await.unwrap();

    let (comment, redirect) = blog
        .posts
        .add_comment(&mia, post.id, CommentForm { text: "nice".to_string() })
        .await
        .unwrap();
    assert_eq!(redirect.location(), format!("/posts/{}/", post.id));
    assert_eq!(comment.post_id, post.id);
    assert_eq!(blog.feed.post_detail(post.id).await.unwrap().comments.len(), 1);

    assert_eq!(listed_in_feeds(&blog, &mia, post.id).await, vec![true, true, true]);

    blog.posts.delete_post(&leo_principal, post.id).await.unwrap();

    assert!(blog.store.list_comments(post.id).await.unwrap().is_empty());
    assert_eq!(listed_in_feeds(&blog, &mia, post.id).await, vec![false, false, false]);
}

#[tokio::test]
async fn test_home_feed_cache_serves_stale_page_until_ttl() {
    let blog = Blog::new();
    let (leo, _) = blog.user("leo").await;
    blog.post(&leo, None).await;
    let newest = blog.post(&leo, None).await;

    let before = blog.home.render(PageNumber::FIRST).await.unwrap();
    blog.store.delete_post(newest.id).await.unwrap();

    let cached = blog.home.render(PageNumber::FIRST).await.unwrap();
    assert_eq!(cached, before);

    blog.clock.advance(Duration::from_secs(19));
    assert_eq!(blog.home.render(PageNumber::FIRST).await.unwrap(), before);

    blog.clock.advance(Duration::from_secs(1));
    let fresh = blog.home.render(PageNumber::FIRST).await.unwrap();
    assert_ne!(fresh, before);
    let page: serde_json::Value = serde_json::from_str(&fresh).unwrap();
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn test_out_of_range_pages_share_the_last_page_entry() {
    let blog = Blog::new();

    let first = blog.home.render(PageNumber::FIRST).await.unwrap();
    for n in 2..=500 {
        assert_eq!(blog.home.render(PageNumber::new(n)).await.unwrap(), first);
    }

    assert!(blog.cache.exists(&CachedHomeFeed::cache_key(PageNumber::FIRST)).await);
    for n in 2..=500 {
        let key = CachedHomeFeed::cache_key(PageNumber::new(n));
        assert!(!blog.cache.exists(&key).await, "{key} should not be cached");
    }
}

#[tokio::test]
async fn test_home_feed_cache_clear_drops_stale_pages() {
    let blog = Blog::new();
    let (leo, _) = blog.user("leo").await;
    let post = blog.post(&leo, None).await;

    let before = blog.home.render(PageNumber::FIRST).await.unwrap();
    blog.store.delete_post(post.id).await.unwrap();
    blog.home.clear().await.unwrap();

    assert_ne!(blog.home.render(PageNumber::FIRST).await.unwrap(), before);
}

#[tokio::test]
async fn test_group_administration() {
    let blog = Blog::new();
    let (_, member) = blog.user("member").await;
    let staff_user = blog
        .store
        .create_user(NewUser::new("admin", "hash", epoch()).staff())
        .await
        .unwrap();
    let staff = Principal::from(Identity::from(&staff_user));
    let cats = GroupForm {
        title: "Cats".to_string(),
        slug: "cats".to_string(),
        description: "Cats only".to_string(),
    };

    assert!(matches!(
        blog.groups.create_group(&member, cats.clone()).await,
        Err(DomainError::PermissionDenied)
    ));

    let group = blog.groups.create_group(&staff, cats.clone()).await.unwrap();
    let duplicate = blog.groups.create_group(&staff, cats).await;
    assert!(matches!(duplicate, Err(DomainError::Validation(_))));

    let (author, _) = blog.user("author").await;
    let post = blog.post(&author, Some(group.id)).await;

    let redirect = blog.groups.delete_group(&staff, "cats").await.unwrap();
    assert_eq!(redirect, Redirect::Groups);

    let survivor = blog.store.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(survivor.group_id, None);
    assert!(blog.feed.groups().await.unwrap().is_empty());
}
