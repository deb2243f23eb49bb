use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction, Value};

use yatube_core::domain::{ImageChange, NewFollow, PostChanges};
use yatube_core::error::RepoError;
use yatube_core::ports::{FollowRepository, GroupRepository, PostFilter, PostRepository};

use super::entity::{group, post};
use super::postgres_repo::PostgresStore;

fn post_model(id: i64, author_id: i64, minute: u32) -> post::Model {
    post::Model {
        id,
        text: format!("Post number {id}"),
        created_at: Utc
            .with_ymd_and_hms(2024, 5, 1, 12, minute, 0)
            .unwrap()
            .into(),
        author_id,
        group_id: None,
        image: None,
    }
}

fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
}

#[tokio::test]
async fn test_find_post_by_id() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(5, 1, 0)]])
        .into_connection();

    let store = PostgresStore::new(db);
    let post = store.find_post(5).await.unwrap().unwrap();

    assert_eq!(post.id, 5);
    assert_eq!(post.author_id, 1);
    assert_eq!(post.text, "Post number 5");
}

#[tokio::test]
async fn test_list_posts_maps_rows_in_store_order() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(3, 1, 30), post_model(2, 1, 20)]])
        .into_connection();

    let store = PostgresStore::new(db);
    let posts = store.list_posts(PostFilter::All, 0, 10).await.unwrap();

    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 2]);

    let log = store.connection().clone().into_transaction_log();
    let sql = log[0].statements()[0].sql.clone();
    assert!(sql.contains(r#"ORDER BY "posts"."created_at" DESC, "posts"."id" DESC"#));
}

#[tokio::test]
async fn test_following_filter_uses_subquery() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![count_row(4)]])
        .into_connection();

    let store = PostgresStore::new(db);
    assert_eq!(store.count_posts(PostFilter::FollowedBy(9)).await.unwrap(), 4);

    let log = store.connection().clone().into_transaction_log();
    let sql = log[0].statements()[0].sql.clone();
    assert!(sql.contains(r#""author_id" IN (SELECT "author_id" FROM "follows""#));
}

#[tokio::test]
async fn test_update_post_leaves_image_column_unless_changed() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(5, 1, 0)], vec![post_model(5, 1, 0)]])
        .into_connection();

    let store = PostgresStore::new(db);
    store
        .update_post(
            5,
            PostChanges {
                text: "typo fixed".to_string(),
                group_id: None,
                image: ImageChange::Keep,
            },
        )
        .await
        .unwrap();
    store
        .update_post(
            5,
            PostChanges {
                text: "typo fixed".to_string(),
                group_id: None,
                image: ImageChange::Clear,
            },
        )
        .await
        .unwrap();

    let log = store.connection().clone().into_transaction_log();
    let set_clause = |i: usize| {
        let sql = log[i].statements()[0].sql.clone();
        sql.split(" WHERE ").next().unwrap_or_default().to_string()
    };
    assert!(!set_clause(0).contains(r#""image""#));
    assert!(set_clause(1).contains(r#""image" = "#));
}

#[tokio::test]
async fn test_delete_post_removes_comments_in_one_transaction() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ])
        .into_connection();

    let store = PostgresStore::new(db);
    store.delete_post(5).await.unwrap();

    let log = store.connection().clone().into_transaction_log();
    assert_eq!(log.len(), 1);
    let statements = log[0].statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].sql.starts_with(r#"DELETE FROM "comments""#));
    assert!(statements[1].sql.starts_with(r#"DELETE FROM "posts""#));
}

#[tokio::test]
async fn test_delete_missing_group_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ])
        .into_connection();

    let store = PostgresStore::new(db);
    assert!(matches!(
        store.delete_group(77).await,
        Err(RepoError::NotFound)
    ));
}

#[tokio::test]
async fn test_find_group_by_slug() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![group::Model {
            id: 1,
            title: "News".to_string(),
            slug: "news".to_string(),
            description: "Daily news".to_string(),
        }]])
        .into_connection();

    let store = PostgresStore::new(db);
    let group = store.find_by_slug("news").await.unwrap().unwrap();
    assert_eq!(group.title, "News");
    assert_eq!(group.slug, "news");
}

#[tokio::test]
async fn test_self_follow_never_reaches_database() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let store = PostgresStore::new(db);

    let result = store
        .create_follow(NewFollow {
            user_id: 3,
            author_id: 3,
        })
        .await;

    assert!(matches!(result, Err(RepoError::Constraint(_))));
    let log = store.connection().clone().into_transaction_log();
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_delete_follow_reports_whether_edge_existed() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ])
        .into_connection();

    let store = PostgresStore::new(db);
    assert!(store.delete_follow(1, 2).await.unwrap());
    assert!(!store.delete_follow(1, 2).await.unwrap());

    // The transaction log keeps one entry per statement outside transactions.
    let log = store.connection().clone().into_transaction_log();
    assert_eq!(
        log[0],
        Transaction::from_sql_and_values(
            DatabaseBackend::Postgres,
            r#"DELETE FROM "follows" WHERE "follows"."user_id" = $1 AND "follows"."author_id" = $2"#,
            [1i64.into(), 2i64.into()],
        )
    );
}
