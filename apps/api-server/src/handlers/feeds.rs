//! Read-only feed endpoints.

use actix_web::{HttpRequest, HttpResponse, http::header::ContentType, web};

use yatube_core::PageNumber;
use yatube_core::domain::PostId;
use yatube_shared::ApiResponse;
use yatube_shared::dto::{GroupResponse, PageQuery};

use super::views;
use crate::middleware::auth::CurrentPrincipal;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn page_number(query: &PageQuery) -> PageNumber {
    PageNumber::parse(query.page.as_deref())
}

/// GET / - every post, newest first. Served from cache for a short while.
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let body = state
        .home
        .render(page_number(&query))
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let feed = state
        .feed
        .group(&slug, page_number(&query))
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(HttpResponse::Ok().json(views::group_feed(feed)))
}

/// GET /profile/{username}/
pub async fn profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let feed = state
        .feed
        .profile(&principal, &username, page_number(&query))
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(HttpResponse::Ok().json(views::profile(feed)))
}

/// GET /posts/{id}/
pub async fn post_detail(
    req: HttpRequest,
    state: web::Data<AppState>,
    post_id: web::Path<PostId>,
) -> AppResult<HttpResponse> {
    let detail = state
        .feed
        .post_detail(post_id.into_inner())
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(HttpResponse::Ok().json(views::post_detail(detail)))
}

/// GET /follow/ - posts by the authors the caller follows.
pub async fn follow_index(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state
        .feed
        .following(&principal, page_number(&query))
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(HttpResponse::Ok().json(views::posts(page)))
}

/// GET /groups/
pub async fn groups(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let groups: Vec<GroupResponse> = state
        .feed
        .groups()
        .await
        .map_err(|e| AppError::from_domain(e, &req))?
        .into_iter()
        .map(views::group)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(groups)))
}
