//! Post and comment writes. Successful writes answer 302 to the page the
//! caller should see next.

use actix_web::{HttpRequest, HttpResponse, web};

use yatube_core::domain::PostId;
use yatube_core::validation::{CommentForm, PostForm};
use yatube_shared::dto::{CommentRequest, PostRequest};

use super::{redirect, views};
use crate::middleware::auth::CurrentPrincipal;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// A missing or unreadable body is treated as an empty form, so it comes
/// back as field errors rather than a bare 400.
fn post_form(body: Option<web::Json<PostRequest>>) -> PostForm {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    PostForm {
        text: body.text,
        group: body.group,
        image: body.image,
    }
}

/// POST /create/
pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    body: Option<web::Json<PostRequest>>,
) -> AppResult<HttpResponse> {
    let next = state
        .posts
        .create_post(&principal, post_form(body))
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(redirect(&next))
}

/// GET /posts/{id}/edit/ - the post as its author is about to edit it.
pub async fn edit_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    post_id: web::Path<PostId>,
) -> AppResult<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = state
        .posts
        .post_for_edit(&principal, post_id)
        .await
        .map_err(|e| AppError::from_post_write(e, &req, post_id))?;

    Ok(HttpResponse::Ok().json(views::post(post)))
}

/// POST /posts/{id}/edit/
pub async fn edit(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    post_id: web::Path<PostId>,
    body: Option<web::Json<PostRequest>>,
) -> AppResult<HttpResponse> {
    let post_id = post_id.into_inner();
    let next = state
        .posts
        .edit_post(&principal, post_id, post_form(body))
        .await
        .map_err(|e| AppError::from_post_write(e, &req, post_id))?;

    Ok(redirect(&next))
}

/// POST /posts/{id}/delete/
pub async fn delete(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    post_id: web::Path<PostId>,
) -> AppResult<HttpResponse> {
    let post_id = post_id.into_inner();
    let next = state
        .posts
        .delete_post(&principal, post_id)
        .await
        .map_err(|e| AppError::from_post_write(e, &req, post_id))?;

    Ok(redirect(&next))
}

/// POST /posts/{id}/comment/
pub async fn add_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    post_id: web::Path<PostId>,
    body: Option<web::Json<CommentRequest>>,
) -> AppResult<HttpResponse> {
    let form = CommentForm {
        text: body.map(web::Json::into_inner).unwrap_or_default().text,
    };
    let (_, next) = state
        .posts
        .add_comment(&principal, post_id.into_inner(), form)
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(redirect(&next))
}
