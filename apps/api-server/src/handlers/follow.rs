//! Follow and unfollow. Both are idempotent and redirect to the profile.

use actix_web::{HttpRequest, HttpResponse, web};

use super::redirect;
use crate::middleware::auth::CurrentPrincipal;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /profile/{username}/follow/
pub async fn follow(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    let next = state
        .subscriptions
        .follow(&principal, &username)
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(redirect(&next))
}

/// POST /profile/{username}/unfollow/
pub async fn unfollow(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    let next = state
        .subscriptions
        .unfollow(&principal, &username)
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(redirect(&next))
}
