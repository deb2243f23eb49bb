//! Group administration (staff only).

use actix_web::{HttpRequest, HttpResponse, http::header, web};

use yatube_core::validation::GroupForm;
use yatube_shared::dto::GroupRequest;

use super::{redirect, views};
use crate::middleware::auth::CurrentPrincipal;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /admin/groups/
pub async fn create_group(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    body: Option<web::Json<GroupRequest>>,
) -> AppResult<HttpResponse> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let form = GroupForm {
        title: body.title,
        slug: body.slug,
        description: body.description,
    };

    let group = state
        .groups
        .create_group(&principal, form)
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/group/{}/", group.slug)))
        .json(views::group(group)))
}

/// DELETE /admin/groups/{slug}/ - posts of the group stay, ungrouped.
pub async fn delete_group(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    slug: web::Path<String>,
) -> AppResult<HttpResponse> {
    let next = state
        .groups
        .delete_group(&principal, &slug)
        .await
        .map_err(|e| AppError::from_domain(e, &req))?;

    Ok(redirect(&next))
}
