//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod feeds;
mod follow;
mod health;
mod posts;
mod views;

use actix_web::{HttpResponse, http::header, web};

use yatube_core::services::Redirect;

use crate::middleware::error::AppError;

pub use views::ApiPageRenderer;

/// 302 to where the caller should go after a successful write.
pub(crate) fn redirect(target: &Redirect) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, target.location()))
        .finish()
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .route("/health", web::get().to(health::health_check))
    // Feeds
    .route("/", web::get().to(feeds::index))
    .route("/group/{slug}/", web::get().to(feeds::group_posts))
    .route("/profile/{username}/", web::get().to(feeds::profile))
    .route("/posts/{post_id}/", web::get().to(feeds::post_detail))
    .route("/follow/", web::get().to(feeds::follow_index))
    .route("/groups/", web::get().to(feeds::groups))
    // Writes
    .route("/create/", web::post().to(posts::create))
    .route("/posts/{post_id}/edit/", web::get().to(posts::edit_form))
    .route("/posts/{post_id}/edit/", web::post().to(posts::edit))
    .route("/posts/{post_id}/delete/", web::post().to(posts::delete))
    .route("/posts/{post_id}/comment/", web::post().to(posts::add_comment))
    .route("/profile/{username}/follow/", web::post().to(follow::follow))
    .route("/profile/{username}/unfollow/", web::post().to(follow::unfollow))
    // Administration
    .service(
        web::scope("/admin")
            .route("/groups/", web::post().to(admin::create_group))
            .route("/groups/{slug}/", web::delete().to(admin::delete_group)),
    )
    // Identity
    .service(
        web::scope("/auth")
            .route("/signup/", web::post().to(auth::signup))
            .route("/login/", web::get().to(auth::login_hint))
            .route("/login/", web::post().to(auth::login)),
    );
}
