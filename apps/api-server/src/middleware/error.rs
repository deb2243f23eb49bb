//! Error handling - RFC 7807 problem bodies and redirects.

use std::fmt;

use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode, http::header};
use url::form_urlencoded;

use yatube_core::DomainError;
use yatube_core::domain::PostId;
use yatube_core::validation::FieldErrors;
use yatube_shared::ErrorResponse;

pub const LOGIN_URL: &str = "/auth/login/";

/// Application-level error type.
///
/// Most variants render as problem bodies; the redirect variants answer
/// `302 Found` so a browser-style client ends up on the right page.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized,
    Forbidden,
    Conflict(String),
    Internal(String),
    Validation(FieldErrors),
    /// Send the caller to log in, then back to `next`.
    LoginRequired { next: String },
    RedirectTo(String),
}

impl AppError {
    /// Map a domain failure, using the request path as the post-login target.
    pub fn from_domain(err: DomainError, req: &HttpRequest) -> Self {
        match err {
            DomainError::Unauthenticated => AppError::LoginRequired {
                next: req
                    .uri()
                    .path_and_query()
                    .map_or_else(|| req.path().to_string(), |pq| pq.as_str().to_string()),
            },
            DomainError::NotFound { entity, key } => {
                AppError::NotFound(format!("{entity} not found: {key}"))
            }
            DomainError::PermissionDenied => AppError::Forbidden,
            DomainError::Validation(errors) => AppError::Validation(errors),
            DomainError::ConstraintViolation(msg) => AppError::Conflict(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }

    /// Like [`AppError::from_domain`], except a non-author is sent back to
    /// the post instead of getting 403.
    pub fn from_post_write(err: DomainError, req: &HttpRequest, post_id: PostId) -> Self {
        match err {
            DomainError::PermissionDenied => AppError::RedirectTo(format!("/posts/{post_id}/")),
            other => Self::from_domain(other, req),
        }
    }

    fn login_location(next: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("next", next)
            .finish();
        format!("{LOGIN_URL}?{query}")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::Forbidden => write!(f, "Forbidden"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal error: {msg}"),
            AppError::Validation(errors) => write!(f, "Validation errors: {errors}"),
            AppError::LoginRequired { next } => write!(f, "Login required for {next}"),
            AppError::RedirectTo(location) => write!(f, "Redirect to {location}"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::LoginRequired { .. } | AppError::RedirectTo(_) => StatusCode::FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::LoginRequired { next } => {
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, Self::login_location(next)))
                    .finish();
            }
            AppError::RedirectTo(location) => {
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, location.as_str()))
                    .finish();
            }
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Unauthorized => ErrorResponse::unauthorized(),
            AppError::Forbidden => ErrorResponse::forbidden(),
            AppError::Conflict(detail) => {
                tracing::warn!(detail = %detail, "Store constraint violated");
                ErrorResponse::conflict(detail)
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
            AppError::Validation(errors) => {
                ErrorResponse::validation_failed(errors.clone().into_inner())
            }
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn test_unauthenticated_redirects_to_login_with_next() {
        let req = TestRequest::post().uri("/posts/3/edit/").to_http_request();
        let response = AppError::from_domain(DomainError::Unauthenticated, &req).error_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login/?next=%2Fposts%2F3%2Fedit%2F"
        );
    }

    #[actix_web::test]
    async fn test_login_next_keeps_query_and_escapes_reserved_chars() {
        let req = TestRequest::post()
            .uri("/profile/a%26b/follow/?page=2")
            .to_http_request();
        let response = AppError::from_domain(DomainError::Unauthenticated, &req).error_response();

        let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert_eq!(
            location,
            "/auth/login/?next=%2Fprofile%2Fa%2526b%2Ffollow%2F%3Fpage%3D2"
        );

        let next = form_urlencoded::parse(location.split_once('?').unwrap().1.as_bytes())
            .find(|(key, _)| key == "next")
            .map(|(_, value)| value.into_owned());
        assert_eq!(next.as_deref(), Some("/profile/a%26b/follow/?page=2"));
    }

    #[actix_web::test]
    async fn test_foreign_post_write_redirects_to_post() {
        let req = TestRequest::post().uri("/posts/3/edit/").to_http_request();
        let response =
            AppError::from_post_write(DomainError::PermissionDenied, &req, 3).error_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/posts/3/");
    }

    #[actix_web::test]
    async fn test_validation_renders_field_map() {
        let error = AppError::Validation(FieldErrors::single("text", "This field is required."));
        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errors"]["text"][0], "This field is required.");
    }

    #[actix_web::test]
    async fn test_internal_details_do_not_leak() {
        let response = AppError::Internal("connection refused".to_string()).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["status"], 500);
        assert!(json.get("detail").is_none());
    }
}
