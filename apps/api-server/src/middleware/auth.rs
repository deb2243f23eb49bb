//! Bearer-token authentication extractor.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, http::StatusCode, http::header, web};

use yatube_core::domain::{Identity, Principal};
use yatube_core::ports::{AuthError, TokenClaims};
use yatube_shared::ErrorResponse;

use crate::state::AppState;

/// The principal behind a request.
///
/// No `Authorization` header means [`Principal::Anonymous`]; a header that
/// does not carry a valid bearer token is rejected with 401.
/// ```ignore
/// async fn feed(CurrentPrincipal(principal): CurrentPrincipal) -> impl Responder { ... }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

/// Error type for authentication failures.
#[derive(Debug)]
pub struct AuthenticationError(pub AuthError);

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AuthError::TokenExpired | AuthError::InvalidToken(_) | AuthError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::HashingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match &self.0 {
            AuthError::TokenExpired => ErrorResponse::new(401, "Token Expired")
                .with_detail("Your authentication token has expired. Please login again."),
            AuthError::InvalidToken(msg) => {
                ErrorResponse::new(401, "Invalid Token").with_detail(msg.clone())
            }
            AuthError::InvalidCredentials => ErrorResponse::unauthorized(),
            AuthError::HashingError(msg) => {
                tracing::error!(error = %msg, "Authentication backend failure");
                ErrorResponse::internal_error()
            }
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

fn identity_from(claims: TokenClaims) -> Identity {
    Identity {
        user_id: claims.user_id,
        username: claims.username,
        is_staff: claims.is_staff,
    }
}

fn principal_from_request(req: &HttpRequest) -> Result<Principal, AuthenticationError> {
    let Some(auth_header) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(Principal::Anonymous);
    };

    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        tracing::error!("AppState not found in app data");
        AuthenticationError(AuthError::InvalidToken(
            "Server configuration error".to_string(),
        ))
    })?;

    let token = auth_header
        .to_str()
        .map_err(|_| {
            AuthenticationError(AuthError::InvalidToken(
                "Invalid authorization header".to_string(),
            ))
        })?
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            AuthenticationError(AuthError::InvalidToken("Expected Bearer token".to_string()))
        })?;

    let claims = state
        .tokens
        .validate_token(token.trim())
        .map_err(AuthenticationError)?;
    Ok(Principal::from(identity_from(claims)))
}

impl FromRequest for CurrentPrincipal {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(principal_from_request(req).map(CurrentPrincipal))
    }
}
