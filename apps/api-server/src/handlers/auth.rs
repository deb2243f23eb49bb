//! Identity collaborator: signup and login issue bearer tokens.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use yatube_core::domain::{NewUser, User};
use yatube_core::error::RepoError;
use yatube_core::validation::SignupForm;
use yatube_shared::dto::{AuthResponse, LoginRequest, SignupRequest};

use crate::middleware::error::{AppError, AppResult, LOGIN_URL};
use crate::state::AppState;

fn token_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = state
        .tokens
        .generate_token(user.id, &user.username, user.is_staff)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    })
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let form = SignupForm {
        username: req.username,
        password: req.password,
    };
    form.validate().map_err(AppError::Validation)?;

    if state.users.find_by_username(&form.username).await.map_err(internal)?.is_some() {
        return Err(AppError::Conflict(
            "A user with that username already exists.".to_string(),
        ));
    }

    let password_hash = state
        .passwords
        .hash(&form.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = state
        .users
        .create_user(NewUser::new(form.username, password_hash, state.clock.now()))
        .await
        .map_err(|e| match e {
            RepoError::Constraint(_) => {
                AppError::Conflict("A user with that username already exists.".to_string())
            }
            other => internal(other),
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "User signed up");
    Ok(HttpResponse::Created().json(token_response(&state, &user)?))
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .users
        .find_by_username(&req.username)
        .await
        .map_err(internal)?
        .ok_or(AppError::Unauthorized)?;

    let valid = state
        .passwords
        .verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        tracing::debug!(username = %req.username, "Rejected login");
        return Err(AppError::Unauthorized);
    }

    Ok(HttpResponse::Ok().json(token_response(&state, &user)?))
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginHint {
    login: &'static str,
    next: Option<String>,
}

/// GET /auth/login/ - where unauthenticated writes are redirected to.
pub async fn login_hint(query: web::Query<NextQuery>) -> HttpResponse {
    HttpResponse::Ok().json(LoginHint {
        login: LOGIN_URL,
        next: query.into_inner().next,
    })
}

fn internal(err: RepoError) -> AppError {
    AppError::Internal(err.to_string())
}
