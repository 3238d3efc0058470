//! Registration, login and profile handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopfloor_core::{Email, Phone, UserId};

use super::ApiJson;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::services::{AuthService, Registration};
use crate::state::AppState;

/// Body of `POST /users/`.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: UserId,
}

/// Body of `POST /users/login`. `identifier` is an email or phone number.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: UserId,
    pub email: Email,
    pub phone: Phone,
    pub name: String,
}

/// Create an account.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let user = AuthService::new(state.store(), state.tokens())
        .register(Registration {
            name: &body.name,
            email: &body.email,
            phone: &body.phone,
            password: &body.password,
        })
        .await?;

    Ok(Json(RegisterResponse {
        message: "User created successfully",
        user_id: user.id,
    }))
}

/// Exchange an identifier and password for a bearer token.
#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (_, access_token) = AuthService::new(state.store(), state.tokens())
        .login(&body.identifier, &body.password)
        .await?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// The caller's own account.
pub async fn profile(CurrentUser(user): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        id: user.id,
        email: user.email,
        phone: user.phone,
        name: user.name,
    })
}
