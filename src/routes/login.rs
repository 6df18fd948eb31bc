use axum::extract::State;
use axum::{Form, Json};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::User;
use crate::schema::users;
use crate::services::auth_service;
use crate::types::auth::TokenPair;
use crate::types::ApiResponse;
use crate::AppState;

/// OAuth2-style password form: the login principal travels as `username`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // Distinct failure messages mirror the original behavior; all map to 401.
    let user: User = users::table
        .filter(users::email.eq(&form.username))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidCredentials, "Invalid email"))?;

    if !user.confirmed {
        return Err(AppError::new(ErrorCode::EmailNotConfirmed, "Email not confirmed"));
    }

    if !auth_service::verify_password(&form.password, &user.password_hash)? {
        return Err(AppError::new(ErrorCode::InvalidCredentials, "Invalid password"));
    }

    let (pair, refresh_hash) = state.tokens.create_token_pair(&user.email)?;

    // Single-slot refresh token: overwriting revokes every previously issued one.
    diesel::update(users::table.filter(users::id.eq(user.id)))
        .set(users::refresh_token.eq(Some(refresh_hash)))
        .execute(&mut conn)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(ApiResponse::ok(pair)))
}
