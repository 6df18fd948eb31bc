use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::User;
use crate::schema::users;
use crate::types::auth::TokenScope;
use crate::types::ApiResponse;
use crate::AppState;

/// `GET /api/auth/confirmed_email/{token}`. Idempotent: confirming an already
/// confirmed account reports so without touching the row.
pub async fn confirmed_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    let claims = state.tokens.decode(&token, TokenScope::EmailConfirmation)?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let user: User = users::table
        .filter(users::email.eq(&claims.sub))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::VerificationFailed, "Verification error"))?;

    if user.confirmed {
        return Ok(Json(ApiResponse::ok("Your email is already confirmed")));
    }

    // confirmed only ever transitions false -> true.
    diesel::update(
        users::table
            .filter(users::id.eq(user.id))
            .filter(users::confirmed.eq(false)),
    )
    .set(users::confirmed.eq(true))
    .execute(&mut conn)?;

    tracing::info!(user_id = %user.id, "email confirmed");

    Ok(Json(ApiResponse::ok("Email confirmed")))
}
