use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::middleware::extract_bearer_token;
use crate::models::User;
use crate::schema::users;
use crate::services::token_service;
use crate::types::auth::{TokenPair, TokenScope};
use crate::types::ApiResponse;
use crate::AppState;

/// `GET /api/auth/refresh_token` with the refresh JWT as the bearer credential.
///
/// Rotation is a single conditional UPDATE keyed on the stored hash, so two
/// concurrent calls with the same token cannot both succeed: exactly one sees
/// the old hash, the other gets zero rows and a 401.
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let token = extract_bearer_token(&headers)?;
    let claims = state.tokens.decode(&token, TokenScope::Refresh)?;

    let old_hash = token_service::hash_token(&token);
    let (pair, new_hash) = state.tokens.create_token_pair(&claims.sub)?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let rotated = diesel::update(
        users::table
            .filter(users::email.eq(&claims.sub))
            .filter(users::refresh_token.eq(Some(&old_hash))),
    )
    .set(users::refresh_token.eq(Some(&new_hash)))
    .get_result::<User>(&mut conn)
    .optional()?;

    match rotated {
        Some(user) => {
            tracing::debug!(user_id = %user.id, "refresh token rotated");
            Ok(Json(ApiResponse::ok(pair)))
        }
        None => {
            // Stale or reused token: clear the slot so the outstanding refresh
            // token is revoked as well.
            diesel::update(users::table.filter(users::email.eq(&claims.sub)))
                .set(users::refresh_token.eq(None::<String>))
                .execute(&mut conn)?;
            tracing::warn!(email = %claims.sub, "stale refresh token presented; session revoked");
            Err(AppError::new(ErrorCode::RefreshTokenMismatch, "invalid refresh token"))
        }
    }
}
