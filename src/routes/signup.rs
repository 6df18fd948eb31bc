use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{NewUser, NewUserContact, User, UserResponse};
use crate::schema::{contacts, users, users_contacts};
use crate::services::auth_service;
use crate::types::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
    #[validate(length(max = 50))]
    pub name: String,
    #[validate(length(max = 50))]
    pub last_name: String,
    pub day_of_born: NaiveDate,
    #[validate(length(max = 250))]
    pub description: Option<String>,
    /// Ids of existing contacts to link to the new account.
    #[serde(default)]
    pub contacts: Vec<i32>,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    auth_service::validate_password(&req.password)?;

    let password_hash = auth_service::hash_password(&req.password)?;
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // Early duplicate check for the common case; a racing insert still loses
    // cleanly via the unique constraint, which renders as 409.
    let existing: i64 = users::table
        .filter(users::email.eq(&req.email))
        .count()
        .get_result(&mut conn)?;
    if existing > 0 {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
    }

    let new_user = NewUser {
        name: req.name,
        last_name: req.last_name,
        day_of_born: req.day_of_born,
        email: req.email,
        password_hash,
        description: req.description,
    };

    // User row and contact links land together or not at all.
    let user: User = conn.transaction::<_, AppError, _>(|conn| {
        let user: User = diesel::insert_into(users::table)
            .values(&new_user)
            .get_result(conn)?;

        // Link any pre-existing contacts the caller asked for; unknown ids
        // are silently skipped.
        if !req.contacts.is_empty() {
            let known: Vec<i32> = contacts::table
                .filter(contacts::id.eq_any(&req.contacts))
                .select(contacts::id)
                .load(conn)?;
            let links: Vec<NewUserContact> = known
                .into_iter()
                .map(|contact_id| NewUserContact { user_id: user.id, contact_id })
                .collect();
            if !links.is_empty() {
                diesel::insert_into(users_contacts::table)
                    .values(&links)
                    .execute(conn)?;
            }
        }

        Ok(user)
    })?;

    let token = state.tokens.create_email_token(&user.email)?;
    if let Err(e) = state
        .email
        .send_confirmation_email(&user.email, &state.config.base_url, &token)
        .await
    {
        tracing::error!(error = %e, "failed to send confirmation email");
    }

    tracing::info!(user_id = %user.id, email = %user.email, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            user.into(),
            "User successfully created. Check your email for confirmation.",
        )),
    ))
}
