use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, Local, NaiveDate};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::middleware::CurrentUser;
use crate::models::{NewUser, NewUserContact, User, UserResponse};
use crate::schema::{contacts, users, users_contacts};
use crate::services::auth_service;
use crate::types::api::ListParams;
use crate::types::ApiResponse;
use crate::AppState;

// --- GET /api/users ---

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let rows: Vec<User> = users::table
        .order(users::id.asc())
        .offset(params.skip())
        .limit(params.limit())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(rows.into_iter().map(Into::into).collect())))
}

// --- GET /api/users/{id} ---

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let user: User = users::table
        .find(user_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "User not found"))?;

    Ok(Json(ApiResponse::ok(user.into())))
}

// --- POST /api/users ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
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
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    auth_service::validate_password(&req.password)?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // A racing duplicate insert still resolves to 409 through the unique
    // constraint on users.email.
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
        password_hash: auth_service::hash_password(&req.password)?,
        description: req.description,
    };

    let user: User = diesel::insert_into(users::table)
        .values(&new_user)
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user.into()))))
}

// --- PUT /api/users/{id} ---

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(max = 50))]
    pub name: String,
    #[validate(length(max = 50))]
    pub last_name: String,
    pub day_of_born: NaiveDate,
    #[validate(length(max = 250))]
    pub description: Option<String>,
    /// Replaces the user's contact links when present.
    pub contacts: Option<Vec<i32>>,
}

pub async fn update_user(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    // Users may only edit themselves; anything else resolves like a missing row.
    if user.0.id != user_id {
        return Err(AppError::new(ErrorCode::UserNotFound, "User not found"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // Field update and contact relink are one atomic step.
    let updated: User = conn.transaction::<_, AppError, _>(|conn| {
        let updated: User = diesel::update(users::table.find(user_id))
            .set((
                users::name.eq(&req.name),
                users::last_name.eq(&req.last_name),
                users::day_of_born.eq(req.day_of_born),
                users::description.eq(req.description.as_deref()),
                users::updated_at.eq(chrono::Utc::now()),
            ))
            .get_result(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "User not found"))?;

        if let Some(ids) = &req.contacts {
            diesel::delete(users_contacts::table.filter(users_contacts::user_id.eq(user_id)))
                .execute(conn)?;
            let known: Vec<i32> = contacts::table
                .filter(contacts::id.eq_any(ids))
                .select(contacts::id)
                .load(conn)?;
            let links: Vec<NewUserContact> = known
                .into_iter()
                .map(|contact_id| NewUserContact { user_id, contact_id })
                .collect();
            if !links.is_empty() {
                diesel::insert_into(users_contacts::table)
                    .values(&links)
                    .execute(conn)?;
            }
        }

        Ok(updated)
    })?;

    Ok(Json(ApiResponse::ok(updated.into())))
}

// --- DELETE /api/users/{id} ---

pub async fn remove_user(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    if user.0.id != user_id {
        return Err(AppError::new(ErrorCode::UserNotFound, "User not found"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let removed: User = diesel::delete(users::table.find(user_id))
        .get_result(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "User not found"))?;

    tracing::info!(user_id = %user_id, "user removed");

    Ok(Json(ApiResponse::ok(removed.into())))
}

// --- Search endpoints ---

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub user_name: String,
}

pub async fn find_user_by_name(
    State(state): State<Arc<AppState>>,
    Query(q): Query<NameQuery>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let user: User = users::table
        .filter(users::name.eq(&q.user_name))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "User not found"))?;
    Ok(Json(ApiResponse::ok(user.into())))
}

#[derive(Debug, Deserialize)]
pub struct LastNameQuery {
    pub user_last_name: String,
}

pub async fn find_user_by_last_name(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LastNameQuery>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let user: User = users::table
        .filter(users::last_name.eq(&q.user_last_name))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "User not found"))?;
    Ok(Json(ApiResponse::ok(user.into())))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub user_email: String,
}

pub async fn find_user_by_email(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EmailQuery>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let user: User = users::table
        .filter(users::email.eq(&q.user_email))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "User not found"))?;
    Ok(Json(ApiResponse::ok(user.into())))
}

// --- GET /api/users/next_7_days_birthdays ---

pub async fn next_7_days_birthdays(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let today = Local::now().date_naive();
    let rows: Vec<User> = users::table.load(&mut conn)?;
    let upcoming: Vec<UserResponse> = rows
        .into_iter()
        .filter(|u| birthday_in_next_days(u.day_of_born, today, 7))
        .map(Into::into)
        .collect();

    Ok(Json(ApiResponse::ok(upcoming)))
}

/// True when the month/day of `born` falls on one of the `days` calendar days
/// after `today` (tomorrow through `today + days`). Handles month and year
/// boundaries by walking actual dates.
fn birthday_in_next_days(born: NaiveDate, today: NaiveDate, days: i64) -> bool {
    (1..=days).any(|offset| {
        let date = today + chrono::Duration::days(offset);
        date.month() == born.month() && date.day() == born.day()
    })
}

// --- PATCH /api/users/avatar ---

pub async fn update_avatar(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("avatar").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(format!("failed to read upload: {e}")))?;
            upload = Some((file_name, content_type, bytes.to_vec()));
            break;
        }
    }

    let (file_name, content_type, bytes) =
        upload.ok_or_else(|| AppError::bad_request("missing 'file' field"))?;

    let url = state
        .images
        .upload(&file_name, bytes, &content_type)
        .await
        .map_err(|e| AppError::new(ErrorCode::AvatarUploadFailed, e))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let updated: User = diesel::update(users::table.find(user.0.id))
        .set((
            users::avatar.eq(Some(&url)),
            users::updated_at.eq(chrono::Utc::now()),
        ))
        .get_result(&mut conn)?;

    tracing::info!(user_id = %updated.id, url = %url, "avatar updated");

    Ok(Json(ApiResponse::ok(updated.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn birthday_tomorrow_is_within_window() {
        let today = date(2024, 6, 10);
        assert!(birthday_in_next_days(date(1990, 6, 11), today, 7));
    }

    #[test]
    fn birthday_today_is_outside_window() {
        let today = date(2024, 6, 10);
        assert!(!birthday_in_next_days(date(1990, 6, 10), today, 7));
    }

    #[test]
    fn birthday_on_last_window_day_matches() {
        let today = date(2024, 6, 10);
        assert!(birthday_in_next_days(date(1990, 6, 17), today, 7));
        assert!(!birthday_in_next_days(date(1990, 6, 18), today, 7));
    }

    #[test]
    fn window_crosses_month_boundary() {
        let today = date(2024, 6, 28);
        assert!(birthday_in_next_days(date(1985, 7, 2), today, 7));
    }

    #[test]
    fn window_crosses_year_boundary() {
        let today = date(2024, 12, 29);
        assert!(birthday_in_next_days(date(2000, 1, 3), today, 7));
        assert!(!birthday_in_next_days(date(2000, 1, 6), today, 7));
    }
}
