use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::middleware::CurrentUser;
use crate::models::{Contact, NewContact, NewUserContact};
use crate::schema::{contacts, users_contacts};
use crate::types::api::ListParams;
use crate::types::ApiResponse;
use crate::AppState;

/// Fixed-window limit on the contacts surface, keyed per user.
async fn enforce_rate_limit(state: &AppState, user_id: i32) -> AppResult<()> {
    let key = format!("rl:contacts:{user_id}");
    let allowed = state
        .redis
        .rate_limit_check(&key, state.config.contacts_rate_limit, state.config.contacts_rate_window)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(AppError::new(
            ErrorCode::RateLimited,
            format!(
                "no more than {} requests per {} seconds",
                state.config.contacts_rate_limit, state.config.contacts_rate_window
            ),
        ));
    }
    Ok(())
}

/// Delete statement for one user's link to one contact. Other users' links to
/// the same contact are untouched.
fn unlink_contact(
    user_id: i32,
    contact_id: i32,
) -> impl diesel::query_dsl::methods::ExecuteDsl<diesel::PgConnection>
       + diesel::query_builder::QueryFragment<diesel::pg::Pg> {
    diesel::delete(
        users_contacts::table
            .filter(users_contacts::contact_id.eq(contact_id))
            .filter(users_contacts::user_id.eq(user_id)),
    )
}

/// Load a contact only if it is linked to the given user.
fn owned_contact(
    conn: &mut diesel::PgConnection,
    user_id: i32,
    contact_id: i32,
) -> AppResult<Contact> {
    contacts::table
        .inner_join(users_contacts::table)
        .filter(users_contacts::user_id.eq(user_id))
        .filter(contacts::id.eq(contact_id))
        .select(contacts::all_columns)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ContactNotFound, "Contact not found"))
}

// --- GET /api/contacts ---

pub async fn list_contacts(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ApiResponse<Vec<Contact>>>> {
    enforce_rate_limit(&state, user.0.id).await?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let rows: Vec<Contact> = contacts::table
        .inner_join(users_contacts::table)
        .filter(users_contacts::user_id.eq(user.0.id))
        .select(contacts::all_columns)
        .order(contacts::id.asc())
        .offset(params.skip())
        .limit(params.limit())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(rows)))
}

// --- GET /api/contacts/{id} ---

pub async fn get_contact(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Contact>>> {
    enforce_rate_limit(&state, user.0.id).await?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let contact = owned_contact(&mut conn, user.0.id, contact_id)?;

    Ok(Json(ApiResponse::ok(contact)))
}

// --- POST /api/contacts ---

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 20))]
    pub phone_number: String,
}

pub async fn create_contact(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContactRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Contact>>)> {
    enforce_rate_limit(&state, user.0.id).await?;
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // Contact row and ownership link land together or not at all.
    let contact: Contact = conn.transaction::<_, AppError, _>(|conn| {
        let contact: Contact = diesel::insert_into(contacts::table)
            .values(&NewContact { phone_number: req.phone_number })
            .get_result(conn)?;

        diesel::insert_into(users_contacts::table)
            .values(&NewUserContact { user_id: user.0.id, contact_id: contact.id })
            .execute(conn)?;

        Ok(contact)
    })?;

    tracing::info!(user_id = %user.0.id, contact_id = %contact.id, "contact created");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(contact))))
}

// --- PUT /api/contacts/{id} ---

pub async fn update_contact(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<i32>,
    Json(req): Json<ContactRequest>,
) -> AppResult<Json<ApiResponse<Contact>>> {
    enforce_rate_limit(&state, user.0.id).await?;
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let contact = owned_contact(&mut conn, user.0.id, contact_id)?;

    let updated: Contact = diesel::update(contacts::table.find(contact.id))
        .set((
            contacts::phone_number.eq(&req.phone_number),
            contacts::updated_at.eq(chrono::Utc::now()),
        ))
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- DELETE /api/contacts/{id} ---

pub async fn remove_contact(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Contact>>> {
    enforce_rate_limit(&state, user.0.id).await?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let contact = owned_contact(&mut conn, user.0.id, contact_id)?;

    // A contact can be linked to several users. Deleting removes only the
    // caller's link; the contact row itself goes away once nobody holds it.
    let removed: Contact = conn.transaction::<_, AppError, _>(|conn| {
        unlink_contact(user.0.id, contact.id).execute(conn)?;

        let remaining: i64 = users_contacts::table
            .filter(users_contacts::contact_id.eq(contact.id))
            .count()
            .get_result(conn)?;
        if remaining == 0 {
            diesel::delete(contacts::table.find(contact.id)).execute(conn)?;
        }

        Ok(contact)
    })?;

    tracing::info!(user_id = %user.0.id, contact_id = %contact_id, "contact removed");

    Ok(Json(ApiResponse::ok(removed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_unlink_is_scoped_to_the_caller() {
        let sql = diesel::debug_query::<diesel::pg::Pg, _>(&unlink_contact(3, 7)).to_string();
        assert!(sql.contains("DELETE FROM \"users_contacts\""), "{sql}");
        assert!(sql.contains("\"users_contacts\".\"contact_id\" = $1"), "{sql}");
        assert!(sql.contains("\"users_contacts\".\"user_id\" = $2"), "{sql}");
    }
}
