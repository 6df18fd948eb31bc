use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::User;
use crate::schema::users;
use crate::types::ApiResponse;
use crate::AppState;

const GENERIC_REPLY: &str = "Check your email for confirmation.";
const ALREADY_CONFIRMED_REPLY: &str = "Your email is already confirmed";

#[derive(Debug, Deserialize, Validate)]
pub struct RequestEmailBody {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    AlreadyConfirmed,
    Send,
    Skip,
}

/// Unknown addresses and throttled requests get the same reply, so the
/// endpoint reveals nothing about which emails are registered beyond the
/// confirmed/not-confirmed messaging.
fn outcome(confirmed: Option<bool>, allowed: bool) -> Outcome {
    match confirmed {
        Some(true) => Outcome::AlreadyConfirmed,
        Some(false) if allowed => Outcome::Send,
        _ => Outcome::Skip,
    }
}

/// Re-request the confirmation email. 200 with an informational message in
/// all cases.
pub async fn request_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RequestEmailBody>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    // Throttle on the requested address before the lookup so unknown emails
    // consume the window exactly like registered ones.
    let rate_key = format!("confirm:rate:{}", req.email);
    let allowed = state.redis.rate_limit_check(&rate_key, 1, 60).await.unwrap_or(true);

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let user = users::table
        .filter(users::email.eq(&req.email))
        .first::<User>(&mut conn)
        .optional()?;

    let decision = outcome(user.as_ref().map(|u| u.confirmed), allowed);
    match (decision, user) {
        (Outcome::AlreadyConfirmed, _) => Ok(Json(ApiResponse::ok(ALREADY_CONFIRMED_REPLY))),
        (Outcome::Send, Some(user)) => {
            let token = state.tokens.create_email_token(&user.email)?;
            if let Err(e) = state
                .email
                .send_confirmation_email(&user.email, &state.config.base_url, &token)
                .await
            {
                tracing::error!(error = %e, "failed to send confirmation email");
            }
            Ok(Json(ApiResponse::ok(GENERIC_REPLY)))
        }
        _ => Ok(Json(ApiResponse::ok(GENERIC_REPLY))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfirmed_user_within_the_window_gets_the_email() {
        assert_eq!(outcome(Some(false), true), Outcome::Send);
    }

    #[test]
    fn confirmed_user_is_told_so() {
        assert_eq!(outcome(Some(true), true), Outcome::AlreadyConfirmed);
        assert_eq!(outcome(Some(true), false), Outcome::AlreadyConfirmed);
    }

    #[test]
    fn throttled_and_unknown_addresses_are_indistinguishable() {
        // Neither errors nor sends: both fall through to the generic reply.
        assert_eq!(outcome(Some(false), false), Outcome::Skip);
        assert_eq!(outcome(None, true), Outcome::Skip);
        assert_eq!(outcome(None, false), Outcome::Skip);
    }
}
