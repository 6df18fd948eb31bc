use diesel::prelude::*;

use crate::errors::AppError;
use crate::models::User;
use crate::schema::users;
use crate::AppState;

fn cache_key(email: &str) -> String {
    format!("user:{email}")
}

/// Resolve the user behind a decoded access-token subject, going through the
/// Redis snapshot cache first. Cache entries expire by TTL only; a stale
/// snapshot is acceptable within `user_cache_ttl`.
pub async fn resolve_user(state: &AppState, email: &str) -> Result<User, AppError> {
    let key = cache_key(email);

    if let Ok(Some(raw)) = state.redis.get(&key).await {
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => return Ok(user),
            Err(e) => {
                tracing::debug!(error = %e, email = %email, "dropping undecodable user cache entry");
                let _ = state.redis.del(&key).await;
            }
        }
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let user: User = users::table
        .filter(users::email.eq(email))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::unauthorized("could not validate credentials"))?;

    match serde_json::to_string(&user) {
        Ok(raw) => {
            if let Err(e) = state.redis.set(&key, &raw, state.config.user_cache_ttl).await {
                tracing::debug!(error = %e, "failed to cache user snapshot");
            }
        }
        Err(e) => tracing::debug!(error = %e, "failed to serialize user snapshot"),
    }

    Ok(user)
}
