use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{contacts, users, users_contacts};

// --- Users ---

// Serialize + Deserialize because the session resolver caches the whole row in
// Redis as JSON. Never returned to clients directly; see UserResponse.
#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub last_name: String,
    pub day_of_born: NaiveDate,
    pub email: String,
    pub password_hash: String,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub confirmed: bool,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub name: String,
    pub last_name: String,
    pub day_of_born: NaiveDate,
    pub email: String,
    pub password_hash: String,
    pub description: Option<String>,
}

/// Public view of a user. Password hash and refresh-token slot never leave
/// the service.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub last_name: String,
    pub day_of_born: NaiveDate,
    pub email: String,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            last_name: user.last_name,
            day_of_born: user.day_of_born,
            email: user.email,
            description: user.description,
            avatar: user.avatar,
            confirmed: user.confirmed,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// --- Contacts ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = contacts)]
pub struct Contact {
    pub id: i32,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contacts)]
pub struct NewContact {
    pub phone_number: String,
}

// --- Users <-> Contacts join ---

#[derive(Debug, Insertable)]
#[diesel(table_name = users_contacts)]
pub struct NewUserContact {
    pub user_id: i32,
    pub contact_id: i32,
}
