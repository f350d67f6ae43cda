use diesel::prelude::*;
use std::fmt;

/// User model for reading from database.
///
/// Cart and order history live in their own tables and are loaded on demand
/// through the repository.
#[derive(Debug, Queryable, Selectable, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
}

/// NewUser model for inserting new records
#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

/// Identifies the user a cart or order route operates on.
///
/// Routes accept either the account email or the numeric user id in the same
/// path segment. A segment made only of ASCII digits is treated as an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserRef {
    Id(i32),
    Email(String),
}

impl UserRef {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = raw.parse::<i32>() {
                return UserRef::Id(id);
            }
        }
        UserRef::Email(raw.to_string())
    }

    /// Returns `true` when this reference points at `user`.
    pub fn matches(&self, user_id: i32, email: &str) -> bool {
        match self {
            UserRef::Id(id) => *id == user_id,
            UserRef::Email(e) => e == email,
        }
    }
}

impl From<&str> for UserRef {
    fn from(raw: &str) -> Self {
        UserRef::parse(raw)
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Id(id) => write!(f, "{}", id),
            UserRef::Email(email) => f.write_str(email),
        }
    }
}
