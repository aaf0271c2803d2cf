//! Queries on the users table. All functions take a locked connection and are
//! meant to run inside `db::with_conn`.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{
    self,
    models::{User, USER_COLUMNS},
};
use crate::error::{ApiError, ApiResult};

/// Fields accepted when creating an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password_hash: String,
}

/// Profile columns that can be edited after signup.
#[derive(Debug, Clone, Copy)]
pub enum ProfileField {
    ProfilePic,
    Username,
    FullName,
}

impl ProfileField {
    fn column(self) -> &'static str {
        match self {
            Self::ProfilePic => "profile_pic",
            Self::Username => "username",
            Self::FullName => "full_name",
        }
    }
}

pub fn find_by_id(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![user_id],
        User::from_row,
    )
    .optional()
}

/// Load a user or fail with 404 "User not found".
pub fn require(conn: &Connection, user_id: &str) -> ApiResult<User> {
    find_by_id(conn, user_id)?.ok_or_else(|| ApiError::not_found("User not found"))
}

/// User and stored password hash for a login attempt.
pub fn find_credentials(conn: &Connection, email: &str) -> rusqlite::Result<Option<(User, String)>> {
    conn.query_row(
        &format!(
            "SELECT {}, password_hash FROM users WHERE email = ?1",
            USER_COLUMNS
        ),
        params![email],
        |row| Ok((User::from_row(row)?, row.get(7)?)),
    )
    .optional()
}

pub fn email_exists(conn: &Connection, email: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        params![email],
        |row| row.get(0),
    )
}

/// Whether `username` (case-insensitive) belongs to someone other than `except_user`.
pub fn username_taken(
    conn: &Connection,
    username: &str,
    except_user: Option<&str>,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 COLLATE NOCASE AND id != ?2)",
        params![username, except_user.unwrap_or("")],
        |row| row.get(0),
    )
}

/// Fail with the signup error for an email or username that is already in use.
pub fn ensure_available(conn: &Connection, email: &str, username: &str) -> ApiResult<()> {
    if email_exists(conn, email)? {
        return Err(ApiError::bad_request("Email already exists"));
    }
    if username_taken(conn, username, None)? {
        return Err(ApiError::bad_request("Username already taken"));
    }
    Ok(())
}

pub fn insert(conn: &Connection, new_user: NewUser) -> rusqlite::Result<User> {
    let id = Uuid::now_v7().to_string();
    let now = db::timestamp();

    conn.execute(
        "INSERT INTO users (id, email, username, full_name, password_hash, profile_pic, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, '', ?6, ?6)",
        params![
            id,
            new_user.email,
            new_user.username,
            new_user.full_name,
            new_user.password_hash,
            now
        ],
    )?;

    Ok(User {
        id,
        email: new_user.email,
        username: new_user.username,
        full_name: new_user.full_name,
        profile_pic: String::new(),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Set one profile column and return the updated user.
pub fn update_field(
    conn: &Connection,
    user_id: &str,
    field: ProfileField,
    value: &str,
) -> ApiResult<User> {
    let now = db::timestamp();
    let changed = conn.execute(
        &format!(
            "UPDATE users SET {} = ?1, updated_at = ?2 WHERE id = ?3",
            field.column()
        ),
        params![value, now, user_id],
    )?;
    if changed == 0 {
        return Err(ApiError::not_found("User not found"));
    }
    require(conn, user_id)
}
