//! Database row types for all tables.
//! These correspond 1:1 to the SQLite schema defined in migrations.rs,
//! and serialize to the JSON shapes returned by the HTTP API.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Column list matching `User::from_row`.
pub const USER_COLUMNS: &str = "id, email, username, full_name, profile_pic, created_at, updated_at";

/// `USER_COLUMNS` qualified with a table alias, for joins.
pub fn user_columns_for(alias: &str) -> String {
    USER_COLUMNS
        .split(", ")
        .map(|col| format!("{}.{}", alias, col))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Public view of a row in the users table (the password hash is never loaded here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub profile_pic: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Build from a row selected with `USER_COLUMNS`, starting at column `offset`.
    pub fn from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            email: row.get(offset + 1)?,
            username: row.get(offset + 2)?,
            full_name: row.get(offset + 3)?,
            profile_pic: row.get(offset + 4)?,
            created_at: row.get(offset + 5)?,
            updated_at: row.get(offset + 6)?,
        })
    }

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Self::from_row_at(row, 0)
    }
}

/// Friend request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

/// Friend request with the sender populated, as listed to the receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: User,
    pub receiver: String,
    pub status: RequestStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Column list matching `Message::from_row`.
pub const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, text, image, created_at, updated_at";

/// Direct message record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Message {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sender_id: row.get(1)?,
            receiver_id: row.get(2)?,
            text: row.get(3)?,
            image: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}
