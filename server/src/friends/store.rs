use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{
    self,
    models::{user_columns_for, FriendRequest, RequestStatus, User},
};

/// Maximum number of users returned by a search.
pub const SEARCH_LIMIT: i64 = 10;

/// The other party of every friendship involving `user_id`, ordered by username.
pub fn friends_of(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}
         FROM friendships f
         JOIN users u ON u.id = CASE WHEN f.user1_id = ?1 THEN f.user2_id ELSE f.user1_id END
         WHERE f.user1_id = ?1 OR f.user2_id = ?1
         ORDER BY u.username",
        user_columns_for("u")
    ))?;
    let friends = stmt
        .query_map(params![user_id], User::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(friends)
}

pub fn are_friends(conn: &Connection, a: &str, b: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM friendships
                       WHERE (user1_id = ?1 AND user2_id = ?2) OR (user1_id = ?2 AND user2_id = ?1))",
        params![a, b],
        |row| row.get(0),
    )
}

/// Whether any request, whatever its status, exists between `a` and `b` in either direction.
pub fn request_exists_between(conn: &Connection, a: &str, b: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM friend_requests
                       WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1))",
        params![a, b],
        |row| row.get(0),
    )
}

pub fn insert_request(conn: &Connection, sender_id: &str, receiver_id: &str) -> rusqlite::Result<String> {
    let id = Uuid::now_v7().to_string();
    let now = db::timestamp();
    conn.execute(
        "INSERT INTO friend_requests (id, sender_id, receiver_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'pending', ?4, ?4)",
        params![id, sender_id, receiver_id, now],
    )?;
    Ok(id)
}

/// Pending requests addressed to `receiver_id`, newest first, with the sender populated.
pub fn pending_for(conn: &Connection, receiver_id: &str) -> rusqlite::Result<Vec<FriendRequest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT r.id, r.receiver_id, r.status, r.created_at, r.updated_at, {}
         FROM friend_requests r
         JOIN users u ON u.id = r.sender_id
         WHERE r.receiver_id = ?1 AND r.status = 'pending'
         ORDER BY r.created_at DESC, r.id DESC",
        user_columns_for("u")
    ))?;
    let requests = stmt
        .query_map(params![receiver_id], |row| {
            let status: String = row.get(2)?;
            Ok(FriendRequest {
                id: row.get(0)?,
                receiver: row.get(1)?,
                status: RequestStatus::parse(&status).unwrap_or(RequestStatus::Pending),
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
                sender: User::from_row_at(row, 5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(requests)
}

/// Sender of the pending request `request_id` addressed to `receiver_id`, if any.
pub fn find_pending_sender(
    conn: &Connection,
    request_id: &str,
    receiver_id: &str,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT sender_id FROM friend_requests
         WHERE id = ?1 AND receiver_id = ?2 AND status = 'pending'",
        params![request_id, receiver_id],
        |row| row.get(0),
    )
    .optional()
}

/// Close a pending request. Accepting also records the friendship, atomically.
pub fn resolve_request(
    conn: &mut Connection,
    request_id: &str,
    sender_id: &str,
    receiver_id: &str,
    status: RequestStatus,
) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    let now = db::timestamp();

    tx.execute(
        "UPDATE friend_requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, request_id],
    )?;

    if status == RequestStatus::Accepted {
        tx.execute(
            "INSERT OR IGNORE INTO friendships (id, user1_id, user2_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![Uuid::now_v7().to_string(), sender_id, receiver_id, now],
        )?;
    }

    tx.commit()
}

/// Case-insensitive substring search on username or email, excluding `exclude_id`.
/// The query is matched literally; LIKE wildcards in it are escaped.
pub fn search_users(conn: &Connection, query: &str, exclude_id: &str) -> rusqlite::Result<Vec<User>> {
    let pattern = format!("%{}%", escape_like(query));
    let mut stmt = conn.prepare(&format!(
        "SELECT {}
         FROM users u
         WHERE u.id != ?1
           AND (u.username LIKE ?2 ESCAPE '\\' OR u.email LIKE ?2 ESCAPE '\\')
         ORDER BY u.username
         LIMIT ?3",
        user_columns_for("u")
    ))?;
    let users = stmt
        .query_map(params![exclude_id, pattern, SEARCH_LIMIT], User::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
