use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{
    self,
    models::{Message, MESSAGE_COLUMNS},
};

pub fn insert(
    conn: &Connection,
    sender_id: &str,
    receiver_id: &str,
    text: Option<String>,
    image: Option<String>,
) -> rusqlite::Result<Message> {
    let id = Uuid::now_v7().to_string();
    let now = db::timestamp();

    conn.execute(
        "INSERT INTO messages (id, sender_id, receiver_id, text, image, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, sender_id, receiver_id, text, image, now],
    )?;

    Ok(Message {
        id,
        sender_id: sender_id.to_string(),
        receiver_id: receiver_id.to_string(),
        text,
        image,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Every message exchanged between `a` and `b`, oldest first.
pub fn conversation(conn: &Connection, a: &str, b: &str) -> rusqlite::Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM messages
         WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)
         ORDER BY created_at ASC, id ASC",
        MESSAGE_COLUMNS
    ))?;
    let messages = stmt
        .query_map(params![a, b], Message::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::users::store::{insert as insert_user, NewUser};

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrations::migrations().to_latest(&mut conn).unwrap();
        conn
    }

    fn user_id(conn: &Connection, name: &str) -> String {
        insert_user(
            conn,
            NewUser {
                email: format!("{}@example.com", name),
                username: name.into(),
                full_name: String::new(),
                password_hash: "hash".into(),
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_conversation_is_both_directions_in_order() {
        let conn = test_conn();
        let alice = user_id(&conn, "alice");
        let bob = user_id(&conn, "bob");
        let carol = user_id(&conn, "carol");

        let first = insert(&conn, &alice, &bob, Some("hi".into()), None).unwrap();
        let second = insert(&conn, &bob, &alice, None, Some("data:image/png;base64,AA".into())).unwrap();
        insert(&conn, &alice, &carol, Some("elsewhere".into()), None).unwrap();

        let history = conversation(&conn, &bob, &alice).unwrap();
        assert_eq!(history, vec![first, second]);
        assert!(conversation(&conn, &bob, &carol).unwrap().is_empty());
    }
}
