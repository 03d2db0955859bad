/// Seed Data Module
///
/// Creates the example `user_data` table and loads sample rows. The table
/// is the schema used throughout the demos and tests: an opaque uuid
/// `user_id`, `name`, `email` and a numeric `age`. Consumers of the access
/// layer treat the record shape as schema-driven; nothing outside this
/// module depends on these columns.

use crate::config::ConnectInfo;
use crate::connection::ConnectionScope;
use crate::core::Result;
use crate::query::{execute, fetch_all, Query};
use crate::transaction::transactional;
use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

const CREATE_USER_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS user_data (
    user_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    age INTEGER NOT NULL
)";

/// One user to insert; the uuid `user_id` is generated at insert time.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSeed {
    pub name: String,
    pub email: String,
    pub age: i64,
}

impl UserSeed {
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: i64) -> Self {
        UserSeed {
            name: name.into(),
            email: email.into(),
            age,
        }
    }
}

/// The sample data set used by the demo binary and tests.
pub fn sample_users() -> Vec<UserSeed> {
    vec![
        UserSeed::new("Ada Lovelace", "ada@example.com", 35),
        UserSeed::new("Blake Carter", "blake@example.com", 28),
        UserSeed::new("Cleo Farouk", "cleo@example.com", 45),
        UserSeed::new("Dani Okafor", "dani@example.com", 22),
    ]
}

/// Creates the `user_data` table if it does not exist.
pub fn create_user_table(conn: &Connection) -> Result<()> {
    execute(conn, &Query::new(CREATE_USER_TABLE_SQL)).map(|_| ())
}

/// Inserts users that are not already present, keyed by email.
///
/// Returns the number of rows actually inserted.
pub fn insert_users(conn: &Connection, users: &[UserSeed]) -> Result<usize> {
    let mut inserted = 0;
    for user in users {
        let existing = fetch_all(
            conn,
            &Query::with_params(
                "SELECT COUNT(*) AS n FROM user_data WHERE email = ?",
                vec![Value::Text(user.email.clone())],
            ),
        )?;
        if existing[0].numeric("n")? > 0.0 {
            continue;
        }

        execute(
            conn,
            &Query::with_params(
                "INSERT INTO user_data (user_id, name, email, age) VALUES (?, ?, ?, ?)",
                vec![
                    Value::Text(Uuid::new_v4().to_string()),
                    Value::Text(user.name.clone()),
                    Value::Text(user.email.clone()),
                    Value::Integer(user.age),
                ],
            ),
        )?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Creates the table and inserts `users` in one transaction on a scoped
/// connection. Safe to call repeatedly; existing emails are skipped.
pub fn seed_database(info: &ConnectInfo, users: &[UserSeed]) -> Result<usize> {
    let scope = ConnectionScope::new(info.clone());
    let inserted = scope.run(|conn| {
        create_user_table(conn)?;
        transactional(conn, |tx| insert_users(tx, users))
    })?;
    debug!("Seeded {} users into {}", inserted, info.database);
    Ok(inserted)
}
