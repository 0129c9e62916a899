//! Token Store
//!
//! Persistent storage for the session triple (access token, refresh token,
//! authenticated-user record), keyed under fixed names. The triple is always
//! written and cleared in one transaction, so a reader never sees a mix of
//! two sessions.

use std::path::PathBuf;
use rusqlite::{Connection, params};
use tokio::sync::Mutex;

use super::model::{Session, SessionProfile};
use crate::error::{Error, Result};

pub const ACCESS_TOKEN_KEY: &str = "admin_access_token";
pub const REFRESH_TOKEN_KEY: &str = "admin_refresh_token";
pub const USER_KEY: &str = "admin_user";

/// Persistent session store backed by SQLite
pub struct TokenStore {
    /// Database connection
    conn: Mutex<Connection>,
}

impl TokenStore {
    /// Create or open the session database under `data_dir`
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;

        let db_path = data_dir.join("session.db");
        let conn = Connection::open(&db_path)?;
        Self::init(conn)
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session_state (
                key TEXT PRIMARY KEY,
                value_text TEXT NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Load the persisted session.
    ///
    /// A partial or unreadable triple is cleared and reported as no session.
    pub(crate) async fn load(&self) -> Result<Option<Session>> {
        let access = self.get(ACCESS_TOKEN_KEY).await?;
        let refresh = self.get(REFRESH_TOKEN_KEY).await?;
        let user = self.get(USER_KEY).await?;

        match (access, refresh, user) {
            (None, None, None) => Ok(None),
            (Some(access), Some(refresh), Some(user)) => {
                match serde_json::from_str::<SessionProfile>(&user) {
                    Ok(profile) => Ok(Some(Session::from_parts(access, refresh, profile))),
                    Err(e) => {
                        tracing::warn!("Discarding unreadable persisted user record: {}", e);
                        self.clear().await?;
                        Ok(None)
                    }
                }
            }
            _ => {
                tracing::warn!("Discarding incomplete persisted session");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Persist the whole session triple
    pub(crate) async fn save(&self, session: &Session) -> Result<()> {
        let profile = serde_json::to_string(&session.profile())?;

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for (key, value) in [
            (ACCESS_TOKEN_KEY, session.access_token.as_str()),
            (REFRESH_TOKEN_KEY, session.refresh_token.as_str()),
            (USER_KEY, profile.as_str()),
        ] {
            tx.execute(
                r#"
                INSERT INTO session_state (key, value_text) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value_text = ?2, updated_at = CURRENT_TIMESTAMP
                "#,
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove the session triple
    pub(crate) async fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM session_state WHERE key IN (?1, ?2, ?3)",
            params![ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY],
        )?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let result: std::result::Result<String, _> = conn.query_row(
            "SELECT value_text FROM session_state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Store(format!("Failed to read {}: {}", key, e))),
        }
    }

    #[cfg(test)]
    async fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO session_state (key, value_text) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Store(format!("SQLite error: {}", e))
    }
}
