use anyhow::{Context, Result};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};

/// SQLite primary result codes that signal lock contention.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// A write transaction opened with `BEGIN IMMEDIATE`, so the write lock is taken
/// up front and the connection's busy timeout governs how long we wait for it.
///
/// Dropping it without `commit` or `rollback` discards the connection instead
/// of handing a half-open transaction back to the pool.
pub struct WriteTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTransaction {
    pub(crate) async fn begin(mut conn: PoolConnection<Sqlite>) -> Result<Self> {
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .context("Failed to begin write transaction")?;
        Ok(Self { conn: Some(conn) })
    }

    /// The connection the transaction runs on.
    pub fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .context("Write transaction already finished")
    }

    pub async fn commit(mut self) -> Result<()> {
        let mut conn = self.conn.take().context("Write transaction already finished")?;
        match sqlx::query("COMMIT").execute(&mut *conn).await {
            Ok(_) => Ok(()),
            Err(err) => {
                // Leave nothing pending on a pooled connection
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                drop(conn.detach());
                Err(err).context("Failed to commit write transaction")
            }
        }
    }

    pub async fn rollback(mut self) -> Result<()> {
        let mut conn = self.conn.take().context("Write transaction already finished")?;
        if let Err(err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            drop(conn.detach());
            return Err(err).context("Failed to roll back write transaction");
        }
        Ok(())
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            // Closing the connection makes SQLite roll the transaction back
            drop(conn.detach());
        }
    }
}

/// Whether an error is storage contention that is expected to clear on retry.
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::PoolTimedOut) => true,
        Some(sqlx::Error::Database(db_err)) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            // Extended codes (e.g. BUSY_SNAPSHOT = 517) carry the primary code in the low byte
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        _ => false,
    })
}

/// Whether an error originated in the storage layer at all.
pub fn is_storage_error(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<sqlx::Error>().is_some())
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        let err: Result<()> = Err(sqlx::Error::PoolTimedOut).context("Failed to acquire");
        let err = err.unwrap_err();
        assert!(is_transient(&err));
        assert!(is_storage_error(&err));
    }

    #[test]
    fn test_row_not_found_is_permanent() {
        let err = anyhow::Error::new(sqlx::Error::RowNotFound).context("Failed to fetch");
        assert!(!is_transient(&err));
        assert!(is_storage_error(&err));
    }

    #[test]
    fn test_non_storage_error() {
        let err = anyhow::anyhow!("serialization went wrong");
        assert!(!is_transient(&err));
        assert!(!is_storage_error(&err));
    }
}
