use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};
use serde_json::Value;

use super::{CollectionKey, Store};
use crate::errors::{storage_context, with_storage_context};

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Collections kept as ordered JSON rows in a SQLite file
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn open(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        let pool = create_pool(database_path)?;
        let mut conn = get_connection(&pool)?;
        apply_schema(&mut conn)?;
        Ok(Self { pool })
    }
}

impl Store for SqliteStore {
    fn load(&self, key: CollectionKey) -> Result<Option<Vec<Value>>> {
        let conn = get_connection(&self.pool)?;

        let saved: Option<i64> = with_storage_context(
            conn.query_row(
                "SELECT record_count FROM collections WHERE name = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional(),
            "read",
            key.as_str(),
        )?;
        if saved.is_none() {
            return Ok(None);
        }

        let mut stmt = conn.prepare("SELECT body FROM records WHERE collection = ?1 ORDER BY position")?;
        let bodies = stmt
            .query_map(params![key.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| storage_context("read", key.as_str()))?;

        let records = bodies
            .iter()
            .map(|body| serde_json::from_str(body))
            .collect::<serde_json::Result<Vec<Value>>>()
            .with_context(|| format!("Failed to parse stored {} record", key))?;

        info!("Loaded {} {} from database", records.len(), key);
        Ok(Some(records))
    }

    fn save(&mut self, key: CollectionKey, records: &[Value]) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        tx.execute("DELETE FROM records WHERE collection = ?1", params![key.as_str()])
            .with_context(|| storage_context("write", key.as_str()))?;
        tx.execute(
            "INSERT OR REPLACE INTO collections (name, record_count, saved_at) VALUES (?1, ?2, ?3)",
            params![key.as_str(), records.len() as i64, Utc::now()],
        )
        .with_context(|| storage_context("write", key.as_str()))?;

        {
            let mut stmt = tx.prepare("INSERT INTO records (collection, position, body) VALUES (?1, ?2, ?3)")?;
            for (position, record) in records.iter().enumerate() {
                let body = serde_json::to_string(record).context("Failed to serialize record")?;
                stmt.execute(params![key.as_str(), position as i64, body])
                    .with_context(|| format!("Failed to insert {} record {}", key, position))?;
            }
        }

        tx.commit().context("Failed to commit transaction")?;
        info!("Saved {} {} to database", records.len(), key);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let conn = get_connection(&self.pool)?;
        conn.execute("DELETE FROM records", []).context("Failed to clear records")?;
        conn.execute("DELETE FROM collections", []).context("Failed to clear collections")?;

        info!("Database cleared");
        Ok(())
    }
}

pub fn create_pool(database_path: &Path) -> Result<DbPool> {
    let manager = build_manager(database_path);
    build_pool(manager)
}

fn build_manager(path: &Path) -> SqliteConnectionManager {
    SqliteConnectionManager::file(path)
}

fn build_pool(manager: SqliteConnectionManager) -> Result<DbPool> {
    r2d2::Pool::builder()
        .build(manager)
        .context("Failed to create database connection pool")
}

pub fn get_connection(pool: &DbPool) -> Result<DbConn> {
    pool.get().context("Failed to get database connection from pool")
}

fn apply_schema(conn: &mut DbConn) -> Result<()> {
    let schema_sql = include_str!("schema.sql");
    let statements = split_sql_statements(schema_sql);

    for (idx, statement) in statements.iter().enumerate() {
        execute_sql(conn, statement).with_context(|| format!("Failed to execute statement {}", idx + 1))?;
    }

    log::debug!("Database schema ready");
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn execute_sql(conn: &mut DbConn, sql: &str) -> Result<()> {
    conn.execute(sql, [])
        .context("Failed to execute SQL statement")
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_sql_statements_drops_empty_parts() {
        let statements = split_sql_statements("CREATE TABLE a (x INT);\n\n;CREATE TABLE b (y INT);");
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_collections_keep_record_order() {
        let dir = std::env::temp_dir().join(format!("pingpong_sqlite_store_{}", std::process::id()));
        let mut store = SqliteStore::open(&dir.join("club.db")).unwrap();

        assert!(store.load(CollectionKey::Matches).unwrap().is_none());

        let records = vec![json!({"id": "b"}), json!({"id": "a"}), json!({"id": "c"})];
        store.save(CollectionKey::Matches, &records).unwrap();
        store.save(CollectionKey::Matches, &records[..2]).unwrap();

        let loaded = store.load(CollectionKey::Matches).unwrap().unwrap();
        assert_eq!(loaded, records[..2].to_vec());

        store.save(CollectionKey::Teams, &[]).unwrap();
        assert_eq!(store.load(CollectionKey::Teams).unwrap(), Some(vec![]));

        store.clear().unwrap();
        assert!(store.load(CollectionKey::Matches).unwrap().is_none());
        fs::remove_dir_all(&dir).unwrap();
    }
}
