use async_trait::async_trait;
use rusqlite::params;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::SqlWrapper;

#[derive(Debug, Clone, Serialize)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

#[async_trait]
pub trait CountryRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Country>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<Country>>;
    async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Country>>;
    async fn add(&self, name: String) -> anyhow::Result<Country>;
    async fn update(&self, id: i64, name: String) -> anyhow::Result<()>;
    async fn remove(&self, id: i64) -> anyhow::Result<()>;
}

pub struct SqliteCountryRepository {
    conn: Connection,
}

fn read_country(row: &rusqlite::Row) -> Result<Country, rusqlite::Error> {
    Ok(Country {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

const SELECT: &str = "SELECT id, name, created_at FROM country";

impl SqliteCountryRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS country (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    created_at INTEGER NOT NULL
                )",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CountryRepository for SqliteCountryRepository {
    async fn list(&self) -> anyhow::Result<Vec<Country>> {
        let SqlWrapper(items) = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY name"))?;
                let items = stmt
                    .query_map([], read_country)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(items))
            })
            .await?;
        Ok(items)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Country>> {
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} WHERE id = ?1"))?;
                let item = stmt.query_map([id], read_country)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Country>> {
        let name = name.to_string();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} WHERE name = ?1"))?;
                let item = stmt.query_map([name], read_country)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn add(&self, name: String) -> anyhow::Result<Country> {
        let created_at = crate::unix_now();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO country (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(SqlWrapper(Country {
                    id: conn.last_insert_rowid(),
                    name,
                    created_at,
                }))
            })
            .await?;
        Ok(item)
    }

    async fn update(&self, id: i64, name: String) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE country SET name = ?1 WHERE id = ?2",
                    params![name, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, id: i64) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM country WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
