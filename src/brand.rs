use async_trait::async_trait;
use rusqlite::params;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::SqlWrapper;

#[derive(Debug, Clone, Serialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: i64,
}

#[async_trait]
pub trait BrandRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Brand>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<Brand>>;
    async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Brand>>;
    async fn list_slugs(&self) -> anyhow::Result<Vec<String>>;
    async fn add(&self, name: String, slug: String) -> anyhow::Result<Brand>;
    async fn update(&self, id: i64, name: String, slug: String) -> anyhow::Result<()>;
    async fn remove(&self, id: i64) -> anyhow::Result<()>;
}

pub struct SqliteBrandRepository {
    conn: Connection,
}

fn read_brand(row: &rusqlite::Row) -> Result<Brand, rusqlite::Error> {
    Ok(Brand {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        created_at: row.get(3)?,
    })
}

const SELECT: &str = "SELECT id, name, slug, created_at FROM brand";

impl SqliteBrandRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS brand (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    slug TEXT NOT NULL UNIQUE,
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
impl BrandRepository for SqliteBrandRepository {
    async fn list(&self) -> anyhow::Result<Vec<Brand>> {
        let SqlWrapper(items) = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY name"))?;
                let items = stmt
                    .query_map([], read_brand)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(items))
            })
            .await?;
        Ok(items)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Brand>> {
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} WHERE id = ?1"))?;
                let item = stmt.query_map([id], read_brand)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Brand>> {
        let name = name.to_string();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} WHERE name = ?1"))?;
                let item = stmt.query_map([name], read_brand)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn list_slugs(&self) -> anyhow::Result<Vec<String>> {
        let SqlWrapper(slugs) = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT slug FROM brand")?;
                let slugs = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(slugs))
            })
            .await?;
        Ok(slugs)
    }

    async fn add(&self, name: String, slug: String) -> anyhow::Result<Brand> {
        let created_at = crate::unix_now();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO brand (name, slug, created_at) VALUES (?1, ?2, ?3)",
                    params![name, slug, created_at],
                )?;
                Ok(SqlWrapper(Brand {
                    id: conn.last_insert_rowid(),
                    name,
                    slug,
                    created_at,
                }))
            })
            .await?;
        Ok(item)
    }

    async fn update(&self, id: i64, name: String, slug: String) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE brand SET name = ?1, slug = ?2 WHERE id = ?3",
                    params![name, slug, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, id: i64) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM brand WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
