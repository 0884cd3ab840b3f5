use async_trait::async_trait;
use rusqlite::params;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::SqlWrapper;

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<i64>,
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Category>>;
    /// Top-level categories only, id order.
    async fn roots(&self) -> anyhow::Result<Vec<Category>>;
    async fn children(&self, parent_id: i64) -> anyhow::Result<Vec<Category>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<Category>>;
    async fn get_by_slug(&self, slug: &str) -> anyhow::Result<Option<Category>>;
    async fn list_slugs(&self) -> anyhow::Result<Vec<String>>;
    async fn add(&self, item: NewCategory, slug: String) -> anyhow::Result<Category>;
    async fn update(&self, id: i64, item: NewCategory, slug: String) -> anyhow::Result<()>;
    async fn remove(&self, id: i64) -> anyhow::Result<()>;
    async fn count_children(&self, id: i64) -> anyhow::Result<usize>;
}

pub struct SqliteCategoryRepository {
    conn: Connection,
}

fn read_category(row: &rusqlite::Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        parent_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const SELECT: &str = "SELECT id, name, slug, parent_id, created_at FROM category";

impl SqliteCategoryRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS category (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    parent_id INTEGER,
                    created_at INTEGER NOT NULL
                )",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    async fn select(&self, where_sql: &'static str, param: Option<i64>) -> anyhow::Result<Vec<Category>> {
        let SqlWrapper(items) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} {where_sql} ORDER BY id"))?;
                let items = match param {
                    Some(p) => stmt
                        .query_map([p], read_category)?
                        .collect::<Result<Vec<_>, _>>()?,
                    None => stmt
                        .query_map([], read_category)?
                        .collect::<Result<Vec<_>, _>>()?,
                };
                Ok(SqlWrapper(items))
            })
            .await?;
        Ok(items)
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn list(&self) -> anyhow::Result<Vec<Category>> {
        self.select("", None).await
    }

    async fn roots(&self) -> anyhow::Result<Vec<Category>> {
        self.select("WHERE parent_id IS NULL", None).await
    }

    async fn children(&self, parent_id: i64) -> anyhow::Result<Vec<Category>> {
        self.select("WHERE parent_id = ?1", Some(parent_id)).await
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Category>> {
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} WHERE id = ?1"))?;
                let item = stmt.query_map([id], read_category)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn get_by_slug(&self, slug: &str) -> anyhow::Result<Option<Category>> {
        let slug = slug.to_string();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} WHERE slug = ?1"))?;
                let item = stmt.query_map([slug], read_category)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn list_slugs(&self) -> anyhow::Result<Vec<String>> {
        let SqlWrapper(slugs) = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT slug FROM category")?;
                let slugs = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(slugs))
            })
            .await?;
        Ok(slugs)
    }

    async fn add(&self, item: NewCategory, slug: String) -> anyhow::Result<Category> {
        let created_at = crate::unix_now();
        let SqlWrapper(out) = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO category (name, slug, parent_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![item.name, slug, item.parent_id, created_at],
                )?;
                Ok(SqlWrapper(Category {
                    id: conn.last_insert_rowid(),
                    name: item.name,
                    slug,
                    parent_id: item.parent_id,
                    created_at,
                }))
            })
            .await?;
        Ok(out)
    }

    async fn update(&self, id: i64, item: NewCategory, slug: String) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE category SET name = ?1, slug = ?2, parent_id = ?3 WHERE id = ?4",
                    params![item.name, slug, item.parent_id, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, id: i64) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM category WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn count_children(&self, id: i64) -> anyhow::Result<usize> {
        let SqlWrapper(count) = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM category WHERE parent_id = ?1",
                    [id],
                    |row| row.get(0),
                )?;
                Ok(SqlWrapper(count))
            })
            .await?;
        Ok(count.max(0) as usize)
    }
}
