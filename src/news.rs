use async_trait::async_trait;
use rusqlite::params;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::SqlWrapper;

#[derive(Debug, Clone, Serialize)]
pub struct NewsPost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub image_url: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewNewsPost {
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
}

#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Newest first.
    async fn list(&self) -> anyhow::Result<Vec<NewsPost>>;
    async fn latest(&self, limit: usize) -> anyhow::Result<Vec<NewsPost>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<NewsPost>>;
    async fn list_slugs(&self) -> anyhow::Result<Vec<String>>;
    async fn add(&self, item: NewNewsPost, slug: String) -> anyhow::Result<NewsPost>;
    async fn update(&self, id: i64, item: NewNewsPost, slug: String) -> anyhow::Result<()>;
    async fn remove(&self, id: i64) -> anyhow::Result<()>;
}

pub struct SqliteNewsRepository {
    conn: Connection,
}

fn read_post(row: &rusqlite::Row) -> Result<NewsPost, rusqlite::Error> {
    Ok(NewsPost {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        body: row.get(3)?,
        image_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const SELECT: &str = "SELECT id, title, slug, body, image_url, created_at FROM news";

impl SqliteNewsRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS news (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    body TEXT NOT NULL,
                    image_url TEXT,
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
impl NewsRepository for SqliteNewsRepository {
    async fn list(&self) -> anyhow::Result<Vec<NewsPost>> {
        let SqlWrapper(items) = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare(&format!("{SELECT} ORDER BY created_at DESC, id DESC"))?;
                let items = stmt
                    .query_map([], read_post)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(items))
            })
            .await?;
        Ok(items)
    }

    async fn latest(&self, limit: usize) -> anyhow::Result<Vec<NewsPost>> {
        let SqlWrapper(items) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT} ORDER BY created_at DESC, id DESC LIMIT ?1"
                ))?;
                let items = stmt
                    .query_map([limit as i64], read_post)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(items))
            })
            .await?;
        Ok(items)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<NewsPost>> {
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} WHERE id = ?1"))?;
                let item = stmt.query_map([id], read_post)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn list_slugs(&self) -> anyhow::Result<Vec<String>> {
        let SqlWrapper(slugs) = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT slug FROM news")?;
                let slugs = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(slugs))
            })
            .await?;
        Ok(slugs)
    }

    async fn add(&self, item: NewNewsPost, slug: String) -> anyhow::Result<NewsPost> {
        let created_at = crate::unix_now();
        let SqlWrapper(out) = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO news (title, slug, body, image_url, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![item.title, slug, item.body, item.image_url, created_at],
                )?;
                Ok(SqlWrapper(NewsPost {
                    id: conn.last_insert_rowid(),
                    title: item.title,
                    slug,
                    body: item.body,
                    image_url: item.image_url,
                    created_at,
                }))
            })
            .await?;
        Ok(out)
    }

    async fn update(&self, id: i64, item: NewNewsPost, slug: String) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE news SET title = ?1, slug = ?2, body = ?3, image_url = ?4 WHERE id = ?5",
                    params![item.title, slug, item.body, item.image_url, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, id: i64) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM news WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
