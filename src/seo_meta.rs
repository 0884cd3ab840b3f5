use async_trait::async_trait;
use rusqlite::params;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::settings::SettingsView;
use crate::SqlWrapper;

pub const DEFAULT_ROBOTS: &str = "index, follow";

/// Meta overrides for one page: a page type ("main", "catalog",
/// "product", ...) and optionally the id of a concrete record of that
/// type.
#[derive(Debug, Clone, Serialize)]
pub struct SeoMeta {
    pub id: i64,
    pub page_type: String,
    pub page_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub robots: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewSeoMeta {
    pub page_type: String,
    pub page_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub robots: Option<String>,
}

/// What a page head actually renders after fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMeta {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub robots: String,
}

/// Resolution order per field: the page's own override, then the
/// site-wide default from settings, then the built-in fallback.
pub fn resolve(meta: Option<&SeoMeta>, settings: &SettingsView) -> ResolvedMeta {
    let field = |own: Option<&str>, key: &str, fallback: &str| {
        own.filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| settings.get_or(key, fallback).to_string())
    };
    ResolvedMeta {
        title: field(
            meta.and_then(|m| m.title.as_deref()),
            "site_name",
            "Автозапчасти Shop",
        ),
        description: field(
            meta.and_then(|m| m.description.as_deref()),
            "site_description",
            "",
        ),
        keywords: field(
            meta.and_then(|m| m.keywords.as_deref()),
            "site_keywords",
            "",
        ),
        robots: meta
            .map(|m| m.robots.clone())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ROBOTS.to_string()),
    }
}

#[async_trait]
pub trait SeoMetaRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<SeoMeta>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<SeoMeta>>;
    /// Exact row for (page_type, page_id), no fallback.
    async fn find(&self, page_type: &str, page_id: Option<i64>)
        -> anyhow::Result<Option<SeoMeta>>;
    /// Row for the concrete page, falling back to the type-generic row
    /// (page_id NULL) when there is none.
    async fn get_for_page(
        &self,
        page_type: &str,
        page_id: Option<i64>,
    ) -> anyhow::Result<Option<SeoMeta>>;
    async fn add(&self, item: NewSeoMeta) -> anyhow::Result<SeoMeta>;
    async fn update(&self, id: i64, item: NewSeoMeta) -> anyhow::Result<()>;
    async fn remove(&self, id: i64) -> anyhow::Result<()>;
}

pub struct SqliteSeoMetaRepository {
    conn: Connection,
}

fn read_meta(row: &rusqlite::Row) -> Result<SeoMeta, rusqlite::Error> {
    Ok(SeoMeta {
        id: row.get(0)?,
        page_type: row.get(1)?,
        page_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        keywords: row.get(5)?,
        robots: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const SELECT: &str = "SELECT id, page_type, page_id, title, description, keywords, robots, \
     created_at FROM seo_meta";

impl SqliteSeoMetaRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS seo_meta (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    page_type TEXT NOT NULL,
                    page_id INTEGER,
                    title TEXT,
                    description TEXT,
                    keywords TEXT,
                    robots TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    UNIQUE (page_type, page_id)
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
impl SeoMetaRepository for SqliteSeoMetaRepository {
    async fn list(&self) -> anyhow::Result<Vec<SeoMeta>> {
        let SqlWrapper(items) = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY page_type, page_id"))?;
                let items = stmt
                    .query_map([], read_meta)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(items))
            })
            .await?;
        Ok(items)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<SeoMeta>> {
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} WHERE id = ?1"))?;
                let item = stmt.query_map([id], read_meta)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn find(
        &self,
        page_type: &str,
        page_id: Option<i64>,
    ) -> anyhow::Result<Option<SeoMeta>> {
        let page_type = page_type.to_string();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT} WHERE page_type = ?1 AND page_id IS ?2"
                ))?;
                let item = stmt
                    .query_map(params![page_type, page_id], read_meta)?
                    .next()
                    .transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn get_for_page(
        &self,
        page_type: &str,
        page_id: Option<i64>,
    ) -> anyhow::Result<Option<SeoMeta>> {
        if page_id.is_some() {
            if let Some(meta) = self.find(page_type, page_id).await? {
                return Ok(Some(meta));
            }
        }
        self.find(page_type, None).await
    }

    async fn add(&self, item: NewSeoMeta) -> anyhow::Result<SeoMeta> {
        let created_at = crate::unix_now();
        let SqlWrapper(out) = self
            .conn
            .call(move |conn| {
                let robots = item.robots.unwrap_or_else(|| DEFAULT_ROBOTS.to_string());
                conn.execute(
                    "INSERT INTO seo_meta (page_type, page_id, title, description, keywords,
                        robots, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        item.page_type,
                        item.page_id,
                        item.title,
                        item.description,
                        item.keywords,
                        robots,
                        created_at,
                    ],
                )?;
                Ok(SqlWrapper(SeoMeta {
                    id: conn.last_insert_rowid(),
                    page_type: item.page_type,
                    page_id: item.page_id,
                    title: item.title,
                    description: item.description,
                    keywords: item.keywords,
                    robots,
                    created_at,
                }))
            })
            .await?;
        Ok(out)
    }

    async fn update(&self, id: i64, item: NewSeoMeta) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                let robots = item.robots.unwrap_or_else(|| DEFAULT_ROBOTS.to_string());
                conn.execute(
                    "UPDATE seo_meta SET page_type = ?1, page_id = ?2, title = ?3,
                        description = ?4, keywords = ?5, robots = ?6
                     WHERE id = ?7",
                    params![
                        item.page_type,
                        item.page_id,
                        item.title,
                        item.description,
                        item.keywords,
                        robots,
                        id,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, id: i64) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM seo_meta WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Setting;

    #[test]
    fn page_override_beats_site_default() {
        let settings = SettingsView::new(vec![Setting {
            key: "site_name".to_string(),
            value: "Автозапчасти онлайн".to_string(),
            description: None,
        }]);
        let meta = SeoMeta {
            id: 1,
            page_type: "catalog".to_string(),
            page_id: None,
            title: Some("Каталог запчастей".to_string()),
            description: None,
            keywords: Some("  ".to_string()),
            robots: DEFAULT_ROBOTS.to_string(),
            created_at: 0,
        };
        let resolved = resolve(Some(&meta), &settings);
        assert_eq!(resolved.title, "Каталог запчастей");
        // blank override falls through
        assert_eq!(resolved.keywords, "");
        assert_eq!(resolved.robots, "index, follow");
        assert_eq!(resolve(None, &settings).title, "Автозапчасти онлайн");
    }

    #[actix_rt::test]
    async fn specific_row_wins_over_type_generic() {
        let conn = Connection::open_in_memory().await.expect("database");
        let repo = SqliteSeoMetaRepository::init(conn).await.expect("table");
        let generic = NewSeoMeta {
            page_type: "product".to_string(),
            page_id: None,
            title: Some("Запчасть".to_string()),
            description: None,
            keywords: None,
            robots: None,
        };
        let specific = NewSeoMeta {
            page_id: Some(7),
            title: Some("Фильтр Bosch".to_string()),
            ..generic.clone()
        };
        repo.add(generic).await.expect("generic row");
        repo.add(specific).await.expect("specific row");

        let hit = repo.get_for_page("product", Some(7)).await.expect("lookup");
        assert_eq!(hit.and_then(|m| m.title), Some("Фильтр Bosch".to_string()));
        let fallback = repo.get_for_page("product", Some(8)).await.expect("lookup");
        assert_eq!(fallback.and_then(|m| m.title), Some("Запчасть".to_string()));
        assert!(repo
            .get_for_page("news", Some(7))
            .await
            .expect("lookup")
            .is_none());
    }
}
