use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::params;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::SqlWrapper;

#[derive(Debug, Clone, Serialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Setting>>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    /// Upsert, keyed by name.
    async fn set(&self, key: &str, value: &str, description: Option<&str>) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Snapshot of all settings for a single request, with the site-wide
/// defaults every page falls back to.
#[derive(Debug, Clone, Default)]
pub struct SettingsView {
    values: HashMap<String, String>,
}

impl SettingsView {
    pub fn new(settings: Vec<Setting>) -> Self {
        Self {
            values: settings.into_iter().map(|s| (s.key, s.value)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).filter(|v| !v.is_empty()).unwrap_or(default)
    }
}

pub struct SqliteSettingsRepository {
    conn: Connection,
}

impl SqliteSettingsRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS setting (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    description TEXT
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
impl SettingsRepository for SqliteSettingsRepository {
    async fn list(&self) -> anyhow::Result<Vec<Setting>> {
        let SqlWrapper(items) = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT key, value, description FROM setting ORDER BY key")?;
                let items = stmt
                    .query_map([], |row| {
                        Ok(Setting {
                            key: row.get(0)?,
                            value: row.get(1)?,
                            description: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(items))
            })
            .await?;
        Ok(items)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let key = key.to_string();
        let SqlWrapper(value) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT value FROM setting WHERE key = ?1")?;
                let value = stmt
                    .query_map([key], |row| row.get(0))?
                    .next()
                    .transpose()?;
                Ok(SqlWrapper(value))
            })
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, description: Option<&str>) -> anyhow::Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        let description = description.map(str::to_string);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO setting (key, value, description) VALUES (?1, ?2, ?3)
                     ON CONFLICT (key) DO UPDATE SET
                        value = excluded.value,
                        description = coalesce(excluded.description, setting.description)",
                    params![key, value, description],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let key = key.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM setting WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_falls_back_on_missing_or_empty() {
        let view = SettingsView::new(vec![
            Setting {
                key: "site_name".to_string(),
                value: "Автозапчасти".to_string(),
                description: None,
            },
            Setting {
                key: "site_phone".to_string(),
                value: String::new(),
                description: None,
            },
        ]);
        assert_eq!(view.get_or("site_name", "Магазин"), "Автозапчасти");
        assert_eq!(view.get_or("site_phone", "-"), "-");
        assert_eq!(view.get_or("site_email", "-"), "-");
    }
}
