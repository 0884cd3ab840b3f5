use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use rusqlite::params;
use rusqlite::types::Type;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::SqlWrapper;

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub article: String,
    pub short_desc: Option<String>,
    pub full_desc: Option<String>,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    pub created_at: i64,
    pub brand_id: i64,
    pub country_id: i64,
}

impl Product {
    /// Thumbnail path derived from the main image: `_thumb` is spliced
    /// in before the file extension. Falls through to the original
    /// image when there is no extension to splice around.
    pub fn thumbnail_url(&self) -> Option<String> {
        let image_url = self.image_url.as_deref()?;
        let (dir, filename) = match image_url.rsplit_once('/') {
            Some((dir, filename)) => (Some(dir), filename),
            None => (None, image_url),
        };
        let thumb = match filename.rsplit_once('.') {
            Some((stem, ext)) => format!("{stem}_thumb.{ext}"),
            None => return Some(image_url.to_string()),
        };
        Some(match dir {
            Some(dir) => format!("{dir}/{thumb}"),
            None => thumb,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}

/// Read model the search and filter paths operate over: a product with
/// its brand, country and category names already joined in.
#[derive(Debug, Clone, Serialize)]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: Product,
    pub brand_name: String,
    pub country_name: String,
    pub categories: Vec<CategoryRef>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub article: String,
    pub short_desc: Option<String>,
    pub full_desc: Option<String>,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    pub brand_id: i64,
    pub country_id: i64,
    pub category_ids: Vec<i64>,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Full catalog snapshot in store (insertion) order.
    async fn list_cards(&self) -> anyhow::Result<Vec<ProductCard>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<Product>>;
    async fn get_card(&self, id: i64) -> anyhow::Result<Option<ProductCard>>;
    async fn get_by_slug(&self, slug: &str) -> anyhow::Result<Option<Product>>;
    async fn get_by_article(&self, article: &str) -> anyhow::Result<Option<Product>>;
    async fn latest(&self, limit: usize) -> anyhow::Result<Vec<Product>>;
    async fn list_slugs(&self) -> anyhow::Result<Vec<String>>;
    async fn add(&self, item: NewProduct, slug: String) -> anyhow::Result<Product>;
    async fn update(&self, id: i64, item: NewProduct, slug: String) -> anyhow::Result<()>;
    async fn remove(&self, id: i64) -> anyhow::Result<()>;
    async fn count(&self) -> anyhow::Result<usize>;
    async fn count_by_brand(&self, brand_id: i64) -> anyhow::Result<usize>;
    async fn count_by_country(&self, country_id: i64) -> anyhow::Result<usize>;
    async fn count_by_category(&self, category_id: i64) -> anyhow::Result<usize>;
}

pub struct SqliteProductRepository {
    conn: Connection,
}

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.article, p.short_desc, p.full_desc, \
     p.image_url, p.price, p.stock, p.created_at, p.brand_id, p.country_id";

fn read_price(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into()))
}

fn read_product(row: &rusqlite::Row) -> Result<Product, rusqlite::Error> {
    let stock: i64 = row.get(8)?;
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        article: row.get(3)?,
        short_desc: row.get(4)?,
        full_desc: row.get(5)?,
        image_url: row.get(6)?,
        price: read_price(row, 7)?,
        stock: stock.max(0) as u32,
        created_at: row.get(9)?,
        brand_id: row.get(10)?,
        country_id: row.get(11)?,
    })
}

fn category_refs(
    conn: &rusqlite::Connection,
) -> Result<HashMap<i64, Vec<CategoryRef>>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT pc.product_id, c.id, c.name FROM product_category pc
         JOIN category c ON c.id = pc.category_id ORDER BY pc.product_id, c.id",
    )?;
    let mut map: HashMap<i64, Vec<CategoryRef>> = HashMap::new();
    let rows = stmt.query_map([], |row| {
        let product_id: i64 = row.get(0)?;
        Ok((
            product_id,
            CategoryRef {
                id: row.get(1)?,
                name: row.get(2)?,
            },
        ))
    })?;
    for row in rows {
        let (product_id, category) = row?;
        map.entry(product_id).or_default().push(category);
    }
    Ok(map)
}

impl SqliteProductRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS product (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    article TEXT NOT NULL UNIQUE,
                    short_desc TEXT,
                    full_desc TEXT,
                    image_url TEXT,
                    price TEXT NOT NULL,
                    stock INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL,
                    brand_id INTEGER NOT NULL,
                    country_id INTEGER NOT NULL
                )",
                [],
            )?;
            conn.execute(
                "CREATE TABLE IF NOT EXISTS product_category (
                    product_id INTEGER NOT NULL,
                    category_id INTEGER NOT NULL,
                    PRIMARY KEY (product_id, category_id)
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
impl ProductRepository for SqliteProductRepository {
    async fn list_cards(&self) -> anyhow::Result<Vec<ProductCard>> {
        let SqlWrapper(cards) = self
            .conn
            .call(move |conn| {
                let mut categories = category_refs(conn)?;
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PRODUCT_COLUMNS}, b.name, co.name FROM product p
                     JOIN brand b ON b.id = p.brand_id
                     JOIN country co ON co.id = p.country_id
                     ORDER BY p.id",
                ))?;
                let cards = stmt
                    .query_map([], |row| {
                        let product = read_product(row)?;
                        let id = product.id;
                        Ok(ProductCard {
                            product,
                            brand_name: row.get(12)?,
                            country_name: row.get(13)?,
                            categories: categories.remove(&id).unwrap_or_default(),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(cards))
            })
            .await?;
        Ok(cards)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Product>> {
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.id = ?1"
                ))?;
                let item = stmt.query_map([id], read_product)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn get_card(&self, id: i64) -> anyhow::Result<Option<ProductCard>> {
        let SqlWrapper(card) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PRODUCT_COLUMNS}, b.name, co.name FROM product p
                     JOIN brand b ON b.id = p.brand_id
                     JOIN country co ON co.id = p.country_id
                     WHERE p.id = ?1",
                ))?;
                let card = stmt
                    .query_map([id], |row| {
                        let product = read_product(row)?;
                        Ok(ProductCard {
                            product,
                            brand_name: row.get(12)?,
                            country_name: row.get(13)?,
                            categories: vec![],
                        })
                    })?
                    .next()
                    .transpose()?;
                let Some(mut card) = card else {
                    return Ok(SqlWrapper(None));
                };
                let mut stmt = conn.prepare(
                    "SELECT c.id, c.name FROM product_category pc
                     JOIN category c ON c.id = pc.category_id
                     WHERE pc.product_id = ?1 ORDER BY c.id",
                )?;
                card.categories = stmt
                    .query_map([id], |row| {
                        Ok(CategoryRef {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(Some(card)))
            })
            .await?;
        Ok(card)
    }

    async fn get_by_slug(&self, slug: &str) -> anyhow::Result<Option<Product>> {
        let slug = slug.to_string();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.slug = ?1"
                ))?;
                let item = stmt.query_map([slug], read_product)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn get_by_article(&self, article: &str) -> anyhow::Result<Option<Product>> {
        let article = article.to_string();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.article = ?1"
                ))?;
                let item = stmt.query_map([article], read_product)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn latest(&self, limit: usize) -> anyhow::Result<Vec<Product>> {
        let SqlWrapper(items) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM product p
                     ORDER BY p.created_at DESC, p.id DESC LIMIT ?1"
                ))?;
                let items = stmt
                    .query_map([limit as i64], read_product)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(items))
            })
            .await?;
        Ok(items)
    }

    async fn list_slugs(&self) -> anyhow::Result<Vec<String>> {
        let SqlWrapper(slugs) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT slug FROM product")?;
                let slugs = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(slugs))
            })
            .await?;
        Ok(slugs)
    }

    async fn add(&self, item: NewProduct, slug: String) -> anyhow::Result<Product> {
        let created_at = crate::unix_now();
        let SqlWrapper(out) = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO product (
                        name, slug, article, short_desc, full_desc, image_url,
                        price, stock, created_at, brand_id, country_id
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        item.name,
                        slug,
                        item.article,
                        item.short_desc,
                        item.full_desc,
                        item.image_url,
                        item.price.to_string(),
                        item.stock as i64,
                        created_at,
                        item.brand_id,
                        item.country_id,
                    ],
                )?;
                let id = conn.last_insert_rowid();
                for category_id in &item.category_ids {
                    conn.execute(
                        "INSERT OR IGNORE INTO product_category (product_id, category_id)
                         VALUES (?1, ?2)",
                        params![id, category_id],
                    )?;
                }
                Ok(SqlWrapper(Product {
                    id,
                    name: item.name,
                    slug,
                    article: item.article,
                    short_desc: item.short_desc,
                    full_desc: item.full_desc,
                    image_url: item.image_url,
                    price: item.price,
                    stock: item.stock,
                    created_at,
                    brand_id: item.brand_id,
                    country_id: item.country_id,
                }))
            })
            .await?;
        Ok(out)
    }

    async fn update(&self, id: i64, item: NewProduct, slug: String) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE product SET name = ?1, slug = ?2, article = ?3, short_desc = ?4,
                        full_desc = ?5, image_url = ?6, price = ?7, stock = ?8,
                        brand_id = ?9, country_id = ?10
                     WHERE id = ?11",
                    params![
                        item.name,
                        slug,
                        item.article,
                        item.short_desc,
                        item.full_desc,
                        item.image_url,
                        item.price.to_string(),
                        item.stock as i64,
                        item.brand_id,
                        item.country_id,
                        id,
                    ],
                )?;
                conn.execute(
                    "DELETE FROM product_category WHERE product_id = ?1",
                    params![id],
                )?;
                for category_id in &item.category_ids {
                    conn.execute(
                        "INSERT OR IGNORE INTO product_category (product_id, category_id)
                         VALUES (?1, ?2)",
                        params![id, category_id],
                    )?;
                }
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, id: i64) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM product WHERE id = ?1", params![id])?;
                conn.execute(
                    "DELETE FROM product_category WHERE product_id = ?1",
                    params![id],
                )?;
                conn.execute("DELETE FROM cart_item WHERE product_id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn count(&self) -> anyhow::Result<usize> {
        count_where(&self.conn, "SELECT COUNT(*) FROM product", None).await
    }

    async fn count_by_brand(&self, brand_id: i64) -> anyhow::Result<usize> {
        count_where(
            &self.conn,
            "SELECT COUNT(*) FROM product WHERE brand_id = ?1",
            Some(brand_id),
        )
        .await
    }

    async fn count_by_country(&self, country_id: i64) -> anyhow::Result<usize> {
        count_where(
            &self.conn,
            "SELECT COUNT(*) FROM product WHERE country_id = ?1",
            Some(country_id),
        )
        .await
    }

    async fn count_by_category(&self, category_id: i64) -> anyhow::Result<usize> {
        count_where(
            &self.conn,
            "SELECT COUNT(*) FROM product_category WHERE category_id = ?1",
            Some(category_id),
        )
        .await
    }
}

async fn count_where(
    conn: &Connection,
    sql: &'static str,
    param: Option<i64>,
) -> anyhow::Result<usize> {
    let SqlWrapper(count) = conn
        .call(move |conn| {
            let mut stmt = conn.prepare(sql)?;
            let count: i64 = match param {
                Some(p) => stmt.query_row([p], |row| row.get(0))?,
                None => stmt.query_row([], |row| row.get(0))?,
            };
            Ok(SqlWrapper(count))
        })
        .await?;
    Ok(count.max(0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn product(id: i64, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            slug: format!("product-{id}"),
            article: format!("A-{id}"),
            short_desc: None,
            full_desc: None,
            image_url: None,
            price: dec!(100.00),
            stock: 10,
            created_at: 0,
            brand_id: 1,
            country_id: 1,
        }
    }

    #[test]
    fn thumbnail_is_spliced_before_extension() {
        let mut p = product(1, "Фильтр");
        p.image_url = Some("/static/uploads/products/f/1_filtr_ab12.jpg".to_string());
        assert_eq!(
            p.thumbnail_url().as_deref(),
            Some("/static/uploads/products/f/1_filtr_ab12_thumb.jpg")
        );
    }

    #[test]
    fn thumbnail_without_extension_falls_back() {
        let mut p = product(1, "Фильтр");
        p.image_url = Some("/static/uploads/noext".to_string());
        assert_eq!(p.thumbnail_url().as_deref(), Some("/static/uploads/noext"));
        p.image_url = None;
        assert_eq!(p.thumbnail_url(), None);
    }
}
