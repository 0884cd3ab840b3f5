use async_trait::async_trait;
use rusqlite::params;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::product::Product;
use crate::SqlWrapper;

#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub id: i64,
    pub visitor_id: String,
    pub product_id: i64,
    pub quantity: u32,
    pub created_at: i64,
}

/// Cart row joined with its product, what the cart page renders.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.item.quantity)
    }
}

pub fn cart_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

/// Quantity that actually lands in the cart after an add: the existing
/// row plus the request, silently capped at the stock on hand.
pub fn merge_quantity(existing: u32, requested: u32, stock: u32) -> u32 {
    existing.saturating_add(requested).min(stock)
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn list(&self, visitor_id: &str) -> anyhow::Result<Vec<CartItem>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<CartItem>>;
    async fn find(&self, visitor_id: &str, product_id: i64) -> anyhow::Result<Option<CartItem>>;
    async fn add(&self, visitor_id: &str, product_id: i64, quantity: u32)
        -> anyhow::Result<CartItem>;
    async fn set_quantity(&self, id: i64, quantity: u32) -> anyhow::Result<()>;
    async fn remove(&self, id: i64) -> anyhow::Result<()>;
    async fn clear(&self, visitor_id: &str) -> anyhow::Result<()>;
}

pub struct SqliteCartRepository {
    conn: Connection,
}

fn read_item(row: &rusqlite::Row) -> Result<CartItem, rusqlite::Error> {
    let quantity: i64 = row.get(3)?;
    Ok(CartItem {
        id: row.get(0)?,
        visitor_id: row.get(1)?,
        product_id: row.get(2)?,
        quantity: quantity.max(0) as u32,
        created_at: row.get(4)?,
    })
}

const SELECT: &str = "SELECT id, visitor_id, product_id, quantity, created_at FROM cart_item";

impl SqliteCartRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS cart_item (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    visitor_id TEXT NOT NULL,
                    product_id INTEGER NOT NULL,
                    quantity INTEGER NOT NULL,
                    created_at INTEGER NOT NULL,
                    UNIQUE (visitor_id, product_id)
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
impl CartRepository for SqliteCartRepository {
    async fn list(&self, visitor_id: &str) -> anyhow::Result<Vec<CartItem>> {
        let visitor_id = visitor_id.to_string();
        let SqlWrapper(items) = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("{SELECT} WHERE visitor_id = ?1 ORDER BY id"))?;
                let items = stmt
                    .query_map([visitor_id], read_item)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SqlWrapper(items))
            })
            .await?;
        Ok(items)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<CartItem>> {
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT} WHERE id = ?1"))?;
                let item = stmt.query_map([id], read_item)?.next().transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn find(&self, visitor_id: &str, product_id: i64) -> anyhow::Result<Option<CartItem>> {
        let visitor_id = visitor_id.to_string();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("{SELECT} WHERE visitor_id = ?1 AND product_id = ?2"))?;
                let item = stmt
                    .query_map(params![visitor_id, product_id], read_item)?
                    .next()
                    .transpose()?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn add(
        &self,
        visitor_id: &str,
        product_id: i64,
        quantity: u32,
    ) -> anyhow::Result<CartItem> {
        let visitor_id = visitor_id.to_string();
        let created_at = crate::unix_now();
        let SqlWrapper(item) = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO cart_item (visitor_id, product_id, quantity, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (visitor_id, product_id)
                     DO UPDATE SET quantity = excluded.quantity",
                    params![visitor_id, product_id, quantity as i64, created_at],
                )?;
                let mut stmt =
                    conn.prepare(&format!("{SELECT} WHERE visitor_id = ?1 AND product_id = ?2"))?;
                let item = stmt.query_row(params![visitor_id, product_id], read_item)?;
                Ok(SqlWrapper(item))
            })
            .await?;
        Ok(item)
    }

    async fn set_quantity(&self, id: i64, quantity: u32) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE cart_item SET quantity = ?1 WHERE id = ?2",
                    params![quantity as i64, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, id: i64) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM cart_item WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn clear(&self, visitor_id: &str) -> anyhow::Result<()> {
        let visitor_id = visitor_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM cart_item WHERE visitor_id = ?1",
                    params![visitor_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn merge_caps_at_stock() {
        assert_eq!(merge_quantity(0, 3, 10), 3);
        assert_eq!(merge_quantity(8, 5, 10), 10);
        assert_eq!(merge_quantity(0, 1, 0), 0);
        assert_eq!(merge_quantity(u32::MAX, 1, u32::MAX), u32::MAX);
    }

    #[test]
    fn totals_sum_over_lines() {
        let product = |price| crate::product::Product {
            id: 1,
            name: "Фильтр".to_string(),
            slug: "filtr".to_string(),
            article: "A-1".to_string(),
            short_desc: None,
            full_desc: None,
            image_url: None,
            price,
            stock: 10,
            created_at: 0,
            brand_id: 1,
            country_id: 1,
        };
        let line = |price, quantity| CartLine {
            item: CartItem {
                id: 1,
                visitor_id: "v".to_string(),
                product_id: 1,
                quantity,
                created_at: 0,
            },
            product: product(price),
        };
        let lines = vec![line(dec!(100.50), 2), line(dec!(10), 3)];
        assert_eq!(lines[0].line_total(), dec!(201.00));
        assert_eq!(cart_total(&lines), dec!(231.00));
        assert_eq!(cart_total(&[]), dec!(0));
    }
}
