use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::category::Category;
use crate::product::ProductCard;

/// Catalog filter parsed once from the raw query string. Malformed or
/// unknown parameters are dropped silently so a hand-edited URL still
/// renders a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub category_id: Option<i64>,
    pub price_from: Option<Decimal>,
    pub price_to: Option<Decimal>,
    pub brand_ids: Vec<i64>,
}

impl FilterCriteria {
    pub fn from_query(query: &str) -> Self {
        let mut criteria = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "category" => {
                    if let Ok(id) = value.parse::<i64>() {
                        criteria.category_id = Some(id);
                    }
                }
                "price_from" => {
                    if let Ok(price) = Decimal::from_str(value.trim()) {
                        criteria.price_from = Some(price);
                    }
                }
                "price_to" => {
                    if let Ok(price) = Decimal::from_str(value.trim()) {
                        criteria.price_to = Some(price);
                    }
                }
                key => {
                    // checked brand boxes arrive as brand_<id>=on
                    if value == "on" {
                        if let Some(id) = key.strip_prefix("brand_") {
                            if let Ok(id) = id.parse::<i64>() {
                                criteria.brand_ids.push(id);
                            }
                        }
                    }
                }
            }
        }
        criteria
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Narrows the card list to the criteria. The category filter is
    /// subtree-wide: picking a parent category keeps products attached
    /// to it or to any of its descendants.
    pub fn apply(&self, cards: Vec<ProductCard>, categories: &[Category]) -> Vec<ProductCard> {
        let category_ids = self.category_id.map(|id| subtree_ids(id, categories));
        cards
            .into_iter()
            .filter(|card| {
                if let Some(ids) = &category_ids {
                    if !card.categories.iter().any(|c| ids.contains(&c.id)) {
                        return false;
                    }
                }
                if let Some(min) = self.price_from {
                    if card.product.price < min {
                        return false;
                    }
                }
                if let Some(max) = self.price_to {
                    if card.product.price > max {
                        return false;
                    }
                }
                if !self.brand_ids.is_empty() && !self.brand_ids.contains(&card.product.brand_id) {
                    return false;
                }
                true
            })
            .collect()
    }
}

fn subtree_ids(root: i64, categories: &[Category]) -> HashSet<i64> {
    let mut ids = HashSet::from([root]);
    let mut frontier = vec![root];
    while let Some(parent) = frontier.pop() {
        for category in categories {
            if category.parent_id == Some(parent) && ids.insert(category.id) {
                frontier.push(category.id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{CategoryRef, Product, ProductCard};
    use rust_decimal_macros::dec;

    fn category(id: i64, parent_id: Option<i64>) -> Category {
        Category {
            id,
            name: format!("Категория {id}"),
            slug: format!("cat-{id}"),
            parent_id,
            created_at: 0,
        }
    }

    fn card(id: i64, brand_id: i64, category_id: i64, price: Decimal) -> ProductCard {
        ProductCard {
            product: Product {
                id,
                name: format!("Товар {id}"),
                slug: format!("tovar-{id}"),
                article: format!("A-{id}"),
                short_desc: None,
                full_desc: None,
                image_url: None,
                price,
                stock: 1,
                created_at: 0,
                brand_id,
                country_id: 1,
            },
            brand_name: String::new(),
            country_name: String::new(),
            categories: vec![CategoryRef {
                id: category_id,
                name: String::new(),
            }],
        }
    }

    #[test]
    fn parses_brand_checkboxes_and_bounds() {
        let c = FilterCriteria::from_query("category=3&price_from=100&price_to=500&brand_2=on&brand_5=on");
        assert_eq!(c.category_id, Some(3));
        assert_eq!(c.price_from, Some(dec!(100)));
        assert_eq!(c.price_to, Some(dec!(500)));
        assert_eq!(c.brand_ids, vec![2, 5]);
    }

    #[test]
    fn malformed_parameters_are_skipped() {
        let c = FilterCriteria::from_query("category=abc&price_from=cheap&brand_x=on&brand_7=off&page=2");
        assert!(c.is_empty());
    }

    #[test]
    fn parent_category_covers_children() {
        let categories = vec![category(1, None), category(2, Some(1)), category(3, Some(2))];
        let cards = vec![
            card(1, 1, 1, dec!(100)),
            card(2, 1, 3, dec!(100)),
            card(3, 1, 9, dec!(100)),
        ];
        let c = FilterCriteria {
            category_id: Some(1),
            ..Default::default()
        };
        let kept = c.apply(cards, &categories);
        assert_eq!(kept.iter().map(|c| c.product.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let cards = vec![
            card(1, 1, 1, dec!(99.99)),
            card(2, 1, 1, dec!(100)),
            card(3, 1, 1, dec!(500)),
            card(4, 1, 1, dec!(500.01)),
        ];
        let c = FilterCriteria {
            price_from: Some(dec!(100)),
            price_to: Some(dec!(500)),
            ..Default::default()
        };
        let kept = c.apply(cards, &[]);
        assert_eq!(kept.iter().map(|c| c.product.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn brand_filter_is_a_union() {
        let cards = vec![card(1, 1, 1, dec!(1)), card(2, 2, 1, dec!(1)), card(3, 3, 1, dec!(1))];
        let c = FilterCriteria {
            brand_ids: vec![1, 3],
            ..Default::default()
        };
        let kept = c.apply(cards, &[]);
        assert_eq!(kept.iter().map(|c| c.product.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn combined_predicates_commute() {
        let categories = vec![category(1, None), category(2, Some(1))];
        let cards = vec![
            card(1, 1, 2, dec!(150)),
            card(2, 2, 2, dec!(150)),
            card(3, 1, 2, dec!(900)),
            card(4, 1, 9, dec!(150)),
        ];
        let combined = FilterCriteria {
            category_id: Some(1),
            price_from: Some(dec!(100)),
            price_to: Some(dec!(500)),
            brand_ids: vec![1],
        };
        let ids = |kept: Vec<ProductCard>| {
            kept.iter().map(|c| c.product.id).collect::<Vec<_>>()
        };

        // one predicate at a time, in either order, lands on the same set
        let price_only = FilterCriteria {
            price_from: Some(dec!(100)),
            price_to: Some(dec!(500)),
            ..Default::default()
        };
        let brand_only = FilterCriteria {
            brand_ids: vec![1],
            ..Default::default()
        };
        let category_only = FilterCriteria {
            category_id: Some(1),
            ..Default::default()
        };
        let forward = category_only.apply(
            brand_only.apply(price_only.apply(cards.clone(), &categories), &categories),
            &categories,
        );
        let backward = price_only.apply(
            brand_only.apply(category_only.apply(cards.clone(), &categories), &categories),
            &categories,
        );
        let forward = ids(forward);
        assert_eq!(forward, ids(backward));
        assert_eq!(forward, ids(combined.apply(cards, &categories)));
        assert_eq!(forward, vec![1]);
    }
}
