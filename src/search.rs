use crate::product::ProductCard;
use crate::QUICK_SEARCH_LIMIT;

/// Lowercases and collapses every run of whitespace to a single space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Loose match: either normalized string contains the other as a
/// substring, or some token of one side is contained in a token of the
/// other. Empty text or empty query never matches.
pub fn matches(text: &str, query: &str) -> bool {
    let text = normalize(text);
    let query = normalize(query);
    if text.is_empty() || query.is_empty() {
        return false;
    }
    if text.contains(&query) || query.contains(&text) {
        return true;
    }
    query.split(' ').any(|q| {
        text.split(' ')
            .any(|t| t.contains(q) || q.contains(t))
    })
}

fn card_matches(card: &ProductCard, query: &str) -> bool {
    let p = &card.product;
    matches(&p.name, query)
        || matches(&p.article, query)
        || p.short_desc.as_deref().is_some_and(|d| matches(d, query))
        || p.full_desc.as_deref().is_some_and(|d| matches(d, query))
        || matches(&card.brand_name, query)
        || card.categories.iter().any(|c| matches(&c.name, query))
}

/// Full-site search over name, article, both descriptions, brand and
/// category names. An empty query returns the whole input unchanged.
pub fn search(cards: Vec<ProductCard>, query: &str) -> Vec<ProductCard> {
    if normalize(query).is_empty() {
        return cards;
    }
    cards
        .into_iter()
        .filter(|card| card_matches(card, query))
        .collect()
}

/// Suggestion search for the header autocomplete: name and article
/// only, capped to a handful of rows. Queries shorter than two
/// characters return nothing.
pub fn quick_search<'a>(cards: &'a [ProductCard], query: &str) -> Vec<&'a ProductCard> {
    if normalize(query).chars().count() < 2 {
        return vec![];
    }
    cards
        .iter()
        .filter(|card| matches(&card.product.name, query) || matches(&card.product.article, query))
        .take(QUICK_SEARCH_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{CategoryRef, Product, ProductCard};
    use rust_decimal_macros::dec;

    fn card(name: &str, article: &str) -> ProductCard {
        ProductCard {
            product: Product {
                id: 1,
                name: name.to_string(),
                slug: "p".to_string(),
                article: article.to_string(),
                short_desc: None,
                full_desc: None,
                image_url: None,
                price: dec!(10),
                stock: 1,
                created_at: 0,
                brand_id: 1,
                country_id: 1,
            },
            brand_name: "Bosch".to_string(),
            country_name: "Германия".to_string(),
            categories: vec![CategoryRef {
                id: 1,
                name: "Фильтры".to_string(),
            }],
        }
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  Масляный \t фильтр\n"), "масляный фильтр");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn partial_token_matches_name() {
        assert!(matches("Воздушный фильтр Bosch", "фил"));
        assert!(matches("Воздушный фильтр Bosch", "ФИЛЬТР bosch"));
        assert!(!matches("Воздушный фильтр Bosch", "свеча"));
    }

    #[test]
    fn one_matching_token_is_enough() {
        assert!(matches("Воздушный фильтр Bosch", "фильтр premium"));
        assert!(matches("фильтр", "воздушный фильтр bosch"));
        assert!(!matches("Воздушный фильтр Bosch", "свеча premium"));
    }

    #[test]
    fn empty_sides_never_match() {
        assert!(!matches("", "фильтр"));
        assert!(!matches("фильтр", "  "));
        assert!(!matches("", ""));
    }

    #[test]
    fn search_hits_brand_and_category_names() {
        let cards = vec![card("Воздушный фильтр", "AF-12345")];
        assert_eq!(search(cards.clone(), "bosch").len(), 1);
        assert_eq!(search(cards.clone(), "фильтры").len(), 1);
        assert_eq!(search(cards, "тормоз").len(), 0);
    }

    #[test]
    fn empty_query_returns_everything() {
        let cards = vec![card("Фильтр", "A-1"), card("Свеча", "A-2")];
        assert_eq!(search(cards, "  ").len(), 2);
    }

    #[test]
    fn quick_search_is_name_and_article_only() {
        let cards = vec![card("Воздушный фильтр", "AF-12345")];
        assert_eq!(quick_search(&cards, "фил").len(), 1);
        assert_eq!(quick_search(&cards, "af-123").len(), 1);
        // brand matches are out of scope for suggestions
        assert_eq!(quick_search(&cards, "bosch").len(), 0);
        // too short
        assert_eq!(quick_search(&cards, "ф").len(), 0);
    }

    #[test]
    fn quick_search_caps_results() {
        let cards: Vec<_> = (0..20).map(|_| card("Фильтр", "A-1")).collect();
        assert_eq!(quick_search(&cards, "фильтр").len(), QUICK_SEARCH_LIMIT);
    }
}
