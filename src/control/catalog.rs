use actix_web::web::{Data, Path, Query};
use actix_web::{get, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::brand::BrandRepository;
use crate::category::CategoryRepository;
use crate::filter::FilterCriteria;
use crate::news::NewsRepository;
use crate::pagination::{paginate, Page};
use crate::product::{ProductCard, ProductRepository};
use crate::{CATALOG_PER_PAGE, NEWS_PER_PAGE, SEARCH_PER_PAGE};

use super::{page_meta, parse_usize_param, AppState, ControllerError, PageQuery, Response};

/// Standard window shape for the page-number strip.
fn page_window<T>(page: &Page<T>) -> Vec<Option<usize>> {
    page.iter_pages(2, 2, 5, 2).collect()
}

fn page_json<T: serde::Serialize>(page: &Page<T>) -> serde_json::Value {
    json!({
        "items": page.items,
        "page": page.page,
        "per_page": page.per_page,
        "pages": page.pages(),
        "total": page.total,
        "prev": page.prev_num(),
        "next": page.next_num(),
        "window": page_window(page),
    })
}

async fn filtered_cards(
    state: &AppState,
    criteria: &FilterCriteria,
) -> Result<Vec<ProductCard>, ControllerError> {
    let cards = state.products.list_cards().await?;
    if criteria.is_empty() {
        return Ok(cards);
    }
    let categories = state.categories.list().await?;
    Ok(criteria.apply(cards, &categories))
}

#[get("/catalog")]
pub async fn catalog(req: HttpRequest, query: Query<PageQuery>, state: Data<AppState>) -> Response {
    let criteria = FilterCriteria::from_query(req.query_string());
    if let Some(id) = criteria.category_id {
        state
            .categories
            .get(id)
            .await?
            .ok_or(ControllerError::NotFound)?;
    }
    let cards = filtered_cards(&state, &criteria).await?;
    let page = parse_usize_param(query.page.as_deref(), 1);
    let page = paginate(cards, page, CATALOG_PER_PAGE);
    let meta = page_meta(&state, "catalog", None).await?;
    Ok(HttpResponse::Ok().json(json!({
        "meta": meta,
        "products": page_json(&page),
        "categories": state.categories.roots().await?,
        "brands": state.brands.list().await?,
    })))
}

/// Category landing page. The path may be nested
/// (`/catalog/filtry/vozdushnye-filtry`), only the last segment picks
/// the category; the rest is there for readable URLs.
#[get("/catalog/{slug:.*}")]
pub async fn catalog_category(
    path: Path<String>,
    req: HttpRequest,
    query: Query<PageQuery>,
    state: Data<AppState>,
) -> Response {
    let slug = path
        .trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(ControllerError::NotFound)?
        .to_string();
    let category = state
        .categories
        .get_by_slug(&slug)
        .await?
        .ok_or(ControllerError::NotFound)?;
    let mut criteria = FilterCriteria::from_query(req.query_string());
    criteria.category_id = Some(category.id);
    let cards = filtered_cards(&state, &criteria).await?;
    let page = parse_usize_param(query.page.as_deref(), 1);
    let page = paginate(cards, page, CATALOG_PER_PAGE);
    let meta = page_meta(&state, "category", Some(category.id)).await?;
    Ok(HttpResponse::Ok().json(json!({
        "meta": meta,
        "category": category,
        "children": state.categories.children(category.id).await?,
        "products": page_json(&page),
        "brands": state.brands.list().await?,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<String>,
}

#[get("/search")]
pub async fn search(query: Query<SearchQuery>, state: Data<AppState>) -> Response {
    let q = query.q.as_deref().unwrap_or_default();
    let cards = state.products.list_cards().await?;
    let found = crate::search::search(cards, q);
    let page = parse_usize_param(query.page.as_deref(), 1);
    let page = paginate(found, page, SEARCH_PER_PAGE);
    let meta = page_meta(&state, "search", None).await?;
    Ok(HttpResponse::Ok().json(json!({
        "meta": meta,
        "query": q,
        "products": page_json(&page),
    })))
}

#[get("/api/search")]
pub async fn api_search(query: Query<SearchQuery>, state: Data<AppState>) -> Response {
    let q = query.q.as_deref().unwrap_or_default();
    let cards = state.products.list_cards().await?;
    let suggestions: Vec<_> = crate::search::quick_search(&cards, q)
        .into_iter()
        .map(|card| {
            json!({
                "id": card.product.id,
                "name": card.product.name,
                "article": card.product.article,
                "price": card.product.price,
                "image_url": card.product.thumbnail_url(),
                "url": format!("/product/{}", card.product.slug),
            })
        })
        .collect();
    Ok(HttpResponse::Ok().json(suggestions))
}

/// Product page, addressable by numeric id or by slug.
#[get("/product/{key}")]
pub async fn product(path: Path<String>, state: Data<AppState>) -> Response {
    let key = path.into_inner();
    let found = match key.parse::<i64>() {
        Ok(id) => state.products.get(id).await?,
        Err(_) => state.products.get_by_slug(&key).await?,
    };
    let found = found.ok_or(ControllerError::NotFound)?;
    let card = state
        .products
        .get_card(found.id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    let meta = page_meta(&state, "product", Some(card.product.id)).await?;
    let thumbnail = card.product.thumbnail_url();
    Ok(HttpResponse::Ok().json(json!({
        "meta": meta,
        "product": card,
        "thumbnail_url": thumbnail,
    })))
}

#[get("/news")]
pub async fn news(query: Query<PageQuery>, state: Data<AppState>) -> Response {
    let posts = state.news.list().await?;
    let page = parse_usize_param(query.page.as_deref(), 1);
    let page = paginate(posts, page, NEWS_PER_PAGE);
    let meta = page_meta(&state, "news", None).await?;
    Ok(HttpResponse::Ok().json(json!({
        "meta": meta,
        "news": page_json(&page),
    })))
}

#[get("/news/{id}")]
pub async fn news_post(path: Path<i64>, state: Data<AppState>) -> Response {
    let post = state
        .news
        .get(path.into_inner())
        .await?
        .ok_or(ControllerError::NotFound)?;
    let meta = page_meta(&state, "news", Some(post.id)).await?;
    Ok(HttpResponse::Ok().json(json!({ "meta": meta, "post": post })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::web::Data;
    use actix_web::{test, App};
    use tokio_rusqlite::Connection;

    use super::*;
    use crate::brand::SqliteBrandRepository;
    use crate::cart::SqliteCartRepository;
    use crate::category::{NewCategory, SqliteCategoryRepository};
    use crate::country::SqliteCountryRepository;
    use crate::news::SqliteNewsRepository;
    use crate::product::SqliteProductRepository;
    use crate::seo_meta::SqliteSeoMetaRepository;
    use crate::settings::SqliteSettingsRepository;

    async fn empty_state() -> Data<AppState> {
        let conn = Connection::open_in_memory()
            .await
            .expect("in-memory database");
        Data::new(AppState {
            products: Arc::new(
                SqliteProductRepository::init(conn.clone())
                    .await
                    .expect("product table"),
            ),
            categories: Arc::new(
                SqliteCategoryRepository::init(conn.clone())
                    .await
                    .expect("category table"),
            ),
            brands: Arc::new(
                SqliteBrandRepository::init(conn.clone())
                    .await
                    .expect("brand table"),
            ),
            countries: Arc::new(
                SqliteCountryRepository::init(conn.clone())
                    .await
                    .expect("country table"),
            ),
            news: Arc::new(
                SqliteNewsRepository::init(conn.clone())
                    .await
                    .expect("news table"),
            ),
            cart: Arc::new(
                SqliteCartRepository::init(conn.clone())
                    .await
                    .expect("cart table"),
            ),
            settings: Arc::new(
                SqliteSettingsRepository::init(conn.clone())
                    .await
                    .expect("setting table"),
            ),
            seo: Arc::new(
                SqliteSeoMetaRepository::init(conn)
                    .await
                    .expect("seo table"),
            ),
            base_url: "http://localhost:8080".to_string(),
        })
    }

    #[actix_rt::test]
    async fn unknown_category_filter_is_not_found() {
        let state = empty_state().await;
        let known = state
            .categories
            .add(
                NewCategory {
                    name: "Фильтры".to_string(),
                    parent_id: None,
                },
                "filtry".to_string(),
            )
            .await
            .expect("category row");
        let app = test::init_service(
            App::new().app_data(state.clone()).service(catalog),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/catalog?category=9999")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 404);

        let req = test::TestRequest::get()
            .uri(&format!("/catalog?category={}", known.id))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
    }
}
