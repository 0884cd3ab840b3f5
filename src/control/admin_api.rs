use actix_web::web::{Data, Path, Query};
use actix_web::{get, post, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::brand::BrandRepository;
use crate::category::{CategoryRepository, NewCategory};
use crate::country::CountryRepository;
use crate::empty_string_as_none;
use crate::news::{NewNewsPost, NewsRepository};
use crate::pagination::paginate;
use crate::product::{NewProduct, ProductRepository};
use crate::seo_meta::{NewSeoMeta, SeoMetaRepository};
use crate::settings::SettingsRepository;
use crate::slug::generate_slug;
use crate::ADMIN_PER_PAGE;

use super::{parse_usize_param, AppState, ControllerError, InputData, PageQuery, Response};

fn required(value: &str, field: &str) -> Result<String, ControllerError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ControllerError::InvalidInput {
            field: field.to_string(),
            msg: "must not be empty".to_string(),
        });
    }
    Ok(value.to_string())
}

fn taken(field: &str, value: &str) -> ControllerError {
    ControllerError::InvalidInput {
        field: field.to_string(),
        msg: format!("{value:?} is already taken"),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub article: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub short_desc: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub full_desc: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub image_url: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    pub brand_id: i64,
    pub country_id: i64,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

impl ProductInput {
    fn into_new(self) -> Result<NewProduct, ControllerError> {
        if self.price < Decimal::ZERO {
            return Err(ControllerError::InvalidInput {
                field: "price".to_string(),
                msg: "must not be negative".to_string(),
            });
        }
        Ok(NewProduct {
            name: required(&self.name, "name")?,
            article: required(&self.article, "article")?,
            short_desc: self.short_desc,
            full_desc: self.full_desc,
            image_url: self.image_url,
            price: self.price,
            stock: self.stock,
            brand_id: self.brand_id,
            country_id: self.country_id,
            category_ids: self.category_ids,
        })
    }
}

async fn check_product_refs(state: &AppState, item: &NewProduct) -> Result<(), ControllerError> {
    if state.brands.get(item.brand_id).await?.is_none() {
        return Err(ControllerError::InvalidInput {
            field: "brand_id".to_string(),
            msg: format!("no brand with id {}", item.brand_id),
        });
    }
    if state.countries.get(item.country_id).await?.is_none() {
        return Err(ControllerError::InvalidInput {
            field: "country_id".to_string(),
            msg: format!("no country with id {}", item.country_id),
        });
    }
    for id in &item.category_ids {
        if state.categories.get(*id).await?.is_none() {
            return Err(ControllerError::InvalidInput {
                field: "category_ids".to_string(),
                msg: format!("no category with id {id}"),
            });
        }
    }
    Ok(())
}

/// Fresh slug for `name`, ignoring the row's own current slug so an
/// unchanged name keeps its slug on update.
fn renamed_slug(name: &str, mut slugs: Vec<String>, own: Option<&str>) -> String {
    if let Some(own) = own {
        slugs.retain(|s| s != own);
    }
    generate_slug(name, &slugs)
}

#[get("/admin/products")]
pub async fn list_products(query: Query<PageQuery>, state: Data<AppState>) -> Response {
    let cards = state.products.list_cards().await?;
    let page = parse_usize_param(query.page.as_deref(), 1);
    let page = paginate(cards, page, ADMIN_PER_PAGE);
    let pages = page.pages();
    Ok(HttpResponse::Ok().json(json!({
        "items": page.items,
        "page": page.page,
        "pages": pages,
        "total": page.total,
    })))
}

#[get("/admin/products/{id}")]
pub async fn get_product(path: Path<i64>, state: Data<AppState>) -> Response {
    let card = state
        .products
        .get_card(path.into_inner())
        .await?
        .ok_or(ControllerError::NotFound)?;
    Ok(HttpResponse::Ok().json(card))
}

#[post("/admin/products")]
pub async fn add_product(input: InputData<ProductInput>, state: Data<AppState>) -> Response {
    let item = input.into_inner().into_new()?;
    check_product_refs(&state, &item).await?;
    if state.products.get_by_article(&item.article).await?.is_some() {
        return Err(taken("article", &item.article));
    }
    let slug = generate_slug(&item.name, &state.products.list_slugs().await?);
    let product = state.products.add(item, slug).await?;
    Ok(HttpResponse::Created().json(product))
}

#[post("/admin/products/{id}")]
pub async fn update_product(
    path: Path<i64>,
    input: InputData<ProductInput>,
    state: Data<AppState>,
) -> Response {
    let id = path.into_inner();
    let item = input.into_inner().into_new()?;
    check_product_refs(&state, &item).await?;
    let current = state
        .products
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    if let Some(other) = state.products.get_by_article(&item.article).await? {
        if other.id != id {
            return Err(taken("article", &item.article));
        }
    }
    let slug = renamed_slug(
        &item.name,
        state.products.list_slugs().await?,
        Some(&current.slug),
    );
    state.products.update(id, item, slug).await?;
    let card = state
        .products
        .get_card(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    Ok(HttpResponse::Ok().json(card))
}

#[post("/admin/products/{id}/delete")]
pub async fn remove_product(path: Path<i64>, state: Data<AppState>) -> Response {
    let id = path.into_inner();
    state
        .products
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    state.products.remove(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub parent_id: Option<i64>,
}

#[get("/admin/categories")]
pub async fn list_categories(state: Data<AppState>) -> Response {
    Ok(HttpResponse::Ok().json(state.categories.list().await?))
}

#[post("/admin/categories")]
pub async fn add_category(input: InputData<CategoryInput>, state: Data<AppState>) -> Response {
    let input = input.into_inner();
    let name = required(&input.name, "name")?;
    if let Some(parent_id) = input.parent_id {
        state
            .categories
            .get(parent_id)
            .await?
            .ok_or_else(|| ControllerError::InvalidInput {
                field: "parent_id".to_string(),
                msg: format!("no category with id {parent_id}"),
            })?;
    }
    let slug = generate_slug(&name, &state.categories.list_slugs().await?);
    let category = state
        .categories
        .add(
            NewCategory {
                name,
                parent_id: input.parent_id,
            },
            slug,
        )
        .await?;
    Ok(HttpResponse::Created().json(category))
}

#[post("/admin/categories/{id}")]
pub async fn update_category(
    path: Path<i64>,
    input: InputData<CategoryInput>,
    state: Data<AppState>,
) -> Response {
    let id = path.into_inner();
    let input = input.into_inner();
    let name = required(&input.name, "name")?;
    let current = state
        .categories
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    if input.parent_id == Some(id) {
        return Err(ControllerError::InvalidInput {
            field: "parent_id".to_string(),
            msg: "a category cannot be its own parent".to_string(),
        });
    }
    let slug = renamed_slug(
        &name,
        state.categories.list_slugs().await?,
        Some(&current.slug),
    );
    state
        .categories
        .update(
            id,
            NewCategory {
                name,
                parent_id: input.parent_id,
            },
            slug,
        )
        .await?;
    Ok(HttpResponse::Ok().json(state.categories.get(id).await?))
}

#[post("/admin/categories/{id}/delete")]
pub async fn remove_category(path: Path<i64>, state: Data<AppState>) -> Response {
    let id = path.into_inner();
    state
        .categories
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    let products = state.products.count_by_category(id).await?;
    if products > 0 {
        return Err(ControllerError::Conflict(format!(
            "category is still attached to {products} products"
        )));
    }
    let children = state.categories.count_children(id).await?;
    if children > 0 {
        return Err(ControllerError::Conflict(format!(
            "category still has {children} subcategories"
        )));
    }
    state.categories.remove(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct NameInput {
    pub name: String,
}

#[get("/admin/brands")]
pub async fn list_brands(state: Data<AppState>) -> Response {
    Ok(HttpResponse::Ok().json(state.brands.list().await?))
}

#[post("/admin/brands")]
pub async fn add_brand(input: InputData<NameInput>, state: Data<AppState>) -> Response {
    let name = required(&input.into_inner().name, "name")?;
    if state.brands.get_by_name(&name).await?.is_some() {
        return Err(taken("name", &name));
    }
    let slug = generate_slug(&name, &state.brands.list_slugs().await?);
    Ok(HttpResponse::Created().json(state.brands.add(name, slug).await?))
}

#[post("/admin/brands/{id}")]
pub async fn update_brand(
    path: Path<i64>,
    input: InputData<NameInput>,
    state: Data<AppState>,
) -> Response {
    let id = path.into_inner();
    let name = required(&input.into_inner().name, "name")?;
    let current = state
        .brands
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    if let Some(other) = state.brands.get_by_name(&name).await? {
        if other.id != id {
            return Err(taken("name", &name));
        }
    }
    let slug = renamed_slug(&name, state.brands.list_slugs().await?, Some(&current.slug));
    state.brands.update(id, name, slug).await?;
    Ok(HttpResponse::Ok().json(state.brands.get(id).await?))
}

#[post("/admin/brands/{id}/delete")]
pub async fn remove_brand(path: Path<i64>, state: Data<AppState>) -> Response {
    let id = path.into_inner();
    state
        .brands
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    let products = state.products.count_by_brand(id).await?;
    if products > 0 {
        return Err(ControllerError::Conflict(format!(
            "brand is still attached to {products} products"
        )));
    }
    state.brands.remove(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/admin/countries")]
pub async fn list_countries(state: Data<AppState>) -> Response {
    Ok(HttpResponse::Ok().json(state.countries.list().await?))
}

#[post("/admin/countries")]
pub async fn add_country(input: InputData<NameInput>, state: Data<AppState>) -> Response {
    let name = required(&input.into_inner().name, "name")?;
    if state.countries.get_by_name(&name).await?.is_some() {
        return Err(taken("name", &name));
    }
    Ok(HttpResponse::Created().json(state.countries.add(name).await?))
}

#[post("/admin/countries/{id}")]
pub async fn update_country(
    path: Path<i64>,
    input: InputData<NameInput>,
    state: Data<AppState>,
) -> Response {
    let id = path.into_inner();
    let name = required(&input.into_inner().name, "name")?;
    state
        .countries
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    if let Some(other) = state.countries.get_by_name(&name).await? {
        if other.id != id {
            return Err(taken("name", &name));
        }
    }
    state.countries.update(id, name).await?;
    Ok(HttpResponse::Ok().json(state.countries.get(id).await?))
}

#[post("/admin/countries/{id}/delete")]
pub async fn remove_country(path: Path<i64>, state: Data<AppState>) -> Response {
    let id = path.into_inner();
    state
        .countries
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    let products = state.products.count_by_country(id).await?;
    if products > 0 {
        return Err(ControllerError::Conflict(format!(
            "country is still attached to {products} products"
        )));
    }
    state.countries.remove(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct NewsInput {
    pub title: String,
    pub body: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub image_url: Option<String>,
}

impl NewsInput {
    fn into_new(self) -> Result<NewNewsPost, ControllerError> {
        Ok(NewNewsPost {
            title: required(&self.title, "title")?,
            body: self.body,
            image_url: self.image_url,
        })
    }
}

#[get("/admin/news")]
pub async fn list_news(query: Query<PageQuery>, state: Data<AppState>) -> Response {
    let posts = state.news.list().await?;
    let page = parse_usize_param(query.page.as_deref(), 1);
    let page = paginate(posts, page, ADMIN_PER_PAGE);
    let pages = page.pages();
    Ok(HttpResponse::Ok().json(json!({
        "items": page.items,
        "page": page.page,
        "pages": pages,
        "total": page.total,
    })))
}

#[post("/admin/news")]
pub async fn add_news(input: InputData<NewsInput>, state: Data<AppState>) -> Response {
    let post = input.into_inner().into_new()?;
    let slug = generate_slug(&post.title, &state.news.list_slugs().await?);
    Ok(HttpResponse::Created().json(state.news.add(post, slug).await?))
}

#[post("/admin/news/{id}")]
pub async fn update_news(
    path: Path<i64>,
    input: InputData<NewsInput>,
    state: Data<AppState>,
) -> Response {
    let id = path.into_inner();
    let post = input.into_inner().into_new()?;
    let current = state
        .news
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    let slug = renamed_slug(&post.title, state.news.list_slugs().await?, Some(&current.slug));
    state.news.update(id, post, slug).await?;
    Ok(HttpResponse::Ok().json(state.news.get(id).await?))
}

#[post("/admin/news/{id}/delete")]
pub async fn remove_news(path: Path<i64>, state: Data<AppState>) -> Response {
    let id = path.into_inner();
    state
        .news
        .get(id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    state.news.remove(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct SettingInput {
    pub key: String,
    pub value: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub description: Option<String>,
}

#[get("/admin/settings")]
pub async fn list_settings(state: Data<AppState>) -> Response {
    Ok(HttpResponse::Ok().json(state.settings.list().await?))
}

#[post("/admin/settings")]
pub async fn set_setting(input: InputData<SettingInput>, state: Data<AppState>) -> Response {
    let input = input.into_inner();
    let key = required(&input.key, "key")?;
    state
        .settings
        .set(&key, &input.value, input.description.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "key": key, "value": input.value })))
}

#[post("/admin/settings/{key}/delete")]
pub async fn remove_setting(path: Path<String>, state: Data<AppState>) -> Response {
    let key = path.into_inner();
    state
        .settings
        .get(&key)
        .await?
        .ok_or(ControllerError::NotFound)?;
    state.settings.remove(&key).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct SeoInput {
    pub page_type: String,
    pub page_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub keywords: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub robots: Option<String>,
}

impl SeoInput {
    fn into_new(self) -> Result<NewSeoMeta, ControllerError> {
        Ok(NewSeoMeta {
            page_type: required(&self.page_type, "page_type")?,
            page_id: self.page_id,
            title: self.title,
            description: self.description,
            keywords: self.keywords,
            robots: self.robots,
        })
    }
}

#[get("/admin/seo")]
pub async fn list_seo(state: Data<AppState>) -> Response {
    Ok(HttpResponse::Ok().json(state.seo.list().await?))
}

#[post("/admin/seo")]
pub async fn add_seo(input: InputData<SeoInput>, state: Data<AppState>) -> Response {
    let meta = input.into_inner().into_new()?;
    if state.seo.find(&meta.page_type, meta.page_id).await?.is_some() {
        return Err(taken("page_type", &meta.page_type));
    }
    Ok(HttpResponse::Created().json(state.seo.add(meta).await?))
}

#[post("/admin/seo/{id}")]
pub async fn update_seo(path: Path<i64>, input: InputData<SeoInput>, state: Data<AppState>) -> Response {
    let id = path.into_inner();
    let meta = input.into_inner().into_new()?;
    state.seo.get(id).await?.ok_or(ControllerError::NotFound)?;
    if let Some(other) = state.seo.find(&meta.page_type, meta.page_id).await? {
        if other.id != id {
            return Err(taken("page_type", &meta.page_type));
        }
    }
    state.seo.update(id, meta).await?;
    Ok(HttpResponse::Ok().json(state.seo.get(id).await?))
}

#[post("/admin/seo/{id}/delete")]
pub async fn remove_seo(path: Path<i64>, state: Data<AppState>) -> Response {
    let id = path.into_inner();
    state.seo.get(id).await?.ok_or(ControllerError::NotFound)?;
    state.seo.remove(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renamed_slug_keeps_slug_for_unchanged_name() {
        let slugs = vec!["vozdushnyy-filtr".to_string(), "maslo".to_string()];
        assert_eq!(
            renamed_slug("Воздушный фильтр", slugs.clone(), Some("vozdushnyy-filtr")),
            "vozdushnyy-filtr"
        );
        // a rename that collides with another row gets a suffix
        assert_eq!(
            renamed_slug("Масло", slugs, Some("vozdushnyy-filtr")),
            "maslo-1"
        );
    }
}
