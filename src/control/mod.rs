pub mod admin_api;
pub mod cart;
pub mod catalog;

use std::sync::Arc;

use actix_session::Session;
use actix_web::http::header::ContentType;
use actix_web::web::{Data, Form, Json};
use actix_web::{get, Either, HttpResponse};
use derive_more::{Display, Error};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::brand::BrandRepository;
use crate::cart::CartRepository;
use crate::category::CategoryRepository;
use crate::country::CountryRepository;
use crate::news::NewsRepository;
use crate::product::ProductRepository;
use crate::seo_meta::{self, ResolvedMeta, SeoMetaRepository};
use crate::settings::{SettingsRepository, SettingsView};

pub type Response = Result<HttpResponse, ControllerError>;
pub type InputData<T> = Either<Form<T>, Json<T>>;

pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub brands: Arc<dyn BrandRepository>,
    pub countries: Arc<dyn CountryRepository>,
    pub news: Arc<dyn NewsRepository>,
    pub cart: Arc<dyn CartRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub seo: Arc<dyn SeoMetaRepository>,
    pub base_url: String,
}

#[derive(Debug, Display, Error)]
pub enum ControllerError {
    NotFound,
    #[error(ignore)]
    #[display("{_0}")]
    Conflict(String),
    #[error(ignore)]
    #[display("Invalid field {field}")]
    InvalidInput {
        field: String,
        msg: String,
    },
    #[error(ignore)]
    InternalServerError(anyhow::Error),
}

impl From<anyhow::Error> for ControllerError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalServerError(err)
    }
}

impl actix_web::error::ResponseError for ControllerError {
    fn error_response(&self) -> HttpResponse {
        use ControllerError::*;
        match self {
            NotFound => HttpResponse::NotFound().json(json!({ "error": "not found" })),
            Conflict(msg) => HttpResponse::Conflict().json(json!({ "error": msg })),
            InvalidInput { field, msg } => HttpResponse::BadRequest().json(json!({
                "error": "invalid input",
                "field": field,
                "message": msg,
            })),
            InternalServerError(err) => {
                log::error!("{err:?}");
                HttpResponse::InternalServerError()
                    .json(json!({ "error": "internal server error" }))
            }
        }
    }
}

pub fn parse_usize_param(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Anonymous cart identity. A fresh uuid is minted into the session
/// cookie on first touch and reused for every later request.
pub fn visitor_id(session: &Session) -> Result<String, ControllerError> {
    let stored = session
        .get::<String>("visitor_id")
        .map_err(|err| ControllerError::InternalServerError(err.into()))?;
    if let Some(id) = stored {
        return Ok(id);
    }
    let id = Uuid::new_v4().to_string();
    session
        .insert("visitor_id", &id)
        .map_err(|err| ControllerError::InternalServerError(err.into()))?;
    Ok(id)
}

pub async fn page_meta(
    state: &AppState,
    page_type: &str,
    page_id: Option<i64>,
) -> Result<ResolvedMeta, ControllerError> {
    let settings = SettingsView::new(state.settings.list().await?);
    let meta = state.seo.get_for_page(page_type, page_id).await?;
    Ok(seo_meta::resolve(meta.as_ref(), &settings))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[get("/")]
pub async fn index(state: Data<AppState>) -> Response {
    let latest_products = state.products.latest(6).await?;
    let latest_news = state.news.latest(3).await?;
    let meta = page_meta(&state, "main", None).await?;
    Ok(HttpResponse::Ok().json(json!({
        "meta": meta,
        "latest_products": latest_products,
        "latest_news": latest_news,
    })))
}

#[get("/sitemap.xml")]
pub async fn sitemap(state: Data<AppState>) -> Response {
    let base = state.base_url.trim_end_matches('/');
    let mut urls = vec![
        format!("{base}/"),
        format!("{base}/catalog"),
        format!("{base}/search"),
        format!("{base}/news"),
    ];
    for slug in state.categories.list_slugs().await? {
        urls.push(format!("{base}/catalog/{slug}"));
    }
    for slug in state.products.list_slugs().await? {
        urls.push(format!("{base}/product/{slug}"));
    }
    for post in state.news.list().await? {
        urls.push(format!("{base}/news/{}", post.id));
    }
    let mut body = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in urls {
        body.push_str(&format!("  <url><loc>{url}</loc></url>\n"));
    }
    body.push_str("</urlset>\n");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::xml())
        .body(body))
}

#[get("/robots.txt")]
pub async fn robots(state: Data<AppState>) -> Response {
    let base = state.base_url.trim_end_matches('/');
    let body = format!(
        "User-agent: *\nDisallow: /admin/\nDisallow: /cart\n\nSitemap: {base}/sitemap.xml\n"
    );
    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(body))
}

pub async fn not_found() -> Response {
    Err(ControllerError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_param_falls_back_on_garbage() {
        assert_eq!(parse_usize_param(Some("3"), 1), 3);
        assert_eq!(parse_usize_param(Some(" 7 "), 1), 7);
        assert_eq!(parse_usize_param(Some("abc"), 1), 1);
        assert_eq!(parse_usize_param(None, 1), 1);
    }

    #[test]
    fn error_variants_map_to_status_codes() {
        use actix_web::error::ResponseError;
        assert_eq!(ControllerError::NotFound.error_response().status(), 404);
        assert_eq!(
            ControllerError::Conflict("busy".to_string())
                .error_response()
                .status(),
            409
        );
        assert_eq!(
            ControllerError::InvalidInput {
                field: "name".to_string(),
                msg: "must not be empty".to_string(),
            }
            .error_response()
            .status(),
            400
        );
    }
}
