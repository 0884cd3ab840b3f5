use std::env;
use std::io::Write;
use std::sync::Arc;

use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::Key;
use actix_web::middleware::TrailingSlash;
use actix_web::web::{self, Data, FormConfig};
use actix_web::{App, HttpServer};
use anyhow::Context;
use parts_shop::brand::SqliteBrandRepository;
use parts_shop::cart::SqliteCartRepository;
use parts_shop::category::SqliteCategoryRepository;
use parts_shop::control::{self, admin_api, AppState};
use parts_shop::country::SqliteCountryRepository;
use parts_shop::news::SqliteNewsRepository;
use parts_shop::product::SqliteProductRepository;
use parts_shop::seed;
use parts_shop::seo_meta::SqliteSeoMetaRepository;
use parts_shop::settings::SqliteSettingsRepository;
use rand::{distributions, Rng};
use tokio_rusqlite::Connection;

const DB_PATH: &str = "storage/shop.db";

#[actix_web::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    match std::fs::File::open(".env") {
        Ok(_) => envmnt::load_file(".env")?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            std::fs::File::create(".env")?;
            envmnt::load_file(".env")?;
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to open .env file: {err}"));
        }
    }

    tokio::fs::create_dir_all("storage").await?;

    // Each repository owns its own connection. SQLite handles several
    // connections to one file safely.
    let products = Arc::new(SqliteProductRepository::init(Connection::open(DB_PATH).await?).await?);
    let categories =
        Arc::new(SqliteCategoryRepository::init(Connection::open(DB_PATH).await?).await?);
    let brands = Arc::new(SqliteBrandRepository::init(Connection::open(DB_PATH).await?).await?);
    let countries = Arc::new(SqliteCountryRepository::init(Connection::open(DB_PATH).await?).await?);
    let news = Arc::new(SqliteNewsRepository::init(Connection::open(DB_PATH).await?).await?);
    let cart = Arc::new(SqliteCartRepository::init(Connection::open(DB_PATH).await?).await?);
    let settings =
        Arc::new(SqliteSettingsRepository::init(Connection::open(DB_PATH).await?).await?);
    let seo = Arc::new(SqliteSeoMetaRepository::init(Connection::open(DB_PATH).await?).await?);

    seed::seed(seed::Repositories {
        brands: brands.as_ref(),
        countries: countries.as_ref(),
        categories: categories.as_ref(),
        news: news.as_ref(),
        products: products.as_ref(),
        settings: settings.as_ref(),
        seo: seo.as_ref(),
    })
    .await?;

    let base_url = envmnt::get_or("BASE_URL", "http://localhost:8080");

    let secret_key = match envmnt::get_parse("SESSION_KEY") {
        Ok(v) => v,
        Err(envmnt::errors::EnvmntError::Missing(_)) => {
            let key = rand::thread_rng()
                .sample_iter(distributions::Alphanumeric)
                .take(64)
                .map(char::from)
                .collect::<String>();
            let mut f = std::fs::File::options().append(true).open(".env")?;
            f.write_all(format!("SESSION_KEY={key}").as_bytes())?;
            key
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to read secret key: {err}"));
        }
    };
    let secret_key = Key::from(secret_key.as_bytes());

    let state = Data::new(AppState {
        products,
        categories,
        brands,
        countries,
        news,
        cart,
        settings,
        seo,
        base_url,
    });

    log::info!("listening on 0.0.0.0:8080");
    HttpServer::new(move || {
        App::new()
            .app_data(FormConfig::default().limit(256 * 1024))
            .app_data(state.clone())
            .wrap(actix_web::middleware::Compress::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_http_only(true)
                    .cookie_secure(false)
                    .build(),
            )
            .wrap(actix_web::middleware::NormalizePath::new(
                TrailingSlash::Trim,
            ))
            .wrap(actix_web::middleware::Logger::default())
            .service(control::index)
            .service(control::sitemap)
            .service(control::robots)
            .service(control::catalog::catalog)
            .service(control::catalog::catalog_category)
            .service(control::catalog::search)
            .service(control::catalog::api_search)
            .service(control::catalog::product)
            .service(control::catalog::news)
            .service(control::catalog::news_post)
            .service(control::cart::view)
            .service(control::cart::add)
            .service(control::cart::update)
            .service(control::cart::remove)
            .service(control::cart::clear)
            .service(admin_api::list_products)
            .service(admin_api::get_product)
            .service(admin_api::add_product)
            .service(admin_api::update_product)
            .service(admin_api::remove_product)
            .service(admin_api::list_categories)
            .service(admin_api::add_category)
            .service(admin_api::update_category)
            .service(admin_api::remove_category)
            .service(admin_api::list_brands)
            .service(admin_api::add_brand)
            .service(admin_api::update_brand)
            .service(admin_api::remove_brand)
            .service(admin_api::list_countries)
            .service(admin_api::add_country)
            .service(admin_api::update_country)
            .service(admin_api::remove_country)
            .service(admin_api::list_news)
            .service(admin_api::add_news)
            .service(admin_api::update_news)
            .service(admin_api::remove_news)
            .service(admin_api::list_settings)
            .service(admin_api::set_setting)
            .service(admin_api::remove_setting)
            .service(admin_api::list_seo)
            .service(admin_api::add_seo)
            .service(admin_api::update_seo)
            .service(admin_api::remove_seo)
            .default_service(web::route().to(control::not_found))
    })
    .bind(("0.0.0.0", 8080))
    .context("Failed to bind server to 0.0.0.0:8080. Is the port already in use?")?
    .run()
    .await?;

    Ok(())
}
