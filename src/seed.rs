use std::collections::HashMap;

use log::info;
use rust_decimal_macros::dec;

use crate::brand::BrandRepository;
use crate::category::{CategoryRepository, NewCategory};
use crate::country::CountryRepository;
use crate::news::{NewNewsPost, NewsRepository};
use crate::product::{NewProduct, ProductRepository};
use crate::seo_meta::{NewSeoMeta, SeoMetaRepository};
use crate::settings::SettingsRepository;
use crate::slug::generate_slug;

pub struct Repositories<'a> {
    pub brands: &'a dyn BrandRepository,
    pub countries: &'a dyn CountryRepository,
    pub categories: &'a dyn CategoryRepository,
    pub news: &'a dyn NewsRepository,
    pub products: &'a dyn ProductRepository,
    pub settings: &'a dyn SettingsRepository,
    pub seo: &'a dyn SeoMetaRepository,
}

/// Fills an empty database with the demo catalog. A database that
/// already holds products is left untouched.
pub async fn seed(repos: Repositories<'_>) -> anyhow::Result<()> {
    if repos.products.count().await? > 0 {
        return Ok(());
    }
    info!("empty database, seeding demo catalog");

    let mut brand_slugs: Vec<String> = vec![];
    let mut brands = HashMap::new();
    for name in [
        "Bosch",
        "Continental",
        "Michelin",
        "Castrol",
        "Mobil",
        "Shell",
        "Motul",
    ] {
        let slug = generate_slug(name, &brand_slugs);
        brand_slugs.push(slug.clone());
        brands.insert(name, repos.brands.add(name.to_string(), slug).await?.id);
    }

    let mut countries = HashMap::new();
    for name in [
        "Германия",
        "Франция",
        "Япония",
        "США",
        "Китай",
        "Россия",
        "Южная Корея",
    ] {
        countries.insert(name, repos.countries.add(name.to_string()).await?.id);
    }

    let mut category_slugs: Vec<String> = vec![];
    let mut categories = HashMap::new();
    let mut add_category = |name: &'static str, parent: Option<&'static str>| {
        let slug = generate_slug(name, &category_slugs);
        category_slugs.push(slug.clone());
        (name, parent, slug)
    };
    let category_rows = [
        add_category("Фильтры", None),
        add_category("Автокосметика", None),
        add_category("Моторные масла", None),
        add_category("Тормозная система", None),
        add_category("Подвеска", None),
        add_category("Масляные фильтры", Some("Фильтры")),
        add_category("Воздушные фильтры", Some("Фильтры")),
        add_category("Топливные фильтры", Some("Фильтры")),
        add_category("Очистители салона", Some("Автокосметика")),
        add_category("Полироли", Some("Автокосметика")),
        add_category("Шампуни для авто", Some("Автокосметика")),
        add_category("Синтетические масла", Some("Моторные масла")),
        add_category("Полусинтетические масла", Some("Моторные масла")),
        add_category("Минеральные масла", Some("Моторные масла")),
    ];
    for (name, parent, slug) in category_rows {
        let parent_id = parent.map(|p| categories[p]);
        let category = repos
            .categories
            .add(
                NewCategory {
                    name: name.to_string(),
                    parent_id,
                },
                slug,
            )
            .await?;
        categories.insert(name, category.id);
    }

    let news_rows = [
        (
            "Новые поступления запчастей",
            "<p>Мы пополнили склад новыми запчастями для автомобилей различных марок. \
             В наличии фильтры, масла и другие автозапчасти от ведущих производителей.</p>\
             <p>Специальные цены на товары месяца!</p>",
        ),
        (
            "Скидки на зимние шины",
            "<p>Специальное предложение на зимние шины Continental и Michelin до конца месяца. \
             Скидки до 30% на весь ассортимент!</p><p>Успейте приобрести по выгодным ценам!</p>",
        ),
        (
            "Расширение ассортимента автокосметики",
            "<p>Новый раздел автокосметики уже открыт! В продаже очистители салона, полироли, \
             шампуни и многое другое.</p>\
             <p>Профессиональные средства по уходу за автомобилем по доступным ценам.</p>",
        ),
    ];
    let mut news_slugs: Vec<String> = vec![];
    for (title, body) in news_rows {
        let slug = generate_slug(title, &news_slugs);
        news_slugs.push(slug.clone());
        repos
            .news
            .add(
                NewNewsPost {
                    title: title.to_string(),
                    body: body.to_string(),
                    image_url: None,
                },
                slug,
            )
            .await?;
    }

    let product_rows = [
        NewProduct {
            name: "Воздушный фильтр Bosch".to_string(),
            article: "AF-12345".to_string(),
            short_desc: Some(
                "Высококачественный воздушный фильтр для автомобилей".to_string(),
            ),
            full_desc: Some(
                "<p>Профессиональный воздушный фильтр Bosch обеспечивает отличную фильтрацию \
                 воздуха, поступающего в двигатель.</p>"
                    .to_string(),
            ),
            image_url: None,
            price: dec!(1299.99),
            stock: 50,
            brand_id: brands["Bosch"],
            country_id: countries["Германия"],
            category_ids: vec![categories["Воздушные фильтры"]],
        },
        NewProduct {
            name: "Масляный фильтр Mann-Filter".to_string(),
            article: "OF-67890".to_string(),
            short_desc: Some("Фильтр масляный высокого качества".to_string()),
            full_desc: Some(
                "<p>Масляный фильтр Mann-Filter обеспечивает надежную очистку масла и \
                 продлевает срок службы двигателя.</p>"
                    .to_string(),
            ),
            image_url: None,
            price: dec!(899.50),
            stock: 30,
            brand_id: brands["Continental"],
            country_id: countries["Франция"],
            category_ids: vec![categories["Масляные фильтры"]],
        },
        NewProduct {
            name: "Очиститель салона Meguiar's".to_string(),
            article: "CL-54321".to_string(),
            short_desc: Some(
                "Универсальный очиститель для салона автомобиля".to_string(),
            ),
            full_desc: Some(
                "<p>Очиститель салона Meguiar's эффективно удаляет загрязнения с различных \
                 поверхностей салона автомобиля.</p>"
                    .to_string(),
            ),
            image_url: None,
            price: dec!(1599.00),
            stock: 25,
            brand_id: brands["Motul"],
            country_id: countries["США"],
            category_ids: vec![categories["Очистители салона"]],
        },
        NewProduct {
            name: "Синтетическое масло Castrol".to_string(),
            article: "MO-98765".to_string(),
            short_desc: Some(
                "Синтетическое моторное масло премиум класса".to_string(),
            ),
            full_desc: Some(
                "<p>Синтетическое моторное масло Castrol обеспечивает превосходную защиту \
                 двигателя в любых условиях эксплуатации.</p>"
                    .to_string(),
            ),
            image_url: None,
            price: dec!(3299.99),
            stock: 40,
            brand_id: brands["Castrol"],
            country_id: countries["Германия"],
            category_ids: vec![categories["Синтетические масла"]],
        },
    ];
    let mut product_slugs: Vec<String> = vec![];
    for product in product_rows {
        let slug = generate_slug(&product.name, &product_slugs);
        product_slugs.push(slug.clone());
        repos.products.add(product, slug).await?;
    }

    let setting_rows = [
        ("site_name", "Автозапчасти Shop", "Название сайта"),
        (
            "site_description",
            "Интернет-магазин автозапчастей с доставкой по всей России",
            "Описание сайта по умолчанию",
        ),
        (
            "site_keywords",
            "автозапчасти, фильтры, масла, автокосметика",
            "Ключевые слова по умолчанию",
        ),
        ("items_per_page", "9", "Товаров на странице каталога"),
    ];
    for (key, value, description) in setting_rows {
        repos.settings.set(key, value, Some(description)).await?;
    }

    repos
        .seo
        .add(NewSeoMeta {
            page_type: "main".to_string(),
            page_id: None,
            title: Some("Автозапчасти Shop - главная".to_string()),
            description: Some(
                "Качественные автозапчасти от проверенных производителей".to_string(),
            ),
            keywords: Some("автозапчасти, купить запчасти, магазин запчастей".to_string()),
            robots: None,
        })
        .await?;

    info!("seeded demo catalog");
    Ok(())
}
