#![deny(clippy::unwrap_used)]
#![allow(clippy::from_over_into)]

use serde::de::IntoDeserializer;
use serde::Deserialize;

pub mod brand;
pub mod cart;
pub mod category;
pub mod control;
pub mod country;
pub mod filter;
pub mod news;
pub mod pagination;
pub mod product;
pub mod search;
pub mod seed;
pub mod seo_meta;
pub mod settings;
pub mod slug;

/// Items per page on the public catalog listing.
pub const CATALOG_PER_PAGE: usize = 9;
/// Items per page on the search results listing.
pub const SEARCH_PER_PAGE: usize = 12;
/// Items per page on back-office lists.
pub const ADMIN_PER_PAGE: usize = 10;
/// Items per page on the news listing.
pub const NEWS_PER_PAGE: usize = 5;
/// Entry cap for the autocomplete endpoint.
pub const QUICK_SEARCH_LIMIT: usize = 8;

#[derive(Debug)]
pub struct SqlWrapper<T>(pub T);

impl<T> SqlWrapper<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

pub fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => T::deserialize(s.into_deserializer()).map(Some),
    }
}
