//! Catalog views used by the storefront pages.

use std::{cmp::Ordering, fmt, str::FromStr};

use shared::domain::{Category, Product, ProductId};
use tracing::info;
use url::Url;

use crate::{catalog::CatalogGate, error::ListingError};

pub const FEATURED_PER_CATEGORY: usize = 2;
pub const STORE_NAME: &str = "PC Zone";

pub fn price_label(price: f64) -> String {
    format!("RM{price}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Name,
    PriceLow,
    PriceHigh,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortOrder::Name),
            "price-low" => Ok(SortOrder::PriceLow),
            "price-high" => Ok(SortOrder::PriceHigh),
            other => Err(format!(
                "unknown sort order '{other}' (expected name, price-low or price-high)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrowseQuery {
    pub sort: Option<SortOrder>,
    pub search: Option<String>,
}

/// First two laptops followed by the first two accessories.
pub async fn featured(catalog: &CatalogGate) -> Vec<&Product> {
    catalog.ensure_loaded().await;
    info!("listing: featured products");
    Category::ALL
        .iter()
        .flat_map(|category| {
            catalog
                .products_in(*category)
                .iter()
                .take(FEATURED_PER_CATEGORY)
        })
        .collect()
}

pub async fn best_sellers(catalog: &CatalogGate) -> Vec<&Product> {
    catalog.ensure_loaded().await;
    info!("listing: best sellers");
    catalog.all_products().filter(|p| p.best_seller).collect()
}

/// Products of one category, optionally filtered by a case-insensitive name
/// fragment and sorted. Without a sort the document order is kept.
pub async fn browse<'a>(
    catalog: &'a CatalogGate,
    category: Category,
    query: &BrowseQuery,
) -> Vec<&'a Product> {
    catalog.ensure_loaded().await;

    let needle = query
        .search
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut products: Vec<&Product> = catalog
        .products_in(category)
        .iter()
        .filter(|p| match &needle {
            Some(needle) => p.name.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .collect();

    if let Some(sort) = query.sort {
        products.sort_by(|a, b| compare_products(a, b, sort));
    }

    info!(
        category = %category,
        results = products.len(),
        "listing: browse"
    );
    products
}

fn compare_products(a: &Product, b: &Product, sort: SortOrder) -> Ordering {
    match sort {
        SortOrder::PriceLow => a.price.total_cmp(&b.price),
        SortOrder::PriceHigh => b.price.total_cmp(&a.price),
        SortOrder::Name => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

pub async fn product_details(
    catalog: &CatalogGate,
    id: ProductId,
) -> Result<&Product, ListingError> {
    catalog.ensure_loaded().await;
    catalog
        .product_by_id(id)
        .ok_or(ListingError::ProductNotFound(id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharePlatform {
    Facebook,
    Twitter,
    WhatsApp,
}

impl fmt::Display for SharePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SharePlatform::Facebook => "facebook",
            SharePlatform::Twitter => "twitter",
            SharePlatform::WhatsApp => "whatsapp",
        })
    }
}

impl FromStr for SharePlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "facebook" => Ok(SharePlatform::Facebook),
            "twitter" | "x" => Ok(SharePlatform::Twitter),
            "whatsapp" => Ok(SharePlatform::WhatsApp),
            other => Err(format!("unsupported share platform '{other}'")),
        }
    }
}

pub fn share_text(product: &Product) -> String {
    format!(
        "Check out {} for {} at {STORE_NAME}!",
        product.name,
        price_label(product.price)
    )
}

pub fn share_link(
    platform: SharePlatform,
    product: &Product,
    page_url: &str,
) -> Result<Url, url::ParseError> {
    let text = share_text(product);
    match platform {
        SharePlatform::Facebook => Url::parse_with_params(
            "https://www.facebook.com/sharer/sharer.php",
            &[("u", page_url)],
        ),
        SharePlatform::Twitter => Url::parse_with_params(
            "https://twitter.com/intent/tweet",
            &[("text", text.as_str()), ("url", page_url)],
        ),
        SharePlatform::WhatsApp => Url::parse_with_params(
            "https://wa.me/",
            &[("text", format!("{text} {page_url}").as_str())],
        ),
    }
}

#[cfg(test)]
#[path = "tests/listing_tests.rs"]
mod tests;
