use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ProductId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Laptops,
    Accessories,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Laptops, Category::Accessories];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Laptops => "laptops",
            Category::Accessories => "accessories",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "laptops" | "laptop" => Ok(Category::Laptops),
            "accessories" | "accessory" => Ok(Category::Accessories),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown product category '{0}'")]
pub struct UnknownCategory(pub String);

/// A purchasable item as published in the catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_price: Option<f64>,
    /// Free-form label from the document; partitioning is done by [`Catalog`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub best_seller: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<Vec<String>>,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub laptops: Vec<Product>,
    #[serde(default)]
    pub accessories: Vec<Product>,
}

impl Catalog {
    pub fn category(&self, category: Category) -> &[Product] {
        match category {
            Category::Laptops => &self.laptops,
            Category::Accessories => &self.accessories,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.laptops.iter().chain(self.accessories.iter())
    }

    pub fn find(&self, id: ProductId) -> Option<&Product> {
        self.iter().find(|product| product.id == id)
    }

    pub fn len(&self) -> usize {
        self.laptops.len() + self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids must be unique across every category.
    pub fn duplicate_id(&self) -> Option<ProductId> {
        let mut seen = HashSet::with_capacity(self.len());
        self.iter()
            .map(|product| product.id)
            .find(|id| !seen.insert(*id))
    }
}
