use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Categories whose products are personalised and need a name printed on them.
pub const PERSONALIZED_CATEGORIES: &[&str] = &["Treat Jars"];

pub fn requires_custom_name(category: &str) -> bool {
    PERSONALIZED_CATEGORIES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(category.trim()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default = "chrono::Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Product {
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: String,
    pub title: String,
    pub image: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub collection: Option<String>,
    pub sale: Option<bool>,
}

impl ProductFilter {
    pub fn matches(&self, p: &Product) -> bool {
        if let Some(c) = &self.category {
            if !p.category.eq_ignore_ascii_case(c) {
                return false;
            }
        }
        if let Some(c) = &self.collection {
            if !p.collection.as_deref().is_some_and(|pc| pc.eq_ignore_ascii_case(c)) {
                return false;
            }
        }
        if let Some(sale) = self.sale {
            if p.on_sale != sale {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(category: &str, collection: Option<&str>, on_sale: bool) -> Product {
        Product {
            id: "p1".to_string(),
            title: "Thing".to_string(),
            description: String::new(),
            price: 100.0,
            original_price: None,
            images: vec![],
            category: category.to_string(),
            collection: collection.map(str::to_string),
            sizes: vec!["M".to_string()],
            on_sale,
            in_stock: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn treat_jars_need_a_name() {
        assert!(requires_custom_name("Treat Jars"));
        assert!(requires_custom_name("treat jars "));
        assert!(!requires_custom_name("Collars"));
    }

    #[test]
    fn filter_combines_all_fields() {
        let f = ProductFilter {
            category: Some("collars".to_string()),
            collection: Some("festive".to_string()),
            sale: Some(true),
        };
        assert!(f.matches(&product("Collars", Some("Festive"), true)));
        assert!(!f.matches(&product("Collars", None, true)));
        assert!(!f.matches(&product("Collars", Some("Festive"), false)));
        assert!(ProductFilter::default().matches(&product("Bowls", None, false)));
    }
}
