// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Zamknięty zbiór kategorii dostępnych w formularzu.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Type, EnumString, Display, EnumIter, AsRefStr,
)]
#[sqlx(type_name = "product_category")]
pub enum Category {
    Laptop,
    Electronics,
    Fashion,
    Phone,
}

/// Zapisany rekord produktu.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub image_url: String,
    pub price: f64,
    pub category: Category,
    pub brand: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// To, co trafia do magazynu rekordów przy `create` i `replace`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub name: String,
    pub image_url: String,
    pub price: f64,
    pub category: Category,
    pub brand: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    pub fn into_product(self, id: Uuid) -> Product {
        Product {
            id,
            name: self.name,
            image_url: self.image_url,
            price: self.price,
            category: self.category,
            brand: self.brand,
            description: self.description,
            created_at: self.created_at,
            edited_at: self.edited_at,
        }
    }
}

/// Nazwy pól formularza, dokładnie takie jak atrybut `name` w HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, EnumIter, AsRefStr)]
pub enum DraftField {
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "imageURL")]
    ImageUrl,
    #[strum(serialize = "price")]
    Price,
    #[strum(serialize = "category")]
    Category,
    #[strum(serialize = "brand")]
    Brand,
    #[strum(serialize = "desc")]
    Desc,
}

/// Szkic edytowanego produktu. Wszystkie pola są tekstem, tak jak w formularzu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub image_url: String,
    pub price: String,
    pub category: String,
    pub brand: String,
    pub desc: String,
}

impl ProductDraft {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zwraca nowy szkic z podmienionym jednym polem; `self` zostaje nietknięty.
    #[must_use]
    pub fn with_field(&self, field: DraftField, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        let value = value.into();
        match field {
            DraftField::Name => next.name = value,
            DraftField::ImageUrl => next.image_url = value,
            DraftField::Price => next.price = value,
            DraftField::Category => next.category = value,
            DraftField::Brand => next.brand = value,
            DraftField::Desc => next.desc = value,
        }
        next
    }

    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::Name => &self.name,
            DraftField::ImageUrl => &self.image_url,
            DraftField::Price => &self.price,
            DraftField::Category => &self.category,
            DraftField::Brand => &self.brand,
            DraftField::Desc => &self.desc,
        }
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        ProductDraft {
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            price: product.price.to_string(),
            category: product.category.to_string(),
            brand: product.brand.clone(),
            desc: product.description.clone(),
        }
    }
}

/// Szkic po konwersji typów, gotowy do walidacji przed zapisem.
#[derive(Debug, Clone, Validate)]
pub struct ProductSubmission {
    #[validate(length(min = 1, max = 255, message = "Product name is required."))]
    pub name: String,

    pub image_url: String,

    #[validate(range(min = 0.0, message = "Price cannot be negative."))]
    pub price: f64,

    pub category: Category,

    #[validate(length(min = 1, max = 255, message = "Brand is required."))]
    pub brand: String,

    #[validate(length(min = 1, max = 5000, message = "Description is required."))]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn sample_draft() -> ProductDraft {
        ProductDraft {
            name: "ThinkPad".into(),
            image_url: "https://img/1.jpg".into(),
            price: "999".into(),
            category: "Laptop".into(),
            brand: "Lenovo".into(),
            desc: "14 cali".into(),
        }
    }

    #[test]
    fn with_field_replaces_only_the_named_field() {
        let draft = sample_draft();
        for field in DraftField::iter() {
            let next = draft.with_field(field, "zmienione");
            assert_eq!(next.get(field), "zmienione");
            for other in DraftField::iter().filter(|f| *f != field) {
                assert_eq!(next.get(other), draft.get(other));
            }
        }
        // oryginał bez zmian
        assert_eq!(draft, sample_draft());
    }

    #[test]
    fn with_field_is_idempotent() {
        let once = sample_draft().with_field(DraftField::Brand, "Dell");
        let twice = once.with_field(DraftField::Brand, "Dell");
        assert_eq!(once, twice);
    }

    #[test]
    fn draft_field_parses_form_names() {
        assert_eq!(DraftField::from_str("imageURL").ok(), Some(DraftField::ImageUrl));
        assert_eq!(DraftField::from_str("desc").ok(), Some(DraftField::Desc));
        assert!(DraftField::from_str("description").is_err());
    }

    #[test]
    fn category_accepts_only_the_four_names() {
        let names: Vec<String> = Category::iter().map(|c| c.to_string()).collect();
        assert_eq!(names, ["Laptop", "Electronics", "Fashion", "Phone"]);
        assert!(Category::from_str("Furniture").is_err());
        assert!(Category::from_str("").is_err());
    }

    #[test]
    fn draft_from_product_copies_fields() {
        let product = Product {
            id: Uuid::new_v4(),
            name: "Pixel".into(),
            image_url: "https://img/p.jpg".into(),
            price: 19.99,
            category: Category::Phone,
            brand: "Google".into(),
            description: "telefon".into(),
            created_at: Utc::now(),
            edited_at: None,
        };
        let draft = ProductDraft::from(&product);
        assert_eq!(draft.price, "19.99");
        assert_eq!(draft.category, "Phone");
        assert_eq!(draft.desc, "telefon");
        assert_eq!(draft.image_url, product.image_url);
    }
}
