use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Deserializer, Serialize};

use super::Lifecycle;

pub const DEFAULT_COLOR: &str = "#0ea5e9";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "schools")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub color: String,
    #[sea_orm(column_type = "Json")]
    pub categories: SchoolCategories,
    pub logo: Option<String>,
    pub image: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchoolCategory {
    PrePrimary,
    Primary,
    Secondary,
    Institution,
}

/// Non-empty set of classifications; accepts a single value or a list on input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromJsonQueryResult)]
pub struct SchoolCategories(pub Vec<SchoolCategory>);

impl Default for SchoolCategories {
    fn default() -> Self {
        SchoolCategories(vec![SchoolCategory::Primary])
    }
}

impl SchoolCategories {
    /// Drops duplicates keeping first occurrence; an empty input falls back to the default.
    pub fn normalized(values: Vec<SchoolCategory>) -> Self {
        let mut unique = Vec::with_capacity(values.len());
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        if unique.is_empty() {
            Self::default()
        } else {
            SchoolCategories(unique)
        }
    }

    pub fn contains(&self, category: SchoolCategory) -> bool {
        self.0.contains(&category)
    }
}

impl<'de> Deserialize<'de> for SchoolCategories {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(SchoolCategory),
            Many(Vec<SchoolCategory>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(category) => SchoolCategories(vec![category]),
            OneOrMany::Many(categories) => SchoolCategories::normalized(categories),
        })
    }
}

/// Wire representation of a school
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub category: SchoolCategories,
    pub logo: Option<String>,
    pub image: Option<String>,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<u64>,
}

impl From<&Model> for SchoolView {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            slug: model.slug.clone(),
            color: model.color.clone(),
            category: model.categories.clone(),
            logo: model.logo.clone(),
            image: model.image.clone(),
            description: model.description.clone(),
            is_active: model.lifecycle.is_active(),
            created_at: model.created_at,
            updated_at: model.updated_at,
            product_count: None,
        }
    }
}

impl From<Model> for SchoolView {
    fn from(model: Model) -> Self {
        SchoolView::from(&model)
    }
}

impl SchoolView {
    pub fn with_product_count(mut self, count: u64) -> Self {
        self.product_count = Some(count);
        self
    }
}

/// School fields embedded in product views
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub color: String,
}

impl From<&Model> for SchoolSummary {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            slug: model.slug.clone(),
            logo: model.logo.clone(),
            color: model.color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_accept_single_value() {
        let parsed: SchoolCategories = serde_json::from_str("\"pre-primary\"").unwrap();
        assert_eq!(parsed.0, vec![SchoolCategory::PrePrimary]);
    }

    #[test]
    fn categories_dedupe_and_default_when_empty() {
        let parsed: SchoolCategories =
            serde_json::from_str(r#"["secondary","primary","secondary"]"#).unwrap();
        assert_eq!(
            parsed.0,
            vec![SchoolCategory::Secondary, SchoolCategory::Primary]
        );

        let empty: SchoolCategories = serde_json::from_str("[]").unwrap();
        assert_eq!(empty, SchoolCategories::default());
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(serde_json::from_str::<SchoolCategories>("\"university\"").is_err());
    }
}
