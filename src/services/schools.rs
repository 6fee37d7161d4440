use crate::{
    common::slugify,
    db::DbPool,
    entities::{
        product,
        school::{self, SchoolCategories, SchoolCategory, SchoolView},
        Lifecycle,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

const DUPLICATE_SCHOOL: &str = "A school with this name already exists";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolRequest {
    #[validate(length(min = 1, max = 120, message = "School name is required"))]
    pub name: String,
    pub color: Option<String>,
    #[serde(default)]
    pub category: Option<SchoolCategories>,
    pub logo: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchoolRequest {
    #[validate(length(min = 1, max = 120, message = "School name is required"))]
    pub name: Option<String>,
    pub color: Option<String>,
    pub category: Option<SchoolCategories>,
    pub logo: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Schools side of the catalog
#[derive(Clone)]
pub struct SchoolService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

fn derive_slug(name: &str) -> Result<String, ServiceError> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ServiceError::ValidationError(
            "School name must contain letters or digits".to_string(),
        ));
    }
    Ok(slug)
}

impl SchoolService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Active schools, alphabetical
    #[instrument(skip(self))]
    pub async fn list_schools(&self) -> Result<Vec<SchoolView>, ServiceError> {
        let schools = school::Entity::find()
            .filter(school::Column::Lifecycle.eq(Lifecycle::Active))
            .order_by_asc(school::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(schools.into_iter().map(SchoolView::from).collect())
    }

    /// Looks up an active school by id or by slug.
    #[instrument(skip(self))]
    pub async fn get_school(&self, id_or_slug: &str) -> Result<SchoolView, ServiceError> {
        let matcher = match Uuid::parse_str(id_or_slug) {
            Ok(id) => Condition::any()
                .add(school::Column::Id.eq(id))
                .add(school::Column::Slug.eq(id_or_slug)),
            Err(_) => Condition::all().add(school::Column::Slug.eq(id_or_slug)),
        };

        school::Entity::find()
            .filter(matcher)
            .filter(school::Column::Lifecycle.eq(Lifecycle::Active))
            .one(&*self.db_pool)
            .await?
            .map(SchoolView::from)
            .ok_or_else(|| ServiceError::NotFound("School not found".to_string()))
    }

    async fn find_model(&self, id: Uuid) -> Result<school::Model, ServiceError> {
        school::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("School not found".to_string()))
    }

    async fn ensure_unique(
        &self,
        name: &str,
        slug: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = school::Entity::find().filter(
            Condition::any()
                .add(school::Column::Name.eq(name))
                .add(school::Column::Slug.eq(slug)),
        );
        if let Some(id) = except {
            query = query.filter(school::Column::Id.ne(id));
        }
        if query.count(&*self.db_pool).await? > 0 {
            return Err(ServiceError::Conflict(DUPLICATE_SCHOOL.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_school(
        &self,
        request: CreateSchoolRequest,
    ) -> Result<SchoolView, ServiceError> {
        request.validate()?;
        let name = request.name.trim().to_string();
        let slug = derive_slug(&name)?;
        self.ensure_unique(&name, &slug, None).await?;

        let now = Utc::now();
        let model = school::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
            color: Set(request
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| school::DEFAULT_COLOR.to_string())),
            categories: Set(request.category.unwrap_or_default()),
            logo: Set(request.logo),
            image: Set(request.image),
            description: Set(request.description),
            lifecycle: Set(Lifecycle::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| ServiceError::from_write(e, DUPLICATE_SCHOOL))?;

        info!(school_id = %model.id, slug = %model.slug, "school created");
        Ok(SchoolView::from(model))
    }

    /// Partial update; a new name re-derives the slug.
    #[instrument(skip(self, request))]
    pub async fn update_school(
        &self,
        id: Uuid,
        request: UpdateSchoolRequest,
    ) -> Result<SchoolView, ServiceError> {
        request.validate()?;
        let existing = self.find_model(id).await?;
        let mut active = existing.clone().into_active_model();

        if let Some(name) = request.name.as_deref().map(str::trim) {
            if name != existing.name {
                let slug = derive_slug(name)?;
                self.ensure_unique(name, &slug, Some(id)).await?;
                active.name = Set(name.to_string());
                active.slug = Set(slug);
            }
        }
        if let Some(color) = request.color {
            active.color = Set(color);
        }
        if let Some(categories) = request.category {
            active.categories = Set(categories);
        }
        if let Some(logo) = request.logo {
            active.logo = Set(Some(logo));
        }
        if let Some(image) = request.image {
            active.image = Set(Some(image));
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(is_active) = request.is_active {
            active.lifecycle = Set(Lifecycle::from_active_flag(is_active));
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_write(e, DUPLICATE_SCHOOL))?;
        Ok(SchoolView::from(updated))
    }

    /// Soft delete. Refused while active products still reference the school.
    #[instrument(skip(self))]
    pub async fn retire_school(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_model(id).await?;

        let product_count = product::Entity::find()
            .filter(product::Column::SchoolId.eq(id))
            .filter(product::Column::Lifecycle.eq(Lifecycle::Active))
            .count(&*self.db_pool)
            .await?;
        if product_count > 0 {
            return Err(ServiceError::ValidationError(format!(
                "Cannot delete school. It has {} associated products. Please remove or reassign products first.",
                product_count
            )));
        }

        let mut active = existing.into_active_model();
        active.lifecycle = Set(Lifecycle::Retired);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db_pool).await?;

        info!(school_id = %id, "school retired");
        self.event_sender.send_or_log(Event::SchoolRetired(id)).await;
        Ok(())
    }

    /// Every school regardless of lifecycle, each with its active product count.
    #[instrument(skip(self))]
    pub async fn list_schools_with_stats(&self) -> Result<Vec<SchoolView>, ServiceError> {
        let schools = school::Entity::find()
            .order_by_asc(school::Column::Name)
            .all(&*self.db_pool)
            .await?;

        let counts: HashMap<Uuid, i64> = product::Entity::find()
            .select_only()
            .column(product::Column::SchoolId)
            .column_as(product::Column::Id.count(), "product_count")
            .filter(product::Column::SchoolId.is_not_null())
            .filter(product::Column::Lifecycle.eq(Lifecycle::Active))
            .group_by(product::Column::SchoolId)
            .into_tuple::<(Option<Uuid>, i64)>()
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .filter_map(|(school_id, count)| school_id.map(|id| (id, count)))
            .collect();

        Ok(schools
            .into_iter()
            .map(|model| {
                let count = counts.get(&model.id).copied().unwrap_or(0);
                SchoolView::from(model).with_product_count(count.max(0) as u64)
            })
            .collect())
    }

    /// Schools in `category` among the active ones
    #[instrument(skip(self))]
    pub async fn list_schools_in_category(
        &self,
        category: SchoolCategory,
    ) -> Result<Vec<SchoolView>, ServiceError> {
        Ok(self
            .list_schools()
            .await?
            .into_iter()
            .filter(|view| view.category.contains(category))
            .collect())
    }
}
