use crate::{
    db::DbPool,
    entities::corporate_inquiry::{self, InquiryStatus, InquiryView},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{Page, PageRequest},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub const INQUIRY_PAGE_SIZE: u64 = 50;
const MISSING_FIELDS: &str = "Please provide all required fields";

/// Public bulk-order form. Every field is required, but all are optional on
/// the wire so a missing one gets the same message as a blank one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInquiryRequest {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub requirement: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInquiryRequest {
    pub status: Option<InquiryStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InquiryFilter {
    pub status: Option<InquiryStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryStats {
    pub total: u64,
    pub new_inquiries: u64,
    pub contacted: u64,
    pub converted: u64,
}

fn required(value: Option<String>) -> Result<String, ServiceError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::ValidationError(MISSING_FIELDS.to_string()))
}

/// Corporate and bulk-order inquiries
#[derive(Clone)]
pub struct InquiryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InquiryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_inquiry(
        &self,
        request: CreateInquiryRequest,
    ) -> Result<InquiryView, ServiceError> {
        let name = required(request.name)?;
        let company_name = required(request.company_name)?;
        let email = required(request.email)?.to_lowercase();
        let phone = required(request.phone)?;
        let requirement = required(request.requirement)?;

        if !validator::validate_email(email.as_str()) {
            return Err(ServiceError::ValidationError(
                "Please provide a valid email address".to_string(),
            ));
        }

        let now = Utc::now();
        let model = corporate_inquiry::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            company_name: Set(company_name),
            email: Set(email),
            phone: Set(phone),
            requirement: Set(requirement),
            status: Set(InquiryStatus::New),
            notes: Set(String::new()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(inquiry_id = %model.id, company = %model.company_name, "inquiry received");
        self.event_sender
            .send_or_log(Event::InquiryReceived(model.id))
            .await;
        Ok(InquiryView::from(model))
    }

    /// Newest first
    #[instrument(skip(self))]
    pub async fn list_inquiries(
        &self,
        filter: InquiryFilter,
    ) -> Result<Page<InquiryView>, ServiceError> {
        let request = PageRequest::new(filter.page, filter.limit, INQUIRY_PAGE_SIZE);
        let mut query = corporate_inquiry::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(corporate_inquiry::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(corporate_inquiry::Column::CreatedAt)
            .paginate(&*self.db_pool, request.limit);
        let total = paginator.num_items().await?;
        let inquiries = paginator.fetch_page(request.index()).await?;
        Ok(Page::new(inquiries, total, request).map(InquiryView::from))
    }

    async fn find_model(&self, id: Uuid) -> Result<corporate_inquiry::Model, ServiceError> {
        corporate_inquiry::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Inquiry not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get_inquiry(&self, id: Uuid) -> Result<InquiryView, ServiceError> {
        self.find_model(id).await.map(InquiryView::from)
    }

    #[instrument(skip(self, request))]
    pub async fn update_inquiry(
        &self,
        id: Uuid,
        request: UpdateInquiryRequest,
    ) -> Result<InquiryView, ServiceError> {
        let existing = self.find_model(id).await?;
        let current = existing.status;
        let mut active = existing.into_active_model();

        if let Some(next) = request.status {
            if next != current {
                if !current.can_transition_to(next) {
                    return Err(ServiceError::ValidationError(format!(
                        "Cannot change inquiry status from {} to {}",
                        current, next
                    )));
                }
                active.status = Set(next);
                info!(inquiry_id = %id, from = %current, to = %next, "inquiry status changed");
            }
        }
        if let Some(notes) = request.notes {
            active.notes = Set(notes);
        }

        let updated = active.update(&*self.db_pool).await?;
        Ok(InquiryView::from(updated))
    }

    #[instrument(skip(self))]
    pub async fn inquiry_stats(&self) -> Result<InquiryStats, ServiceError> {
        let db = &*self.db_pool;
        let count_with = |status: InquiryStatus| {
            corporate_inquiry::Entity::find()
                .filter(corporate_inquiry::Column::Status.eq(status))
                .count(db)
        };

        Ok(InquiryStats {
            total: corporate_inquiry::Entity::find().count(db).await?,
            new_inquiries: count_with(InquiryStatus::New).await?,
            contacted: count_with(InquiryStatus::Contacted).await?,
            converted: count_with(InquiryStatus::Converted).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_missing_fields_share_one_message() {
        for value in [None, Some(String::new()), Some("   ".to_string())] {
            match required(value) {
                Err(ServiceError::ValidationError(msg)) => assert_eq!(msg, MISSING_FIELDS),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
        assert_eq!(required(Some(" Acme ".into())).unwrap(), "Acme");
    }

    #[test]
    fn stats_serialize_in_camel_case() {
        let stats = InquiryStats {
            total: 4,
            new_inquiries: 2,
            contacted: 1,
            converted: 1,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["newInquiries"], 2);
        assert_eq!(json["converted"], 1);
    }
}
