use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "corporate_inquiries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub company_name: String,
    pub email: String,
    pub phone: String,
    #[sea_orm(column_type = "Text")]
    pub requirement: String,
    pub status: InquiryStatus,
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            self.updated_at = Set(Utc::now());
        }
        Ok(self)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InquiryStatus {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "contacted")]
    Contacted,
    #[sea_orm(string_value = "quoted")]
    Quoted,
    #[sea_orm(string_value = "converted")]
    Converted,
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl InquiryStatus {
    fn rank(self) -> Option<u8> {
        match self {
            InquiryStatus::New => Some(0),
            InquiryStatus::Contacted => Some(1),
            InquiryStatus::Quoted => Some(2),
            InquiryStatus::Converted => Some(3),
            InquiryStatus::Closed => None,
        }
    }

    /// Forward along the sales pipeline, or to `Closed` from anything still open.
    pub fn can_transition_to(self, next: InquiryStatus) -> bool {
        match (self.rank(), next.rank()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(from), Some(to)) => to > from,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryView {
    pub id: Uuid,
    pub name: String,
    pub company_name: String,
    pub email: String,
    pub phone: String,
    pub requirement: String,
    pub status: InquiryStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for InquiryView {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            company_name: model.company_name,
            email: model.email,
            phone: model.phone,
            requirement: model.requirement,
            status: model.status,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
