use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admins")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: AdminRole,
    pub status: AdminStatus,
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

impl Model {
    pub fn is_active(&self) -> bool {
        self.status == AdminStatus::Active
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AdminRole {
    #[sea_orm(string_value = "super-admin")]
    SuperAdmin,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
}

impl Default for AdminRole {
    fn default() -> Self {
        AdminRole::Admin
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum AdminStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "disabled")]
    Disabled,
}

/// Admin as returned to clients; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Model> for AdminView {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            email: model.email.clone(),
            role: model.role,
            is_active: model.is_active(),
            created_at: model.created_at,
        }
    }
}

impl From<Model> for AdminView {
    fn from(model: Model) -> Self {
        AdminView::from(&model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            name: "Office".into(),
            email: "office@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: AdminRole::SuperAdmin,
            status: AdminStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn serialized_admin_omits_password_hash() {
        let model = serde_json::to_value(sample()).unwrap();
        assert!(model.get("password_hash").is_none());

        let view = serde_json::to_value(AdminView::from(sample())).unwrap();
        assert!(view.get("passwordHash").is_none());
        assert_eq!(view["role"], "super-admin");
        assert_eq!(view["isActive"], true);
    }

    #[test]
    fn role_parses_wire_names() {
        assert_eq!(AdminRole::from_str("super-admin").unwrap(), AdminRole::SuperAdmin);
        assert_eq!(AdminRole::Manager.to_string(), "manager");
        assert!(AdminRole::from_str("owner").is_err());
    }
}
