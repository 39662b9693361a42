use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::Role;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// 'seller' or 'manager'. Superusers do not need a role.
    pub role: Option<String>,
    pub is_superuser: bool,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String, // +250XXXXXXXXX
    pub address: String,
    pub national_id: String,
    /// Stored path of the profile signature image used on agreements
    pub signature: Option<String>,
    pub is_suspended: bool,
    pub suspended_at: Option<String>,
    pub suspended_reason: String,
    pub suspended_by: Option<i32>, // manager who suspended this user
    pub date_joined: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::phone::Entity")]
    OwnedPhones,
}

impl Related<super::phone::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OwnedPhones.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    pub fn is_manager(&self) -> bool {
        self.role() == Some(Role::Manager)
    }

    /// Managers and superusers share the management surface.
    pub fn can_manage(&self) -> bool {
        self.is_superuser || self.is_manager()
    }

    /// Suspension only binds regular accounts.
    pub fn is_held(&self) -> bool {
        self.is_suspended && !self.is_superuser
    }

    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }

    /// Agreements carry the dealer's identity, so these must all be filled in.
    pub fn profile_complete(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.phone_number,
            &self.address,
            &self.national_id,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
            && self.signature.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn is_pending_approval(&self) -> bool {
        self.is_suspended && self.suspended_reason.to_lowercase().contains("pending")
    }
}
