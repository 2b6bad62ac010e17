//! Users table (minimal entity).
//!
//! Authentication lives outside the engine; the engine only needs to know a
//! user exists and whether it may perform administrative writes.

use sea_orm::entity::prelude::*;

use crate::EngineError;

pub const ROLE_MEMBER: &str = "member";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UserRole {
    Member,
    Admin,
}

impl TryFrom<&str> for UserRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            ROLE_MEMBER => Ok(Self::Member),
            ROLE_ADMIN => Ok(Self::Admin),
            other => Err(EngineError::Forbidden(format!("unknown role: {other}"))),
        }
    }
}
