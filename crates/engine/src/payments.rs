//! Payments recorded against a share. Append-only.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub split_share_id: Uuid,
    pub amount: MoneyCents,
    pub paid_at: DateTime<Utc>,
    pub method: String,
    pub idempotency_key: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub split_share_id: String,
    pub amount_minor: i64,
    pub paid_at: DateTimeUtc,
    pub method: String,
    pub idempotency_key: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::split_shares::Entity",
        from = "Column::SplitShareId",
        to = "super::split_shares::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Share,
}

impl Related<super::split_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Share.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            split_share_id: ActiveValue::Set(payment.split_share_id.to_string()),
            amount_minor: ActiveValue::Set(payment.amount.cents()),
            paid_at: ActiveValue::Set(payment.paid_at),
            method: ActiveValue::Set(payment.method.clone()),
            idempotency_key: ActiveValue::Set(payment.idempotency_key.clone()),
            recorded_by: ActiveValue::Set(payment.recorded_by.clone()),
            created_at: ActiveValue::Set(payment.created_at),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "payment")?,
            split_share_id: parse_uuid(&model.split_share_id, "share")?,
            amount: MoneyCents::new(model.amount_minor),
            paid_at: model.paid_at,
            method: model.method,
            idempotency_key: model.idempotency_key,
            recorded_by: model.recorded_by,
            created_at: model.created_at,
        })
    }
}
