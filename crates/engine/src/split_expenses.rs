//! Split expenses: one expense bound to a group, a policy and its deadlines.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, MoneyCents, ResultEngine,
    split::{SplitKind, SplitPolicy},
    util::parse_uuid,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitExpense {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub group_id: String,
    pub created_by: String,
    pub total_amount: MoneyCents,
    pub currency: Currency,
    pub policy: SplitPolicy,
    pub remainder_holder: String,
    pub settlement_priority: i32,
    pub grace_end_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub needs_approval: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "split_expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub group_id: String,
    pub created_by: String,
    pub total_amount_minor: i64,
    pub currency: String,
    pub split_kind: String,
    pub policy: Json,
    pub remainder_holder: String,
    pub settlement_priority: i32,
    pub grace_end_date: DateTimeUtc,
    pub due_date: DateTimeUtc,
    pub needs_approval: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Expense,
    #[sea_orm(has_many = "super::split_shares::Entity")]
    Shares,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl Related<super::split_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&SplitExpense> for ActiveModel {
    type Error = EngineError;

    fn try_from(split: &SplitExpense) -> ResultEngine<Self> {
        let policy = serde_json::to_value(&split.policy)
            .map_err(|err| EngineError::InvalidSplitPolicy(err.to_string()))?;
        Ok(Self {
            id: ActiveValue::Set(split.id.to_string()),
            expense_id: ActiveValue::Set(split.expense_id.to_string()),
            group_id: ActiveValue::Set(split.group_id.clone()),
            created_by: ActiveValue::Set(split.created_by.clone()),
            total_amount_minor: ActiveValue::Set(split.total_amount.cents()),
            currency: ActiveValue::Set(split.currency.code().to_string()),
            split_kind: ActiveValue::Set(split.policy.kind().as_str().to_string()),
            policy: ActiveValue::Set(policy),
            remainder_holder: ActiveValue::Set(split.remainder_holder.clone()),
            settlement_priority: ActiveValue::Set(split.settlement_priority),
            grace_end_date: ActiveValue::Set(split.grace_end_date),
            due_date: ActiveValue::Set(split.due_date),
            needs_approval: ActiveValue::Set(split.needs_approval),
            created_at: ActiveValue::Set(split.created_at),
        })
    }
}

impl TryFrom<Model> for SplitExpense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let policy: SplitPolicy = serde_json::from_value(model.policy)
            .map_err(|err| EngineError::InvalidSplitPolicy(err.to_string()))?;
        if policy.kind() != SplitKind::try_from(model.split_kind.as_str())? {
            return Err(EngineError::InvalidSplitPolicy(
                "stored policy does not match split kind".to_string(),
            ));
        }
        Ok(Self {
            id: parse_uuid(&model.id, "split")?,
            expense_id: parse_uuid(&model.expense_id, "expense")?,
            group_id: model.group_id,
            created_by: model.created_by,
            total_amount: MoneyCents::new(model.total_amount_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            policy,
            remainder_holder: model.remainder_holder,
            settlement_priority: model.settlement_priority,
            grace_end_date: model.grace_end_date,
            due_date: model.due_date,
            needs_approval: model.needs_approval,
            created_at: model.created_at,
        })
    }
}
