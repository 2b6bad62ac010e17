//! Expense ledger records.
//!
//! Financial facts (amount, currency, converted amount, date) are immutable
//! after creation; only annotations may change. Retraction sets `deleted_at`
//! and never removes the row.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, MoneyCents, util::parse_uuid};

/// Whether a query should see retracted expenses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tombstones {
    #[default]
    Exclude,
    Include,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: String,
    pub group_id: Option<String>,
    pub amount: MoneyCents,
    pub currency: Currency,
    pub converted_amount: MoneyCents,
    pub reference_currency: Currency,
    pub category: String,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub annotations: ExpenseAnnotations,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Expense {
    pub fn is_retracted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Owner-editable fields of an expense.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseAnnotations {
    pub is_verified: bool,
    pub image_url: Option<String>,
    pub emotional_state: Option<String>,
    pub is_impulsive: bool,
    pub mindfulness_score: f64,
    pub is_recurring: bool,
    pub is_essential: bool,
    pub payment_mode: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub group_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub converted_amount_minor: i64,
    pub reference_currency: String,
    pub category: String,
    pub tags: Json,
    pub description: Option<String>,
    pub date: DateTimeUtc,
    pub is_verified: bool,
    pub image_url: Option<String>,
    pub emotional_state: Option<String>,
    pub is_impulsive: bool,
    pub mindfulness_score: f64,
    pub is_recurring: bool,
    pub is_essential: bool,
    pub payment_mode: Option<String>,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::split_expenses::Entity")]
    SplitExpenses,
}

impl Related<super::split_expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitExpenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            user_id: ActiveValue::Set(expense.user_id.clone()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            currency: ActiveValue::Set(expense.currency.code().to_string()),
            converted_amount_minor: ActiveValue::Set(expense.converted_amount.cents()),
            reference_currency: ActiveValue::Set(expense.reference_currency.code().to_string()),
            category: ActiveValue::Set(expense.category.clone()),
            tags: ActiveValue::Set(serde_json::json!(expense.tags)),
            description: ActiveValue::Set(expense.description.clone()),
            date: ActiveValue::Set(expense.date),
            is_verified: ActiveValue::Set(expense.annotations.is_verified),
            image_url: ActiveValue::Set(expense.annotations.image_url.clone()),
            emotional_state: ActiveValue::Set(expense.annotations.emotional_state.clone()),
            is_impulsive: ActiveValue::Set(expense.annotations.is_impulsive),
            mindfulness_score: ActiveValue::Set(expense.annotations.mindfulness_score),
            is_recurring: ActiveValue::Set(expense.annotations.is_recurring),
            is_essential: ActiveValue::Set(expense.annotations.is_essential),
            payment_mode: ActiveValue::Set(expense.annotations.payment_mode.clone()),
            created_at: ActiveValue::Set(expense.created_at),
            deleted_at: ActiveValue::Set(expense.deleted_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let tags: Vec<String> = serde_json::from_value(model.tags)
            .map_err(|_| EngineError::InvalidAmount("invalid expense tags".to_string()))?;
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            user_id: model.user_id,
            group_id: model.group_id,
            amount: MoneyCents::new(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            converted_amount: MoneyCents::new(model.converted_amount_minor),
            reference_currency: Currency::try_from(model.reference_currency.as_str())?,
            category: model.category,
            tags,
            description: model.description,
            date: model.date,
            annotations: ExpenseAnnotations {
                is_verified: model.is_verified,
                image_url: model.image_url,
                emotional_state: model.emotional_state,
                is_impulsive: model.is_impulsive,
                mindfulness_score: model.mindfulness_score,
                is_recurring: model.is_recurring,
                is_essential: model.is_essential,
                payment_mode: model.payment_mode,
            },
            created_at: model.created_at,
            deleted_at: model.deleted_at,
        })
    }
}
