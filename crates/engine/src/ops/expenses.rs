use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, ExpenseAnnotations, MoneyCents, NewExpenseCmd, ResultEngine, expenses,
    expenses::Tombstones,
    rates,
    util::{normalize_optional_text, normalize_required_text},
};

use super::{Engine, with_tx};

fn validate_annotations(annotations: &ExpenseAnnotations) -> ResultEngine<ExpenseAnnotations> {
    let score = annotations.mindfulness_score;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(EngineError::InvalidAmount(format!(
            "mindfulness score must be between 0 and 100, got {score}"
        )));
    }
    Ok(ExpenseAnnotations {
        image_url: normalize_optional_text(annotations.image_url.as_deref()),
        emotional_state: normalize_optional_text(annotations.emotional_state.as_deref()),
        payment_mode: normalize_optional_text(annotations.payment_mode.as_deref()),
        ..annotations.clone()
    })
}

impl Engine {
    /// Records an expense, converting its amount into the reference currency.
    pub async fn create_expense(&self, cmd: NewExpenseCmd) -> ResultEngine<Expense> {
        let amount = MoneyCents::new(cmd.amount_minor);
        if !amount.is_positive() {
            return Err(EngineError::NonPositiveAmount(format!(
                "expense amount is {amount}"
            )));
        }
        let category = normalize_required_text(&cmd.category, "category")?;
        let annotations = validate_annotations(&cmd.annotations)?;
        let converted = rates::convert(
            self.rates.as_ref(),
            amount,
            cmd.currency,
            self.reference_currency,
        )?;

        let expense = Expense {
            id: Uuid::new_v4(),
            user_id: cmd.caller.clone(),
            group_id: normalize_optional_text(cmd.group_id.as_deref()),
            amount,
            currency: cmd.currency,
            converted_amount: converted,
            reference_currency: self.reference_currency,
            category,
            tags: cmd
                .tags
                .iter()
                .filter_map(|t| normalize_optional_text(Some(t)))
                .collect(),
            description: normalize_optional_text(cmd.description.as_deref()),
            date: cmd.date,
            annotations,
            created_at: Utc::now(),
            deleted_at: None,
        };

        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, &cmd.caller).await?;
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
            Ok(())
        })?;

        tracing::debug!(
            "expense {} recorded by {}: {} {}",
            expense.id,
            expense.user_id,
            expense.amount,
            expense.currency
        );
        Ok(expense)
    }

    /// Replaces the owner-editable annotations of an expense.
    pub async fn update_expense_annotations(
        &self,
        caller: &str,
        expense_id: Uuid,
        annotations: ExpenseAnnotations,
    ) -> ResultEngine<Expense> {
        let annotations = validate_annotations(&annotations)?;
        with_tx!(self, |db_tx| {
            let model = self
                .require_expense_owner(&db_tx, expense_id, caller, Tombstones::Exclude)
                .await?;
            let mut active: expenses::ActiveModel = model.into();
            active.is_verified = ActiveValue::Set(annotations.is_verified);
            active.image_url = ActiveValue::Set(annotations.image_url.clone());
            active.emotional_state = ActiveValue::Set(annotations.emotional_state.clone());
            active.is_impulsive = ActiveValue::Set(annotations.is_impulsive);
            active.mindfulness_score = ActiveValue::Set(annotations.mindfulness_score);
            active.is_recurring = ActiveValue::Set(annotations.is_recurring);
            active.is_essential = ActiveValue::Set(annotations.is_essential);
            active.payment_mode = ActiveValue::Set(annotations.payment_mode.clone());
            let updated = active.update(&db_tx).await?;
            Expense::try_from(updated)
        })
    }

    /// Tombstones an expense. The row is kept and stays visible to queries
    /// that ask for [`Tombstones::Include`].
    pub async fn retract_expense(
        &self,
        caller: &str,
        expense_id: Uuid,
        retracted_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_expense_owner(&db_tx, expense_id, caller, Tombstones::Include)
                .await?;
            if model.deleted_at.is_some() {
                return Err(EngineError::ExistingKey(format!(
                    "expense {expense_id} already retracted"
                )));
            }
            let active = expenses::ActiveModel {
                id: ActiveValue::Set(model.id),
                deleted_at: ActiveValue::Set(Some(retracted_at)),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Returns one of the caller's expenses.
    pub async fn expense(
        &self,
        caller: &str,
        expense_id: Uuid,
        tombstones: Tombstones,
    ) -> ResultEngine<Expense> {
        let model = self
            .require_expense_owner(&self.database, expense_id, caller, tombstones)
            .await?;
        Expense::try_from(model)
    }

    /// Lists the caller's expenses, most recent first.
    pub async fn list_expenses(
        &self,
        caller: &str,
        tombstones: Tombstones,
    ) -> ResultEngine<Vec<Expense>> {
        let mut query = expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(caller.to_string()))
            .order_by_desc(expenses::Column::Date)
            .order_by_desc(expenses::Column::CreatedAt);
        if tombstones == Tombstones::Exclude {
            query = query.filter(expenses::Column::DeletedAt.is_null());
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Expense::try_from)
            .collect()
    }

    pub(super) async fn require_expense_owner<C: ConnectionTrait>(
        &self,
        db: &C,
        expense_id: Uuid,
        caller: &str,
        tombstones: Tombstones,
    ) -> ResultEngine<expenses::Model> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(db)
            .await?
            .filter(|m| tombstones == Tombstones::Include || m.deleted_at.is_none())
            .ok_or_else(|| EngineError::KeyNotFound(format!("expense {expense_id}")))?;
        if model.user_id != caller {
            return Err(EngineError::Forbidden(
                "expense belongs to another user".to_string(),
            ));
        }
        Ok(model)
    }
}
