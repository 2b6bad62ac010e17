use sea_orm::{ConnectionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, split_expenses, split_shares,
    users::{self, UserRole},
};

use super::Engine;

impl Engine {
    pub(super) async fn require_user_exists<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<UserRole> {
        let user = users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))?;
        UserRole::try_from(user.role.as_str())
    }

    pub(super) async fn is_admin<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<bool> {
        Ok(self.require_user_exists(db, user_id).await? == UserRole::Admin)
    }

    pub(super) async fn require_admin<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &str,
    ) -> ResultEngine<()> {
        if !self.is_admin(db, caller).await? {
            return Err(EngineError::Forbidden(
                "administrator role required".to_string(),
            ));
        }
        Ok(())
    }

    /// Score chains are readable by their owner and by administrators.
    pub(super) async fn require_self_or_admin<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        if caller == user_id {
            self.require_user_exists(db, caller).await?;
            return Ok(());
        }
        self.require_admin(db, caller).await
    }

    /// Split data is visible to its creator, its participants and
    /// administrators.
    pub(super) async fn require_split_read<C: ConnectionTrait>(
        &self,
        db: &C,
        split: &split_expenses::Model,
        caller: &str,
    ) -> ResultEngine<()> {
        if split.created_by == caller {
            return Ok(());
        }
        let participant = split_shares::Entity::find()
            .filter(split_shares::Column::SplitExpenseId.eq(split.id.clone()))
            .filter(split_shares::Column::UserId.eq(caller.to_string()))
            .one(db)
            .await?
            .is_some();
        if participant || self.is_admin(db, caller).await? {
            return Ok(());
        }
        Err(EngineError::Forbidden(
            "not a participant of this split".to_string(),
        ))
    }
}
