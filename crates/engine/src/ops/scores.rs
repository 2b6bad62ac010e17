use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, ScoreEntry,
    locks::LockKey,
    score::{INITIAL_SCORE_REASON, ScoreEntryKind},
    score_history,
    util::{normalize_required_text, unique_violation_as},
};

use super::{Engine, with_tx};

impl Engine {
    /// Returns the score chain of `user_id`, oldest first. A user without
    /// history gets an empty chain.
    pub async fn score_history(&self, caller: &str, user_id: &str) -> ResultEngine<Vec<ScoreEntry>> {
        self.require_self_or_admin(&self.database, caller, user_id)
            .await?;
        score_history::Entity::find()
            .filter(score_history::Column::UserId.eq(user_id.to_string()))
            .order_by_asc(score_history::Column::Seq)
            .all(&self.database)
            .await?
            .into_iter()
            .map(ScoreEntry::try_from)
            .collect()
    }

    /// Current score: the `new_score` of the latest entry, if any.
    pub async fn current_score(&self, caller: &str, user_id: &str) -> ResultEngine<Option<f64>> {
        self.require_self_or_admin(&self.database, caller, user_id)
            .await?;
        Ok(self
            .latest_score_entry(&self.database, user_id)
            .await?
            .map(|entry| entry.new_score))
    }

    /// Seeds the chain with the configured baseline.
    pub async fn initialize_score(
        &self,
        caller: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<ScoreEntry> {
        let _guard = self.locks.lock(LockKey::Score(user_id.to_string())).await;
        let entry = with_tx!(self, |db_tx| {
            self.require_self_or_admin(&db_tx, caller, user_id).await?;
            if self.latest_score_entry(&db_tx, user_id).await?.is_some() {
                return Err(EngineError::ScoreAlreadyInitialized(user_id.to_string()));
            }
            let entry = ScoreEntry::next(
                None,
                user_id,
                self.score_policy.baseline,
                INITIAL_SCORE_REASON,
                ScoreEntryKind::Initial,
                at,
            )
            .recorded_by(caller);
            self.insert_score_entry(&db_tx, &entry).await?;
            Ok(entry)
        })?;
        tracing::info!("score of {user_id} initialized at {}", entry.new_score);
        Ok(entry)
    }

    /// Applies a saturating delta to the chain of `user_id`.
    ///
    /// A user without history starts from 0.
    pub async fn apply_score_adjustment(
        &self,
        user_id: &str,
        delta: f64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<ScoreEntry> {
        let reason = normalize_required_text(reason, "reason")?;
        let _guard = self.locks.lock(LockKey::Score(user_id.to_string())).await;
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            self.append_adjustment(&db_tx, user_id, delta, &reason, at)
                .await
        })
    }

    /// Administrative override. Out-of-range values are rejected, not
    /// clamped, and the chain must already be initialized.
    pub async fn override_score(
        &self,
        caller: &str,
        user_id: &str,
        new_score: f64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<ScoreEntry> {
        let reason = normalize_required_text(reason, "reason")?;
        self.score_policy.ensure_in_range(new_score)?;
        let _guard = self.locks.lock(LockKey::Score(user_id.to_string())).await;
        let entry = with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, caller).await?;
            self.require_user_exists(&db_tx, user_id).await?;
            let previous = self
                .latest_score_entry(&db_tx, user_id)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound(format!("score of {user_id} is not initialized"))
                })?;
            let entry = ScoreEntry::next(
                Some(&previous),
                user_id,
                new_score,
                &reason,
                ScoreEntryKind::Override,
                at,
            )
            .recorded_by(caller);
            self.insert_score_entry(&db_tx, &entry).await?;
            Ok(entry)
        })?;
        tracing::info!(
            "score of {user_id} overridden by {caller}: {} -> {}",
            entry.old_score,
            entry.new_score
        );
        Ok(entry)
    }

    /// Appends an adjustment inside an open transaction. The caller holds
    /// the score lock of `user_id`.
    pub(super) async fn append_adjustment<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        delta: f64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<ScoreEntry> {
        let previous = self.latest_score_entry(db, user_id).await?;
        let old_score = previous.as_ref().map_or(0.0, |entry| entry.new_score);
        let entry = ScoreEntry::next(
            previous.as_ref(),
            user_id,
            self.score_policy.adjusted(old_score, delta),
            reason,
            ScoreEntryKind::Adjustment,
            at,
        );
        self.insert_score_entry(db, &entry).await?;
        tracing::debug!(
            "score of {user_id}: {} -> {} ({reason})",
            entry.old_score,
            entry.new_score
        );
        Ok(entry)
    }

    async fn latest_score_entry<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Option<ScoreEntry>> {
        score_history::Entity::find()
            .filter(score_history::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(score_history::Column::Seq)
            .one(db)
            .await?
            .map(ScoreEntry::try_from)
            .transpose()
    }

    async fn insert_score_entry<C: ConnectionTrait>(
        &self,
        db: &C,
        entry: &ScoreEntry,
    ) -> ResultEngine<()> {
        score_history::ActiveModel::from(entry)
            .insert(db)
            .await
            .map_err(|err| {
                unique_violation_as(err, || {
                    EngineError::ConcurrentMutation(format!(
                        "score chain of {} moved while appending",
                        entry.user_id
                    ))
                })
            })?;
        Ok(())
    }
}

impl ScoreEntry {
    /// Builds the entry that follows `previous` in a chain.
    fn next(
        previous: Option<&ScoreEntry>,
        user_id: &str,
        new_score: f64,
        reason: &str,
        kind: ScoreEntryKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            seq: previous.map_or(1, |entry| entry.seq + 1),
            old_score: previous.map_or(0.0, |entry| entry.new_score),
            new_score,
            reason: reason.to_string(),
            kind,
            recorded_by: None,
            timestamp,
        }
    }

    fn recorded_by(mut self, caller: &str) -> Self {
        self.recorded_by = Some(caller.to_string());
        self
    }
}
