use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    ResultEngine, ScoreEntry,
    locks::LockKey,
    settlement::{SettlementCompleted, SettlementStatus, pending_settlement_events, settlement_status},
    split_shares,
};

use super::{Engine, with_tx};

/// Outcome of a settlement evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SettlementReport {
    pub split_id: Uuid,
    pub status: SettlementStatus,
    /// Events emitted by this evaluation. Empty when the split was already
    /// notified or is not settled yet.
    pub events: Vec<SettlementCompleted>,
    pub score_entries: Vec<ScoreEntry>,
}

impl Engine {
    /// Evaluates the settlement state of a split on behalf of `caller`.
    ///
    /// Re-evaluating a settled split emits nothing new.
    pub async fn evaluate_settlement(
        &self,
        caller: &str,
        split_id: Uuid,
    ) -> ResultEngine<SettlementReport> {
        let model = self.require_split(&self.database, split_id).await?;
        self.require_split_read(&self.database, &model, caller)
            .await?;
        self.evaluate_split(split_id).await
    }

    /// Emits the pending [`SettlementCompleted`] events of a settled split
    /// and feeds them to the score chains, marking each share notified in
    /// the same transaction.
    pub(super) async fn evaluate_split(&self, split_id: Uuid) -> ResultEngine<SettlementReport> {
        let _split_guard = self.locks.lock(LockKey::Split(split_id.to_string())).await;
        let shares = self.live_shares(&self.database, split_id).await?;
        let status = settlement_status(&shares);
        if status != SettlementStatus::Settled || shares.iter().all(|s| s.settlement_notified) {
            return Ok(SettlementReport {
                split_id,
                status,
                events: Vec::new(),
                score_entries: Vec::new(),
            });
        }

        let score_keys = shares
            .iter()
            .map(|s| LockKey::Score(s.user_id.clone()))
            .collect();
        let _score_guards = self.locks.lock_all(score_keys).await;

        let report = with_tx!(self, |db_tx| {
            let split = self.require_split(&db_tx, split_id).await?;
            let shares = self.live_shares(&db_tx, split_id).await?;
            let events = pending_settlement_events(&shares, split.due_date);
            let now = Utc::now();

            let mut score_entries = Vec::with_capacity(events.len());
            for event in &events {
                let active = split_shares::ActiveModel {
                    id: ActiveValue::Set(event.share_id.to_string()),
                    settlement_notified: ActiveValue::Set(true),
                    ..Default::default()
                };
                active.update(&db_tx).await?;

                let reason = if event.on_time {
                    format!("Split {split_id} settled on time")
                } else {
                    format!("Split {split_id} settled late")
                };
                let delta = self.score_policy.settlement_delta(event.on_time);
                score_entries.push(
                    self.append_adjustment(&db_tx, &event.user_id, delta, &reason, now)
                        .await?,
                );
            }

            Ok(SettlementReport {
                split_id,
                status: settlement_status(&shares),
                events,
                score_entries,
            })
        })?;

        if !report.events.is_empty() {
            tracing::info!(
                "split {split_id} settled, {} participants notified",
                report.events.len()
            );
        }
        Ok(report)
    }
}
