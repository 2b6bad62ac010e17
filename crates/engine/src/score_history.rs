//! Append-only social score chain.
//!
//! Entries of one user are ordered by `seq`; each entry's `old_score` equals
//! the previous entry's `new_score`, and the first entry starts from 0.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, score::ScoreEntryKind, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: Uuid,
    pub user_id: String,
    pub seq: i64,
    pub old_score: f64,
    pub new_score: f64,
    pub reason: String,
    pub kind: ScoreEntryKind,
    pub recorded_by: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "social_score_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub seq: i64,
    pub old_score: f64,
    pub new_score: f64,
    pub reason: String,
    pub kind: String,
    pub recorded_by: Option<String>,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ScoreEntry> for ActiveModel {
    fn from(entry: &ScoreEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            user_id: ActiveValue::Set(entry.user_id.clone()),
            seq: ActiveValue::Set(entry.seq),
            old_score: ActiveValue::Set(entry.old_score),
            new_score: ActiveValue::Set(entry.new_score),
            reason: ActiveValue::Set(entry.reason.clone()),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            recorded_by: ActiveValue::Set(entry.recorded_by.clone()),
            timestamp: ActiveValue::Set(entry.timestamp),
        }
    }
}

impl TryFrom<Model> for ScoreEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "score entry")?,
            user_id: model.user_id,
            seq: model.seq,
            old_score: model.old_score,
            new_score: model.new_score,
            reason: model.reason,
            kind: ScoreEntryKind::try_from(model.kind.as_str())?,
            recorded_by: model.recorded_by,
            timestamp: model.timestamp,
        })
    }
}
