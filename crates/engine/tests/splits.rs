mod common;

use std::collections::BTreeMap;

use chrono::Utc;
use engine::{
    CreateSplitCmd, EngineError, MoneyCents, RecordPaymentCmd, SettlementStatus, SplitPolicy,
};
use uuid::Uuid;

use common::{day, engine_with_db, expense, users};

fn equal_split(caller: &str, expense_id: Uuid, participants: &[&str]) -> CreateSplitCmd {
    CreateSplitCmd::new(
        caller,
        expense_id,
        "flat",
        SplitPolicy::Equal,
        users(participants),
        day(30),
    )
}

#[tokio::test]
async fn equal_split_assigns_residual_to_first_participant() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 10_000).await;

    let detail = engine
        .create_split(equal_split("alice", expense_id, &["carol", "alice", "bob"]))
        .await
        .unwrap();

    let amounts: Vec<(&str, i64)> = detail
        .shares
        .iter()
        .map(|s| (s.user_id.as_str(), s.amount.cents()))
        .collect();
    assert_eq!(amounts, vec![("alice", 3334), ("bob", 3333), ("carol", 3333)]);
    assert_eq!(detail.split.remainder_holder, "alice");
    assert_eq!(
        detail.shares.iter().map(|s| s.amount).sum::<MoneyCents>(),
        detail.split.total_amount
    );
    assert_eq!(detail.status, SettlementStatus::Open);
}

#[tokio::test]
async fn shares_policy_gives_residual_to_heaviest_weight() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;
    let weights = BTreeMap::from([
        ("alice".to_string(), 1),
        ("bob".to_string(), 1),
        ("carol".to_string(), 1),
    ]);

    let detail = engine
        .create_split(CreateSplitCmd::new(
            "alice",
            expense_id,
            "flat",
            SplitPolicy::Shares { weights },
            users(&["alice", "bob", "carol"]),
            day(30),
        ))
        .await
        .unwrap();
    let total: i64 = detail.shares.iter().map(|s| s.amount.cents()).sum();
    assert_eq!(total, 1_000);
    assert_eq!(detail.split.remainder_holder, "alice");
}

#[tokio::test]
async fn percentages_must_cover_the_whole_amount() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;
    let bps = BTreeMap::from([("alice".to_string(), 6_000), ("bob".to_string(), 3_000)]);

    let err = engine
        .create_split(CreateSplitCmd::new(
            "alice",
            expense_id,
            "flat",
            SplitPolicy::Percentage { bps },
            users(&["alice", "bob"]),
            day(30),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSplitPolicy(_)));
}

#[tokio::test]
async fn empty_participants_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;
    let err = engine
        .create_split(equal_split("alice", expense_id, &[]))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::EmptyParticipantSet);
}

#[tokio::test]
async fn unknown_participant_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;
    let err = engine
        .create_split(equal_split("alice", expense_id, &["alice", "mallory"]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn only_the_owner_splits_and_only_once() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;

    let err = engine
        .create_split(equal_split("bob", expense_id, &["alice", "bob"]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .create_split(equal_split("alice", expense_id, &["alice", "bob"]))
        .await
        .unwrap();
    let err = engine
        .create_split(equal_split("alice", expense_id, &["alice", "bob"]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn retracted_expense_cannot_be_split() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;
    engine
        .retract_expense("alice", expense_id, Utc::now())
        .await
        .unwrap();
    let err = engine
        .create_split(equal_split("alice", expense_id, &["alice", "bob"]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn grace_period_cannot_end_before_due_date() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;
    let err = engine
        .create_split(equal_split("alice", expense_id, &["alice", "bob"]).grace_end_date(day(29)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn split_is_visible_to_participants_only() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;
    let detail = engine
        .create_split(equal_split("alice", expense_id, &["alice", "bob"]))
        .await
        .unwrap();

    assert!(engine.split_detail("bob", detail.split.id).await.is_ok());
    assert!(engine.split_detail("root", detail.split.id).await.is_ok());
    assert!(matches!(
        engine.split_detail("carol", detail.split.id).await,
        Err(EngineError::Forbidden(_))
    ));
}

#[tokio::test]
async fn correction_supersedes_unpaid_shares() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 10_000).await;
    let detail = engine
        .create_split(equal_split("alice", expense_id, &["alice", "bob"]))
        .await
        .unwrap();
    let old_ids: Vec<Uuid> = detail.shares.iter().map(|s| s.id).collect();

    let bps = BTreeMap::from([
        ("alice".to_string(), 5_000),
        ("bob".to_string(), 2_500),
        ("carol".to_string(), 2_500),
    ]);
    let corrected = engine
        .correct_split(
            "alice",
            detail.split.id,
            SplitPolicy::Percentage { bps },
            Some(users(&["alice", "bob", "carol"])),
        )
        .await
        .unwrap();
    let amounts: Vec<i64> = corrected.shares.iter().map(|s| s.amount.cents()).collect();
    assert_eq!(amounts, vec![5_000, 2_500, 2_500]);

    let reread = engine.split_detail("alice", detail.split.id).await.unwrap();
    assert_eq!(reread.shares.len(), 3);
    assert!(reread.shares.iter().all(|s| !old_ids.contains(&s.id)));
    assert!(matches!(
        engine
            .record_payment(RecordPaymentCmd::new("bob", old_ids[1], 100, day(1)))
            .await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn correction_after_payment_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 10_000).await;
    let detail = engine
        .create_split(equal_split("alice", expense_id, &["alice", "bob"]))
        .await
        .unwrap();
    engine
        .record_payment(RecordPaymentCmd::new("bob", detail.shares[1].id, 100, day(1)))
        .await
        .unwrap();

    let err = engine
        .correct_split("alice", detail.split.id, SplitPolicy::Equal, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CorrectionRejected(_)));

    let err = engine
        .correct_split("bob", detail.split.id, SplitPolicy::Equal, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}
