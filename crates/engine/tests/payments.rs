mod common;

use std::{collections::BTreeMap, sync::Arc};

use engine::{
    CreateSplitCmd, EngineError, INITIAL_SCORE_REASON, MoneyCents, RecordPaymentCmd,
    SettlementStatus, ShareStatus, SplitDetail, SplitPolicy,
};

use common::{day, engine_with_db, expense, users};

async fn split_of(engine: &engine::Engine, amount: i64, participants: &[&str]) -> SplitDetail {
    let expense_id = expense(engine, "alice", amount).await;
    engine
        .create_split(CreateSplitCmd::new(
            "alice",
            expense_id,
            "flat",
            SplitPolicy::Equal,
            users(participants),
            day(30),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn overpayment_leaves_share_unchanged() {
    let (engine, _db) = engine_with_db().await;
    let detail = split_of(&engine, 5_000, &["bob"]).await;
    let share_id = detail.shares[0].id;

    let err = engine
        .record_payment(RecordPaymentCmd::new("bob", share_id, 6_000, day(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OverpaymentRejected(_)));

    let share = engine.share_detail("bob", share_id, day(1)).await.unwrap();
    assert_eq!(share.share.paid, MoneyCents::ZERO);
    assert!(share.payments.is_empty());
    assert_eq!(share.status, ShareStatus::Pending);
}

#[tokio::test]
async fn non_positive_payment_is_invalid() {
    let (engine, _db) = engine_with_db().await;
    let detail = split_of(&engine, 5_000, &["bob"]).await;
    let err = engine
        .record_payment(RecordPaymentCmd::new("bob", detail.shares[0].id, -5, day(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPayment(_)));
}

#[tokio::test]
async fn outsiders_cannot_pay_a_share() {
    let (engine, _db) = engine_with_db().await;
    let detail = split_of(&engine, 5_000, &["bob"]).await;
    let err = engine
        .record_payment(RecordPaymentCmd::new("carol", detail.shares[0].id, 10, day(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn partial_payments_complete_a_share() {
    let (engine, _db) = engine_with_db().await;
    let detail = split_of(&engine, 10_000, &["alice", "bob"]).await;
    let bob_share = detail.shares[1].id;

    let first = engine
        .record_payment(RecordPaymentCmd::new("bob", bob_share, 2_000, day(1)))
        .await
        .unwrap();
    assert_eq!(first.share.status(), ShareStatus::PartiallyPaid);
    assert!(first.settlement.is_none());

    let second = engine
        .record_payment(
            RecordPaymentCmd::new("bob", bob_share, 3_000, day(2)).method("bank transfer"),
        )
        .await
        .unwrap();
    assert!(second.share.is_paid);
    assert_eq!(second.share.paid_at, Some(day(2)));
    let settlement = second.settlement.unwrap();
    assert_eq!(settlement.status, SettlementStatus::PartiallySettled);
    assert!(settlement.events.is_empty());

    let share = engine.share_detail("bob", bob_share, day(3)).await.unwrap();
    assert_eq!(share.payments.len(), 2);
    assert_eq!(share.payments[1].method, "bank transfer");
    assert_eq!(share.outstanding, MoneyCents::ZERO);

    let err = engine
        .record_payment(RecordPaymentCmd::new("bob", bob_share, 1, day(3)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OverpaymentRejected(_)));
}

#[tokio::test]
async fn retried_payment_is_applied_once() {
    let (engine, _db) = engine_with_db().await;
    let detail = split_of(&engine, 5_000, &["bob"]).await;
    let share_id = detail.shares[0].id;
    let cmd = RecordPaymentCmd::new("bob", share_id, 1_000, day(1)).idempotency_key("req-1");

    let first = engine.record_payment(cmd.clone()).await.unwrap();
    let retry = engine.record_payment(cmd).await.unwrap();
    assert!(!first.replayed);
    assert!(retry.replayed);
    assert_eq!(retry.payment.id, first.payment.id);

    let share = engine.share_detail("bob", share_id, day(1)).await.unwrap();
    assert_eq!(share.share.paid.cents(), 1_000);
    assert_eq!(share.payments.len(), 1);
}

#[tokio::test]
async fn settlement_is_emitted_once_per_participant() {
    let (engine, _db) = engine_with_db().await;
    let detail = split_of(&engine, 9_000, &["alice", "bob", "carol"]).await;
    engine
        .initialize_score("bob", "bob", day(0))
        .await
        .unwrap();

    engine
        .record_payment(RecordPaymentCmd::new("alice", detail.shares[0].id, 3_000, day(1)))
        .await
        .unwrap();
    engine
        .record_payment(RecordPaymentCmd::new("bob", detail.shares[1].id, 3_000, day(2)))
        .await
        .unwrap();
    // Late: due date is day 30.
    let last = engine
        .record_payment(RecordPaymentCmd::new("carol", detail.shares[2].id, 3_000, day(40)))
        .await
        .unwrap();

    let settlement = last.settlement.unwrap();
    assert_eq!(settlement.status, SettlementStatus::Settled);
    assert_eq!(settlement.events.len(), 3);
    let on_time: Vec<(&str, bool)> = settlement
        .events
        .iter()
        .map(|e| (e.user_id.as_str(), e.on_time))
        .collect();
    assert_eq!(
        on_time,
        vec![("alice", true), ("bob", true), ("carol", false)]
    );

    let again = engine
        .evaluate_settlement("alice", detail.split.id)
        .await
        .unwrap();
    assert_eq!(again.status, SettlementStatus::Settled);
    assert!(again.events.is_empty());

    let bob = engine.score_history("bob", "bob").await.unwrap();
    assert_eq!(bob.len(), 2);
    assert_eq!(bob[0].reason, INITIAL_SCORE_REASON);
    assert_eq!(bob[1].old_score, 50.0);
    assert_eq!(bob[1].new_score, 55.0);

    let alice = engine.score_history("alice", "alice").await.unwrap();
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].old_score, 0.0);
    assert_eq!(alice[0].new_score, 5.0);

    let carol = engine.score_history("carol", "carol").await.unwrap();
    assert_eq!(carol.len(), 1);
    assert_eq!(carol[0].new_score, 0.0);
}

#[tokio::test]
async fn concurrent_payments_cannot_overpay() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let detail = split_of(&engine, 5_000, &["bob"]).await;
    let share_id = detail.shares[0].id;

    let mut handles = Vec::new();
    for n in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .record_payment(RecordPaymentCmd::new("bob", share_id, 2_000, day(n)))
                .await
        }));
    }
    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert!(matches!(err, EngineError::OverpaymentRejected(_))),
        }
    }
    assert_eq!(accepted, 2);

    let share = engine.share_detail("bob", share_id, day(5)).await.unwrap();
    assert_eq!(share.share.paid.cents(), 4_000);
    assert!(!share.share.is_paid);
}

#[tokio::test]
async fn zero_shares_get_no_settlement_outcome() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;
    let amounts_minor = BTreeMap::from([("alice".to_string(), 0), ("bob".to_string(), 1_000)]);
    let detail = engine
        .create_split(CreateSplitCmd::new(
            "alice",
            expense_id,
            "flat",
            SplitPolicy::Custom { amounts_minor },
            users(&["alice", "bob"]),
            day(30),
        ))
        .await
        .unwrap();
    let share_of = |user: &str| detail.shares.iter().find(|s| s.user_id == user).unwrap();
    assert!(share_of("alice").is_paid);

    let outcome = engine
        .record_payment(RecordPaymentCmd::new("bob", share_of("bob").id, 1_000, day(1)))
        .await
        .unwrap();
    let settlement = outcome.settlement.unwrap();
    assert_eq!(settlement.status, SettlementStatus::Settled);
    let notified: Vec<&str> = settlement.events.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(notified, vec!["bob"]);
    assert!(engine.score_history("alice", "alice").await.unwrap().is_empty());
}
