mod common;

use engine::{CreateSplitCmd, MoneyCents, Period, RecordPaymentCmd, SplitDetail, SplitPolicy};

use common::{day, engine_with_db, expense, users};

async fn overdue_split(engine: &engine::Engine) -> SplitDetail {
    let expense_id = expense(engine, "alice", 10_000).await;
    engine
        .create_split(
            CreateSplitCmd::new(
                "alice",
                expense_id,
                "flat",
                SplitPolicy::Equal,
                users(&["alice", "bob"]),
                day(30),
            )
            .interest(100, Period::Daily)
            .reminders(Period::Weekly),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn interest_accrues_after_grace_only() {
    let (engine, _db) = engine_with_db().await;
    overdue_split(&engine).await;

    assert_eq!(engine.accrue_interest(day(30)).await.unwrap(), MoneyCents::ZERO);
    // 2 shares × 5000 × 1% × 10 days
    assert_eq!(
        engine.accrue_interest(day(40)).await.unwrap(),
        MoneyCents::new(1_000)
    );
    assert_eq!(engine.accrue_interest(day(40)).await.unwrap(), MoneyCents::ZERO);
}

#[tokio::test]
async fn accrued_interest_raises_the_obligation() {
    let (engine, _db) = engine_with_db().await;
    let detail = overdue_split(&engine).await;
    let bob_share = detail.shares[1].id;
    engine.accrue_interest(day(40)).await.unwrap();

    let share = engine.share_detail("bob", bob_share, day(40)).await.unwrap();
    assert_eq!(share.share.interest_accrued, MoneyCents::new(500));
    assert_eq!(share.outstanding, MoneyCents::new(5_500));
    assert!(share.overdue);

    let outcome = engine
        .record_payment(RecordPaymentCmd::new("bob", bob_share, 5_500, day(41)))
        .await
        .unwrap();
    assert!(outcome.share.is_paid);
}

#[tokio::test]
async fn paid_shares_stop_accruing() {
    let (engine, _db) = engine_with_db().await;
    let detail = overdue_split(&engine).await;
    engine
        .record_payment(RecordPaymentCmd::new("bob", detail.shares[1].id, 5_000, day(10)))
        .await
        .unwrap();

    assert_eq!(
        engine.accrue_interest(day(40)).await.unwrap(),
        MoneyCents::new(500)
    );
    let bob = engine
        .share_detail("bob", detail.shares[1].id, day(40))
        .await
        .unwrap();
    assert_eq!(bob.share.interest_accrued, MoneyCents::ZERO);
    assert!(!bob.overdue);
}

#[tokio::test]
async fn sweep_emits_one_reminder_per_share_and_catches_up() {
    let (engine, _db) = engine_with_db().await;
    let detail = overdue_split(&engine).await;

    let early = engine.run_sweep(day(29)).await.unwrap();
    assert!(early.reminders.is_empty());
    assert_eq!(early.splits_processed, 1);

    let report = engine.run_sweep(day(44)).await.unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.reminders.len(), 2);
    assert!(report.reminders.iter().all(|r| r.remind_at == day(30)));
    assert_eq!(report.interest_accrued, MoneyCents::new(1_400));

    let share = engine
        .share_detail("alice", detail.shares[0].id, day(44))
        .await
        .unwrap();
    assert_eq!(share.share.next_reminder_date, Some(day(51)));

    let again = engine.run_sweep(day(44)).await.unwrap();
    assert!(again.reminders.is_empty());
    assert_eq!(again.interest_accrued, MoneyCents::ZERO);
}

#[tokio::test]
async fn next_reminder_moves_one_period_forward() {
    let (engine, _db) = engine_with_db().await;
    let detail = overdue_split(&engine).await;
    let share_id = detail.shares[1].id;

    assert_eq!(
        engine.schedule_next_reminder(share_id).await.unwrap(),
        Some(day(37))
    );
    assert_eq!(
        engine.schedule_next_reminder(share_id).await.unwrap(),
        Some(day(44))
    );
}

#[tokio::test]
async fn shares_without_reminders_are_never_scheduled() {
    let (engine, _db) = engine_with_db().await;
    let expense_id = expense(&engine, "alice", 1_000).await;
    let detail = engine
        .create_split(CreateSplitCmd::new(
            "alice",
            expense_id,
            "flat",
            SplitPolicy::Equal,
            users(&["bob"]),
            day(30),
        ))
        .await
        .unwrap();

    assert_eq!(
        engine
            .schedule_next_reminder(detail.shares[0].id)
            .await
            .unwrap(),
        None
    );
    assert!(engine.run_sweep(day(60)).await.unwrap().reminders.is_empty());
}
