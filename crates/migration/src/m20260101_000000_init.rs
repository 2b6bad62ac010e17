//! Initial schema.
//!
//! - `users`: authentication and role
//! - `expenses`: the ledger, soft-deleted through `deleted_at`
//! - `split_expenses`: at most one split per expense
//! - `split_shares`: per-participant obligations, superseded on correction
//! - `payments`: append-only, idempotency key unique per share
//! - `social_score_history`: append-only score chain, `seq` unique per user

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    Role,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    UserId,
    GroupId,
    AmountMinor,
    Currency,
    ConvertedAmountMinor,
    ReferenceCurrency,
    Category,
    Tags,
    Description,
    Date,
    IsVerified,
    ImageUrl,
    EmotionalState,
    IsImpulsive,
    MindfulnessScore,
    IsRecurring,
    IsEssential,
    PaymentMode,
    CreatedAt,
    DeletedAt,
}

#[derive(Iden)]
enum SplitExpenses {
    Table,
    Id,
    ExpenseId,
    GroupId,
    CreatedBy,
    TotalAmountMinor,
    Currency,
    SplitKind,
    Policy,
    RemainderHolder,
    SettlementPriority,
    GraceEndDate,
    DueDate,
    NeedsApproval,
    CreatedAt,
}

#[derive(Iden)]
enum SplitShares {
    Table,
    Id,
    SplitExpenseId,
    UserId,
    AmountMinor,
    PaidMinor,
    IsPaid,
    PaidAt,
    InterestRateBps,
    InterestAccruedMinor,
    AccrualPeriod,
    LastAccrualAt,
    NextReminderDate,
    ReminderFrequency,
    SettlementNotified,
    SupersededAt,
    CreatedAt,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    SplitShareId,
    AmountMinor,
    PaidAt,
    Method,
    IdempotencyKey,
    RecordedBy,
    CreatedAt,
}

#[derive(Iden)]
enum SocialScoreHistory {
    Table,
    Id,
    UserId,
    Seq,
    OldScore,
    NewScore,
    Reason,
    Kind,
    RecordedBy,
    Timestamp,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("member"),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::UserId).string().not_null())
                    .col(ColumnDef::new(Expenses::GroupId).string())
                    .col(ColumnDef::new(Expenses::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::ConvertedAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Expenses::ReferenceCurrency)
                            .string()
                            .not_null()
                            .default("EUR"),
                    )
                    .col(ColumnDef::new(Expenses::Category).string().not_null())
                    .col(ColumnDef::new(Expenses::Tags).json().not_null())
                    .col(ColumnDef::new(Expenses::Description).string())
                    .col(ColumnDef::new(Expenses::Date).timestamp().not_null())
                    .col(
                        ColumnDef::new(Expenses::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Expenses::ImageUrl).string())
                    .col(ColumnDef::new(Expenses::EmotionalState).string())
                    .col(
                        ColumnDef::new(Expenses::IsImpulsive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Expenses::MindfulnessScore)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Expenses::IsRecurring)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Expenses::IsEssential)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Expenses::PaymentMode).string())
                    .col(ColumnDef::new(Expenses::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::DeletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-user_id")
                            .from(Expenses::Table, Expenses::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-user_id-date")
                    .table(Expenses::Table)
                    .col(Expenses::UserId)
                    .col(Expenses::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Split expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SplitExpenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitExpenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SplitExpenses::ExpenseId).string().not_null())
                    .col(ColumnDef::new(SplitExpenses::GroupId).string().not_null())
                    .col(ColumnDef::new(SplitExpenses::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(SplitExpenses::TotalAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SplitExpenses::Currency).string().not_null())
                    .col(ColumnDef::new(SplitExpenses::SplitKind).string().not_null())
                    .col(ColumnDef::new(SplitExpenses::Policy).json().not_null())
                    .col(
                        ColumnDef::new(SplitExpenses::RemainderHolder)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitExpenses::SettlementPriority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SplitExpenses::GraceEndDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SplitExpenses::DueDate).timestamp().not_null())
                    .col(
                        ColumnDef::new(SplitExpenses::NeedsApproval)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SplitExpenses::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_expenses-expense_id")
                            .from(SplitExpenses::Table, SplitExpenses::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_expenses-expense_id-unique")
                    .table(SplitExpenses::Table)
                    .col(SplitExpenses::ExpenseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Split shares
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SplitShares::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitShares::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SplitShares::SplitExpenseId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SplitShares::UserId).string().not_null())
                    .col(
                        ColumnDef::new(SplitShares::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitShares::PaidMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SplitShares::IsPaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SplitShares::PaidAt).timestamp())
                    .col(
                        ColumnDef::new(SplitShares::InterestRateBps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SplitShares::InterestAccruedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SplitShares::AccrualPeriod)
                            .string()
                            .not_null()
                            .default("daily"),
                    )
                    .col(ColumnDef::new(SplitShares::LastAccrualAt).timestamp())
                    .col(ColumnDef::new(SplitShares::NextReminderDate).timestamp())
                    .col(ColumnDef::new(SplitShares::ReminderFrequency).string())
                    .col(
                        ColumnDef::new(SplitShares::SettlementNotified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SplitShares::SupersededAt).timestamp())
                    .col(ColumnDef::new(SplitShares::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_shares-split_expense_id")
                            .from(SplitShares::Table, SplitShares::SplitExpenseId)
                            .to(SplitExpenses::Table, SplitExpenses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_shares-user_id")
                            .from(SplitShares::Table, SplitShares::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_shares-split_expense_id")
                    .table(SplitShares::Table)
                    .col(SplitShares::SplitExpenseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_shares-unpaid")
                    .table(SplitShares::Table)
                    .col(SplitShares::IsPaid)
                    .col(SplitShares::SupersededAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::SplitShareId).string().not_null())
                    .col(ColumnDef::new(Payments::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Payments::PaidAt).timestamp().not_null())
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(ColumnDef::new(Payments::IdempotencyKey).string())
                    .col(ColumnDef::new(Payments::RecordedBy).string().not_null())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-split_share_id")
                            .from(Payments::Table, Payments::SplitShareId)
                            .to(SplitShares::Table, SplitShares::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-idempotency_key")
                    .table(Payments::Table)
                    .col(Payments::SplitShareId)
                    .col(Payments::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Social score history
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SocialScoreHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SocialScoreHistory::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SocialScoreHistory::UserId).string().not_null())
                    .col(
                        ColumnDef::new(SocialScoreHistory::Seq)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SocialScoreHistory::OldScore)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SocialScoreHistory::NewScore)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SocialScoreHistory::Reason).string().not_null())
                    .col(ColumnDef::new(SocialScoreHistory::Kind).string().not_null())
                    .col(ColumnDef::new(SocialScoreHistory::RecordedBy).string())
                    .col(
                        ColumnDef::new(SocialScoreHistory::Timestamp)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-social_score_history-user_id")
                            .from(SocialScoreHistory::Table, SocialScoreHistory::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-social_score_history-user_id-seq-unique")
                    .table(SocialScoreHistory::Table)
                    .col(SocialScoreHistory::UserId)
                    .col(SocialScoreHistory::Seq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(SocialScoreHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SplitShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SplitExpenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
