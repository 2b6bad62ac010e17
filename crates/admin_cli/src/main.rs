use std::{error::Error, io::Write};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, ROLE_ADMIN, ROLE_MEMBER};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, Set};
use tracing_subscriber::EnvFilter;

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub username: String,
        pub password: String,
        pub role: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "splitledger_admin")]
#[command(about = "Admin utilities for SplitLedger (users, sweep, scores)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./splitledger.db?mode=rwc"
    )]
    database_url: String,

    /// Log filter, e.g. `info` or `engine=debug`.
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Sweep(Sweep),
    Score(Score),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    /// Grant the administrator role.
    Promote(UsernameArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    admin: bool,
}

#[derive(Args, Debug)]
struct UsernameArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Sweep {
    #[command(subcommand)]
    command: SweepCommand,
}

#[derive(Subcommand, Debug)]
enum SweepCommand {
    /// Accrue interest and advance due reminders once.
    Run(SweepRunArgs),
}

#[derive(Args, Debug)]
struct SweepRunArgs {
    /// RFC3339 instant to sweep up to. Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
struct Score {
    #[command(subcommand)]
    command: ScoreCommand,
}

#[derive(Subcommand, Debug)]
enum ScoreCommand {
    /// Seed the baseline score of a user.
    Init(UsernameArgs),
    /// Print the score chain of a user.
    Show(UsernameArgs),
    /// Append a saturating adjustment.
    Adjust(ScoreAdjustArgs),
    /// Overwrite the score on behalf of an administrator.
    Set(ScoreSetArgs),
}

#[derive(Args, Debug)]
struct ScoreAdjustArgs {
    #[arg(long)]
    username: String,
    #[arg(long, allow_hyphen_values = true)]
    delta: f64,
    #[arg(long)]
    reason: String,
}

#[derive(Args, Debug)]
struct ScoreSetArgs {
    /// Administrator performing the override.
    #[arg(long)]
    actor: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    score: f64,
    #[arg(long)]
    reason: String,
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| format!("invalid RFC3339 instant {raw}: {err}"))
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn require_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<users::Model, Box<dyn Error + Send + Sync>> {
    match users::Entity::find_by_id(username.to_string()).one(db).await? {
        Some(user) => Ok(user),
        None => {
            eprintln!("user not found: {username}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db.clone()).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;

            if users::Entity::find_by_id(args.username.clone())
                .one(&db)
                .await?
                .is_some()
            {
                eprintln!("user already exists: {}", args.username);
                std::process::exit(1);
            }

            let role = if args.admin { ROLE_ADMIN } else { ROLE_MEMBER };
            let user = users::ActiveModel {
                username: Set(args.username.clone()),
                password: Set(password),
                role: Set(role.to_string()),
            };
            users::Entity::insert(user).exec(&db).await?;

            println!("created user: {} ({role})", args.username);
        }
        Command::User(User {
            command: UserCommand::Promote(args),
        }) => {
            let user = require_user(&db, &args.username).await?;
            let mut user: users::ActiveModel = user.into();
            user.role = Set(ROLE_ADMIN.to_string());
            user.update(&db).await?;
            println!("promoted user: {}", args.username);
        }
        Command::Sweep(Sweep {
            command: SweepCommand::Run(args),
        }) => {
            let report = engine.run_sweep(args.as_of.unwrap_or_else(Utc::now)).await?;
            println!(
                "splits: {}, interest accrued: {}, reminders: {}, failures: {}",
                report.splits_processed,
                report.interest_accrued,
                report.reminders.len(),
                report.failures.len()
            );
            for reminder in &report.reminders {
                println!(
                    "remind {} about share {} ({} outstanding, due {})",
                    reminder.user_id, reminder.share_id, reminder.outstanding, reminder.remind_at
                );
            }
            for (split_id, err) in &report.failures {
                eprintln!("split {split_id} failed: {err}");
            }
        }
        Command::Score(Score {
            command: ScoreCommand::Init(args),
        }) => {
            let entry = engine
                .initialize_score(&args.username, &args.username, Utc::now())
                .await?;
            println!("{}: {}", args.username, entry.new_score);
        }
        Command::Score(Score {
            command: ScoreCommand::Show(args),
        }) => {
            for entry in engine.score_history(&args.username, &args.username).await? {
                println!(
                    "#{} {} {} -> {} ({})",
                    entry.seq, entry.timestamp, entry.old_score, entry.new_score, entry.reason
                );
            }
        }
        Command::Score(Score {
            command: ScoreCommand::Adjust(args),
        }) => {
            let entry = engine
                .apply_score_adjustment(&args.username, args.delta, &args.reason, Utc::now())
                .await?;
            println!(
                "{}: {} -> {}",
                args.username, entry.old_score, entry.new_score
            );
        }
        Command::Score(Score {
            command: ScoreCommand::Set(args),
        }) => {
            let entry = engine
                .override_score(
                    &args.actor,
                    &args.username,
                    args.score,
                    &args.reason,
                    Utc::now(),
                )
                .await?;
            println!(
                "{}: {} -> {}",
                args.username, entry.old_score, entry.new_score
            );
        }
    }

    Ok(())
}
