//! Account provisioning and maintenance commands.
//!
//! Sign-up and login live outside this service; operators use these commands
//! to create users, hand out bearer tokens, and reset watch lists.

use chrono::{Duration, Utc};
use clap::Subcommand;
use lemonade_core::Plan;
use sqlx::PgPool;

const MAX_SESSION_DAYS: i64 = 365;

#[derive(Debug, Subcommand)]
pub enum UserCommands {
    /// Create a user account
    Create {
        #[arg(long)]
        email: String,
        /// `free` or `pro`
        #[arg(long, default_value = "free")]
        plan: String,
    },
    /// Change a user's plan
    SetPlan {
        #[arg(long)]
        email: String,
        /// `free` or `pro`
        #[arg(long)]
        plan: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionCommands {
    /// Issue a bearer token for a user and print it once
    Issue {
        #[arg(long)]
        email: String,
        /// Days until the token expires
        #[arg(long, default_value = "30")]
        days: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum TrackedCommands {
    /// Remove every tracked competitor for a user, active or not
    Clear {
        #[arg(long)]
        email: String,
    },
}

fn parse_plan(raw: &str) -> anyhow::Result<Plan> {
    raw.trim()
        .to_lowercase()
        .parse::<Plan>()
        .map_err(anyhow::Error::msg)
}

async fn require_user(pool: &PgPool, email: &str) -> anyhow::Result<lemonade_db::UserRow> {
    lemonade_db::get_user_by_email(pool, email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no user with email '{email}'; run `user create` first"))
}

/// # Errors
///
/// Returns an error for an unknown plan, a duplicate email, or a failed query.
pub(crate) async fn run_user_command(pool: &PgPool, command: UserCommands) -> anyhow::Result<()> {
    match command {
        UserCommands::Create { email, plan } => {
            let plan = parse_plan(&plan)?;
            let user = lemonade_db::create_user(pool, &email, plan).await?;
            tracing::info!(user_id = user.id, plan = %plan, "user created");
            println!("created user {} <{}> on plan {}", user.id, user.email, user.plan);
        }
        UserCommands::SetPlan { email, plan } => {
            let plan = parse_plan(&plan)?;
            let user = require_user(pool, &email).await?;
            let updated = lemonade_db::set_user_plan(pool, user.id, plan).await?;
            println!("user {} <{}> is now on plan {}", updated.id, updated.email, updated.plan);
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the user does not exist, `days` is out of range, or
/// the insert fails.
pub(crate) async fn run_session_command(
    pool: &PgPool,
    command: SessionCommands,
) -> anyhow::Result<()> {
    match command {
        SessionCommands::Issue { email, days } => {
            if !(1..=MAX_SESSION_DAYS).contains(&days) {
                anyhow::bail!("--days must be between 1 and {MAX_SESSION_DAYS}");
            }
            let user = require_user(pool, &email).await?;
            let token = lemonade_db::generate_token();
            let expires_at = Utc::now() + Duration::days(days);
            let token_hash = lemonade_db::hash_token(&token);
            let session =
                lemonade_db::create_session(pool, user.id, &token_hash, expires_at).await?;
            tracing::info!(user_id = user.id, session_id = session.id, "session issued");
            println!("{token}");
            eprintln!("expires {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the user does not exist or the delete fails.
pub(crate) async fn run_tracked_command(
    pool: &PgPool,
    command: TrackedCommands,
) -> anyhow::Result<()> {
    match command {
        TrackedCommands::Clear { email } => {
            let user = require_user(pool, &email).await?;
            let removed = lemonade_db::clear_tracked(pool, user.id).await?;
            println!("removed {removed} tracked competitor(s) for {}", user.email);
        }
    }
    Ok(())
}
