//! Database initialization and status

use anyhow::{bail, Context, Result};
use custos_core::{AccessLevel, Permission, UserSnapshot};
use custos_persistence::{Database, UserRepo};
use custos_workflow::credentials;
use std::path::Path;

/// Create the database, run migrations and seed the first super user.
///
/// Seeding bypasses the maker-checker workflow: with an empty users table
/// there is nobody to act as maker or checker yet.
pub async fn init_database(
    db_path: &Path,
    username: &str,
    password: &str,
    force: bool,
) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("Removed existing database");
    } else if db_path.exists() {
        bail!(
            "Database already exists at {:?}; use --force to re-initialize",
            db_path
        );
    }

    let db = connect_rwc(db_path).await?;

    let snapshot = UserSnapshot {
        username: username.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: credentials::hash_password(password)
            .context("Failed to hash the seed password")?,
        access_level: AccessLevel::SuperUser,
        active: true,
    };

    let mut conn = db.pool().acquire().await?;
    let user_id = UserRepo::insert_from_snapshot(&mut conn, &snapshot, None).await?;
    UserRepo::replace_permissions(
        &mut conn,
        user_id,
        &[
            Permission::CreateUser,
            Permission::UpdateUser,
            Permission::ViewUsers,
            Permission::AuthorizeModification,
            Permission::AuditTrail,
            Permission::PullReports,
        ],
    )
    .await?;
    drop(conn);

    println!("Seeded super user '{}' with id {}", username, user_id);
    db.pool().close().await;
    Ok(())
}

/// Open an existing database, running any outstanding migrations.
pub async fn connect(db_path: &Path) -> Result<Database> {
    if !db_path.exists() {
        bail!(
            "Database not found at {:?}; run 'custos init' first",
            db_path
        );
    }
    connect_rwc(db_path).await
}

async fn connect_rwc(db_path: &Path) -> Result<Database> {
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let db = Database::init_with_migrations(&db_url)
        .await
        .context("Failed to open database")?;
    Ok(db)
}

/// Show database status
pub async fn show_status(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("Database not found at {:?}", db_path);
        println!("Run 'custos init' to create it");
        return Ok(());
    }

    let db = connect(db_path).await?;

    println!("Database status");
    println!("  Path: {:?}", db_path);
    println!();

    let users: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(db.pool())
        .await
        .unwrap_or((0,));
    let pending: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM user_modifications WHERE authorization_status = 0")
            .fetch_one(db.pool())
            .await
            .unwrap_or((0,));
    let resolved: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM user_modifications WHERE authorization_status != 0")
            .fetch_one(db.pool())
            .await
            .unwrap_or((0,));
    let activities: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM activities")
        .fetch_one(db.pool())
        .await
        .unwrap_or((0,));

    println!("  Users:                  {}", users.0);
    println!("  Pending modifications:  {}", pending.0);
    println!("  Resolved modifications: {}", resolved.0);
    println!("  Activities:             {}", activities.0);

    db.pool().close().await;
    Ok(())
}
