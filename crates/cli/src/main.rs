//! Custos CLI - Maker-checker record management from the command line
//!
//! Usage:
//! ```bash
//! custos init --username root --password "change-me-now"
//! custos user propose-create --actor 1 --username jdoe --password "s3cret-pw" --first-name Jane
//! custos user propose-update --actor 1 7 --deactivate
//! custos review pending
//! custos review approve 3 --verifier 2
//! custos review reject 3 --verifier 2 --comment "not cleared"
//! custos report summary --actor 1
//! custos activity recent --limit 20
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod db;

use commands::{activity, report, review, user};

/// Custos - user record management under maker-checker authorization
#[derive(Parser)]
#[command(name = "custos")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, default_value = "data/custos.db", global = true)]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and seed the first super user
    Init {
        /// Username of the seeded super user
        #[arg(long)]
        username: String,
        /// Password of the seeded super user
        #[arg(long)]
        password: String,
        /// Drop any existing database first
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// User records and change proposals
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Review pending modifications
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// Aggregated throughput reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Activity trail
    Activity {
        #[command(subcommand)]
        action: ActivityAction,
    },

    /// Check a username/password pair
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Propose creating a new user
    ProposeCreate {
        /// Acting user id (the maker)
        #[arg(long)]
        actor: i64,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long, value_enum)]
        access_level: Option<AccessLevelArg>,
        /// Permissions to grant on approval (comma-separated)
        #[arg(long, value_enum, value_delimiter = ',')]
        permissions: Option<Vec<PermissionArg>>,
    },
    /// Propose updating an existing user
    ProposeUpdate {
        /// Target user id
        user_id: i64,
        /// Acting user id (the maker)
        #[arg(long)]
        actor: i64,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long, value_enum)]
        access_level: Option<AccessLevelArg>,
        /// Propose deactivating the user
        #[arg(long, conflicts_with = "activate")]
        deactivate: bool,
        /// Propose reactivating the user
        #[arg(long)]
        activate: bool,
        #[arg(long, value_enum, value_delimiter = ',')]
        permissions: Option<Vec<PermissionArg>>,
    },
    /// Show a user record
    Show {
        user_id: i64,
    },
    /// Most recently created users
    Recent {
        #[arg(long, default_value_t = 15)]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum ReviewAction {
    /// List pending modifications
    Pending,
    /// Show a modification
    Show {
        modification_id: i64,
    },
    /// Approve a pending modification
    Approve {
        modification_id: i64,
        /// Acting user id (the checker)
        #[arg(long)]
        verifier: i64,
    },
    /// Reject a pending modification
    Reject {
        modification_id: i64,
        /// Acting user id (the checker)
        #[arg(long)]
        verifier: i64,
        #[arg(long)]
        comment: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportAction {
    /// Today's and this month's counts for one actor
    Summary {
        #[arg(long)]
        actor: i64,
    },
    /// Per-day totals for the current week
    Weekly {
        #[arg(long)]
        actor: i64,
        #[arg(long, value_enum, default_value = "approved")]
        status: StatusArg,
    },
    /// Users ranked by approved modifications this week
    Top {
        #[arg(long, default_value_t = 5)]
        limit: i64,
    },
    /// Per-user counts over a date range
    Performance {
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: String,
        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: String,
        #[arg(long, value_enum, default_value = "approved")]
        status: StatusArg,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ActivityAction {
    /// Most recent activities
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        /// Only activities by this actor
        #[arg(long)]
        actor: Option<i64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AccessLevelArg {
    SuperUser,
    Admin,
    Staff,
    Tech,
}

impl AccessLevelArg {
    pub fn to_core_type(&self) -> custos_core::AccessLevel {
        match self {
            AccessLevelArg::SuperUser => custos_core::AccessLevel::SuperUser,
            AccessLevelArg::Admin => custos_core::AccessLevel::Admin,
            AccessLevelArg::Staff => custos_core::AccessLevel::Staff,
            AccessLevelArg::Tech => custos_core::AccessLevel::Tech,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PermissionArg {
    CreateUser,
    UpdateUser,
    ViewUsers,
    AuthorizeModification,
    AuditTrail,
    PullReports,
}

impl PermissionArg {
    pub fn to_core_type(&self) -> custos_core::Permission {
        match self {
            PermissionArg::CreateUser => custos_core::Permission::CreateUser,
            PermissionArg::UpdateUser => custos_core::Permission::UpdateUser,
            PermissionArg::ViewUsers => custos_core::Permission::ViewUsers,
            PermissionArg::AuthorizeModification => custos_core::Permission::AuthorizeModification,
            PermissionArg::AuditTrail => custos_core::Permission::AuditTrail,
            PermissionArg::PullReports => custos_core::Permission::PullReports,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Approved,
    Rejected,
}

impl StatusArg {
    pub fn to_core_type(&self) -> custos_core::AuthorizationStatus {
        match self {
            StatusArg::Pending => custos_core::AuthorizationStatus::Pending,
            StatusArg::Approved => custos_core::AuthorizationStatus::Approved,
            StatusArg::Rejected => custos_core::AuthorizationStatus::Rejected,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Some(parent) = cli.db.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    match cli.command {
        Commands::Init {
            username,
            password,
            force,
        } => {
            db::init_database(&cli.db, &username, &password, force).await?;
            println!("Database initialized at {:?}", cli.db);
        }

        Commands::Status => {
            db::show_status(&cli.db).await?;
        }

        Commands::User { action } => {
            user::handle(&cli.db, action).await?;
        }

        Commands::Review { action } => {
            review::handle(&cli.db, action).await?;
        }

        Commands::Report { action } => {
            report::handle(&cli.db, action).await?;
        }

        Commands::Activity { action } => {
            activity::handle(&cli.db, action).await?;
        }

        Commands::Login { username, password } => {
            user::login(&cli.db, &username, &password).await?;
        }
    }

    Ok(())
}
