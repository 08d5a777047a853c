//! User record commands

use anyhow::Result;
use custos_core::{Modification, ProposedFields};
use custos_workflow::{access, ServiceContext, WorkflowService};
use std::path::Path;

use crate::db;
use crate::UserAction;

/// Handle user subcommands
pub async fn handle(db_path: &Path, action: UserAction) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = ServiceContext::new(&database);
    let svc = WorkflowService::new(&ctx);

    match action {
        UserAction::ProposeCreate {
            actor,
            username,
            password,
            first_name,
            last_name,
            access_level,
            permissions,
        } => {
            access::require_any_permission(
                ctx.pool(),
                actor,
                &[custos_core::Permission::CreateUser],
            )
            .await?;
            let fields = ProposedFields {
                username: Some(username),
                password: Some(password),
                first_name,
                last_name,
                access_level: access_level.map(|level| level.to_core_type()),
                active: None,
                permissions: permissions
                    .map(|perms| perms.iter().map(|p| p.to_core_type()).collect()),
            };
            let staged = svc.propose_create(fields, actor).await?;
            println!("Staged create proposal:");
            print_modification(&staged);
        }

        UserAction::ProposeUpdate {
            user_id,
            actor,
            username,
            password,
            first_name,
            last_name,
            access_level,
            deactivate,
            activate,
            permissions,
        } => {
            access::require_any_permission(
                ctx.pool(),
                actor,
                &[custos_core::Permission::UpdateUser],
            )
            .await?;
            let active = match (deactivate, activate) {
                (true, _) => Some(false),
                (_, true) => Some(true),
                _ => None,
            };
            let fields = ProposedFields {
                username,
                password,
                first_name,
                last_name,
                access_level: access_level.map(|level| level.to_core_type()),
                active,
                permissions: permissions
                    .map(|perms| perms.iter().map(|p| p.to_core_type()).collect()),
            };
            let staged = svc.propose_update(user_id, fields, actor).await?;
            println!("Staged update proposal for user {}:", user_id);
            print_modification(&staged);
        }

        UserAction::Show { user_id } => {
            let user = svc.user_by_id(user_id).await?;
            println!("User {}", user.id);
            println!("  Username:     {}", user.username);
            println!("  Name:         {} {}", user.first_name, user.last_name);
            println!("  Access level: {}", user.access_level);
            println!("  Active:       {}", user.active);
            if let Some(modification_id) = user.modification_id {
                println!("  Last change:  modification {}", modification_id);
            }
            if let Some(pending) = svc.pending_modification_for(user_id).await? {
                println!("  Pending:      modification {}", pending.id);
            }
        }

        UserAction::Recent { limit } => {
            let reports = custos_reports::ReportService::new(database.pool().clone());
            let users = reports.most_recent_users(limit).await?;
            if users.is_empty() {
                println!("No users yet");
            }
            for user in users {
                println!(
                    "{:>5}  {:<20} {} {}  [{}]",
                    user.id,
                    user.username,
                    user.first_name,
                    user.last_name,
                    if user.active { "active" } else { "inactive" }
                );
            }
        }
    }

    database.pool().close().await;
    Ok(())
}

/// Check a credential pair against the live records
pub async fn login(db_path: &Path, username: &str, password: &str) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = ServiceContext::new(&database);
    let svc = WorkflowService::new(&ctx);

    match svc.verify_credentials(username, password).await {
        Ok(user) => println!("Credentials OK - user {} ({})", user.id, user.username),
        Err(err) => println!("Login failed: {}", err),
    }

    database.pool().close().await;
    Ok(())
}

pub(crate) fn print_modification(modification: &Modification) {
    println!("  Modification: {}", modification.id);
    match modification.user_id {
        Some(user_id) => println!("  Target user:  {}", user_id),
        None => println!("  Target user:  (new user)"),
    }
    println!("  Username:     {}", modification.username);
    println!(
        "  Name:         {} {}",
        modification.first_name, modification.last_name
    );
    println!("  Access level: {}", modification.access_level);
    println!("  Active:       {}", modification.active);
    println!("  Security:     {}", modification.security_modification);
    println!("  Status:       {}", modification.authorization_status);
    println!("  Initiator:    {}", modification.initiator_id);
    if let Some(verifier_id) = modification.verifier_id {
        println!("  Verifier:     {}", verifier_id);
    }
    if let Some(comment) = &modification.verifier_comment {
        println!("  Comment:      {}", comment);
    }
}
