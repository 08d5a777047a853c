//! Review commands - the checker side of the workflow

use anyhow::Result;
use custos_core::Permission;
use custos_workflow::{access, ServiceContext, WorkflowService};
use std::path::Path;

use crate::commands::user::print_modification;
use crate::db;
use crate::ReviewAction;

/// Handle review subcommands
pub async fn handle(db_path: &Path, action: ReviewAction) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = ServiceContext::new(&database);
    let svc = WorkflowService::new(&ctx);

    match action {
        ReviewAction::Pending => {
            let pending = svc.list_pending().await?;
            if pending.is_empty() {
                println!("No pending modifications");
            }
            for modification in pending {
                let target = match modification.user_id {
                    Some(user_id) => format!("user {}", user_id),
                    None => "new user".to_string(),
                };
                println!(
                    "{:>5}  {:<20} {:<12} by {}",
                    modification.id, modification.username, target, modification.initiator_id
                );
            }
        }

        ReviewAction::Show { modification_id } => {
            let modification = svc.modification_by_id(modification_id).await?;
            print_modification(&modification);
        }

        ReviewAction::Approve {
            modification_id,
            verifier,
        } => {
            access::require_any_permission(
                ctx.pool(),
                verifier,
                &[Permission::AuthorizeModification],
            )
            .await?;
            let staged = svc.modification_by_id(modification_id).await?;
            access::require_distinct_verifier(staged.initiator_id, verifier)?;

            let approved = svc.approve(modification_id, verifier).await?;
            println!("Approved modification {}:", modification_id);
            print_modification(&approved);
        }

        ReviewAction::Reject {
            modification_id,
            verifier,
            comment,
        } => {
            access::require_any_permission(
                ctx.pool(),
                verifier,
                &[Permission::AuthorizeModification],
            )
            .await?;
            let staged = svc.modification_by_id(modification_id).await?;
            access::require_distinct_verifier(staged.initiator_id, verifier)?;

            let rejected = svc
                .reject(modification_id, verifier, comment.as_deref())
                .await?;
            println!("Rejected modification {}:", modification_id);
            print_modification(&rejected);
        }
    }

    database.pool().close().await;
    Ok(())
}
