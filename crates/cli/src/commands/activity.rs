//! Activity trail commands

use anyhow::Result;
use custos_core::Activity;
use custos_workflow::{ActivityRecorder, ServiceContext};
use std::path::Path;

use crate::db;
use crate::ActivityAction;

/// Handle activity subcommands
pub async fn handle(db_path: &Path, action: ActivityAction) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = ServiceContext::new(&database);
    let recorder = ActivityRecorder::new(&ctx);

    match action {
        ActivityAction::Recent { limit, actor } => {
            let activities = match actor {
                Some(actor_id) => recorder.most_recent_by_actor(actor_id, limit).await?,
                None => recorder.most_recent(limit).await?,
            };
            if activities.is_empty() {
                println!("No activity recorded yet");
            }
            for activity in activities {
                print_activity(&activity);
            }
        }
    }

    database.pool().close().await;
    Ok(())
}

fn print_activity(activity: &Activity) {
    println!(
        "{}  user {} {} {} {} ({}={})",
        activity.created_at.format("%Y-%m-%d %H:%M:%S"),
        activity.actor_id,
        activity.activity_kind.past_tense(),
        activity.entity_kind.as_str(),
        activity.entity_primary_value,
        activity.reference_field,
        activity.reference_value,
    );
}
