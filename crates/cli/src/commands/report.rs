//! Aggregated report commands

use anyhow::{Context, Result};
use chrono::NaiveDate;
use custos_core::AuthorizationStatus;
use custos_reports::ReportService;
use std::path::Path;

use crate::db;
use crate::ReportAction;

/// Handle report subcommands
pub async fn handle(db_path: &Path, action: ReportAction) -> Result<()> {
    let database = db::connect(db_path).await?;
    let reports = ReportService::new(database.pool().clone());

    match action {
        ReportAction::Summary { actor } => {
            println!("Throughput for user {}", actor);
            println!();
            println!("  Today:");
            for status in [
                AuthorizationStatus::Pending,
                AuthorizationStatus::Approved,
                AuthorizationStatus::Rejected,
            ] {
                let count = reports.count_today(actor, status).await?;
                println!("    {:<9} {}", format!("{}:", status), count);
            }
            println!("    {:<9} {}", "total:", reports.total_today(actor).await?);
            println!();
            println!("  This month:");
            for status in [
                AuthorizationStatus::Pending,
                AuthorizationStatus::Approved,
                AuthorizationStatus::Rejected,
            ] {
                let count = reports.count_this_month(actor, status).await?;
                println!("    {:<9} {}", format!("{}:", status), count);
            }
        }

        ReportAction::Weekly { actor, status } => {
            let status = status.to_core_type();
            let summary = reports.weekly_summary(actor, status).await?;
            println!("{} modifications this week for user {}", status, actor);
            for day in &summary.days {
                println!("  {}  {}", day.date.format("%Y-%m-%d %a"), day.count);
            }
            println!("  Total: {}", summary.total);
        }

        ReportAction::Top { limit } => {
            let leaders = reports.top_initiators_this_week(limit).await?;
            println!("Most approved modifications this week:");
            for (rank, leader) in leaders.iter().enumerate() {
                println!(
                    "{:>3}. {:<20} {} {}  ({})",
                    rank + 1,
                    leader.username,
                    leader.first_name,
                    leader.last_name,
                    leader.records
                );
            }
        }

        ReportAction::Performance {
            from,
            to,
            status,
            json,
        } => {
            let from = parse_date(&from)?;
            let to = parse_date(&to)?;
            let status = status.to_core_type();
            let rows = reports.performance_summary(status, from, to).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{} modifications from {} through {}:", status, from, to);
                for row in rows {
                    println!(
                        "{:>5}  {:<20} {} {}  ({})",
                        row.id, row.username, row.first_name, row.last_name, row.records
                    );
                }
            }
        }
    }

    database.pool().close().await;
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))
}
