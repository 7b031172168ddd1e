use super::apply::describe_version;
use super::common::{close_targets, connect_targets, open_source};
use crate::config::Config;
use crate::migrator::MigrationStatus;
use anyhow::{Result, bail};
use serde::Serialize;
use std::path::Path;

/// Output format for status reports
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Serialize)]
struct TargetStatus {
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<MigrationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn cmd_migrate_status(
    config: &Config,
    root_dir: &Path,
    format: StatusFormat,
) -> Result<()> {
    let source = open_source(config, root_dir)?;
    let (targets, unreachable) = connect_targets(config, source).await?;

    let mut report = Vec::with_capacity(targets.len() + unreachable.len());
    for (label, migrator) in &targets {
        let entry = match migrator.status().await {
            Ok(status) => TargetStatus {
                target: label.clone(),
                status: Some(status),
                error: None,
            },
            Err(e) => TargetStatus {
                target: label.clone(),
                status: None,
                error: Some(e.to_string()),
            },
        };
        report.push(entry);
    }
    for (label, e) in unreachable {
        report.push(TargetStatus {
            target: label,
            status: None,
            error: Some(format!("{:#}", e)),
        });
    }
    close_targets(targets).await;

    match format {
        StatusFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        StatusFormat::Human => report.iter().for_each(print_status),
    }

    let failed = report.iter().filter(|entry| entry.error.is_some()).count();
    if failed > 0 {
        bail!("Could not read status of {} target(s)", failed);
    }
    Ok(())
}

fn print_status(entry: &TargetStatus) {
    println!("{}", entry.target);

    if let Some(error) = &entry.error {
        println!("  ❌ {}", error);
        return;
    }

    let Some(status) = &entry.status else {
        return;
    };

    println!("  Recorded: {}", describe_version(status.recorded));
    println!("  Latest available: {}", describe_version(status.latest));
    if status.is_up_to_date() {
        println!("  ✅ Up to date");
    } else {
        println!("  Outstanding:");
        for pending in &status.outstanding {
            println!("    {} - {}", pending.index, pending.name);
        }
    }
}
