//! Journal summary: `authflow status`.

use anyhow::Result;
use console::style;
use std::path::Path;

use authflow::config::AuthflowConfig;
use authflow::flow::AttemptStatus;
use authflow::journal::Journal;
use authflow::ui::icons::{CHECK, CROSS, PENDING};

pub fn cmd_status(project_dir: &Path) -> Result<()> {
    let config = AuthflowConfig::new(project_dir.to_path_buf())?;
    let journal = Journal::new(config.state_file());
    let latest = journal.latest()?;

    println!();
    if latest.is_empty() {
        println!("No authorization attempts recorded yet. Run 'authflow connect' to start.");
        println!();
        return Ok(());
    }

    println!("   {:<12} {:<10} {:<26} Detail", "Service", "Status", "When");
    for entry in &latest {
        let icon = match entry.status {
            AttemptStatus::Success => CHECK,
            AttemptStatus::Error => CROSS,
            _ => PENDING,
        };
        println!(
            "{}{:<12} {:<10} {:<26} {}",
            icon,
            entry.service,
            entry.status,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.detail.as_deref().unwrap_or("")
        );
    }

    // Configured services that never reached the journal.
    let pending: Vec<_> = config
        .services()
        .into_iter()
        .filter(|s| !latest.iter().any(|e| e.service == s.id().as_str()))
        .collect();
    for service in &pending {
        println!(
            "{}{:<12} {}",
            PENDING,
            service.id(),
            style("not attempted").dim()
        );
    }

    println!();
    println!(
        "Connected: {}/{}",
        journal.connected()?.len(),
        latest.len() + pending.len()
    );
    println!("Journal: {}", style(journal.path().display()).dim());
    println!();
    Ok(())
}
