//! Service listing: `authflow services`.

use anyhow::Result;
use std::path::Path;

use authflow::attempt::{TargetResolver, build_target_url};
use authflow::config::AuthflowConfig;

pub fn cmd_services(project_dir: &Path) -> Result<()> {
    let config = AuthflowConfig::new(project_dir.to_path_buf())?;
    let resolver = config.resolver();
    let services = config.services();

    if services.is_empty() {
        println!();
        println!("No services configured. Add [[services]] entries to authflow.toml.");
        println!();
        return Ok(());
    }

    println!();
    println!("{:<12} {:<20} {:<6} Login target", "Id", "Name", "Auth");
    println!("{:<12} {:<20} {:<6} ------------", "--", "----", "----");
    for service in &services {
        let target = if !service.requires_external_auth() {
            "(none needed)".to_string()
        } else {
            match resolver.resolve(service) {
                Some(base) => build_target_url(&base, config.user_id(), service.id())
                    .map(|url| url.to_string())
                    .unwrap_or_else(|e| format!("(invalid: {})", e)),
                None => "(not configured)".to_string(),
            }
        };
        println!(
            "{:<12} {:<20} {:<6} {}",
            service.id(),
            service.display_name(),
            if service.requires_external_auth() { "yes" } else { "no" },
            target
        );
    }
    println!();
    Ok(())
}
