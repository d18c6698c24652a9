//! Configuration view and validation commands: `authflow config`.

use anyhow::{Context, Result};
use std::path::Path;

use authflow::config::{AuthflowConfig, AuthflowToml, CONFIG_DIR, CONFIG_FILE};

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_dir = project_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Authflow Configuration");
            println!("======================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                AuthflowToml::load(&config_path)?
            } else {
                println!("No {} found at {}", CONFIG_FILE, config_path.display());
                println!("Using default configuration.");
                AuthflowToml::default()
            };
            println!();

            println!("[flow]");
            println!("  poll_interval_ms = {}", toml.flow.poll_interval_ms);
            println!(
                "  auto_advance_delay_ms = {}",
                toml.flow.auto_advance_delay_ms
            );
            println!("  attempt_timeout_ms = {}", toml.flow.attempt_timeout_ms);
            println!();

            println!("[surface]");
            println!("  mode = \"{}\"", toml.surface.mode);
            if let Some(command) = &toml.surface.command {
                println!("  command = \"{}\"", command);
            }
            println!(
                "  window = {}x{} on {}x{}",
                toml.surface.width,
                toml.surface.height,
                toml.surface.screen_width,
                toml.surface.screen_height
            );
            println!();

            println!("[[services]]");
            for service in &toml.services {
                println!(
                    "  {} ({}){}",
                    service.id,
                    service.display_name(),
                    if service.requires_auth {
                        ""
                    } else {
                        ", no authorization needed"
                    }
                );
            }
            println!();

            // Show effective values (including env overrides)
            println!("Effective values (with env overrides):");
            let config = AuthflowConfig::new(project_dir.to_path_buf())?;
            println!("  user_id = \"{}\"", config.user_id());
            println!("  api_base = \"{}\"", config.api_base());
            match config.callback_port() {
                0 => println!("  callback port = dynamic"),
                port => println!("  callback port = {}", port),
            }
            let geometry = config.geometry();
            println!(
                "  window position = left {}, top {}",
                geometry.left, geometry.top
            );
            println!();

            if !config_path.exists() {
                println!("Run 'authflow config init' to create an {} file.", CONFIG_FILE);
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE);
                return Ok(());
            }

            let config = AuthflowConfig::new(project_dir.to_path_buf())?;
            let warnings = config.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE, config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config_dir).with_context(|| {
                format!("Failed to create config directory: {}", config_dir.display())
            })?;

            AuthflowToml::default().save(&config_path)?;

            println!("Created {} at {}", CONFIG_FILE, config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [flow] user_id, api_base, poll_interval_ms, auto_advance_delay_ms,");
            println!("           attempt_timeout_ms");
            println!("  - [surface] mode, command, width, height");
            println!("  - [[services]] id, display_name, requires_auth, login_url");
            println!();
        }
    }

    Ok(())
}
