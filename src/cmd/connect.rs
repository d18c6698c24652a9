//! The authorization flow itself: `authflow connect`.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Select, theme::ColorfulTheme};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use authflow::attempt::AttemptManager;
use authflow::channel::{CallbackServer, MessageBus};
use authflow::config::AuthflowConfig;
use authflow::errors::AttemptError;
use authflow::flow::{
    AttemptStatus, ChannelObserver, CompositeObserver, FlowEvent, FlowHandle, FlowReport,
    FlowRunner,
};
use authflow::journal::{Journal, JournalObserver};
use authflow::service::{ServiceEntry, ServiceId};
use authflow::ui::TerminalObserver;
use authflow::ui::icons::{CHECK, CROSS, SKIP};

use super::super::Cli;

/// What to do about a service whose attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Retry,
    Skip,
    SkipRemaining,
}

pub async fn cmd_connect(
    cli: &Cli,
    project_dir: PathBuf,
    service_ids: &[String],
    user_id: Option<String>,
    yes: bool,
) -> Result<()> {
    let config = AuthflowConfig::with_cli_args(project_dir, cli.verbose, yes, user_id)?;
    for warning in config.validate() {
        eprintln!("{} {}", style("warning:").yellow(), warning);
    }

    let services = if service_ids.is_empty() {
        config.services()
    } else {
        config.select_services(service_ids)?
    };

    println!();
    println!(
        "Connecting {} service(s) for {}",
        services.len(),
        style(config.user_id()).bold()
    );
    println!();

    let ui = Arc::new(TerminalObserver::new(&services, config.verbose));

    let bus = MessageBus::new();
    let mut server = CallbackServer::new(bus.clone());
    if services.iter().any(ServiceEntry::requires_external_auth) {
        let url = server
            .start(config.callback_port())
            .await
            .context("Failed to start completion callback server")?;
        ui.print_callback_url(&url);
    }

    let attempts = AttemptManager::new(
        Arc::new(config.resolver()),
        config.launcher()?,
        bus,
        config.user_id(),
    )
    .with_geometry(config.geometry())
    .with_poll_interval(config.poll_interval())
    .with_attempt_timeout(config.attempt_timeout());

    let (events_observer, mut events) = ChannelObserver::new();
    let observer = CompositeObserver::new()
        .with(ui.clone())
        .with(Arc::new(JournalObserver::new(Journal::new(
            config.state_file(),
        ))))
        .with(Arc::new(events_observer));

    let (runner, handle) = FlowRunner::new(Arc::new(attempts), Arc::new(observer));
    let runner = runner.with_auto_advance_delay(config.auto_advance_delay());
    let flow = tokio::spawn(runner.run(services));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(FlowEvent::StatusChanged {
                    service,
                    status: AttemptStatus::Error,
                    error,
                }) => {
                    let recovery = choose_recovery(&ui, &service, error, config.yes).await?;
                    apply_recovery(&ui, &handle, service, recovery);
                }
                Some(FlowEvent::Complete) | None => break,
                Some(_) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                ui.print_line(format!("{}", style("Cancelling...").yellow()));
                if handle.cancel().is_err() {
                    break;
                }
            }
        }
    }

    // Closing the last handle ends a flow paused on an error.
    drop(handle);
    let report = flow.await.context("Flow task failed")??;
    ui.finish();
    debug!(
        url = ?server.callback_url(),
        accepted = server.accepted().await,
        "Stopping callback server"
    );
    server.stop().await;

    print_report(&report);
    Ok(())
}

async fn choose_recovery(
    ui: &Arc<TerminalObserver>,
    service: &ServiceId,
    error: Option<AttemptError>,
    yes: bool,
) -> Result<Recovery> {
    if yes || !console::user_attended() {
        info!(service = %service, "Skipping failed service without prompting");
        return Ok(Recovery::Skip);
    }

    let retryable = error.as_ref().is_none_or(AttemptError::is_retryable);
    let mut options = Vec::new();
    if retryable {
        options.push(("Retry", Recovery::Retry));
    }
    options.push(("Skip this service", Recovery::Skip));
    options.push(("Skip all remaining services", Recovery::SkipRemaining));

    let prompt = match &error {
        Some(error) => format!(
            "{} did not connect ({}). What next?",
            service,
            error.category().describe()
        ),
        None => format!("{} did not connect. What next?", service),
    };
    let labels: Vec<&str> = options.iter().map(|(label, _)| *label).collect();
    let ui = ui.clone();
    let selection = tokio::task::spawn_blocking(move || {
        ui.suspend(|| {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&labels)
                .default(0)
                .interact()
        })
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read selection")?;

    Ok(options
        .get(selection)
        .map(|(_, recovery)| *recovery)
        .unwrap_or(Recovery::Skip))
}

fn apply_recovery(ui: &TerminalObserver, handle: &FlowHandle, service: ServiceId, recovery: Recovery) {
    let sent = match recovery {
        Recovery::Retry => handle.retry(service),
        Recovery::Skip => {
            ui.service_skipped(&service);
            handle.skip(service)
        }
        Recovery::SkipRemaining => handle.skip_remaining(),
    };
    if let Err(e) = sent {
        debug!(error = %e, "Recovery not delivered");
    }
}

fn print_report(report: &FlowReport) {
    println!();
    println!("   {:<20} {:<12} Detail", "Service", "Status");
    println!("   {:<20} {:<12} ------", "-------", "------");
    for view in &report.projection.services {
        let (icon, status) = if view.skipped {
            (SKIP, "skipped".to_string())
        } else if view.status == AttemptStatus::Success {
            (CHECK, view.status.to_string())
        } else {
            (CROSS, view.status.to_string())
        };
        println!(
            "{}{:<20} {:<12} {}",
            icon,
            view.display_name,
            status,
            view.error.as_deref().unwrap_or("")
        );
    }
    println!();

    let summary = format!(
        "{}/{} resolved ({} authorized)",
        report.projection.resolved,
        report.projection.total,
        report.projection.succeeded().count()
    );
    if report.cancelled {
        println!("{} {}", style("Cancelled:").yellow().bold(), summary);
    } else if report.all_authorized() {
        println!("{} {}", style("All services connected:").green().bold(), summary);
    } else {
        println!("{} {}", style("Finished:").bold(), summary);
    }
    println!("Run id: {}", style(report.run_id).dim());
    println!();
}
