use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::AttemptError;
use crate::flow::{AttemptStatus, FlowObserver};
use crate::service::{ServiceEntry, ServiceId};
use crate::ui::icons::{CHECK, CROSS, KEY, LINK, SKIP, SPARKLE};

/// Terminal rendering of a flow, driven by observer callbacks.
///
/// Two bars are stacked vertically:
/// - Flow bar: resolved services out of the total
/// - Service spinner: the service currently authorizing
///
/// Status lines are printed above the bars through `MultiProgress`.
pub struct TerminalObserver {
    multi: MultiProgress,
    flow_bar: ProgressBar,
    service_bar: ProgressBar,
    names: HashMap<ServiceId, String>,
    verbose: bool,
}

impl TerminalObserver {
    pub fn new(services: &[ServiceEntry], verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let flow_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let flow_bar = multi.add(ProgressBar::new(services.len() as u64));
        flow_bar.set_style(flow_style);
        flow_bar.set_prefix("Services");

        let service_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let service_bar = multi.add(ProgressBar::new_spinner());
        service_bar.set_style(service_style);
        service_bar.set_prefix("     Now");

        let names = services
            .iter()
            .map(|s| (s.id().clone(), s.display_name().to_string()))
            .collect();

        Self {
            multi,
            flow_bar,
            service_bar,
            names,
            verbose,
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` if the rich UI fails.
    pub fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    fn name<'a>(&'a self, service: &'a ServiceId) -> &'a str {
        self.names
            .get(service)
            .map(String::as_str)
            .unwrap_or(service.as_str())
    }

    /// Hide the bars while `f` runs, so an interactive prompt renders cleanly.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.multi.suspend(f)
    }

    pub fn service_skipped(&self, service: &ServiceId) {
        self.print_line(format!(
            "  {} {} {}",
            SKIP,
            style(self.name(service)).dim(),
            style("skipped").dim()
        ));
    }

    pub fn print_callback_url(&self, url: &str) {
        self.print_line(format!(
            "{}Completion callback: {}",
            LINK,
            style(url).cyan()
        ));
    }

    /// Stop the spinner and leave the bars on screen.
    pub fn finish(&self) {
        self.service_bar.finish_and_clear();
        self.flow_bar.finish();
    }
}

impl FlowObserver for TerminalObserver {
    fn service_status_changed(
        &self,
        service: &ServiceId,
        status: AttemptStatus,
        error: Option<&AttemptError>,
    ) {
        let name = self.name(service);
        match status {
            AttemptStatus::Pending => {
                if self.verbose {
                    self.print_line(format!("  {} {}", style("·").dim(), style(name).dim()));
                }
            }
            AttemptStatus::Authorizing => {
                self.service_bar.set_message(format!(
                    "{}Authorizing {} {}",
                    KEY,
                    style(name).yellow(),
                    style("(complete sign-in in the opened window)").dim()
                ));
                self.service_bar
                    .enable_steady_tick(Duration::from_millis(100));
            }
            AttemptStatus::Success => {
                self.service_bar.set_message("");
                self.print_line(format!("  {} {}", CHECK, style(name).green()));
            }
            AttemptStatus::Error => {
                self.service_bar.set_message("");
                let reason = error.map(AttemptError::to_string).unwrap_or_default();
                self.print_line(format!(
                    "  {} {} {}",
                    CROSS,
                    style(name).red().bold(),
                    style(reason).red()
                ));
            }
        }
    }

    fn progress(&self, resolved: usize, total: usize) {
        self.flow_bar.set_length(total as u64);
        self.flow_bar.set_position(resolved as u64);
    }

    fn flow_complete(&self) {
        self.service_bar.finish_and_clear();
        self.flow_bar
            .finish_with_message(format!("{}", style("done").green()));
        self.print_line(format!("\n{} All services resolved\n", SPARKLE));
    }
}
