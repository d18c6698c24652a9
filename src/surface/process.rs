//! Windows backed by a spawned command, usually a browser in app mode.

use async_trait::async_trait;
use reqwest::Url;
use std::io;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::{Surface, SurfaceGeometry, SurfaceLauncher};
use crate::errors::FlowError;

/// Spawns `program args...` with placeholders filled in per window.
///
/// Supported placeholders: `{url}`, `{width}`, `{height}`, `{left}`, `{top}`.
/// A template without `{url}` gets the URL appended as the last argument.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: String,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn from_template(template: &str) -> Result<Self, FlowError> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| FlowError::InvalidCommand(template.to_string()))?;
        let mut args: Vec<String> = parts.collect();

        if !program.contains("{url}") && !args.iter().any(|a| a.contains("{url}")) {
            args.push("{url}".to_string());
        }

        Ok(Self { program, args })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with every placeholder substituted.
    pub fn render_args(&self, url: &Url, geometry: SurfaceGeometry) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{url}", url.as_str())
                    .replace("{width}", &geometry.width.to_string())
                    .replace("{height}", &geometry.height.to_string())
                    .replace("{left}", &geometry.left.to_string())
                    .replace("{top}", &geometry.top.to_string())
            })
            .collect()
    }
}

#[async_trait]
impl SurfaceLauncher for ProcessLauncher {
    async fn open(
        &self,
        url: &Url,
        geometry: SurfaceGeometry,
    ) -> io::Result<Option<Box<dyn Surface>>> {
        let args = self.render_args(url, geometry);
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        info!(program = %self.program, pid = child.id().unwrap_or(0), "Opened authorization window");
        Ok(Some(Box::new(ProcessSurface { child })))
    }
}

/// A window that lives as long as its child process.
pub struct ProcessSurface {
    child: Child,
}

#[async_trait]
impl Surface for ProcessSurface {
    fn is_closed(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(%status, "Authorization window process exited");
                true
            }
            Ok(None) => false,
            Err(e) => {
                debug!(error = %e, "Could not query authorization window process");
                true
            }
        }
    }

    async fn close(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "Failed to kill authorization window process");
        }
    }
}
