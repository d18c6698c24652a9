//! Configuration read from `.authflow/authflow.toml`.
//!
//! Values are layered file → environment → CLI. Without a file the default
//! provider set is used.
//!
//! ```toml
//! [flow]
//! user_id = "user-123"
//! api_base = "http://localhost:8000"
//! poll_interval_ms = 500
//! auto_advance_delay_ms = 800
//! attempt_timeout_ms = 300000
//!
//! [callback]
//! port = 0
//!
//! [surface]
//! mode = "process"
//! command = "chromium --app={url} --window-size={width},{height} --window-position={left},{top}"
//! width = 600
//! height = 700
//!
//! [[services]]
//! id = "microsoft"
//! display_name = "Microsoft 365"
//! login_url = "{api_base}/api/auth/microsoft/login"
//!
//! [[services]]
//! id = "cloudabis"
//! display_name = "CloudABIS"
//! requires_auth = false
//! ```

use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::attempt::StaticTargetResolver;
use crate::errors::FlowError;
use crate::service::{ServiceEntry, ServiceId};
use crate::surface::{
    BrowserLauncher, DEFAULT_HEIGHT, DEFAULT_SCREEN, DEFAULT_WIDTH, ProcessLauncher,
    SurfaceGeometry, SurfaceLauncher,
};

pub const CONFIG_DIR: &str = ".authflow";
pub const CONFIG_FILE: &str = "authflow.toml";
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_USER_ID: &str = "local-user";

pub const ENV_USER_ID: &str = "AUTHFLOW_USER_ID";
pub const ENV_API_BASE: &str = "AUTHFLOW_API_BASE";
pub const ENV_CALLBACK_PORT: &str = "AUTHFLOW_CALLBACK_PORT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Liveness poll interval for open windows
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause after a success before the next window opens
    #[serde(default = "default_auto_advance_delay_ms")]
    pub auto_advance_delay_ms: u64,
    /// Give up on a window with no completion after this long; 0 waits forever
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_auto_advance_delay_ms() -> u64 {
    800
}

fn default_attempt_timeout_ms() -> u64 {
    300_000
}

impl Default for FlowSection {
    fn default() -> Self {
        Self {
            user_id: None,
            api_base: None,
            poll_interval_ms: default_poll_interval_ms(),
            auto_advance_delay_ms: default_auto_advance_delay_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackSection {
    /// 0 picks a free port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceMode {
    /// Hand the login page to the system browser
    #[default]
    Browser,
    /// Spawn `surface.command` per window
    Process,
}

impl std::fmt::Display for SurfaceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceMode::Browser => write!(f, "browser"),
            SurfaceMode::Process => write!(f, "process"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceSection {
    #[serde(default)]
    pub mode: SurfaceMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_screen_width() -> u32 {
    DEFAULT_SCREEN.0
}

fn default_screen_height() -> u32 {
    DEFAULT_SCREEN.1
}

impl Default for SurfaceSection {
    fn default() -> Self {
        Self {
            mode: SurfaceMode::default(),
            command: None,
            width: default_width(),
            height: default_height(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
        }
    }
}

/// One `[[services]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_requires_auth")]
    pub requires_auth: bool,
    /// `{api_base}` is substituted. Absent means `{api_base}/api/auth/<id>/login`;
    /// an empty string means no target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
}

fn default_requires_auth() -> bool {
    true
}

impl ServiceConfig {
    fn oauth(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: Some(display_name.to_string()),
            requires_auth: true,
            login_url: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn to_entry(&self) -> ServiceEntry {
        ServiceEntry::new(self.id.as_str(), self.display_name()).with_external_auth(self.requires_auth)
    }
}

/// The provider set offered when no services are configured.
pub fn default_services() -> Vec<ServiceConfig> {
    vec![
        ServiceConfig::oauth("microsoft", "Microsoft 365"),
        ServiceConfig::oauth("slack", "Slack"),
        ServiceConfig::oauth("google", "Google Workspace"),
        ServiceConfig::oauth("jira", "Jira"),
        ServiceConfig::oauth("asana", "Asana"),
        ServiceConfig::oauth("github", "GitHub"),
        ServiceConfig {
            id: "cloudabis".to_string(),
            display_name: Some("CloudABIS Biometrics".to_string()),
            requires_auth: false,
            login_url: None,
        },
    ]
}

/// The complete authflow.toml structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthflowToml {
    #[serde(default)]
    pub flow: FlowSection,
    #[serde(default)]
    pub callback: CallbackSection,
    #[serde(default)]
    pub surface: SurfaceSection,
    #[serde(default = "default_services")]
    pub services: Vec<ServiceConfig>,
}

impl Default for AuthflowToml {
    fn default() -> Self {
        Self {
            flow: FlowSection::default(),
            callback: CallbackSection::default(),
            surface: SurfaceSection::default(),
            services: default_services(),
        }
    }
}

impl AuthflowToml {
    pub fn load(path: &Path) -> Result<Self, FlowError> {
        let content = std::fs::read_to_string(path).map_err(|source| FlowError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| FlowError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `authflow.toml` from `config_dir`, or defaults if it does not exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self, FlowError> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize authflow.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut seen = HashSet::new();
        for service in &self.services {
            if !seen.insert(service.id.as_str()) {
                warnings.push(format!("Duplicate service id '{}'", service.id));
            }
            if let Some(login_url) = &service.login_url
                && !login_url.trim().is_empty()
            {
                let candidate = login_url.replace("{api_base}", DEFAULT_API_BASE);
                if Url::parse(&candidate).is_err() {
                    warnings.push(format!(
                        "Invalid login_url '{}' for service '{}'",
                        login_url, service.id
                    ));
                }
            }
        }

        if self.flow.poll_interval_ms == 0 {
            warnings.push("poll_interval_ms must be greater than 0".to_string());
        }

        match (&self.surface.mode, &self.surface.command) {
            (SurfaceMode::Process, None) => {
                warnings.push("surface.mode is 'process' but no surface.command is set".to_string())
            }
            (_, Some(command)) if !command.contains("{url}") => warnings.push(format!(
                "surface.command '{}' has no {{url}} placeholder; the URL will be appended",
                command
            )),
            _ => {}
        }

        warnings
    }
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct AuthflowConfig {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: AuthflowToml,
    pub verbose: bool,
    pub yes: bool,
    user_id: String,
    api_base: String,
    callback_port: u16,
}

impl AuthflowConfig {
    /// Load from a project directory, taking overrides from the process environment.
    pub fn new(project_dir: PathBuf) -> Result<Self, FlowError> {
        let project_dir = project_dir
            .canonicalize()
            .map_err(|source| FlowError::ConfigRead {
                path: project_dir.clone(),
                source,
            })?;
        let config_dir = project_dir.join(CONFIG_DIR);
        let toml = AuthflowToml::load_or_default(&config_dir)?;
        Ok(Self::from_parts(project_dir, toml, |key| {
            std::env::var(key).ok()
        }))
    }

    /// Create AuthflowConfig with CLI overrides.
    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        yes: bool,
        user_id: Option<String>,
    ) -> Result<Self, FlowError> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.yes = yes;
        if let Some(user_id) = user_id {
            config.user_id = user_id;
        }
        Ok(config)
    }

    /// Layer `env` over `toml`. `env` looks up one variable by name.
    pub fn from_parts(
        project_dir: PathBuf,
        toml: AuthflowToml,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let user_id = non_empty(ENV_USER_ID)
            .or_else(|| toml.flow.user_id.clone())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
        let api_base = non_empty(ENV_API_BASE)
            .or_else(|| toml.flow.api_base.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let callback_port = non_empty(ENV_CALLBACK_PORT)
            .and_then(|v| v.trim().parse().ok())
            .or(toml.callback.port)
            .unwrap_or(0);

        Self {
            config_dir: project_dir.join(CONFIG_DIR),
            project_dir,
            toml,
            verbose: false,
            yes: false,
            user_id,
            api_base: api_base.trim_end_matches('/').to_string(),
            callback_port,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn callback_port(&self) -> u16 {
        self.callback_port
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.toml.flow.poll_interval_ms.max(1))
    }

    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.toml.flow.auto_advance_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        match self.toml.flow.attempt_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn geometry(&self) -> SurfaceGeometry {
        let surface = &self.toml.surface;
        SurfaceGeometry::centered(
            (surface.screen_width, surface.screen_height),
            surface.width,
            surface.height,
        )
    }

    /// Every configured service, in file order.
    pub fn services(&self) -> Vec<ServiceEntry> {
        self.toml.services.iter().map(ServiceConfig::to_entry).collect()
    }

    /// The configured services named in `ids`, in the order given.
    pub fn select_services(&self, ids: &[String]) -> Result<Vec<ServiceEntry>, FlowError> {
        ids.iter()
            .map(|id| {
                self.service_config(id)
                    .map(ServiceConfig::to_entry)
                    .ok_or_else(|| FlowError::UnknownService(ServiceId::from(id.as_str())))
            })
            .collect()
    }

    pub fn service_config(&self, id: &str) -> Option<&ServiceConfig> {
        self.toml.services.iter().find(|s| s.id == id)
    }

    /// Login endpoint of a service with `{api_base}` filled in, if it has one.
    pub fn login_url(&self, id: &str) -> Option<String> {
        let service = self.service_config(id)?;
        if !service.requires_auth {
            return None;
        }
        let template = match &service.login_url {
            Some(url) if url.trim().is_empty() => return None,
            Some(url) => url.clone(),
            None => format!("{{api_base}}/api/auth/{}/login", service.id),
        };
        Some(template.replace("{api_base}", &self.api_base))
    }

    pub fn resolver(&self) -> StaticTargetResolver {
        let mut resolver = StaticTargetResolver::new();
        for service in &self.toml.services {
            if let Some(url) = self.login_url(&service.id) {
                resolver.insert(service.id.as_str(), url);
            }
        }
        resolver
    }

    pub fn launcher(&self) -> Result<Arc<dyn SurfaceLauncher>, FlowError> {
        match (self.toml.surface.mode, &self.toml.surface.command) {
            (SurfaceMode::Browser, _) => Ok(Arc::new(BrowserLauncher)),
            (SurfaceMode::Process, Some(command)) => {
                Ok(Arc::new(ProcessLauncher::from_template(command)?))
            }
            (SurfaceMode::Process, None) => Err(FlowError::InvalidCommand(
                "surface.mode is 'process' but surface.command is not set".to_string(),
            )),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Get path to the journal.
    pub fn state_file(&self) -> PathBuf {
        self.config_dir.join("state")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        if Url::parse(&self.api_base).is_err() {
            warnings.push(format!("Invalid api_base '{}'", self.api_base));
        }
        warnings
    }
}
