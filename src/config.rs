use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "anclora.toml";
pub const RC_FILE: &str = ".anclora-rc";
pub const ENV_PREFIX: &str = "ANCLORA";

/// Main configuration structure for the kanban engine
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AncloraConfig {
    /// Move protocol settings
    pub workflow: WorkflowConfig,
    /// Change subscription settings
    pub realtime: RealtimeConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// How long a written id stays muted for its own change echo
    pub pending_ttl_ms: u64,
    /// Refuse a second drag while the first one is still in flight
    pub block_pending_moves: bool,
    /// Forget the pending entry as soon as the write is confirmed
    pub clear_pending_on_confirm: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            pending_ttl_ms: 5000,
            block_pending_moves: true,
            clear_pending_on_confirm: false,
        }
    }
}

impl WorkflowConfig {
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_millis(self.pending_ttl_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Subscription channel name
    pub channel: String,
    pub schema: String,
    pub table: String,
    /// Show toasts for changes made by other sessions
    pub show_notifications: bool,
    /// Change events buffered before a slow listener lags
    pub event_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel: "kanban-realtime".to_string(),
            schema: crate::remote::DEFAULT_SCHEMA.to_string(),
            table: crate::remote::DEFAULT_TABLE.to_string(),
            show_notifications: true,
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl AncloraConfig {
    /// Load configuration from the working directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Configuration files in `dir` (anclora.toml, .anclora-rc)
    /// 3. Environment variables (ANCLORA_WORKFLOW__PENDING_TTL_MS, ...)
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let toml_path = dir.join(CONFIG_FILE);
        if toml_path.exists() {
            builder = builder.add_source(File::from(toml_path).format(FileFormat::Toml));
        }

        let rc_path = dir.join(RC_FILE);
        if rc_path.exists() {
            builder = builder.add_source(File::from(rc_path).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AncloraConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.workflow.pending_ttl_ms == 0 {
            anyhow::bail!("workflow.pending_ttl_ms must be greater than zero");
        }
        if self.realtime.event_buffer == 0 {
            anyhow::bail!("realtime.event_buffer must be greater than zero");
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<AncloraConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = AncloraConfig::load_env_file();
        AncloraConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static AncloraConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let config = config()?;
    tracing::info!(
        pending_ttl_ms = config.workflow.pending_ttl_ms,
        channel = %config.realtime.channel,
        "Configuration loaded successfully"
    );
    Ok(())
}
