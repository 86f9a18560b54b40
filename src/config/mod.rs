use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4320;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── LimiterConfig ────────────────────────────────────────────────────────────

/// Token-bucket settings for the generation endpoint (`[limiter]` in
/// config.toml). Defaults allow 10 requests per minute.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Maximum tokens in the bucket.
    pub capacity: u32,
    /// Time to regenerate `capacity` tokens, in milliseconds.
    pub refill_interval_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_interval_ms: 60_000,
        }
    }
}

// ─── GenerationConfig ─────────────────────────────────────────────────────────

/// Generation endpoint settings (`[generation]` in config.toml).
///
/// The API key is usually supplied via the `CODEDECK_API_KEY` env var rather
/// than the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of the generateContent-style endpoint.
    pub api_base_url: String,
    /// Model identifier appended to the endpoint path.
    pub model: String,
    /// API key passed as a query parameter. Empty = unauthenticated.
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-pro".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

// ─── SandboxConfig ────────────────────────────────────────────────────────────

/// Execution sandbox settings (`[sandbox]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Path to the Node.js binary used for sandboxed runs.
    pub node_path: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            node_path: "node".to_string(),
        }
    }
}

// ─── ConsoleConfig ────────────────────────────────────────────────────────────

/// Console log settings (`[console]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Maximum retained log records; the oldest are evicted beyond this.
    pub max_records: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { max_records: 10_000 }
    }
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// WebSocket server port (default: 4320).
    port: Option<u16>,
    /// Log level filter string, e.g. "debug", "info,codedeck=trace".
    log: Option<String>,
    /// Log output format: "pretty" (default) | "json".
    log_format: Option<String>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    limiter: Option<LimiterConfig>,
    generation: Option<GenerationConfig>,
    sandbox: Option<SandboxConfig>,
    console: Option<ConsoleConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub log: String,
    /// "pretty" (default) | "json" (structured for log aggregators).
    pub log_format: String,
    pub bind_address: String,
    pub limiter: LimiterConfig,
    pub generation: GenerationConfig,
    pub sandbox: SandboxConfig,
    pub console: ConsoleConfig,
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let log_format = std::env::var("CODEDECK_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let bind_address = bind_address
            .or(std::env::var("CODEDECK_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let limiter = toml.limiter.unwrap_or_default();
        let mut generation = toml.generation.unwrap_or_default();
        if let Ok(key) = std::env::var("CODEDECK_API_KEY") {
            if !key.is_empty() {
                generation.api_key = key;
            }
        }
        let sandbox = toml.sandbox.unwrap_or_default();
        let console = toml.console.unwrap_or_default();

        Self {
            port,
            data_dir,
            log,
            log_format,
            bind_address,
            limiter,
            generation,
            sandbox,
            console,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/codedeck
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("codedeck");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/codedeck or ~/.local/share/codedeck
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("codedeck");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("codedeck");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\codedeck
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("codedeck");
        }
    }
    // Fallback
    PathBuf::from(".codedeck")
}
