pub mod config;
pub mod console;
pub mod editor;
pub mod error;
pub mod generation;
pub mod ipc;
pub mod limiter;
pub mod sandbox;

use std::sync::Arc;
use std::time::Duration;

use config::DaemonConfig;
use console::ConsoleLog;
use editor::EditorShell;
use generation::{GenerationBackend, GenerationClient, HttpBackend};
use ipc::event::EventBroadcaster;
use limiter::RateLimiter;
use sandbox::ExecutionSandbox;

/// Shared application state passed to every RPC handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub shell: Arc<EditorShell>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    /// Wire the editor shell against the real HTTP generation backend.
    pub fn new(config: DaemonConfig) -> Self {
        let backend: Arc<dyn GenerationBackend> = Arc::new(HttpBackend::new(&config.generation));
        Self::with_backend(config, backend)
    }

    /// Wire the editor shell against an arbitrary backend. Tests use this to
    /// script endpoint replies without a network.
    pub fn with_backend(config: DaemonConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let console = Arc::new(ConsoleLog::new(config.console.max_records));
        let limiter = RateLimiter::new(
            config.limiter.capacity,
            Duration::from_millis(config.limiter.refill_interval_ms),
        );
        let client = GenerationClient::new(limiter, backend);
        let sandbox = ExecutionSandbox::new(config.sandbox.node_path.as_str());
        let shell = Arc::new(EditorShell::new(
            client,
            sandbox,
            console,
            Arc::clone(&broadcaster),
        ));

        Self {
            config: Arc::new(config),
            broadcaster,
            shell,
            started_at: std::time::Instant::now(),
        }
    }
}
