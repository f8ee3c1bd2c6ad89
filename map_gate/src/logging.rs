// MapGate - logging.rs

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Our own spans at `info`, dependencies (hyper, reqwest) only when they warn.
const DEFAULT_DIRECTIVES: &str = "warn,map_gate=info,map_probe=info";

static TRACING: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber once; later calls are no-ops.
///
/// Filter comes from `MAP_GATE_LOG`, then `RUST_LOG`, then
/// `DEFAULT_DIRECTIVES`. `MAP_GATE_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing_once() {
    TRACING.get_or_init(|| {
        let directives = filter_directives(
            std::env::var("MAP_GATE_LOG").ok(),
            std::env::var("RUST_LOG").ok(),
        );
        let json = std::env::var("MAP_GATE_LOG_FORMAT").is_ok_and(|v| v == "json");
        let builder = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(&directives))
            .with_target(true);
        let _ = if json {
            builder.json().try_init()
        } else {
            builder.compact().try_init()
        };
        tracing::debug!(json, %directives, "tracing initialized");
    });
}

fn filter_directives(own: Option<String>, rust_log: Option<String>) -> String {
    own.into_iter()
        .chain(rust_log)
        .map(|raw| raw.trim().to_string())
        .find(|raw| !raw.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string())
}
