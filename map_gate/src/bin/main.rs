// MapGate - src/bin/main.rs
//
// Entry point for the edge server. Parses configuration, builds the probe
// and hands both to the router.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use map_gate::config::ServerArgs;
use map_gate::logging::init_tracing_once;
use map_gate::probe_manager::FileAvailabilityProbe;
use map_gate::server::{serve, AppState};
use map_gate::transport::ReqwestTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing_once();
    let args = ServerArgs::parse();
    args.validate()?;

    let transport = ReqwestTransport::new(&args.probe.transport_config())?;
    let probe = FileAvailabilityProbe::new(args.probe.probe_config(), Arc::new(transport));
    let state = AppState {
        probe: Arc::new(probe),
        missing_params_redirect: Arc::from(args.missing_params_redirect.as_str()),
        probe_deadline: args.probe_deadline(),
    };

    let listener = TcpListener::bind(args.listen).await?;
    serve(listener, state, shutdown_signal()).await?;
    info!("map gate stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        // Without a signal handler, run until killed.
        Err(e) => {
            tracing::warn!(error = %e, "could not install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    }
}
