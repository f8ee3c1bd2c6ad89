// MapGate - src/bin/probe.rs
//
// One-shot probe: checks a single archive and prints the outcome as JSON.
// Useful for checking the file host by hand without running the server.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use map_gate::config::ProbeArgs;
use map_gate::logging::init_tracing_once;
use map_gate::probe_manager::FileAvailabilityProbe;
use map_gate::transport::ReqwestTransport;

/// Check whether a map archive is published and report its size.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Map group identifier, e.g. "A".
    map_group: String,

    /// Mission display title, used verbatim in the archive name.
    mission_display_title: String,

    #[command(flatten)]
    probe: ProbeArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing_once();
    let args = Args::parse();
    args.probe.validate()?;

    let transport = ReqwestTransport::new(&args.probe.transport_config())?;
    let probe = FileAvailabilityProbe::new(args.probe.probe_config(), Arc::new(transport));

    let outcome = probe.probe(&args.map_group, &args.mission_display_title).await;
    let json = serde_json::to_string_pretty(&outcome).context("serializing probe outcome")?;
    println!("{json}");
    Ok(())
}
