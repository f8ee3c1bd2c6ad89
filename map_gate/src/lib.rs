// MapGate - lib.rs
//
// Checks whether a map archive is published on the file host, learns its
// size, and serves the answer as an HTML page.

pub mod config;
pub mod logging;
pub mod metadata;
pub mod probe_manager;
pub mod render;
pub mod server;
pub mod transport;

pub use metadata::{ProbeInput, ProbeOutcome, UNREACHABLE_STATUS};
pub use probe_manager::{FileAvailabilityProbe, ProbeConfig, Sleeper, TokioSleeper};
pub use transport::{ProbeTransport, ReqwestTransport, TransportConfig, TransportError};
