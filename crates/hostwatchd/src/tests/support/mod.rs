//! Test doubles shared by the daemon's unit and behavioural suites.

mod client;
mod config_loader;
mod metrics;
mod reporter;
mod transport;

pub use client::TestClient;
pub use config_loader::{FailingConfigLoader, loopback_config};
pub use metrics::StaticMetricsProvider;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use transport::ChannelTransport;
