//! Helpers for tests of this crate and the crates built on it.

use crate::config::PatternsConfig;
use crate::data_source::ResourceSpec;

/// Initialize test logging (call once per test).
pub fn init_test_logging() {
    use tracing_subscriber::filter::{Directive, LevelFilter};
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = "async_patterns=debug"
        .parse()
        .unwrap_or_else(|_| Directive::from(LevelFilter::DEBUG));
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_test_writer()
        .try_init();
}

/// The three-resource fixture with the given latencies, ids 1, 2, 3.
pub fn fixture_with_latencies(latencies: [u64; 3]) -> PatternsConfig {
    let names = ["stench", "drizzle", "speed-boost"];
    PatternsConfig {
        resources: names
            .iter()
            .zip(latencies)
            .zip(1..)
            .map(|((name, latency_ms), id)| ResourceSpec::new(id, *name, latency_ms))
            .collect(),
        ..PatternsConfig::default()
    }
}

/// The default fixture with resource `id` failing.
pub fn fixture_failing(id: u32) -> PatternsConfig {
    let mut config = PatternsConfig::default();
    if let Some(resource) = config.resources.iter_mut().find(|resource| resource.id == id) {
        resource.fail = true;
    }
    config
}

/// The names every strategy delivers for the default fixture.
pub fn expected_names() -> Vec<String> {
    ["stench", "drizzle", "speed-boost"].map(String::from).to_vec()
}
