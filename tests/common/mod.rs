#![allow(dead_code)]

pub mod fixtures;
pub mod nodes;

pub use fixtures::*;
pub use nodes::*;

/// Install the tracing subscriber once per test binary.
pub fn init_tracing() {
    graphloom::telemetry::init_tracing();
}
