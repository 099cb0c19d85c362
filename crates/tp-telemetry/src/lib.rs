//! Logging setup shared by the toolprobe binaries and test suites.
//!
//! All diagnostics go through `tracing`; this crate only installs the
//! subscriber: human-readable or JSON output via `tracing-subscriber`, and a
//! test-writer variant so log lines are captured per test.

pub mod logging;
