//! Shared configuration for the toolprobe workspace.
//!
//! The harness never reads the process environment itself: a single
//! [`config::HarnessConfig`] is built at suite entry and handed to every
//! component by reference.

pub mod config;
