pub mod client;
pub mod reaper;
pub mod repos;

pub use client::{GitHubError, GitHubVerifier, Result};
