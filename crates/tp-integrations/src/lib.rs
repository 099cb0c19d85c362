//! Direct provider access for verification and out-of-band setup.
//!
//! Nothing here stands in for a tool under test: it checks what the tools
//! did and prepares state the tools cannot create themselves.

pub mod github;
