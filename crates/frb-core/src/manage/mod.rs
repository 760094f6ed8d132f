//! Remote management API: wire model and the port the workflow talks to.

pub mod client;
pub mod types;
