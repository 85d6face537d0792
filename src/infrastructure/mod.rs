//! Infrastructure layer: configuration loading and logging setup. The
//! collaborator adapters (repositories, LLM/embedder/executor clients) live
//! under `crate::adapters` since they implement domain ports rather than
//! wrap an external transport.

pub mod config;
pub mod logging;
