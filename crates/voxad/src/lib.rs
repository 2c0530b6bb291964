//! Voxa daemon library - exposes modules for testing.

pub mod apps;
pub mod clock;
pub mod config;
pub mod fallback;
pub mod intents;
pub mod llm_client;
pub mod router;
pub mod routes;
pub mod server;
pub mod store;
pub mod weather;
