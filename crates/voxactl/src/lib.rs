//! Voxa Control library - exposes modules for testing.

pub mod actions;
pub mod cli;
pub mod client;
pub mod listen;
pub mod speech;
