//! HubSteward CLI library exports for integration testing.
//!
//! This module exposes the configuration, the file-backed record store and the command
//! implementations.

pub mod auth;
pub mod commands;
pub mod config;
pub mod errors;
pub mod file_store;
pub mod workspace;
