//! WordPress project scaffolding: an ordered pipeline of idempotent setup
//! steps plus a WP-CLI acquisition subsystem (locate or download the tool,
//! verify its checksum, run it through a resolved PHP interpreter).
//!
//! The binary wraps [`pipeline::scaffold`]; embedding callers use the same
//! entry point and receive a `Result` instead of a process exit.

pub mod cli;
pub mod config;
pub mod env_filters;
pub mod mu_plugins;
pub mod packages;
pub mod paths;
pub mod pipeline;
pub mod steps;
pub mod wp_cli;
