//! medinify-cli: library side of the `medinify` binary.
//!
//! Configuration loading and the subcommand implementations live here so they
//! can be tested without spawning the binary.
pub mod commands;
pub mod config;
