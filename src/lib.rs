//! linkrelay - URL shortener and large-file relay for chat bots
//!
//! The library holds everything except process setup, so integration tests
//! can drive the services directly against a temporary database.
//!
//! # Architecture
//! - `storage`: SeaORM backend for links, files and owners
//! - `services`: code allocation, link registry, transfer engine, broadcast
//! - `transport`: the chat platform boundary and a filesystem implementation
//! - `access`: caller identity and the ownership rule
//! - `interfaces`: command-line front end
//! - `config`: Configuration management
//! - `runtime`: wiring and execution modes
//! - `system`: logging

pub mod access;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod transport;
pub mod utils;
