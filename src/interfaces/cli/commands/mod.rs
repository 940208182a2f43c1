//! CLI command implementations
//!
//! This module re-exports all CLI command functions.

mod admin;
mod config_gen;
mod files;
mod links;
mod owners;

pub use admin::*;
pub use config_gen::*;
pub use files::*;
pub use links::*;
pub use owners::*;
