//! Mode routing
//!
//! linkrelay currently ships a single execution mode, the one-shot CLI.

pub mod cli;

pub use cli::run_cli;
