//! Application lifecycle
//!
//! `startup` wires storage, transport and services from a loaded
//! [`StaticConfig`](crate::config::StaticConfig); `modes` holds the entry
//! points the binary dispatches to.

pub mod modes;
pub mod startup;

pub use startup::{AppContext, prepare_startup};
