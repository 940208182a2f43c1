use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;
use crate::errors::Result;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Only the binary entry point reads this; library services receive their
/// configuration sections through their constructors.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Load the configuration once and install it globally
///
/// A second call keeps the first configuration.
pub fn init_config(path: &str) -> Result<()> {
    if CONFIG.get().is_some() {
        return Ok(());
    }
    let loaded = StaticConfig::load(path)?;
    CONFIG.get_or_init(|| ArcSwap::from_pointee(loaded));
    Ok(())
}
