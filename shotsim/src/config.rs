use anyhow::{Context, Result};
use std::{fs, path::Path};
use tracing_subscriber::EnvFilter;

use shotpath::{config::ShotSettings, world::Arena};

// ============================================================================
// Logging
// ============================================================================

// RUST_LOG wins over the command-line filter; a bad filter falls back to info.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

// ============================================================================
// Input Files
// ============================================================================

pub fn parse_settings(json: &str) -> Result<ShotSettings> {
    let settings: ShotSettings = serde_json::from_str(json).context("invalid shot settings")?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_settings(path: &Path) -> Result<ShotSettings> {
    let json = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_settings(&json).with_context(|| format!("in {}", path.display()))
}

pub fn load_arena(path: &Path) -> Result<Arena> {
    let json = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let arena: Arena = serde_json::from_str(&json).with_context(|| format!("invalid world in {}", path.display()))?;
    arena.validate().with_context(|| format!("in {}", path.display()))?;
    Ok(arena)
}
