//! Interactive viewer
//!
//! cargo run --example viewer -- [config.toml]
//!
//! Keys: 1-5 select a mode, Tab cycles, R regenerates the scene,
//! S logs frame statistics, Esc quits. Drag to orbit, wheel to zoom.

use anyhow::{Context, Result};
use hiz_visibility::{load_config, run_viewer, ViewerConfig};

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path).with_context(|| format!("loading {}", path))?,
        None => {
            log::info!("[Viewer] No config given, using defaults");
            ViewerConfig::default()
        }
    };

    run_viewer(config).context("viewer terminated")?;
    Ok(())
}
