//! Tether Runtime
//!
//! Loads settings, spawns one entity per configured script and drives the
//! scripts' `Start`/`Update` hooks for a fixed number of ticks.

mod scene;
mod settings;

use anyhow::Result;
use scene::Scene;
use settings::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tether.json"));
    let settings = Settings::load(&path)?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Tether v{}", tether_core::VERSION);
    tracing::info!(settings = %path.display(), scripts = settings.scripts.len(), "Loading scene...");

    let scene = Scene::new(&settings)?;
    tracing::info!(
        entities = scene.world().borrow().entity_count(),
        scripted = scene.scripted_entities().count(),
        "Scene ready"
    );
    scene.run(settings.ticks);

    for entity in scene.scripted_entities() {
        if let Some(position) = scene.position(entity) {
            tracing::info!(?entity, x = position.x, y = position.y, "final position");
        }
    }
    Ok(())
}
