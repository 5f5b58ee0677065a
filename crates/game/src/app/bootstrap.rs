use skirmish_sim::Session;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::autopilot::Autopilot;
use super::config::{self, GameConfig, CONFIG_ENV_VAR};
use super::surface::{FrameStats, TracingAudio};
use super::AppError;

pub(crate) struct AppWiring {
    pub(crate) config: GameConfig,
    pub(crate) session: Session,
    pub(crate) autopilot: Autopilot,
    pub(crate) surface: FrameStats,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Skirmish Startup ===");

    let config = config::load_from_env()?;
    info!(
        config_env = CONFIG_ENV_VAR,
        seed = ?config.sim.seed,
        tiles_x = config.sim.map.tiles_x,
        tiles_y = config.sim.map.tiles_y,
        final_round = config.sim.progression.final_round,
        "config_loaded"
    );
    let session = Session::with_audio(config.sim.clone(), Box::new(TracingAudio));

    Ok(AppWiring {
        config,
        session,
        autopilot: Autopilot::default(),
        surface: FrameStats::default(),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
