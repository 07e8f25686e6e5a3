// NEO Impact - asteroid trajectory and impact-effects simulation
// Library entry point

pub mod api_client;
pub mod config;
pub mod error;
pub mod impact_engine;
pub mod impact_physics;
pub mod physics_engine;
pub mod state_manager;
pub mod trajectory;

use tracing_subscriber::EnvFilter;

pub use api_client::{GeoDataClient, GeoDataSource};
pub use config::SimConfig;
pub use error::{ConfigError, ImpactError, LookupError, TrajectoryError};
pub use impact_engine::{
    ImpactAssessment, ImpactEffectsPipeline, ImpactSurface, ImpactorParameters, TargetMaterial,
    TerrainClassifier, WaterPrecedence,
};
pub use impact_physics::{ImpactPhysics, ScalingLawPhysics};
pub use physics_engine::{KeplerSolver, OrbitStateSampler, OrbitalElements, Vector3};
pub use state_manager::AppState;
pub use trajectory::{TrajectoryAssembler, TrajectoryRequest, TrajectoryResponse};

/// Install the global fmt subscriber. `RUST_LOG` overrides the configured
/// filter; a second call is a no-op.
pub fn init_logging(config: &SimConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
