// Error types shared by the trajectory and impact pipelines

use thiserror::Error;

/// Soft failures of the trajectory side. Each variant carries the marker
/// string the service emits in place of a response body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    #[error("missing_or_invalid_a")]
    MissingSemiMajorAxis,

    #[error("invalid_eccentricity")]
    InvalidEccentricity(f64),

    #[error("empty trajectory")]
    EmptyTrajectory,

    #[error("trajectory length mismatch: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("no finite separation between trajectories")]
    DegenerateSeparation,
}

impl TrajectoryError {
    /// Marker placed in the `error` field of a rejected request.
    pub fn marker(&self) -> String {
        self.to_string()
    }
}

/// Failures of the terrain, population and water lookups.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("lookup service returned status {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("failed to decode {endpoint} response: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("lookup unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ImpactError {
    #[error("terrain/population lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
