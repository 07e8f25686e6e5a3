// State Manager - request shaping and the service facade
// Coerces loose JSON requests and runs them through the trajectory and impact pipelines

use serde_json::{json, Value};
use tracing::warn;

use crate::api_client::GeoDataClient;
use crate::config::SimConfig;
use crate::error::{ConfigError, ImpactError};
use crate::impact_engine::{
    ImpactAssessment, ImpactEffectsPipeline, ImpactorParameters, TerrainClassifier,
};
use crate::impact_physics::ScalingLawPhysics;
use crate::physics_engine::OrbitStateSampler;
use crate::trajectory::{TrajectoryAssembler, TrajectoryRequest};

// =============================================================================
// REQUEST COERCION
// =============================================================================

/// Numeric value of a JSON field: numbers, numeric strings and booleans.
fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn field_or(data: &Value, key: &str, default: f64) -> f64 {
    coerce_f64(data.get(key)).unwrap_or(default)
}

/// Catalog record (`a` in AU, `e`, `i`, `om`, `w` in degrees, `spkid`/`id`)
/// to a trajectory request. Anything but `a` defaults to zero.
pub fn parse_trajectory_request(data: &Value) -> TrajectoryRequest {
    let asteroid_id = ["spkid", "id"]
        .iter()
        .filter_map(|key| match data.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .next()
        .unwrap_or_else(|| "unknown".to_string());

    TrajectoryRequest {
        asteroid_id,
        a_au: coerce_f64(data.get("a")),
        e: field_or(data, "e", 0.0),
        i_deg: field_or(data, "i", 0.0),
        raan_deg: field_or(data, "om", 0.0),
        argp_deg: field_or(data, "w", 0.0),
    }
}

/// Impact request (`m`, `d`, `v`, `rho`, `alpha`, `lat`, `lon`) with
/// defaults for anything missing or non-numeric.
pub fn parse_impactor(data: &Value) -> ImpactorParameters {
    ImpactorParameters {
        mass_kg: field_or(data, "m", 0.0),
        diameter_m: field_or(data, "d", 0.0),
        velocity_m_s: field_or(data, "v", 0.0),
        density_kg_m3: field_or(data, "rho", ImpactorParameters::DEFAULT_DENSITY),
        angle_deg: field_or(data, "alpha", ImpactorParameters::DEFAULT_ANGLE),
        lat: field_or(data, "lat", 0.0),
        lon: field_or(data, "lon", 0.0),
    }
}

/// Wall-clock POSIX seconds.
pub fn epoch_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1.0e6
}

// =============================================================================
// SERVICE STATE
// =============================================================================

pub struct AppState {
    pub config: SimConfig,
    pub trajectory: TrajectoryAssembler,
    pub impact: ImpactEffectsPipeline<GeoDataClient, ScalingLawPhysics>,
}

impl AppState {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let geo = GeoDataClient::new(
            config.geodata_url.clone(),
            config.geodata_api_key.clone(),
            config.http_timeout,
        )?;

        let trajectory = TrajectoryAssembler::new(OrbitStateSampler::new(config.kepler))
            .sample_count(config.sample_count);
        let impact = ImpactEffectsPipeline::new(
            geo,
            ScalingLawPhysics,
            TerrainClassifier::new(config.water_precedence),
        );

        Ok(Self {
            config,
            trajectory,
            impact,
        })
    }

    /// Synchronized asteroid/Earth simulation as JSON, or `{"error": marker}`.
    pub async fn full_simulation(&self, data: &Value) -> Value {
        let request = parse_trajectory_request(data);
        match self.trajectory.assemble(&request, epoch_now()) {
            Ok(response) => to_json(&response),
            Err(err) => {
                warn!(%err, asteroid_id = %request.asteroid_id, "trajectory request rejected");
                json!({ "error": err.marker() })
            }
        }
    }

    /// Ellipse preview as JSON, or `{"error": marker}`.
    pub fn static_orbit(&self, data: &Value) -> Value {
        let request = parse_trajectory_request(data);
        match self.trajectory.static_orbit(&request) {
            Ok(orbit) => to_json(&orbit),
            Err(err) => {
                warn!(%err, "static orbit request rejected");
                json!({ "error": err.marker() })
            }
        }
    }

    pub async fn impact(&self, data: &Value) -> Result<ImpactAssessment, ImpactError> {
        self.impact.assess(&parse_impactor(data)).await
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| json!({ "error": err.to_string() }))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trajectory_request() {
        let req = parse_trajectory_request(&json!({
            "spkid": "2000433", "a": "1.458", "e": 0.2229, "i": 10.83, "om": null, "w": "x"
        }));
        assert_eq!(req.asteroid_id, "2000433");
        assert_eq!(req.a_au, Some(1.458));
        assert_eq!(req.e, 0.2229);
        assert_eq!(req.i_deg, 10.83);
        assert_eq!(req.raan_deg, 0.0);
        assert_eq!(req.argp_deg, 0.0);

        let bare = parse_trajectory_request(&json!({ "id": 99 }));
        assert_eq!(bare.asteroid_id, "99");
        assert_eq!(bare.a_au, None);
        assert_eq!(parse_trajectory_request(&json!({})).asteroid_id, "unknown");
    }

    #[test]
    fn test_parse_impactor_defaults() {
        let params = parse_impactor(&json!({ "m": 1e10, "v": "20000", "lat": 40.7 }));
        assert_eq!(params.mass_kg, 1e10);
        assert_eq!(params.velocity_m_s, 20000.0);
        assert_eq!(params.diameter_m, 0.0);
        assert_eq!(params.density_kg_m3, 3000.0);
        assert_eq!(params.angle_deg, 45.0);
        assert_eq!(params.lat, 40.7);
        assert_eq!(params.lon, 0.0);
    }

    #[test]
    fn test_epoch_is_recent() {
        // 2020-09-13
        assert!(epoch_now() > 1.6e9);
    }

    #[tokio::test]
    async fn test_full_simulation_json() {
        let config = SimConfig {
            sample_count: 50,
            ..SimConfig::default()
        };
        let state = AppState::new(config).unwrap();

        let out = state
            .full_simulation(&json!({ "spkid": "3", "a": 1.5, "e": 0.2, "i": 10 }))
            .await;
        assert_eq!(out["asteroid_positions"].as_array().unwrap().len(), 50);
        assert_eq!(out["asteroid_id"], "3");
        assert!(out["closest_approach"]["index"].is_u64());
        let epoch = out["epoch"].as_f64().unwrap();
        let first_abs = out["asteroid_absolute_timestamps"][0].as_f64().unwrap();
        assert_eq!(first_abs, epoch + out["timestamps"][0].as_f64().unwrap());

        let rejected = state.full_simulation(&json!({ "e": 0.2 })).await;
        assert_eq!(rejected, json!({ "error": "missing_or_invalid_a" }));

        let hyperbolic = state.full_simulation(&json!({ "a": 2.0, "e": 1.3 })).await;
        assert_eq!(hyperbolic, json!({ "error": "invalid_eccentricity" }));
    }

    #[test]
    fn test_static_orbit_json() {
        let state = AppState::new(SimConfig::default()).unwrap();
        let out = state.static_orbit(&json!({ "a": 2.0, "e": 0.5 }));
        assert_eq!(out["points"].as_array().unwrap().len(), 1000);
        assert_eq!(out["orbit_meta"]["Q_au"], 3.0);
        assert!(out["orbit_meta"].get("period_seconds").is_none());
    }
}
