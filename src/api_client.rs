// Geodata API Client
// Terrain, population and water-mask lookups by coordinate

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::LookupError;
use crate::impact_engine::TerrainContext;

// =============================================================================
// LOOKUP INTERFACE
// =============================================================================

/// Coordinate lookups the impact pipeline depends on. Calls are made one at
/// a time and any failure is handed back to the caller untouched.
#[allow(async_fn_in_trait)]
pub trait GeoDataSource {
    /// Energy-coupling coefficient, lithology label and elevation (m).
    async fn terrain_characteristics(&self, lat: f64, lon: f64)
        -> Result<TerrainContext, LookupError>;

    /// Number of people living within `radius_km` of the point.
    async fn population_within_radius(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> Result<f64, LookupError>;

    async fn is_over_water(&self, lat: f64, lon: f64) -> Result<bool, LookupError>;
}

// =============================================================================
// API RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainResponse {
    pub eta: f64,
    /// Absent or null over open water
    pub rock_type: Option<String>,
    pub elevation_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationResponse {
    pub population: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterResponse {
    pub over_water: bool,
}

impl TerrainResponse {
    pub fn into_context(self) -> TerrainContext {
        TerrainContext {
            eta: self.eta,
            rock_type: self.rock_type.unwrap_or_default(),
            elevation_m: self.elevation_m,
        }
    }
}

// =============================================================================
// API CLIENT
// =============================================================================

pub struct GeoDataClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GeoDataClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn query(&self, params: &[(&'static str, f64)]) -> Vec<(&'static str, String)> {
        let mut query: Vec<(&'static str, String)> =
            params.iter().map(|(k, v)| (*k, v.to_string())).collect();
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }
        query
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&'static str, f64)],
    ) -> Result<T, LookupError> {
        let url = self.endpoint(path);
        debug!(%url, ?params, "geodata request");

        let response = self
            .client
            .get(&url)
            .query(&self.query(params))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LookupError::Status {
                endpoint: path.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| LookupError::Decode {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })
    }
}

impl GeoDataSource for GeoDataClient {
    async fn terrain_characteristics(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<TerrainContext, LookupError> {
        let data: TerrainResponse = self
            .get_json("terrain", &[("lat", lat), ("lon", lon)])
            .await?;
        Ok(data.into_context())
    }

    async fn population_within_radius(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> Result<f64, LookupError> {
        let data: PopulationResponse = self
            .get_json(
                "population",
                &[("lat", lat), ("lon", lon), ("radius_km", radius_km)],
            )
            .await?;
        Ok(data.population)
    }

    async fn is_over_water(&self, lat: f64, lon: f64) -> Result<bool, LookupError> {
        let data: WaterResponse = self
            .get_json("water", &[("lat", lat), ("lon", lon)])
            .await?;
        Ok(data.over_water)
    }
}
