// Runtime configuration read from the environment (and a .env file if present)

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::impact_engine::WaterPrecedence;
use crate::physics_engine::{KeplerSolver, DEFAULT_SAMPLE_COUNT};

pub const ENV_GEODATA_URL: &str = "NEO_GEODATA_URL";
pub const ENV_GEODATA_API_KEY: &str = "NEO_GEODATA_API_KEY";
pub const ENV_SAMPLE_COUNT: &str = "NEO_SAMPLE_COUNT";
pub const ENV_KEPLER_ITERATIONS: &str = "NEO_KEPLER_ITERATIONS";
pub const ENV_KEPLER_TOLERANCE: &str = "NEO_KEPLER_TOLERANCE";
pub const ENV_WATER_PRECEDENCE: &str = "NEO_WATER_PRECEDENCE";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "NEO_HTTP_TIMEOUT_SECS";
pub const ENV_LOG: &str = "NEO_LOG";

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub geodata_url: String,
    pub geodata_api_key: Option<String>,
    pub sample_count: usize,
    pub kepler: KeplerSolver,
    pub water_precedence: WaterPrecedence,
    pub http_timeout: Duration,
    /// Default tracing filter; RUST_LOG wins when set
    pub log_filter: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            geodata_url: "http://localhost:8080".to_string(),
            geodata_api_key: None,
            sample_count: DEFAULT_SAMPLE_COUNT,
            kepler: KeplerSolver::default(),
            water_precedence: WaterPrecedence::default(),
            http_timeout: Duration::from_secs(20),
            log_filter: "info".to_string(),
        }
    }
}

impl SimConfig {
    /// Load `.env` if present, then read `NEO_*` variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_GEODATA_URL) {
            config.geodata_url = url;
        }
        config.geodata_api_key = get(ENV_GEODATA_API_KEY);

        if let Some(raw) = get(ENV_SAMPLE_COUNT) {
            config.sample_count = parse_positive(ENV_SAMPLE_COUNT, &raw)?;
        }

        let iterations = match get(ENV_KEPLER_ITERATIONS) {
            Some(raw) => parse_positive(ENV_KEPLER_ITERATIONS, &raw)?,
            None => KeplerSolver::DEFAULT_ITERATIONS,
        };
        config.kepler = match get(ENV_KEPLER_TOLERANCE) {
            Some(raw) => {
                let tolerance: f64 = parse(ENV_KEPLER_TOLERANCE, &raw)?;
                if !(tolerance.is_finite() && tolerance > 0.0) {
                    return Err(invalid(ENV_KEPLER_TOLERANCE, &raw, "must be a positive number"));
                }
                KeplerSolver::converging(tolerance, iterations)
            }
            None => KeplerSolver::fixed(iterations),
        };

        if let Some(raw) = get(ENV_WATER_PRECEDENCE) {
            config.water_precedence = match raw.trim().to_ascii_lowercase().as_str() {
                "coordinate" => WaterPrecedence::CoordinateAuthoritative,
                "any" => WaterPrecedence::AnySignal,
                _ => {
                    return Err(invalid(
                        ENV_WATER_PRECEDENCE,
                        &raw,
                        "expected `coordinate` or `any`",
                    ))
                }
            };
        }

        if let Some(raw) = get(ENV_HTTP_TIMEOUT_SECS) {
            config.http_timeout = Duration::from_secs(parse_positive(ENV_HTTP_TIMEOUT_SECS, &raw)?);
        }

        if let Some(filter) = get(ENV_LOG) {
            config.log_filter = filter;
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| invalid(key, raw, &e.to_string()))
}

fn parse_positive<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value: T = parse(key, raw)?;
    if value <= T::default() {
        return Err(invalid(key, raw, "must be at least 1"));
    }
    Ok(value)
}
