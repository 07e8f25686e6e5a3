// Trajectory assembly - synchronized asteroid/Earth sampling for the frontend
// Anomaly recovery, closest-approach scan and response shaping

use serde::Serialize;
use tracing::{info, warn};

use crate::error::TrajectoryError;
use crate::physics_engine::{
    normalize_angle, period_and_mean_motion, EllipseGenerator, KeplerEllipse, OrbitStateSampler,
    OrbitalElements, StateSample, Vector3, AU, DEFAULT_SAMPLE_COUNT, EARTH_ECCENTRICITY,
    EARTH_OBLIQUITY_DEG, EARTH_SIDEREAL_DAY,
};

/// Below this eccentricity E is taken equal to ν.
const CIRCULAR_EPSILON: f64 = 1e-12;

// =============================================================================
// ANOMALIES
// =============================================================================

/// Per-sample true, eccentric and mean anomalies, radians in [0, 2π).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalySeries {
    #[serde(rename = "true_anomaly_rad")]
    pub true_anomaly: Vec<f64>,
    #[serde(rename = "eccentric_anomaly_rad")]
    pub eccentric_anomaly: Vec<f64>,
    #[serde(rename = "mean_anomaly_rad")]
    pub mean_anomaly: Vec<f64>,
}

impl AnomalySeries {
    pub fn len(&self) -> usize {
        self.true_anomaly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.true_anomaly.is_empty()
    }
}

/// Recover anomalies from positions assumed to lie in the XY plane with
/// periapsis on +X.
pub fn derive_anomalies(
    positions: &[Vector3],
    eccentricity: f64,
) -> Result<AnomalySeries, TrajectoryError> {
    if !(0.0..1.0).contains(&eccentricity) {
        return Err(TrajectoryError::InvalidEccentricity(eccentricity));
    }

    let half_angle_factor = ((1.0 - eccentricity) / (1.0 + eccentricity)).sqrt();
    let mut series = AnomalySeries {
        true_anomaly: Vec::with_capacity(positions.len()),
        eccentric_anomaly: Vec::with_capacity(positions.len()),
        mean_anomaly: Vec::with_capacity(positions.len()),
    };

    for p in positions {
        let nu = normalize_angle(p.y.atan2(p.x));

        let ecc_anom = if eccentricity.abs() < CIRCULAR_EPSILON {
            nu
        } else {
            normalize_angle(2.0 * (half_angle_factor * (nu / 2.0).tan()).atan())
        };
        let mean_anom = normalize_angle(ecc_anom - eccentricity * ecc_anom.sin());

        series.true_anomaly.push(nu);
        series.eccentric_anomaly.push(ecc_anom);
        series.mean_anomaly.push(mean_anom);
    }

    Ok(series)
}

// =============================================================================
// CLOSEST APPROACH
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClosestApproach {
    pub index: usize,
    pub distance_m: f64,
}

/// Minimum Euclidean separation between two synchronized position sequences.
/// Ties resolve to the earliest index.
pub fn find_closest_approach(
    first: &[Vector3],
    second: &[Vector3],
) -> Result<ClosestApproach, TrajectoryError> {
    if first.is_empty() || second.is_empty() {
        return Err(TrajectoryError::EmptyTrajectory);
    }
    if first.len() != second.len() {
        return Err(TrajectoryError::LengthMismatch(first.len(), second.len()));
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, (a, b)) in first.iter().zip(second.iter()).enumerate() {
        let d2 = a.sub(b).magnitude_squared();
        if d2.is_nan() {
            continue;
        }
        match best {
            Some((_, best_d2)) if d2 >= best_d2 => {}
            _ => best = Some((idx, d2)),
        }
    }

    best.map(|(index, d2)| ClosestApproach {
        index,
        distance_m: d2.sqrt(),
    })
    .ok_or(TrajectoryError::DegenerateSeparation)
}

// =============================================================================
// REQUEST / RESPONSE RECORDS
// =============================================================================

/// Catalog-style asteroid element set: semi-major axis in AU, angles in
/// degrees. A missing axis is carried as `None` and rejected at assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryRequest {
    pub asteroid_id: String,
    pub a_au: Option<f64>,
    pub e: f64,
    pub i_deg: f64,
    pub raan_deg: f64,
    pub argp_deg: f64,
}

impl TrajectoryRequest {
    fn elements(&self) -> Result<(f64, OrbitalElements), TrajectoryError> {
        let a_au = self
            .a_au
            .filter(|a| a.is_finite())
            .ok_or(TrajectoryError::MissingSemiMajorAxis)?;
        let elements = OrbitalElements::from_degrees(
            a_au * AU,
            self.e,
            self.i_deg,
            self.raan_deg,
            self.argp_deg,
        )?;
        Ok((a_au, elements))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Units {
    pub length: &'static str,
    pub time: &'static str,
}

/// AU-based orbit summary. `period_seconds` is absent from static previews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitMeta {
    pub a_au: f64,
    pub e: f64,
    pub q_au: f64,
    #[serde(rename = "Q_au")]
    pub big_q_au: f64,
    pub i_deg: f64,
    pub raan_deg: f64,
    pub argp_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<f64>,
}

impl OrbitMeta {
    fn new(
        request: &TrajectoryRequest,
        a_au: f64,
        elements: &OrbitalElements,
        period_seconds: Option<f64>,
    ) -> Self {
        Self {
            a_au,
            e: elements.eccentricity,
            q_au: elements.perihelion_distance() / AU,
            big_q_au: elements.aphelion_distance() / AU,
            i_deg: request.i_deg,
            raan_deg: request.raan_deg,
            argp_deg: request.argp_deg,
            period_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsteroidOrbit {
    #[serde(flatten)]
    pub meta: OrbitMeta,
    pub mean_motion_rad_s: f64,
    pub anomalies: AnomalySeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthSpin {
    pub obliquity_deg: f64,
    pub rotation_period_s: f64,
    pub prime_meridian_rad_at_epoch: f64,
}

impl Default for EarthSpin {
    fn default() -> Self {
        Self {
            obliquity_deg: EARTH_OBLIQUITY_DEG,
            rotation_period_s: EARTH_SIDEREAL_DAY,
            prime_meridian_rad_at_epoch: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthOrbit {
    pub a_au: f64,
    pub e: f64,
    pub period_seconds: f64,
    pub mean_motion_rad_s: f64,
    pub anomalies: AnomalySeries,
    pub spin: EarthSpin,
}

/// Closest approach as emitted; all fields `null` when the scan failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosestApproachSummary {
    pub index: Option<usize>,
    pub distance_m: Option<f64>,
    pub progress: Option<f64>,
    pub asteroid_time_s: Option<f64>,
    pub earth_time_s: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryResponse {
    pub epoch: f64,
    pub units: Units,
    pub mu_sun: f64,
    pub asteroid_id: String,
    pub asteroid_positions: Vec<[f64; 3]>,
    pub asteroid_velocities: Vec<[f64; 3]>,
    pub timestamps: Vec<f64>,
    pub earth_positions: Vec<[f64; 3]>,
    pub earth_velocities: Vec<[f64; 3]>,
    pub progress: Vec<f64>,
    pub asteroid_absolute_timestamps: Vec<f64>,
    pub earth_absolute_timestamps: Vec<f64>,
    pub asteroid_orbit: AsteroidOrbit,
    pub earth_orbit: EarthOrbit,
    pub closest_approach: ClosestApproachSummary,
    pub orbit_meta: OrbitMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticOrbit {
    pub points: Vec<[f64; 3]>,
    pub orbit_meta: OrbitMeta,
}

/// Normalized 0..1 position of each sample in the sequence.
pub fn progress_fractions(sample_count: usize) -> Vec<f64> {
    (0..sample_count)
        .map(|i| {
            if sample_count > 1 {
                i as f64 / (sample_count - 1) as f64
            } else {
                0.0
            }
        })
        .collect()
}

fn positions_of(samples: &[StateSample]) -> Vec<Vector3> {
    samples.iter().map(|s| s.state.position).collect()
}

// =============================================================================
// ASSEMBLER
// =============================================================================

pub struct TrajectoryAssembler<G: EllipseGenerator = KeplerEllipse> {
    generator: G,
    sampler: OrbitStateSampler,
    sample_count: usize,
}

impl TrajectoryAssembler<KeplerEllipse> {
    pub fn new(sampler: OrbitStateSampler) -> Self {
        Self::with_generator(KeplerEllipse { mu: sampler.mu }, sampler)
    }
}

impl Default for TrajectoryAssembler<KeplerEllipse> {
    fn default() -> Self {
        Self::new(OrbitStateSampler::default())
    }
}

impl<G: EllipseGenerator> TrajectoryAssembler<G> {
    pub fn with_generator(generator: G, sampler: OrbitStateSampler) -> Self {
        Self {
            generator,
            sampler,
            sample_count: DEFAULT_SAMPLE_COUNT,
        }
    }

    pub fn sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Build the full asteroid/Earth simulation. `epoch` (POSIX seconds) is
    /// added to every relative timestamp; it anchors nothing physical.
    pub fn assemble(
        &self,
        request: &TrajectoryRequest,
        epoch: f64,
    ) -> Result<TrajectoryResponse, TrajectoryError> {
        let (a_au, elements) = request.elements()?;

        let asteroid = self
            .sampler
            .sample(&self.generator, &elements, self.sample_count);
        let timestamps: Vec<f64> = asteroid.iter().map(|s| s.time_s).collect();

        // Earth at the asteroid's own timestamps keeps the pair index-aligned
        let earth = self.sampler.sample_earth_at(&timestamps);

        let asteroid_positions = positions_of(&asteroid);
        let earth_positions = positions_of(&earth);

        let asteroid_anomalies = derive_anomalies(&asteroid_positions, elements.eccentricity)
            .unwrap_or_else(|err| {
                warn!(%err, "asteroid anomalies unavailable");
                AnomalySeries::default()
            });
        let earth_anomalies = derive_anomalies(&earth_positions, EARTH_ECCENTRICITY)
            .unwrap_or_else(|err| {
                warn!(%err, "earth anomalies unavailable");
                AnomalySeries::default()
            });

        let (period_seconds, mean_motion) =
            period_and_mean_motion(elements.semi_major_axis, self.sampler.mu);
        let (earth_period, earth_mean_motion) = period_and_mean_motion(AU, self.sampler.mu);

        let progress = progress_fractions(timestamps.len());

        let closest_approach = match find_closest_approach(&asteroid_positions, &earth_positions) {
            Ok(ca) => ClosestApproachSummary {
                index: Some(ca.index),
                distance_m: Some(ca.distance_m),
                progress: Some(progress[ca.index]),
                asteroid_time_s: Some(timestamps[ca.index]),
                earth_time_s: Some(timestamps[ca.index]),
            },
            Err(err) => {
                warn!(%err, "closest approach unavailable");
                ClosestApproachSummary {
                    index: None,
                    distance_m: None,
                    progress: None,
                    asteroid_time_s: None,
                    earth_time_s: None,
                }
            }
        };

        let absolute: Vec<f64> = timestamps.iter().map(|t| epoch + t).collect();

        let meta = OrbitMeta::new(request, a_au, &elements, Some(period_seconds));

        info!(
            asteroid_id = %request.asteroid_id,
            samples = timestamps.len(),
            closest_index = ?closest_approach.index,
            closest_m = ?closest_approach.distance_m,
            "assembled trajectory"
        );

        Ok(TrajectoryResponse {
            epoch,
            units: Units {
                length: "m",
                time: "s",
            },
            mu_sun: self.sampler.mu,
            asteroid_id: request.asteroid_id.clone(),
            asteroid_positions: asteroid.iter().map(|s| s.state.position.to_array()).collect(),
            asteroid_velocities: asteroid.iter().map(|s| s.state.velocity.to_array()).collect(),
            earth_positions: earth.iter().map(|s| s.state.position.to_array()).collect(),
            earth_velocities: earth.iter().map(|s| s.state.velocity.to_array()).collect(),
            timestamps,
            progress,
            asteroid_absolute_timestamps: absolute.clone(),
            earth_absolute_timestamps: absolute,
            asteroid_orbit: AsteroidOrbit {
                meta: meta.clone(),
                mean_motion_rad_s: mean_motion,
                anomalies: asteroid_anomalies,
            },
            earth_orbit: EarthOrbit {
                a_au: 1.0,
                e: EARTH_ECCENTRICITY,
                period_seconds: earth_period,
                mean_motion_rad_s: earth_mean_motion,
                anomalies: earth_anomalies,
                spin: EarthSpin::default(),
            },
            closest_approach,
            orbit_meta: meta,
        })
    }

    /// Position-only preview of the asteroid ellipse.
    pub fn static_orbit(
        &self,
        request: &TrajectoryRequest,
    ) -> Result<StaticOrbit, TrajectoryError> {
        let (a_au, elements) = request.elements()?;
        let points = self
            .generator
            .ellipse_points(&elements, self.sample_count)
            .iter()
            .map(Vector3::to_array)
            .collect();

        Ok(StaticOrbit {
            points,
            orbit_meta: OrbitMeta::new(request, a_au, &elements, None),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
