// Physics Engine - Two-body orbital mechanics
// Kepler solver, element-to-state conversion and synchronized body sampling

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use crate::error::TrajectoryError;

// =============================================================================
// PHYSICAL CONSTANTS (SI Units)
// =============================================================================

/// Astronomical Unit in meters
pub const AU: f64 = 1.495978707e11;

/// Sun's gravitational parameter μ = G * M_sun (m³/s²)
pub const MU_SUN: f64 = 1.32712440018e20;

/// Earth's orbital eccentricity used by the fixed Earth element set
pub const EARTH_ECCENTRICITY: f64 = 0.0167;

/// Sidereal year (s)
pub const EARTH_SIDEREAL_YEAR: f64 = 365.256363004 * 86400.0;

/// Mean obliquity of the ecliptic at J2000 (degrees)
pub const EARTH_OBLIQUITY_DEG: f64 = 23.439281;

/// Sidereal day (s)
pub const EARTH_SIDEREAL_DAY: f64 = 86164.0905;

/// Samples per body when no count is requested
pub const DEFAULT_SAMPLE_COUNT: usize = 1000;

const TWO_PI: f64 = 2.0 * PI;

/// Normalize an angle to [0, 2π).
pub fn normalize_angle(theta: f64) -> f64 {
    let wrapped = theta.rem_euclid(TWO_PI);
    // rem_euclid can return exactly 2π for tiny negative inputs
    if wrapped >= TWO_PI {
        0.0
    } else {
        wrapped
    }
}

/// Round to one decimal place (meters, m/s, seconds).
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Orbital period (s) and mean motion (rad/s) for a semi-major axis in meters.
pub fn period_and_mean_motion(semi_major_axis: f64, mu: f64) -> (f64, f64) {
    let a3 = semi_major_axis.powi(3);
    let period = TWO_PI * (a3 / mu).sqrt();
    let mean_motion = (mu / a3).sqrt();
    (period, mean_motion)
}

// =============================================================================
// 3D VECTOR MATHEMATICS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn sub(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn rounded(&self) -> Vector3 {
        Vector3::new(round1(self.x), round1(self.y), round1(self.z))
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

// =============================================================================
// STATE VECTOR (Position + Velocity)
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StateVector {
    pub position: Vector3, // meters (SI)
    pub velocity: Vector3, // m/s (SI)
}

impl StateVector {
    pub fn rounded(&self) -> Self {
        Self {
            position: self.position.rounded(),
            velocity: self.velocity.rounded(),
        }
    }
}

/// One heliocentric sample: time since periapsis plus the state at that time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StateSample {
    pub time_s: f64,
    pub state: StateVector,
}

// =============================================================================
// KEPLER EQUATION
// =============================================================================

/// Newton-Raphson solver for M = E - e*sin(E).
///
/// With no tolerance every solve runs exactly `iterations` steps, which is
/// plenty for the low eccentricities of Earth and most catalog NEOs. With a
/// tolerance the loop exits once the Newton step drops below it and
/// `iterations` becomes the cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolver {
    pub iterations: usize,
    pub tolerance: Option<f64>,
}

impl KeplerSolver {
    pub const DEFAULT_ITERATIONS: usize = 8;

    pub fn fixed(iterations: usize) -> Self {
        Self {
            iterations,
            tolerance: None,
        }
    }

    pub fn converging(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            iterations: max_iterations,
            tolerance: Some(tolerance),
        }
    }

    /// Eccentric anomaly for a mean anomaly (radians), initial guess E = M.
    pub fn solve(&self, mean_anomaly: f64, eccentricity: f64) -> f64 {
        let mut e_anom = mean_anomaly;

        for _ in 0..self.iterations {
            let f = e_anom - eccentricity * e_anom.sin() - mean_anomaly;
            let f_prime = 1.0 - eccentricity * e_anom.cos();
            let delta = f / f_prime;
            e_anom -= delta;

            if let Some(tol) = self.tolerance {
                if delta.abs() < tol {
                    break;
                }
            }
        }

        e_anom
    }
}

impl Default for KeplerSolver {
    fn default() -> Self {
        Self::fixed(Self::DEFAULT_ITERATIONS)
    }
}

// =============================================================================
// KEPLERIAN ORBITAL ELEMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OrbitalElements {
    /// Semi-major axis (meters)
    pub semi_major_axis: f64,
    /// Eccentricity, [0, 1)
    pub eccentricity: f64,
    /// Inclination (radians)
    pub inclination: f64,
    /// Longitude of ascending node (radians)
    pub longitude_ascending_node: f64,
    /// Argument of perihelion (radians)
    pub argument_perihelion: f64,
}

impl OrbitalElements {
    /// Build elements from a semi-major axis in meters and angles in degrees.
    ///
    /// Rejects non-positive or non-finite axes and any eccentricity outside
    /// [0, 1); open orbits have no periodic sampling.
    pub fn from_degrees(
        semi_major_axis: f64,
        eccentricity: f64,
        inclination_deg: f64,
        raan_deg: f64,
        argp_deg: f64,
    ) -> Result<Self, TrajectoryError> {
        if !semi_major_axis.is_finite() || semi_major_axis <= 0.0 {
            return Err(TrajectoryError::MissingSemiMajorAxis);
        }
        if !(0.0..1.0).contains(&eccentricity) {
            return Err(TrajectoryError::InvalidEccentricity(eccentricity));
        }

        Ok(Self {
            semi_major_axis,
            eccentricity,
            inclination: inclination_deg.to_radians(),
            longitude_ascending_node: raan_deg.to_radians(),
            argument_perihelion: argp_deg.to_radians(),
        })
    }

    /// Fixed near-circular Earth orbit, perifocal frame aligned with the
    /// inertial frame.
    pub fn earth() -> Self {
        Self {
            semi_major_axis: AU,
            eccentricity: EARTH_ECCENTRICITY,
            inclination: 0.0,
            longitude_ascending_node: 0.0,
            argument_perihelion: 0.0,
        }
    }

    pub fn perihelion_distance(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity)
    }

    pub fn aphelion_distance(&self) -> f64 {
        self.semi_major_axis * (1.0 + self.eccentricity)
    }

    /// Heliocentric state at a given eccentric anomaly.
    pub fn state_at_eccentric_anomaly(&self, eccentric_anomaly: f64, mu: f64) -> StateVector {
        let a = self.semi_major_axis;
        let e = self.eccentricity;

        let true_anomaly = 2.0
            * ((1.0 + e).sqrt() * (eccentric_anomaly / 2.0).sin())
                .atan2((1.0 - e).sqrt() * (eccentric_anomaly / 2.0).cos());

        // Distance from focus
        let r = a * (1.0 - e * eccentric_anomaly.cos());

        // Perifocal frame
        let cos_nu = true_anomaly.cos();
        let sin_nu = true_anomaly.sin();
        let x_orb = r * cos_nu;
        let y_orb = r * sin_nu;

        // h = sqrt(mu * p)
        let p = a * (1.0 - e * e);
        let h = (mu * p).sqrt();
        let vx_orb = -mu / h * sin_nu;
        let vy_orb = mu / h * (e + cos_nu);

        self.rotate_to_inertial(x_orb, y_orb, vx_orb, vy_orb)
    }

    /// Heliocentric state a given time after periapsis, for an orbit of the
    /// given period.
    pub fn state_at_time(
        &self,
        time_since_periapsis: f64,
        period: f64,
        mu: f64,
        solver: &KeplerSolver,
    ) -> StateVector {
        let mean_anomaly = TWO_PI * (time_since_periapsis / period);
        let eccentric_anomaly = solver.solve(mean_anomaly, self.eccentricity);
        self.state_at_eccentric_anomaly(eccentric_anomaly, mu)
    }

    fn rotate_to_inertial(&self, x_orb: f64, y_orb: f64, vx_orb: f64, vy_orb: f64) -> StateVector {
        let cos_omega = self.longitude_ascending_node.cos();
        let sin_omega = self.longitude_ascending_node.sin();
        let cos_w = self.argument_perihelion.cos();
        let sin_w = self.argument_perihelion.sin();
        let cos_i = self.inclination.cos();
        let sin_i = self.inclination.sin();

        // R3(-Ω) R1(-i) R3(-ω), third column unused for planar input
        let r11 = cos_omega * cos_w - sin_omega * sin_w * cos_i;
        let r12 = -cos_omega * sin_w - sin_omega * cos_w * cos_i;
        let r21 = sin_omega * cos_w + cos_omega * sin_w * cos_i;
        let r22 = -sin_omega * sin_w + cos_omega * cos_w * cos_i;
        let r31 = sin_w * sin_i;
        let r32 = cos_w * sin_i;

        let position = Vector3::new(
            r11 * x_orb + r12 * y_orb,
            r21 * x_orb + r22 * y_orb,
            r31 * x_orb + r32 * y_orb,
        );

        let velocity = Vector3::new(
            r11 * vx_orb + r12 * vy_orb,
            r21 * vx_orb + r22 * vy_orb,
            r31 * vx_orb + r32 * vy_orb,
        );

        StateVector { position, velocity }
    }
}

// =============================================================================
// ELLIPSE GENERATION
// =============================================================================

/// Source of sampled points along a closed orbit.
pub trait EllipseGenerator {
    /// `num_points` heliocentric positions around one full revolution.
    fn ellipse_points(&self, elements: &OrbitalElements, num_points: usize) -> Vec<Vector3>;

    /// Positions, velocities and times since periapsis around one revolution.
    fn timed_points(&self, elements: &OrbitalElements, num_points: usize) -> Vec<StateSample>;
}

/// Samples evenly in eccentric anomaly, so points are denser in arc length
/// near aphelion than a time-uniform sampling would give and the timestamps
/// are non-uniform. Output is rounded to 0.1 m, 0.1 m/s and 0.1 s.
#[derive(Debug, Clone, Copy)]
pub struct KeplerEllipse {
    pub mu: f64,
}

impl Default for KeplerEllipse {
    fn default() -> Self {
        Self { mu: MU_SUN }
    }
}

impl KeplerEllipse {
    fn eccentric_anomalies(num_points: usize) -> impl Iterator<Item = f64> {
        (0..num_points).map(move |k| TWO_PI * k as f64 / num_points as f64)
    }
}

impl EllipseGenerator for KeplerEllipse {
    fn ellipse_points(&self, elements: &OrbitalElements, num_points: usize) -> Vec<Vector3> {
        Self::eccentric_anomalies(num_points)
            .map(|ecc| {
                elements
                    .state_at_eccentric_anomaly(ecc, self.mu)
                    .position
                    .rounded()
            })
            .collect()
    }

    fn timed_points(&self, elements: &OrbitalElements, num_points: usize) -> Vec<StateSample> {
        let (_, mean_motion) = period_and_mean_motion(elements.semi_major_axis, self.mu);
        let e = elements.eccentricity;

        Self::eccentric_anomalies(num_points)
            .map(|ecc| {
                let mean_anomaly = ecc - e * ecc.sin();
                StateSample {
                    time_s: round1(mean_anomaly / mean_motion),
                    state: elements.state_at_eccentric_anomaly(ecc, self.mu).rounded(),
                }
            })
            .collect()
    }
}

// =============================================================================
// BODY SAMPLING
// =============================================================================

/// Produces time-ordered state sequences for the asteroid and for Earth.
#[derive(Debug, Clone, Copy)]
pub struct OrbitStateSampler {
    pub solver: KeplerSolver,
    pub mu: f64,
}

impl OrbitStateSampler {
    pub fn new(solver: KeplerSolver) -> Self {
        Self { solver, mu: MU_SUN }
    }

    /// Sample a general body through the ellipse generator.
    pub fn sample<G: EllipseGenerator>(
        &self,
        generator: &G,
        elements: &OrbitalElements,
        sample_count: usize,
    ) -> Vec<StateSample> {
        let samples = generator.timed_points(elements, sample_count);
        debug!(
            samples = samples.len(),
            a_m = elements.semi_major_axis,
            e = elements.eccentricity,
            "sampled body orbit"
        );
        samples
    }

    /// Earth state a given time after Earth's periapsis, rounded to 0.1.
    pub fn earth_state_at(&self, time_since_periapsis: f64) -> StateVector {
        OrbitalElements::earth()
            .state_at_time(time_since_periapsis, EARTH_SIDEREAL_YEAR, self.mu, &self.solver)
            .rounded()
    }

    /// `sample_count` Earth states evenly spaced in time over one sidereal
    /// year, starting at periapsis.
    pub fn sample_earth_uniform(&self, sample_count: usize) -> Vec<StateSample> {
        (0..sample_count)
            .map(|idx| {
                let t = EARTH_SIDEREAL_YEAR * (idx as f64 / sample_count as f64);
                StateSample {
                    time_s: round1(t),
                    state: self.earth_state_at(t),
                }
            })
            .collect()
    }

    /// Earth states at exactly the given times, so the result pairs index by
    /// index with another body's samples.
    pub fn sample_earth_at(&self, times: &[f64]) -> Vec<StateSample> {
        times
            .iter()
            .map(|&t| StateSample {
                time_s: t,
                state: self.earth_state_at(t),
            })
            .collect()
    }
}

impl Default for OrbitStateSampler {
    fn default() -> Self {
        Self::new(KeplerSolver::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_kepler_equation_circular() {
        // For circular orbit e=0, E = M
        let e = KeplerSolver::default().solve(1.0, 0.0);
        assert!((e - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_kepler_equation_eccentric() {
        let solver = KeplerSolver::default();
        let e = solver.solve(0.5, 0.5);
        let check = e - 0.5 * e.sin();
        assert!((check - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_kepler_residual_random_low_eccentricity() {
        let solver = KeplerSolver::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..2000 {
            let m = rng.gen_range(0.0..TWO_PI);
            let ecc = rng.gen_range(0.0..0.3);
            let e_anom = solver.solve(m, ecc);
            let residual = e_anom - ecc * e_anom.sin() - m;
            assert!(residual.abs() < 1e-12, "M={m} e={ecc} residual={residual}");
        }
    }

    #[test]
    fn test_kepler_residual_full_eccentricity_range() {
        let solver = KeplerSolver::fixed(50);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let m = rng.gen_range(0.0..TWO_PI);
            let ecc = rng.gen_range(0.0..0.95);
            let e_anom = solver.solve(m, ecc);
            let residual = e_anom - ecc * e_anom.sin() - m;
            assert!(residual.abs() < 1e-9, "M={m} e={ecc} residual={residual}");
        }
    }

    #[test]
    fn test_converging_solver_matches_fixed() {
        let fixed = KeplerSolver::fixed(8);
        let converging = KeplerSolver::converging(1e-14, 50);
        for &(m, e) in &[(0.1, 0.0167), (2.5, 0.2), (5.9, 0.1)] {
            assert!((fixed.solve(m, e) - converging.solve(m, e)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_elements_reject_open_orbits() {
        assert_eq!(
            OrbitalElements::from_degrees(AU, 1.0, 0.0, 0.0, 0.0),
            Err(TrajectoryError::InvalidEccentricity(1.0))
        );
        assert!(OrbitalElements::from_degrees(AU, -0.1, 0.0, 0.0, 0.0).is_err());
        assert_eq!(
            OrbitalElements::from_degrees(f64::NAN, 0.1, 0.0, 0.0, 0.0),
            Err(TrajectoryError::MissingSemiMajorAxis)
        );
    }

    #[test]
    fn test_earth_starts_at_perihelion() {
        let sampler = OrbitStateSampler::default();
        let state = sampler.earth_state_at(0.0);
        let q = AU * (1.0 - EARTH_ECCENTRICITY);
        assert!((state.position.x - q).abs() < 0.1);
        assert_eq!(state.position.y, 0.0);
        assert_eq!(state.position.z, 0.0);
        assert!(state.velocity.x.abs() < 0.1);
        // vis-viva at perihelion, about 30.3 km/s
        let v_peri = (MU_SUN / AU * (1.0 + EARTH_ECCENTRICITY) / (1.0 - EARTH_ECCENTRICITY)).sqrt();
        assert!((state.velocity.y - v_peri).abs() < 0.5);
    }

    #[test]
    fn test_earth_half_year_is_aphelion() {
        let sampler = OrbitStateSampler::default();
        let state = sampler.earth_state_at(EARTH_SIDEREAL_YEAR / 2.0);
        let big_q = AU * (1.0 + EARTH_ECCENTRICITY);
        assert!((state.position.magnitude() - big_q).abs() < 10.0);
        assert!(state.position.x < 0.0);
    }

    #[test]
    fn test_earth_uniform_sampling() {
        let sampler = OrbitStateSampler::default();
        let samples = sampler.sample_earth_uniform(4);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].time_s, 0.0);
        assert!((samples[1].time_s - round1(EARTH_SIDEREAL_YEAR / 4.0)).abs() < 1e-9);
        assert!(sampler.sample_earth_uniform(0).is_empty());
    }

    #[test]
    fn test_earth_sampling_at_given_times() {
        let sampler = OrbitStateSampler::default();
        let times = [0.0, 1.0e6, 3.3e6, 2.0e7];
        let samples = sampler.sample_earth_at(&times);
        assert_eq!(samples.len(), times.len());
        for (sample, &t) in samples.iter().zip(times.iter()) {
            assert_eq!(sample.time_s, t);
            assert_eq!(sample.state, sampler.earth_state_at(t));
        }
    }

    #[test]
    fn test_ellipse_perihelion_and_closure() {
        let a = 1.5 * AU;
        let elements = OrbitalElements::from_degrees(a, 0.2, 10.0, 0.0, 0.0).unwrap();
        let samples = KeplerEllipse::default().timed_points(&elements, 1000);
        assert_eq!(samples.len(), 1000);

        let radii: Vec<f64> = samples.iter().map(|s| s.state.position.magnitude()).collect();
        let min_r = radii.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!((min_r - a * 0.8).abs() < 1.0);

        let first = samples[0].state.position;
        let last = samples[999].state.position;
        assert!(last.sub(&first).magnitude() < 0.02 * a);

        // Times increase monotonically within one period
        let (period, _) = period_and_mean_motion(a, MU_SUN);
        assert!(samples.windows(2).all(|w| w[1].time_s > w[0].time_s));
        assert!(samples[999].time_s < period);
    }

    #[test]
    fn test_inclination_lifts_orbit_out_of_plane() {
        let elements = OrbitalElements::from_degrees(AU, 0.1, 30.0, 40.0, 60.0).unwrap();
        let points = KeplerEllipse::default().ellipse_points(&elements, 360);
        let max_z = points.iter().map(|p| p.z.abs()).fold(0.0, f64::max);
        assert!(max_z > 0.3 * AU);
    }

    #[test]
    fn test_state_at_time_matches_sampled_state() {
        let elements = OrbitalElements::from_degrees(1.2 * AU, 0.15, 5.0, 20.0, 30.0).unwrap();
        let samples = KeplerEllipse::default().timed_points(&elements, 100);
        let solver = KeplerSolver::converging(1e-14, 50);
        let sample = samples[37];
        let (period, _) = period_and_mean_motion(elements.semi_major_axis, MU_SUN);
        let state = elements.state_at_time(sample.time_s, period, MU_SUN, &solver);
        assert!(state.position.sub(&sample.state.position).magnitude() < 1.0e4);
    }

    #[test]
    fn test_earth_state_uses_sidereal_year() {
        let sampler = OrbitStateSampler::default();
        let t = 0.3 * EARTH_SIDEREAL_YEAR;
        let direct = OrbitalElements::earth()
            .state_at_time(t, EARTH_SIDEREAL_YEAR, MU_SUN, &sampler.solver)
            .rounded();
        assert_eq!(sampler.earth_state_at(t), direct);
    }

    #[test]
    fn test_earth_period() {
        let (period, n) = period_and_mean_motion(AU, MU_SUN);
        assert!((period / 86400.0 - 365.25).abs() < 0.1);
        assert!((period * n - TWO_PI).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(-PI / 2.0) - 1.5 * PI).abs() < 1e-12);
        assert!((normalize_angle(5.0 * PI) - PI).abs() < 1e-12);
        assert!(normalize_angle(-1e-20) < TWO_PI);
    }
}
