// Impact Physics - closed-form crater, airblast, seismic and tsunami-source scaling
// References: Collins, Melosh & Marcus (2005); Ward & Asphaug (2000)

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::impact_engine::{ImpactorParameters, TargetMaterial, BLAST_PSI_LEVELS};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Surface gravity (m/s²)
pub const G_SURFACE: f64 = 9.81;

/// Sea-level air density (kg/m³)
pub const AIR_DENSITY_SEA_LEVEL: f64 = 1.225;

/// Atmospheric scale height (m)
pub const ATMOSPHERE_SCALE_HEIGHT: f64 = 8000.0;

/// Seawater density (kg/m³)
pub const WATER_DENSITY: f64 = 1000.0;

/// Joules per kiloton of TNT
pub const JOULES_PER_KILOTON: f64 = 4.184e12;

/// Pascals per psi
pub const PA_PER_PSI: f64 = 6894.757;

/// Exponential damping of the coastal wave model (per km)
pub const TSUNAMI_DAMPING_PER_KM: f64 = 1e-3;

/// Coastal amplitude below which the wave is no longer tracked (m)
const TSUNAMI_CUTOFF_AMPLITUDE: f64 = 0.01;

/// Furthest distance the attenuation search considers (km)
const TSUNAMI_MAX_RANGE_KM: f64 = 40_000.0;

/// Fraction of air column mass over impactor areal mass that is ablated
const ABLATION_COEFFICIENT: f64 = 0.5;

/// Simple-to-complex crater transition diameter on Earth (m)
const COMPLEX_CRATER_TRANSITION: f64 = 3200.0;

/// Fraction of kinetic energy coupled into the water cavity
const TSUNAMI_CAVITY_EFFICIENCY: f64 = 0.15;

/// Airblast reference point for a 1 kt surface burst (Collins 2005, eq. 54)
const BLAST_REFERENCE_PRESSURE: f64 = 75_000.0;
const BLAST_REFERENCE_DISTANCE: f64 = 290.0;

/// (fatality rate, injury rate) for each overpressure in `BLAST_PSI_LEVELS`
pub const BLAST_ZONE_RATES: [(f64, f64); BLAST_PSI_LEVELS.len()] = [
    (0.001, 0.05),
    (0.07, 0.30),
    (0.3, 0.40),
    (0.7, 0.25),
];

// =============================================================================
// RESULT TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CraterEstimate {
    pub diameter_m: f64,
    pub depth_m: f64,
    pub kinetic_energy_j: f64,
    pub mass_ablation_percent: f64,
}

/// One blast zone: outer radius and casualty rates inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneCoefficients {
    pub radius_m: f64,
    pub fatality_rate: f64,
    pub injury_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageEstimate {
    pub zones: Vec<ZoneCoefficients>,
    pub seismic_magnitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TsunamiSource {
    pub source_amplitude_m: f64,
    pub attenuation_km: f64,
    pub shallow_speed_m_s: f64,
}

// =============================================================================
// PHYSICS INTERFACE
// =============================================================================

/// Closed-form impact physics consumed by the effects pipeline.
pub trait ImpactPhysics {
    /// Crater size, surviving kinetic energy and ablated mass for an impactor.
    fn crater_dimensions(
        &self,
        impactor: &ImpactorParameters,
        target: TargetMaterial,
    ) -> CraterEstimate;

    /// Blast zones ordered by increasing overpressure (2, 5, 10, 20 psi),
    /// plus the seismic magnitude for the given coupling coefficient.
    fn damage_coefficients(&self, kinetic_energy_j: f64, eta: f64) -> DamageEstimate;

    /// Near-source tsunami amplitude for an ocean impact.
    fn tsunami_source(&self, kinetic_energy_j: f64, angle_deg: f64, water_depth_m: f64)
        -> TsunamiSource;
}

/// Coastal wave amplitude at `distance_km` from a source of `source_amplitude_m`.
pub fn coastal_amplitude(source_amplitude_m: f64, distance_km: f64) -> f64 {
    let r = distance_km.max(1.0);
    let geometric = (1.0 / r).powf(0.5);
    let damping = (-TSUNAMI_DAMPING_PER_KM * (r - 1.0)).exp();
    (source_amplitude_m * geometric * damping).max(0.0)
}

// =============================================================================
// SCALING-LAW MODEL
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ScalingLawPhysics;

impl ScalingLawPhysics {
    fn sin_angle(angle_deg: f64) -> f64 {
        angle_deg.clamp(1.0, 90.0).to_radians().sin()
    }

    /// Fraction of the impactor mass lost crossing the atmosphere.
    fn ablated_fraction(impactor: &ImpactorParameters) -> f64 {
        // m / (π r²) for a sphere
        let areal_mass = 2.0 / 3.0 * impactor.density_kg_m3 * impactor.diameter_m;
        if areal_mass <= 0.0 {
            return 0.0;
        }
        let air_column =
            AIR_DENSITY_SEA_LEVEL * ATMOSPHERE_SCALE_HEIGHT / Self::sin_angle(impactor.angle_deg);
        1.0 - (-ABLATION_COEFFICIENT * air_column / areal_mass).exp()
    }

    /// Overpressure (Pa) at scaled distance `r1` (m per kt^(1/3)).
    fn overpressure_at_scaled(r1: f64) -> f64 {
        let ratio = BLAST_REFERENCE_DISTANCE / r1;
        BLAST_REFERENCE_PRESSURE * ratio / 4.0 * (1.0 + 3.0 * ratio.powf(1.3))
    }

    /// Scaled distance at which the overpressure falls to `pressure_pa`.
    fn scaled_radius_for(pressure_pa: f64) -> f64 {
        // overpressure is monotone decreasing, bisect in log space
        let (mut lo, mut hi) = (1.0_f64.ln(), 1.0e7_f64.ln());
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if Self::overpressure_at_scaled(mid.exp()) > pressure_pa {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (0.5 * (lo + hi)).exp()
    }

    /// Distance (km) at which `coastal_amplitude` drops to the cutoff.
    fn attenuation_distance(source_amplitude_m: f64) -> f64 {
        if coastal_amplitude(source_amplitude_m, 1.0) <= TSUNAMI_CUTOFF_AMPLITUDE {
            return 0.0;
        }
        if coastal_amplitude(source_amplitude_m, TSUNAMI_MAX_RANGE_KM) > TSUNAMI_CUTOFF_AMPLITUDE {
            return TSUNAMI_MAX_RANGE_KM;
        }
        let (mut lo, mut hi) = (1.0, TSUNAMI_MAX_RANGE_KM);
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if coastal_amplitude(source_amplitude_m, mid) > TSUNAMI_CUTOFF_AMPLITUDE {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

impl ImpactPhysics for ScalingLawPhysics {
    fn crater_dimensions(
        &self,
        impactor: &ImpactorParameters,
        target: TargetMaterial,
    ) -> CraterEstimate {
        let ablated = Self::ablated_fraction(impactor);
        let surviving_mass = impactor.mass_kg * (1.0 - ablated);
        let kinetic_energy_j = 0.5 * surviving_mass * impactor.velocity_m_s.powi(2);

        let (diameter_m, depth_m) = if impactor.diameter_m > 0.0
            && impactor.velocity_m_s > 0.0
            && impactor.density_kg_m3 > 0.0
        {
            // Transient crater (Collins 2005, eq. 21)
            let transient = 1.161
                * (impactor.density_kg_m3 / target.density()).powf(1.0 / 3.0)
                * impactor.diameter_m.powf(0.78)
                * impactor.velocity_m_s.powf(0.44)
                * G_SURFACE.powf(-0.22)
                * Self::sin_angle(impactor.angle_deg).powf(1.0 / 3.0);

            let simple = 1.25 * transient;
            if simple <= COMPLEX_CRATER_TRANSITION {
                (simple, 0.2 * simple)
            } else {
                let complex =
                    1.17 * transient.powf(1.13) / COMPLEX_CRATER_TRANSITION.powf(0.13);
                // depth relation is fitted in km
                let depth = 0.294 * (complex / 1000.0).powf(0.301) * 1000.0;
                (complex, depth)
            }
        } else {
            (0.0, 0.0)
        };

        CraterEstimate {
            diameter_m,
            depth_m,
            kinetic_energy_j,
            mass_ablation_percent: 100.0 * ablated,
        }
    }

    fn damage_coefficients(&self, kinetic_energy_j: f64, eta: f64) -> DamageEstimate {
        let yield_kt = (kinetic_energy_j / JOULES_PER_KILOTON).max(0.0);
        let yield_scale = yield_kt.cbrt();

        let zones = BLAST_PSI_LEVELS
            .iter()
            .zip(BLAST_ZONE_RATES)
            .map(|(&psi, (fatality_rate, injury_rate))| ZoneCoefficients {
                radius_m: Self::scaled_radius_for(psi * PA_PER_PSI) * yield_scale,
                fatality_rate,
                injury_rate,
            })
            .collect();

        let seismic_energy = eta * kinetic_energy_j;
        let seismic_magnitude = if seismic_energy > 0.0 {
            0.67 * seismic_energy.log10() - 5.87
        } else {
            0.0
        };

        DamageEstimate {
            zones,
            seismic_magnitude,
        }
    }

    fn tsunami_source(
        &self,
        kinetic_energy_j: f64,
        angle_deg: f64,
        water_depth_m: f64,
    ) -> TsunamiSource {
        let depth = water_depth_m.max(1.0);
        let coupled = TSUNAMI_CAVITY_EFFICIENCY
            * kinetic_energy_j.max(0.0)
            * Self::sin_angle(angle_deg);
        let cavity_radius = (3.0 * coupled / (2.0 * PI * WATER_DENSITY * G_SURFACE)).powf(0.25);
        let source_amplitude_m = (0.5 * cavity_radius).min(depth);

        TsunamiSource {
            source_amplitude_m,
            attenuation_km: Self::attenuation_distance(source_amplitude_m),
            shallow_speed_m_s: (G_SURFACE * depth).sqrt(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
