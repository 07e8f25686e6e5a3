// Impact Engine - ground/ocean impact consequences
// Terrain classification, blast zones, casualties and coastal tsunami attenuation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::api_client::GeoDataSource;
use crate::error::ImpactError;
use crate::impact_physics::{coastal_amplitude, ImpactPhysics, TsunamiSource};

/// Water depth assumed when the elevation lookup gives no sea floor (m)
pub const DEFAULT_OCEAN_DEPTH: f64 = 3000.0;

/// Standoff distances at which coastal tsunami effects are reported (km)
pub const COASTAL_DISTANCES_KM: [u32; 5] = [50, 100, 200, 500, 1000];

/// Overpressure label per blast zone, in the order the damage model emits
/// zones. Zones past the end of the table are unclassified (psi 0).
pub const BLAST_PSI_LEVELS: [f64; 4] = [2.0, 5.0, 10.0, 20.0];

const WATER_LABEL: &str = "Water Bodies";

// =============================================================================
// INPUTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactorParameters {
    pub mass_kg: f64,
    pub diameter_m: f64,
    pub velocity_m_s: f64,
    pub density_kg_m3: f64,
    pub angle_deg: f64,
    pub lat: f64,
    pub lon: f64,
}

impl ImpactorParameters {
    pub const DEFAULT_DENSITY: f64 = 3000.0;
    pub const DEFAULT_ANGLE: f64 = 45.0;
}

impl Default for ImpactorParameters {
    fn default() -> Self {
        Self {
            mass_kg: 0.0,
            diameter_m: 0.0,
            velocity_m_s: 0.0,
            density_kg_m3: Self::DEFAULT_DENSITY,
            angle_deg: Self::DEFAULT_ANGLE,
            lat: 0.0,
            lon: 0.0,
        }
    }
}

/// Terrain lookup result for one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainContext {
    pub eta: f64,
    pub rock_type: String,
    pub elevation_m: f64,
}

// =============================================================================
// TERRAIN CLASSIFICATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetMaterial {
    #[serde(rename = "Unconsolidated sediments")]
    UnconsolidatedSediments,
    #[serde(rename = "Siliciclastic sedimentary rocks")]
    SiliciclasticSedimentary,
    #[serde(rename = "Mixed sedimentary rocks")]
    MixedSedimentary,
    #[serde(rename = "Carbonate sedimentary rocks")]
    CarbonateSedimentary,
    #[serde(rename = "Metamorphic rocks")]
    Metamorphic,
    #[serde(rename = "Crystalline rocks")]
    Crystalline,
}

impl TargetMaterial {
    /// Map a lithology label to a target category; unknown labels fall back
    /// to mixed sediments.
    pub fn from_rock_type(label: &str) -> Self {
        match label.trim() {
            "Unconsolidated sediments" => TargetMaterial::UnconsolidatedSediments,
            "Siliciclastic sedimentary rocks" => TargetMaterial::SiliciclasticSedimentary,
            "Mixed sedimentary rocks" => TargetMaterial::MixedSedimentary,
            "Carbonate sedimentary rocks" => TargetMaterial::CarbonateSedimentary,
            "Metamorphics" => TargetMaterial::Metamorphic,
            "Acid/Intermediate/Basic plutonic rocks"
            | "Acid plutonic rocks"
            | "Intermediate plutonic rocks"
            | "Basic plutonic rocks"
            | "Acid/Intermediate/Basic volcanic rocks"
            | "Acid volcanic rocks"
            | "Intermediate volcanic rocks"
            | "Basic volcanic rocks" => TargetMaterial::Crystalline,
            // Pyroclastics, Evaporites and anything unmapped
            _ => TargetMaterial::MixedSedimentary,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TargetMaterial::UnconsolidatedSediments => "Unconsolidated sediments",
            TargetMaterial::SiliciclasticSedimentary => "Siliciclastic sedimentary rocks",
            TargetMaterial::MixedSedimentary => "Mixed sedimentary rocks",
            TargetMaterial::CarbonateSedimentary => "Carbonate sedimentary rocks",
            TargetMaterial::Metamorphic => "Metamorphic rocks",
            TargetMaterial::Crystalline => "Crystalline rocks",
        }
    }

    /// Bulk target density (kg/m³)
    pub fn density(&self) -> f64 {
        match self {
            TargetMaterial::UnconsolidatedSediments => 1800.0,
            TargetMaterial::SiliciclasticSedimentary => 2300.0,
            TargetMaterial::MixedSedimentary => 2400.0,
            TargetMaterial::CarbonateSedimentary => 2500.0,
            TargetMaterial::Metamorphic => 2700.0,
            TargetMaterial::Crystalline => 2750.0,
        }
    }
}

/// How the water-impact decision weighs the coordinate water mask against
/// the lithology label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaterPrecedence {
    /// The coordinate water mask alone decides; a blank or "Water Bodies"
    /// label is ignored for the water decision and only picks the material.
    #[default]
    CoordinateAuthoritative,
    /// Water if the label says water, the label is blank, or the mask says water.
    AnySignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthSource {
    Elevation,
    AssumedDeepOcean,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImpactSurface {
    Land,
    Water {
        depth_m: f64,
        depth_source: DepthSource,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TerrainClass {
    pub material: TargetMaterial,
    pub surface: ImpactSurface,
}

impl TerrainClass {
    pub fn is_water(&self) -> bool {
        matches!(self.surface, ImpactSurface::Water { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TerrainClassifier {
    pub precedence: WaterPrecedence,
}

impl TerrainClassifier {
    pub fn new(precedence: WaterPrecedence) -> Self {
        Self { precedence }
    }

    /// True when the lithology label alone marks the point as water.
    pub fn label_says_water(terrain: &TerrainContext) -> bool {
        let label = terrain.rock_type.trim();
        label.is_empty() || label == WATER_LABEL
    }

    /// Whether the coordinate water mask has to be consulted at all.
    pub fn needs_water_mask(&self, terrain: &TerrainContext) -> bool {
        match self.precedence {
            WaterPrecedence::CoordinateAuthoritative => true,
            WaterPrecedence::AnySignal => !Self::label_says_water(terrain),
        }
    }

    pub fn classify(&self, terrain: &TerrainContext, over_water: bool) -> TerrainClass {
        let material = TargetMaterial::from_rock_type(&terrain.rock_type);
        let water = match self.precedence {
            WaterPrecedence::CoordinateAuthoritative => over_water,
            WaterPrecedence::AnySignal => over_water || Self::label_says_water(terrain),
        };

        let surface = if water {
            // sea floor shows up as negative elevation
            if terrain.elevation_m < 0.0 {
                ImpactSurface::Water {
                    depth_m: terrain.elevation_m.abs(),
                    depth_source: DepthSource::Elevation,
                }
            } else {
                ImpactSurface::Water {
                    depth_m: DEFAULT_OCEAN_DEPTH,
                    depth_source: DepthSource::AssumedDeepOcean,
                }
            }
        } else {
            ImpactSurface::Land
        };

        TerrainClass { material, surface }
    }
}

// =============================================================================
// OUTPUT RECORDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CraterSummary {
    pub diameter_m: f64,
    pub diameter_km: f64,
    pub depth_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlastZone {
    pub psi: f64,
    pub radius_m: f64,
    /// `None` when the damage model gave no radius.
    pub radius_km: Option<f64>,
    pub fatality_rate: f64,
    pub injury_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CasualtyZone {
    pub psi: f64,
    pub radius_km: f64,
    pub population: u64,
    pub deaths: u64,
    pub injuries: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Casualties {
    pub by_zone: Vec<CasualtyZone>,
    pub total_deaths: u64,
    pub total_injuries: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seismic {
    pub magnitude: f64,
    pub eta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerrainSummary {
    pub rock_type: String,
    pub elevation_m: f64,
    pub target_type: TargetMaterial,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TsunamiAssessment {
    pub source_amplitude_m: f64,
    pub max_coastal_amplitude_m: f64,
    pub min_coastal_arrival_hrs: f64,
    pub attenuation_km: f64,
    pub shallow_speed_m_s: f64,
    pub ocean_depth_m: f64,
    /// Amplitude (m) keyed by standoff distance (km)
    pub coastal_amplitudes: BTreeMap<u32, f64>,
    /// Arrival time (hours) keyed by standoff distance (km)
    pub coastal_arrival_times: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactAssessment {
    pub crater: CraterSummary,
    pub blast_zones: Vec<BlastZone>,
    pub casualties: Casualties,
    pub seismic: Seismic,
    pub terrain: TerrainSummary,
    pub impact_energy_j: f64,
    pub mass_ablation_percent: f64,
    pub tsunami: Option<TsunamiAssessment>,
    pub location: Location,
}

// =============================================================================
// DERIVATIONS
// =============================================================================

/// Overpressure label of the zone at `index` in damage-model order.
pub fn psi_for_zone(index: usize) -> f64 {
    BLAST_PSI_LEVELS.get(index).copied().unwrap_or(0.0)
}

/// Coastal amplitude and arrival time at each standoff distance inside the
/// source's attenuation range.
pub fn coastal_tsunami(source: &TsunamiSource, ocean_depth_m: f64) -> TsunamiAssessment {
    let mut coastal_amplitudes = BTreeMap::new();
    let mut coastal_arrival_times = BTreeMap::new();

    for &dist_km in COASTAL_DISTANCES_KM.iter() {
        let distance = f64::from(dist_km);
        if distance > source.attenuation_km {
            continue;
        }
        coastal_amplitudes.insert(dist_km, coastal_amplitude(source.source_amplitude_m, distance));
        coastal_arrival_times.insert(
            dist_km,
            distance * 1000.0 / source.shallow_speed_m_s / 3600.0,
        );
    }

    let max_coastal_amplitude_m = coastal_amplitudes.values().copied().fold(0.0, f64::max);
    let min_coastal_arrival_hrs = coastal_arrival_times
        .values()
        .copied()
        .reduce(f64::min)
        .unwrap_or(0.0);

    TsunamiAssessment {
        source_amplitude_m: source.source_amplitude_m,
        max_coastal_amplitude_m,
        min_coastal_arrival_hrs,
        attenuation_km: source.attenuation_km,
        shallow_speed_m_s: source.shallow_speed_m_s,
        ocean_depth_m,
        coastal_amplitudes,
        coastal_arrival_times,
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

pub struct ImpactEffectsPipeline<S: GeoDataSource, P: ImpactPhysics> {
    geo: S,
    physics: P,
    classifier: TerrainClassifier,
}

impl<S: GeoDataSource, P: ImpactPhysics> ImpactEffectsPipeline<S, P> {
    pub fn new(geo: S, physics: P, classifier: TerrainClassifier) -> Self {
        Self {
            geo,
            physics,
            classifier,
        }
    }

    pub fn geo(&self) -> &S {
        &self.geo
    }

    /// Full consequence assessment for one impactor. Lookup failures are
    /// returned as-is; nothing is retried.
    pub async fn assess(
        &self,
        impactor: &ImpactorParameters,
    ) -> Result<ImpactAssessment, ImpactError> {
        let (lat, lon) = (impactor.lat, impactor.lon);

        let terrain = self.geo.terrain_characteristics(lat, lon).await?;
        let over_water = if self.classifier.needs_water_mask(&terrain) {
            self.geo.is_over_water(lat, lon).await?
        } else {
            true
        };
        let class = self.classifier.classify(&terrain, over_water);
        debug!(?class, rock_type = %terrain.rock_type, "classified impact site");

        let crater = self.physics.crater_dimensions(impactor, class.material);
        let damage = self
            .physics
            .damage_coefficients(crater.kinetic_energy_j, terrain.eta);

        let tsunami = match class.surface {
            ImpactSurface::Water { depth_m, .. } => {
                let source =
                    self.physics
                        .tsunami_source(crater.kinetic_energy_j, impactor.angle_deg, depth_m);
                Some(coastal_tsunami(&source, depth_m))
            }
            ImpactSurface::Land => None,
        };

        let blast_zones: Vec<BlastZone> = damage
            .zones
            .iter()
            .enumerate()
            .map(|(idx, zone)| BlastZone {
                psi: psi_for_zone(idx),
                radius_m: zone.radius_m,
                radius_km: (zone.radius_m != 0.0 && zone.radius_m.is_finite())
                    .then(|| zone.radius_m / 1000.0),
                fatality_rate: zone.fatality_rate,
                injury_rate: zone.injury_rate,
            })
            .collect();

        let mut by_zone = Vec::new();
        let mut total_deaths: u64 = 0;
        let mut total_injuries: u64 = 0;
        for zone in &blast_zones {
            let radius_km = match zone.radius_km {
                Some(r) if r > 0.0 => r,
                _ => continue,
            };
            let population = self.geo.population_within_radius(lat, lon, radius_km).await?;
            let deaths = (population * zone.fatality_rate) as u64;
            let injuries = (population * zone.injury_rate) as u64;
            total_deaths += deaths;
            total_injuries += injuries;
            by_zone.push(CasualtyZone {
                psi: zone.psi,
                radius_km,
                population: population as u64,
                deaths,
                injuries,
            });
        }

        info!(
            lat,
            lon,
            energy_j = crater.kinetic_energy_j,
            water = class.is_water(),
            total_deaths,
            "assessed impact"
        );

        Ok(ImpactAssessment {
            crater: CraterSummary {
                diameter_m: crater.diameter_m,
                diameter_km: crater.diameter_m / 1000.0,
                depth_m: crater.depth_m,
            },
            blast_zones,
            casualties: Casualties {
                by_zone,
                total_deaths,
                total_injuries,
            },
            seismic: Seismic {
                magnitude: damage.seismic_magnitude,
                eta: terrain.eta,
            },
            terrain: TerrainSummary {
                rock_type: terrain.rock_type,
                elevation_m: terrain.elevation_m,
                target_type: class.material,
            },
            impact_energy_j: crater.kinetic_energy_j,
            mass_ablation_percent: crater.mass_ablation_percent,
            tsunami,
            location: Location { lat, lon },
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain(rock_type: &str, elevation_m: f64) -> TerrainContext {
        TerrainContext {
            eta: 1e-4,
            rock_type: rock_type.to_string(),
            elevation_m,
        }
    }

    #[test]
    fn test_rock_type_mapping() {
        assert_eq!(
            TargetMaterial::from_rock_type("Metamorphics"),
            TargetMaterial::Metamorphic
        );
        assert_eq!(
            TargetMaterial::from_rock_type("Acid/Intermediate/Basic volcanic rocks"),
            TargetMaterial::Crystalline
        );
        assert_eq!(
            TargetMaterial::from_rock_type("Carbonate sedimentary rocks"),
            TargetMaterial::CarbonateSedimentary
        );
        assert_eq!(
            TargetMaterial::from_rock_type("Evaporites"),
            TargetMaterial::MixedSedimentary
        );
        assert_eq!(
            TargetMaterial::from_rock_type("Ice and Glaciers"),
            TargetMaterial::MixedSedimentary
        );
        assert_eq!(
            serde_json::to_value(TargetMaterial::Metamorphic).unwrap(),
            "Metamorphic rocks"
        );
    }

    #[test]
    fn test_any_signal_classification() {
        let classifier = TerrainClassifier::new(WaterPrecedence::AnySignal);
        assert!(classifier.classify(&terrain("Water Bodies", 10.0), false).is_water());
        assert!(classifier.classify(&terrain("   ", 10.0), false).is_water());
        assert!(classifier.classify(&terrain("Metamorphics", 10.0), true).is_water());
        assert!(!classifier.classify(&terrain("Metamorphics", 10.0), false).is_water());
        assert!(!classifier.needs_water_mask(&terrain("", 0.0)));
    }

    #[test]
    fn test_coordinate_authoritative_classification() {
        let classifier = TerrainClassifier::default();
        assert!(!classifier.classify(&terrain("Water Bodies", 10.0), false).is_water());
        assert!(classifier.classify(&terrain("Metamorphics", 10.0), true).is_water());
        assert!(classifier.needs_water_mask(&terrain("Water Bodies", 0.0)));
    }

    #[test]
    fn test_ocean_depth_source() {
        let classifier = TerrainClassifier::default();
        let deep = classifier.classify(&terrain("", -4200.0), true);
        assert_eq!(
            deep.surface,
            ImpactSurface::Water {
                depth_m: 4200.0,
                depth_source: DepthSource::Elevation
            }
        );
        let unknown = classifier.classify(&terrain("", 0.0), true);
        assert_eq!(
            unknown.surface,
            ImpactSurface::Water {
                depth_m: DEFAULT_OCEAN_DEPTH,
                depth_source: DepthSource::AssumedDeepOcean
            }
        );
    }

    #[test]
    fn test_psi_labels_follow_zone_order() {
        assert_eq!(psi_for_zone(0), 2.0);
        assert_eq!(psi_for_zone(3), 20.0);
        assert_eq!(psi_for_zone(4), 0.0);
    }

    #[test]
    fn test_coastal_tsunami_respects_cutoff() {
        let source = TsunamiSource {
            source_amplitude_m: 40.0,
            attenuation_km: 300.0,
            shallow_speed_m_s: 200.0,
        };
        let tsunami = coastal_tsunami(&source, 4000.0);
        assert_eq!(
            tsunami.coastal_amplitudes.keys().copied().collect::<Vec<_>>(),
            vec![50, 100, 200]
        );
        assert!((tsunami.coastal_arrival_times[&50] - 50_000.0 / 200.0 / 3600.0).abs() < 1e-12);
        assert_eq!(tsunami.max_coastal_amplitude_m, tsunami.coastal_amplitudes[&50]);
        assert_eq!(tsunami.min_coastal_arrival_hrs, tsunami.coastal_arrival_times[&50]);
        let amps: Vec<f64> = tsunami.coastal_amplitudes.values().copied().collect();
        assert!(amps.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_coastal_tsunami_out_of_range() {
        let source = TsunamiSource {
            source_amplitude_m: 0.001,
            attenuation_km: 0.0,
            shallow_speed_m_s: 170.0,
        };
        let tsunami = coastal_tsunami(&source, 3000.0);
        assert!(tsunami.coastal_amplitudes.is_empty());
        assert_eq!(tsunami.max_coastal_amplitude_m, 0.0);
        assert_eq!(tsunami.min_coastal_arrival_hrs, 0.0);
    }
}
