//! Plant document schema.
//!
//! Each component kind is a tagged variant carrying exactly the fields
//! its physics needs; there is no dynamic property bag, and unknown
//! fields are rejected at parse time by construction of the types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlantError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantDoc {
    pub version: u32,
    pub name: String,
    /// Deterministic seed for burst margins and break geometry.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

impl PlantDoc {
    pub fn from_json_str(text: &str) -> Result<Self, PlantError> {
        serde_json::from_str(text).map_err(|e| PlantError::Parse {
            message: e.to_string(),
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, PlantError> {
        serde_yaml::from_str(text).map_err(|e| PlantError::Parse {
            message: e.to_string(),
        })
    }

    pub fn to_json_string(&self) -> Result<String, PlantError> {
        serde_json::to_string_pretty(self).map_err(|e| PlantError::Parse {
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    /// Stable id; generated when the document omits it.
    #[serde(default = "generated_id")]
    pub id: String,
    pub name: String,
    /// Elevation of the component bottom above plant datum.
    #[serde(default)]
    pub elevation_m: f64,
    /// Id of the enclosing component (containment building, shell, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contained_by: Option<String>,
    pub kind: ComponentKind,
}

fn generated_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ComponentKind {
    Tank {
        volume_m3: f64,
        height_m: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        design_pressure_pa: Option<f64>,
        #[serde(default)]
        initial: InitialFluidDef,
    },
    Pipe {
        inner_diameter_m: f64,
        length_m: f64,
        #[serde(default = "default_resistance")]
        resistance_k: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        design_pressure_pa: Option<f64>,
        #[serde(default)]
        initial: InitialFluidDef,
    },
    Pump {
        rated_head_m: f64,
        rated_flow_kg_s: f64,
        #[serde(default = "default_pump_efficiency")]
        efficiency: f64,
        #[serde(default = "default_ramp_up")]
        ramp_up_s: f64,
        #[serde(default = "default_coast_down")]
        coast_down_s: f64,
    },
    Valve {
        #[serde(default)]
        position: f64,
        #[serde(default = "default_stroke_time")]
        stroke_time_s: f64,
    },
    CheckValve {
        cracking_pressure_pa: f64,
    },
    /// Reactor vessel: decomposes into a core-barrel interior node and
    /// an annular downcomer node.
    Vessel {
        inner_radius_m: f64,
        inner_height_m: f64,
        barrel_inner_radius_m: f64,
        barrel_wall_thickness_m: f64,
        #[serde(default = "default_gap")]
        top_gap_m: f64,
        #[serde(default = "default_gap")]
        bottom_gap_m: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        design_pressure_pa: Option<f64>,
        #[serde(default)]
        initial: InitialFluidDef,
    },
    /// Fuel bundle living inside a vessel (`contained_by` names it).
    Core {
        rod_count: u32,
        rod_diameter_m: f64,
        rod_height_m: f64,
        rated_power_w: f64,
        #[serde(default)]
        kinetics: KineticsDef,
    },
    HeatExchanger {
        shell_volume_m3: f64,
        shell_height_m: f64,
        tube_count: u32,
        tube_inner_diameter_m: f64,
        tube_length_m: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tube_design_pressure_pa: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shell_design_pressure_pa: Option<f64>,
        #[serde(default)]
        initial_shell: InitialFluidDef,
        #[serde(default)]
        initial_tube: InitialFluidDef,
    },
    Turbine {
        volume_m3: f64,
        height_m: f64,
        #[serde(default = "default_turbine_efficiency")]
        efficiency: f64,
        #[serde(default)]
        initial: InitialFluidDef,
    },
    Condenser {
        volume_m3: f64,
        height_m: f64,
        ua_w_k: f64,
        sink_temperature_k: f64,
        max_heat_w: f64,
        #[serde(default)]
        initial: InitialFluidDef,
    },
}

impl ComponentKind {
    /// Device components compile to a flow connection rather than nodes.
    pub fn is_device(&self) -> bool {
        matches!(
            self,
            ComponentKind::Pump { .. } | ComponentKind::Valve { .. } | ComponentKind::CheckValve { .. }
        )
    }
}

/// Initial fluid condition of a volume component.
///
/// A fill fraction below 1 means a saturated mixture at the given
/// pressure with that much liquid by volume; a full component holds
/// liquid at (pressure, temperature), subcooled when the temperature is
/// below saturation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitialFluidDef {
    #[serde(default = "default_pressure")]
    pub pressure_pa: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_k: Option<f64>,
    #[serde(default = "default_fill")]
    pub fill_fraction: f64,
}

impl Default for InitialFluidDef {
    fn default() -> Self {
        Self {
            pressure_pa: default_pressure(),
            temperature_k: None,
            fill_fraction: default_fill(),
        }
    }
}

/// Point-kinetics configuration for a core. Defaults are a generic
/// PWR-like parameter set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KineticsDef {
    #[serde(default = "default_rod_worth")]
    pub rod_worth: f64,
    #[serde(default = "default_reference_insertion")]
    pub reference_insertion: f64,
    #[serde(default = "default_doppler")]
    pub doppler_coeff_per_k: f64,
    #[serde(default = "default_moderator")]
    pub moderator_coeff_per_k: f64,
    #[serde(default = "default_scram_fall")]
    pub scram_fall_time_s: f64,
    #[serde(default = "default_true")]
    pub xenon_enabled: bool,
    #[serde(default = "default_power_fraction")]
    pub initial_power_fraction: f64,
}

impl Default for KineticsDef {
    fn default() -> Self {
        Self {
            rod_worth: default_rod_worth(),
            reference_insertion: default_reference_insertion(),
            doppler_coeff_per_k: default_doppler(),
            moderator_coeff_per_k: default_moderator(),
            scram_fall_time_s: default_scram_fall(),
            xenon_enabled: true,
            initial_power_fraction: default_power_fraction(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionDef {
    pub from: PortRef,
    pub to: PortRef,
    /// Tap heights above each component's bottom.
    #[serde(default)]
    pub from_elevation_m: f64,
    #[serde(default)]
    pub to_elevation_m: f64,
    pub flow_area_m2: f64,
    pub length_m: f64,
    #[serde(default = "default_resistance")]
    pub resistance_k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortRef {
    pub component: String,
    pub port: String,
}

fn default_resistance() -> f64 {
    1.5
}

fn default_pump_efficiency() -> f64 {
    0.75
}

fn default_ramp_up() -> f64 {
    5.0
}

fn default_coast_down() -> f64 {
    10.0
}

fn default_stroke_time() -> f64 {
    2.0
}

fn default_gap() -> f64 {
    0.3
}

fn default_turbine_efficiency() -> f64 {
    0.85
}

fn default_pressure() -> f64 {
    rf_core::units::constants::P_ATM_PA
}

fn default_fill() -> f64 {
    1.0
}

fn default_rod_worth() -> f64 {
    0.08
}

fn default_reference_insertion() -> f64 {
    0.3
}

fn default_doppler() -> f64 {
    -2.5e-5
}

fn default_moderator() -> f64 {
    -2.0e-4
}

fn default_scram_fall() -> f64 {
    2.5
}

fn default_true() -> bool {
    true
}

fn default_power_fraction() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let doc = PlantDoc {
            version: 1,
            name: "two tanks".into(),
            seed: 7,
            components: vec![ComponentDef {
                id: "tank-a".into(),
                name: "Tank A".into(),
                elevation_m: 0.0,
                contained_by: None,
                kind: ComponentKind::Tank {
                    volume_m3: 10.0,
                    height_m: 2.0,
                    design_pressure_pa: Some(1.0e6),
                    initial: InitialFluidDef::default(),
                },
            }],
            connections: vec![],
        };
        let json = doc.to_json_string().unwrap();
        let back = PlantDoc::from_json_str(&json).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn yaml_with_defaults() {
        let yaml = r#"
version: 1
name: minimal
components:
  - id: t1
    name: Tank
    kind:
      type: Tank
      volume_m3: 5.0
      height_m: 2.0
  - id: v1
    name: Valve
    kind:
      type: Valve
"#;
        let doc = PlantDoc::from_yaml_str(yaml).unwrap();
        assert_eq!(doc.components.len(), 2);
        match &doc.components[0].kind {
            ComponentKind::Tank { initial, .. } => {
                assert_eq!(initial.fill_fraction, 1.0);
                assert_eq!(initial.pressure_pa, 101_325.0);
            }
            _ => panic!("expected tank"),
        }
        assert!(doc.components[1].kind.is_device());
        assert_eq!(doc.seed, 0);
    }

    #[test]
    fn missing_id_is_generated() {
        let yaml = r#"
version: 1
name: generated
components:
  - name: Tank
    kind:
      type: Tank
      volume_m3: 5.0
      height_m: 2.0
"#;
        let doc = PlantDoc::from_yaml_str(yaml).unwrap();
        assert!(!doc.components[0].id.is_empty());
    }

    #[test]
    fn bad_document_is_a_parse_error() {
        let err = PlantDoc::from_json_str("{").unwrap_err();
        assert!(matches!(err, PlantError::Parse { .. }));
    }
}
