//! Pump, valve, and check-valve device states.
//!
//! Each device acts on exactly one flow connection. Devices carry both a
//! commanded and an effective value; operators only ever read the
//! effective value, and commands feed a first-order filter inside the
//! fluid-flow operator's device-update phase.

use rf_core::ConnId;

/// Centrifugal pump driving a connection.
#[derive(Clone, Debug)]
pub struct PumpState {
    pub label: String,
    pub conn: ConnId,
    pub running: bool,
    /// Commanded speed fraction in [0, 1].
    pub commanded_speed: f64,
    /// Low-pass-filtered speed that enters the momentum balance.
    pub effective_speed: f64,
    pub rated_head_m: f64,
    pub rated_flow_kg_s: f64,
    pub efficiency: f64,
    pub ramp_up_s: f64,
    pub coast_down_s: f64,
}

impl PumpState {
    pub fn new(label: String, conn: ConnId, rated_head_m: f64, rated_flow_kg_s: f64) -> Self {
        Self {
            label,
            conn,
            running: false,
            commanded_speed: 0.0,
            effective_speed: 0.0,
            rated_head_m,
            rated_flow_kg_s,
            efficiency: 0.75,
            ramp_up_s: 5.0,
            coast_down_s: 10.0,
        }
    }
}

/// Throttle valve on a connection. Resistance scales as 1/position^2;
/// fully closed below `CLOSED_POSITION`.
#[derive(Clone, Debug)]
pub struct ValveState {
    pub label: String,
    pub conn: ConnId,
    /// Commanded position in [0, 1].
    pub commanded_position: f64,
    /// Filtered position actually applied to the resistance.
    pub position: f64,
    /// First-order stroke time constant.
    pub stroke_time_s: f64,
}

impl ValveState {
    pub const CLOSED_POSITION: f64 = 0.01;

    pub fn new(label: String, conn: ConnId, position: f64) -> Self {
        Self {
            label,
            conn,
            commanded_position: position,
            position,
            stroke_time_s: 2.0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.position < Self::CLOSED_POSITION
    }

    /// Multiplier applied to the connection resistance.
    pub fn resistance_factor(&self) -> f64 {
        1.0 / (self.position * self.position)
    }
}

/// Check valve: passes forward flow only once the driving pressure
/// exceeds the cracking pressure.
#[derive(Clone, Debug)]
pub struct CheckValveState {
    pub label: String,
    pub conn: ConnId,
    pub cracking_pressure_pa: f64,
}

impl CheckValveState {
    pub fn new(label: String, conn: ConnId, cracking_pressure_pa: f64) -> Self {
        Self {
            label,
            conn,
            cracking_pressure_pa,
        }
    }

    /// Whether the valve admits flow at the given driving pressure.
    pub fn passes(&self, dp_driving_pa: f64) -> bool {
        dp_driving_pa >= self.cracking_pressure_pa && dp_driving_pa > 0.0
    }
}

/// Turbine acting on a flow node: work extraction between the node and
/// its downstream neighbor.
#[derive(Clone, Debug)]
pub struct TurbineSpec {
    pub label: String,
    pub node: rf_core::NodeId,
    /// Isentropic efficiency in (0, 1].
    pub efficiency: f64,
}

/// Condenser heat rejection on a flow node.
#[derive(Clone, Debug)]
pub struct CondenserSpec {
    pub label: String,
    pub node: rf_core::NodeId,
    pub ua_w_k: f64,
    pub sink_t_k: f64,
    /// User-configurable ceiling on the heat rate.
    pub max_heat_w: f64,
}

/// Heat-exchanger coupling between a shell-side and a tube-side node.
///
/// The nominal UA applies with the shell fully wetted; the convection
/// operator scales it with the wetted-tube fraction.
#[derive(Clone, Debug)]
pub struct HxSpec {
    pub label: String,
    pub shell: rf_core::NodeId,
    pub tube: rf_core::NodeId,
    pub ua_w_k: f64,
    pub tube_count: u32,
    pub tube_diameter_m: f64,
}
