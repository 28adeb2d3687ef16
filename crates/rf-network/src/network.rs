//! The network container: flat collections keyed by stable ids.

use rf_core::{ConnId, Id, NodeId, ThermalId};

use crate::burst::BurstState;
use crate::connection::FlowConnection;
use crate::devices::{CheckValveState, CondenserSpec, HxSpec, PumpState, TurbineSpec, ValveState};
use crate::error::{NetworkError, NetworkResult};
use crate::node::{FlowNode, ThermalNode};

/// The complete flow-and-thermal network.
///
/// Node and connection ids are indices into the vectors and stay stable
/// for the lifetime of the simulation; operators never re-key entities.
/// The only structural mutation after compilation is the burst-check
/// operator synthesizing break connections.
#[derive(Clone, Debug, Default)]
pub struct Network {
    nodes: Vec<FlowNode>,
    thermals: Vec<ThermalNode>,
    connections: Vec<FlowConnection>,
    pumps: Vec<PumpState>,
    valves: Vec<ValveState>,
    check_valves: Vec<CheckValveState>,
    bursts: Vec<BurstState>,
    turbines: Vec<TurbineSpec>,
    condensers: Vec<CondenserSpec>,
    heat_exchangers: Vec<HxSpec>,
    atmosphere: Option<NodeId>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- construction (compiler and burst-check only) ------------------

    pub fn add_node(&mut self, mut node: FlowNode) -> NodeId {
        let id = Id::from_index(self.nodes.len());
        node.id = id;
        self.nodes.push(node);
        id
    }

    pub fn add_thermal(&mut self, mut node: ThermalNode) -> ThermalId {
        let id = Id::from_index(self.thermals.len());
        node.id = id;
        self.thermals.push(node);
        id
    }

    pub fn add_connection(&mut self, mut conn: FlowConnection) -> ConnId {
        let id = Id::from_index(self.connections.len());
        conn.id = id;
        self.connections.push(conn);
        id
    }

    pub fn add_pump(&mut self, pump: PumpState) -> u32 {
        let idx = self.pumps.len() as u32;
        let conn = pump.conn;
        self.pumps.push(pump);
        self.connections[conn.index()].pump = Some(idx);
        idx
    }

    pub fn add_valve(&mut self, valve: ValveState) -> u32 {
        let idx = self.valves.len() as u32;
        let conn = valve.conn;
        self.valves.push(valve);
        self.connections[conn.index()].valve = Some(idx);
        idx
    }

    pub fn add_check_valve(&mut self, cv: CheckValveState) -> u32 {
        let idx = self.check_valves.len() as u32;
        let conn = cv.conn;
        self.check_valves.push(cv);
        self.connections[conn.index()].check_valve = Some(idx);
        idx
    }

    pub fn add_burst(&mut self, burst: BurstState) -> usize {
        self.bursts.push(burst);
        self.bursts.len() - 1
    }

    pub fn add_turbine(&mut self, spec: TurbineSpec) -> usize {
        self.turbines.push(spec);
        self.turbines.len() - 1
    }

    pub fn add_condenser(&mut self, spec: CondenserSpec) -> usize {
        self.condensers.push(spec);
        self.condensers.len() - 1
    }

    pub fn add_heat_exchanger(&mut self, spec: HxSpec) -> usize {
        self.heat_exchangers.push(spec);
        self.heat_exchangers.len() - 1
    }

    pub fn set_atmosphere(&mut self, id: NodeId) {
        self.atmosphere = Some(id);
    }

    // ---- accessors ------------------------------------------------------

    pub fn atmosphere(&self) -> Option<NodeId> {
        self.atmosphere
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [FlowNode] {
        &mut self.nodes
    }

    pub fn thermals(&self) -> &[ThermalNode] {
        &self.thermals
    }

    pub fn thermals_mut(&mut self) -> &mut [ThermalNode] {
        &mut self.thermals
    }

    pub fn connections(&self) -> &[FlowConnection] {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut [FlowConnection] {
        &mut self.connections
    }

    pub fn pumps(&self) -> &[PumpState] {
        &self.pumps
    }

    pub fn pumps_mut(&mut self) -> &mut [PumpState] {
        &mut self.pumps
    }

    pub fn valves(&self) -> &[ValveState] {
        &self.valves
    }

    pub fn valves_mut(&mut self) -> &mut [ValveState] {
        &mut self.valves
    }

    pub fn check_valves(&self) -> &[CheckValveState] {
        &self.check_valves
    }

    pub fn bursts(&self) -> &[BurstState] {
        &self.bursts
    }

    pub fn bursts_mut(&mut self) -> &mut [BurstState] {
        &mut self.bursts
    }

    pub fn turbines(&self) -> &[TurbineSpec] {
        &self.turbines
    }

    pub fn condensers(&self) -> &[CondenserSpec] {
        &self.condensers
    }

    pub fn heat_exchangers(&self) -> &[HxSpec] {
        &self.heat_exchangers
    }

    pub fn node(&self, id: NodeId) -> NetworkResult<&FlowNode> {
        self.nodes
            .get(id.index())
            .ok_or(NetworkError::UnknownNode { id: id.index() })
    }

    pub fn node_mut(&mut self, id: NodeId) -> NetworkResult<&mut FlowNode> {
        self.nodes
            .get_mut(id.index())
            .ok_or(NetworkError::UnknownNode { id: id.index() })
    }

    pub fn connection(&self, id: ConnId) -> NetworkResult<&FlowConnection> {
        self.connections
            .get(id.index())
            .ok_or(NetworkError::UnknownConnection { id: id.index() })
    }

    pub fn thermal(&self, id: ThermalId) -> NetworkResult<&ThermalNode> {
        self.thermals
            .get(id.index())
            .ok_or(NetworkError::UnknownThermal { id: id.index() })
    }

    /// Find a flow node by its label (inspection convenience).
    pub fn node_by_label(&self, label: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.label == label)
    }

    /// Total fluid mass over non-atmosphere nodes.
    pub fn total_mass_kg(&self) -> f64 {
        self.nodes
            .iter()
            .filter(|n| !n.is_atmosphere)
            .map(|n| n.mass_kg)
            .sum()
    }

    /// Total fluid internal energy over non-atmosphere nodes.
    pub fn total_fluid_energy_j(&self) -> f64 {
        self.nodes
            .iter()
            .filter(|n| !n.is_atmosphere)
            .map(|n| n.energy_j)
            .sum()
    }

    /// Total stored thermal energy C*T over solid masses.
    pub fn total_thermal_energy_j(&self) -> f64 {
        self.thermals
            .iter()
            .map(|t| t.heat_capacity_j_k * t.t_k)
            .sum()
    }

    // ---- invariants ------------------------------------------------------

    /// Structural and physical invariants, asserted by the solver each
    /// tick. Violations indicate an operator bug, not a user error.
    pub fn assert_invariants(&self) -> NetworkResult<()> {
        for n in &self.nodes {
            if !(n.volume_m3 > 0.0) {
                return Err(NetworkError::Invariant {
                    entity: "flow node",
                    label: n.label.clone(),
                    what: "volume must be strictly positive",
                });
            }
            if !(n.mass_kg > 0.0) {
                return Err(NetworkError::Invariant {
                    entity: "flow node",
                    label: n.label.clone(),
                    what: "mass must be strictly positive",
                });
            }
            if !(n.energy_j >= 0.0) {
                return Err(NetworkError::Invariant {
                    entity: "flow node",
                    label: n.label.clone(),
                    what: "internal energy must be non-negative",
                });
            }
            if !n.mass_kg.is_finite() || !n.energy_j.is_finite() {
                return Err(NetworkError::Invariant {
                    entity: "flow node",
                    label: n.label.clone(),
                    what: "conserved quantities must be finite",
                });
            }
            if let Some(c) = n.container {
                if c.index() >= self.nodes.len() {
                    return Err(NetworkError::Invariant {
                        entity: "flow node",
                        label: n.label.clone(),
                        what: "container id out of range",
                    });
                }
            }
        }
        for c in &self.connections {
            if c.from.index() >= self.nodes.len() || c.to.index() >= self.nodes.len() {
                return Err(NetworkError::Invariant {
                    entity: "connection",
                    label: format!("{}", c.id),
                    what: "endpoint id out of range",
                });
            }
            if !(c.flow_area_m2 > 0.0) {
                return Err(NetworkError::Invariant {
                    entity: "connection",
                    label: format!("{}", c.id),
                    what: "flow area must be positive",
                });
            }
        }
        for p in &self.pumps {
            if p.conn.index() >= self.connections.len() {
                return Err(NetworkError::Invariant {
                    entity: "pump",
                    label: p.label.clone(),
                    what: "bound connection out of range",
                });
            }
        }
        for v in &self.valves {
            if v.conn.index() >= self.connections.len() {
                return Err(NetworkError::Invariant {
                    entity: "valve",
                    label: v.label.clone(),
                    what: "bound connection out of range",
                });
            }
        }
        for cv in &self.check_valves {
            if cv.conn.index() >= self.connections.len() {
                return Err(NetworkError::Invariant {
                    entity: "check valve",
                    label: cv.label.clone(),
                    what: "bound connection out of range",
                });
            }
        }
        for b in &self.bursts {
            if b.node.index() >= self.nodes.len() {
                return Err(NetworkError::Invariant {
                    entity: "burst record",
                    label: b.label.clone(),
                    what: "node id out of range",
                });
            }
            if !(0.0..=1.0).contains(&b.current_break_fraction) {
                return Err(NetworkError::Invariant {
                    entity: "burst record",
                    label: b.label.clone(),
                    what: "break fraction outside [0, 1]",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_steam::Phase;

    fn test_node(label: &str) -> FlowNode {
        FlowNode {
            id: Id::from_index(0),
            label: label.into(),
            volume_m3: 1.0,
            elevation_m: 0.0,
            height_m: 1.0,
            container: None,
            is_atmosphere: false,
            mass_kg: 100.0,
            energy_j: 1.0e7,
            t_k: 300.0,
            p_pa: 1.0e5,
            phase: Phase::Liquid,
            quality: 0.0,
        }
    }

    #[test]
    fn ids_are_stable_indices() {
        let mut net = Network::new();
        let a = net.add_node(test_node("a"));
        let b = net.add_node(test_node("b"));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(net.node(a).unwrap().label, "a");
        assert_eq!(net.node(b).unwrap().label, "b");
    }

    #[test]
    fn device_binding_links_connection() {
        let mut net = Network::new();
        let a = net.add_node(test_node("a"));
        let b = net.add_node(test_node("b"));
        let conn = net.add_connection(FlowConnection::new(
            Id::from_index(0),
            a,
            b,
            0.01,
            2.0,
            1.0,
        ));
        let idx = net.add_pump(PumpState::new("p".into(), conn, 50.0, 100.0));
        assert_eq!(net.connection(conn).unwrap().pump, Some(idx));
        assert!(net.assert_invariants().is_ok());
    }

    #[test]
    fn invariants_catch_dead_node() {
        let mut net = Network::new();
        let a = net.add_node(test_node("a"));
        net.node_mut(a).unwrap().mass_kg = 0.0;
        assert!(net.assert_invariants().is_err());
    }

    #[test]
    fn totals_skip_atmosphere() {
        let mut net = Network::new();
        let _a = net.add_node(test_node("a"));
        let mut atm = test_node("atmosphere");
        atm.is_atmosphere = true;
        atm.mass_kg = 1.0e12;
        let atm_id = net.add_node(atm);
        net.set_atmosphere(atm_id);
        assert_eq!(net.total_mass_kg(), 100.0);
    }
}
