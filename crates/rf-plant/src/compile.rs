//! Compile a plant document into the simulation network.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rf_core::units::{k, pa};
use rf_core::NodeId;
use rf_network::{
    BurstState, CheckValveState, CondenserSpec, FlowConnection, FlowNode, HxSpec, Network,
    PumpState, ThermalNode, TurbineSpec, ValveState,
};
use rf_physics::{FluidStateUpdate, KineticsParams, PhysicsOperator, SimState};
use rf_steam::{Phase, SteamError, WaterProperties};

use crate::error::PlantError;
use crate::schema::{ComponentDef, ComponentKind, InitialFluidDef, PlantDoc, PortRef};

// Fuel/cladding material constants for the core thermal masses.
const RHO_UO2_KG_M3: f64 = 10_970.0;
const CP_UO2_J_KG_K: f64 = 300.0;
const RHO_ZIRC_KG_M3: f64 = 6_560.0;
const CP_ZIRC_J_KG_K: f64 = 285.0;
const CLAD_THICKNESS_M: f64 = 6.0e-4;
/// Fuel-to-cladding gap conductance per unit rod surface, W/(m2 K).
const H_GAP_W_M2_K: f64 = 3_000.0;
/// Cladding-to-coolant convective coefficient, W/(m2 K).
const H_COOLANT_W_M2_K: f64 = 30_000.0;
/// Overall HX coefficient per unit tube surface at full wetting.
const U_HX_W_M2_K: f64 = 5_000.0;

/// Loss coefficients contributed by in-line devices.
const K_PUMP_BODY: f64 = 0.5;
const K_VALVE_BODY: f64 = 2.0;
const K_CHECK_VALVE_BODY: f64 = 1.0;
const K_VESSEL_GAP: f64 = 1.0;

const ATMOSPHERE_VOLUME_M3: f64 = 1.0e9;
const ATMOSPHERE_MASS_KG: f64 = 1.0e9;
const ATMOSPHERE_U_J_KG: f64 = 2.41e6;

/// Isothermal bulk modulus of the tabulated liquid band, Pa. Tracks the
/// IAPWS table (stiffer than the runtime feedback curve) so subcooled
/// initial densities stay inside the interpolation mesh.
fn table_compressibility(t_c: f64) -> f64 {
    const T_LO: f64 = 50.0;
    const T_HI: f64 = 350.0;
    const K_LO: f64 = 2.2e9;
    const K_HI: f64 = 4.0e8;
    let frac = ((t_c - T_LO) / (T_HI - T_LO)).clamp(0.0, 1.0);
    (K_LO.ln() + frac * (K_HI.ln() - K_LO.ln())).exp()
}

/// Result of a successful compilation.
#[derive(Debug)]
pub struct CompiledPlant {
    pub state: SimState,
    /// Flow nodes created per component id, in creation order.
    pub nodes_by_component: HashMap<String, Vec<NodeId>>,
}

#[derive(Clone, Copy)]
struct EdgeHalf {
    node: NodeId,
    tap_elevation_m: f64,
    flow_area_m2: f64,
    length_m: f64,
    resistance_k: f64,
}

#[derive(Default)]
struct EdgeParts {
    inlet: Option<EdgeHalf>,
    outlet: Option<EdgeHalf>,
}

enum PortTarget {
    Node(NodeId),
    EdgeIn(String),
    EdgeOut(String),
}

struct Compiler<'a> {
    doc: &'a PlantDoc,
    props: &'a WaterProperties,
    net: Network,
    errors: Vec<PlantError>,
    nodes_by_component: HashMap<String, Vec<NodeId>>,
    components_by_id: HashMap<String, &'a ComponentDef>,
    edge_parts: HashMap<String, EdgeParts>,
    kinetics: Option<(KineticsParams, f64)>,
}

/// Compile the document. All collected errors are returned together;
/// nothing is coerced.
pub fn build_network(
    doc: &PlantDoc,
    props: Arc<WaterProperties>,
) -> Result<CompiledPlant, Vec<PlantError>> {
    let mut c = Compiler {
        doc,
        props: props.as_ref(),
        net: Network::new(),
        errors: Vec::new(),
        nodes_by_component: HashMap::new(),
        components_by_id: HashMap::new(),
        edge_parts: HashMap::new(),
        kinetics: None,
    };

    c.index_components();
    c.create_nodes();
    c.resolve_containment();
    c.create_vessel_internals();
    c.create_cores();
    c.wire_connections();
    c.assemble_edges();
    c.register_bursts();
    c.create_atmosphere();

    if !c.errors.is_empty() {
        return Err(c.errors);
    }

    let mut state = match c.kinetics {
        Some((params, power_frac)) => SimState::with_kinetics(c.net, params, power_frac),
        None => SimState::new(c.net),
    };

    // Derived states must be consistent before the first solver tick.
    if let Err(e) = FluidStateUpdate::new(props.clone()).apply(&mut state, 0.0) {
        return Err(vec![PlantError::Physics(e)]);
    }
    if let Err(e) = state.network.assert_invariants() {
        return Err(vec![PlantError::Physics(e.into())]);
    }

    Ok(CompiledPlant {
        state,
        nodes_by_component: c.nodes_by_component,
    })
}

impl<'a> Compiler<'a> {
    fn index_components(&mut self) {
        let doc = self.doc;
        for comp in &doc.components {
            if self
                .components_by_id
                .insert(comp.id.clone(), comp)
                .is_some()
            {
                self.errors.push(PlantError::DuplicateId {
                    id: comp.id.clone(),
                });
            }
        }
    }

    fn bad_geometry(&mut self, component: &str, what: impl Into<String>) {
        self.errors.push(PlantError::BadGeometry {
            component: component.to_string(),
            what: what.into(),
        });
    }

    /// Initial (mass, energy) for a volume from its declared condition.
    fn initial_inventory(
        &self,
        volume_m3: f64,
        init: &InitialFluidDef,
    ) -> Result<(f64, f64, f64), SteamError> {
        let p_pa = init.pressure_pa;
        if init.fill_fraction < 1.0 {
            let t = self.props.t_sat(pa(p_pa))?;
            let fill = init.fill_fraction.max(0.0);
            let rho_f = self.props.rho_f(t)?.value;
            let rho_g = self.props.rho_g(t)?.value;
            let m_liq = rho_f * fill * volume_m3;
            let m_vap = rho_g * (1.0 - fill) * volume_m3;
            let energy = m_liq * self.props.u_f(t)? + m_vap * self.props.u_g(t)?;
            Ok((m_liq + m_vap, energy, t.value))
        } else {
            let t_k = match init.temperature_k {
                Some(t) => t,
                None => self.props.t_sat(pa(p_pa))?.value,
            };
            let p_sat = self.props.p_sat(k(t_k))?.value;
            if p_pa < p_sat * (1.0 - 1.0e-9) {
                return Err(SteamError::NonPhysical {
                    what: "declared liquid state is below its saturation pressure",
                });
            }
            // Invert with the tabulated liquid compressibility so the
            // initial point lands inside the single-phase mesh; the
            // runtime pressure feedback uses its own curve.
            let rho = self.props.rho_f(k(t_k))?.value
                * (1.0 + (p_pa - p_sat) / table_compressibility(t_k - 273.15));
            let mass = rho * volume_m3;
            Ok((mass, mass * self.props.u_f(k(t_k))?, t_k))
        }
    }

    fn push_node(
        &mut self,
        comp: &ComponentDef,
        label: String,
        volume_m3: f64,
        elevation_m: f64,
        height_m: f64,
        init: &InitialFluidDef,
    ) -> Option<NodeId> {
        if !(volume_m3 > 0.0) {
            self.bad_geometry(&comp.id, format!("non-positive volume {volume_m3} m3"));
            return None;
        }
        if !(height_m > 0.0) {
            self.bad_geometry(&comp.id, format!("non-positive height {height_m} m"));
            return None;
        }
        let (mass_kg, energy_j, t_k) = match self.initial_inventory(volume_m3, init) {
            Ok(v) => v,
            Err(source) => {
                self.errors.push(PlantError::InitialState {
                    component: comp.id.clone(),
                    source,
                });
                return None;
            }
        };
        let id = self.net.add_node(FlowNode {
            id: NodeId::from_index(0),
            label,
            volume_m3,
            elevation_m,
            height_m,
            container: None,
            is_atmosphere: false,
            mass_kg,
            energy_j,
            t_k,
            p_pa: init.pressure_pa,
            phase: Phase::Liquid,
            quality: 0.0,
        });
        self.nodes_by_component
            .entry(comp.id.clone())
            .or_default()
            .push(id);
        Some(id)
    }

    fn create_nodes(&mut self) {
        let doc = self.doc;
        for comp in &doc.components {
            match &comp.kind {
                ComponentKind::Tank {
                    volume_m3,
                    height_m,
                    initial,
                    ..
                }
                | ComponentKind::Turbine {
                    volume_m3,
                    height_m,
                    initial,
                    ..
                }
                | ComponentKind::Condenser {
                    volume_m3,
                    height_m,
                    initial,
                    ..
                } => {
                    let (v, h, i) = (*volume_m3, *height_m, initial.clone());
                    self.push_node(comp, comp.name.clone(), v, comp.elevation_m, h, &i);
                }
                ComponentKind::Pipe {
                    inner_diameter_m,
                    length_m,
                    initial,
                    ..
                } => {
                    let bore = PI * (inner_diameter_m / 2.0).powi(2);
                    let (v, i) = (bore * length_m, initial.clone());
                    // A pipe node's vertical extent is its bore unless it
                    // runs vertically; taps resolve against the bore.
                    let h = inner_diameter_m.max(0.01);
                    self.push_node(comp, comp.name.clone(), v, comp.elevation_m, h, &i);
                }
                ComponentKind::Vessel {
                    inner_radius_m,
                    inner_height_m,
                    barrel_inner_radius_m,
                    barrel_wall_thickness_m,
                    top_gap_m,
                    bottom_gap_m,
                    initial,
                    ..
                } => {
                    let r_in = *inner_radius_m;
                    let r_b = *barrel_inner_radius_m;
                    let wall = *barrel_wall_thickness_m;
                    let h = *inner_height_m;
                    let brh = h - top_gap_m - bottom_gap_m;
                    if r_b + wall >= r_in {
                        self.bad_geometry(
                            &comp.id,
                            "core barrel (with wall) does not fit inside the vessel",
                        );
                        continue;
                    }
                    if brh <= 0.0 {
                        self.bad_geometry(&comp.id, "gaps leave no barrel height");
                        continue;
                    }
                    let bundle = self.core_bundle_volume_for(&comp.id);
                    let v_barrel = PI * r_b * r_b * brh - bundle;
                    if v_barrel <= 0.0 {
                        self.bad_geometry(&comp.id, "fuel bundle displaces the whole barrel");
                        continue;
                    }
                    // Inner geometry fixes the volumes; the wall consumes
                    // annulus space, not barrel interior.
                    let v_annulus = PI * r_in * r_in * h - PI * (r_b + wall).powi(2) * brh;
                    if v_annulus <= 0.0 {
                        self.bad_geometry(&comp.id, "annulus volume is non-positive");
                        continue;
                    }
                    let init = initial.clone();
                    self.push_node(
                        comp,
                        format!("{}:barrel", comp.name),
                        v_barrel,
                        comp.elevation_m + bottom_gap_m,
                        brh,
                        &init,
                    );
                    self.push_node(
                        comp,
                        format!("{}:annulus", comp.name),
                        v_annulus,
                        comp.elevation_m,
                        h,
                        &init,
                    );
                }
                ComponentKind::HeatExchanger {
                    shell_volume_m3,
                    shell_height_m,
                    tube_count,
                    tube_inner_diameter_m,
                    tube_length_m,
                    initial_shell,
                    initial_tube,
                    ..
                } => {
                    let tube_volume = *tube_count as f64
                        * PI
                        * (tube_inner_diameter_m / 2.0).powi(2)
                        * tube_length_m;
                    let (vs, hs) = (*shell_volume_m3, *shell_height_m);
                    let (is, it) = (initial_shell.clone(), initial_tube.clone());
                    let shell = self.push_node(
                        comp,
                        format!("{}:shell", comp.name),
                        vs,
                        comp.elevation_m,
                        hs,
                        &is,
                    );
                    let tube = self.push_node(
                        comp,
                        format!("{}:tube", comp.name),
                        tube_volume,
                        comp.elevation_m,
                        hs,
                        &it,
                    );
                    if let (Some(shell), Some(tube)) = (shell, tube) {
                        let ua = U_HX_W_M2_K
                            * *tube_count as f64
                            * PI
                            * tube_inner_diameter_m
                            * tube_length_m;
                        self.net.add_heat_exchanger(HxSpec {
                            label: comp.name.clone(),
                            shell,
                            tube,
                            ua_w_k: ua,
                            tube_count: *tube_count,
                            tube_diameter_m: *tube_inner_diameter_m,
                        });
                    }
                }
                ComponentKind::Pump { .. }
                | ComponentKind::Valve { .. }
                | ComponentKind::CheckValve { .. } => {
                    self.edge_parts.insert(comp.id.clone(), EdgeParts::default());
                }
                ComponentKind::Core { .. } => {
                    // Cores create thermal nodes, not flow nodes.
                }
            }
            let first_node = self
                .nodes_by_component
                .get(&comp.id)
                .and_then(|v| v.first())
                .copied();
            if let (ComponentKind::Turbine { efficiency, .. }, Some(node)) =
                (&comp.kind, first_node)
            {
                self.net.add_turbine(TurbineSpec {
                    label: comp.name.clone(),
                    node,
                    efficiency: *efficiency,
                });
            }
            if let (
                ComponentKind::Condenser {
                    ua_w_k,
                    sink_temperature_k,
                    max_heat_w,
                    ..
                },
                Some(node),
            ) = (&comp.kind, first_node)
            {
                self.net.add_condenser(CondenserSpec {
                    label: comp.name.clone(),
                    node,
                    ua_w_k: *ua_w_k,
                    sink_t_k: *sink_temperature_k,
                    max_heat_w: *max_heat_w,
                });
            }
        }
    }

    /// Volume displaced by the fuel bundle of the core contained in the
    /// given vessel, if any.
    fn core_bundle_volume_for(&self, vessel_id: &str) -> f64 {
        let doc = self.doc;
        for comp in &doc.components {
            if let ComponentKind::Core {
                rod_count,
                rod_diameter_m,
                rod_height_m,
                ..
            } = &comp.kind
            {
                if comp.contained_by.as_deref() == Some(vessel_id) {
                    return *rod_count as f64 * PI * (rod_diameter_m / 2.0).powi(2) * rod_height_m;
                }
            }
        }
        0.0
    }

    /// The node used as a component's containment boundary.
    fn primary_node(&self, comp_id: &str) -> Option<NodeId> {
        let nodes = self.nodes_by_component.get(comp_id)?;
        let comp = self.components_by_id.get(comp_id)?;
        match comp.kind {
            // A vessel's outermost fluid region is the annulus.
            ComponentKind::Vessel { .. } => nodes.get(1).copied(),
            _ => nodes.first().copied(),
        }
    }

    fn resolve_containment(&mut self) {
        let doc = self.doc;
        let mut assignments = Vec::new();
        for comp in &doc.components {
            let Some(container_id) = &comp.contained_by else {
                continue;
            };
            if matches!(comp.kind, ComponentKind::Core { .. }) {
                // Core containment selects the host vessel, handled in
                // create_cores.
                continue;
            }
            match self.primary_node(container_id) {
                Some(container_node) => {
                    if let Some(nodes) = self.nodes_by_component.get(&comp.id) {
                        for &n in nodes {
                            assignments.push((n, container_node));
                        }
                    }
                }
                None => self.errors.push(PlantError::UnknownComponent {
                    id: container_id.clone(),
                    context: format!("containment of {:?}", comp.id),
                }),
            }
        }
        for (node, container) in assignments {
            if let Ok(n) = self.net.node_mut(node) {
                n.container = Some(container);
            }
        }
    }

    fn create_vessel_internals(&mut self) {
        let doc = self.doc;
        for comp in &doc.components {
            let ComponentKind::Vessel {
                barrel_inner_radius_m,
                top_gap_m,
                bottom_gap_m,
                ..
            } = &comp.kind
            else {
                continue;
            };
            let Some(nodes) = self.nodes_by_component.get(&comp.id).cloned() else {
                continue;
            };
            if nodes.len() != 2 {
                continue;
            }
            let (barrel, annulus) = (nodes[0], nodes[1]);
            let bundle_area = self.core_bundle_area_for(&comp.id);
            let gap_area = PI * barrel_inner_radius_m * barrel_inner_radius_m - bundle_area;
            if gap_area <= 0.0 {
                self.bad_geometry(&comp.id, "fuel bundle blocks the barrel flow area");
                continue;
            }
            let barrel_height = match self.net.node(barrel) {
                Ok(n) => n.height_m,
                Err(_) => continue,
            };

            // Top gap: barrel top to the annulus at the same height.
            let mut top = FlowConnection::new(
                NodeId::from_index(0),
                barrel,
                annulus,
                gap_area,
                K_VESSEL_GAP,
                top_gap_m.max(0.1),
            );
            top.from_elevation_m = barrel_height;
            top.to_elevation_m = bottom_gap_m + barrel_height;
            self.net.add_connection(top);

            // Bottom gap: annulus floor into the barrel floor.
            let mut bottom = FlowConnection::new(
                NodeId::from_index(0),
                annulus,
                barrel,
                gap_area,
                K_VESSEL_GAP,
                bottom_gap_m.max(0.1),
            );
            bottom.from_elevation_m = 0.0;
            bottom.to_elevation_m = 0.0;
            self.net.add_connection(bottom);
        }
    }

    fn core_bundle_area_for(&self, vessel_id: &str) -> f64 {
        let doc = self.doc;
        for comp in &doc.components {
            if let ComponentKind::Core {
                rod_count,
                rod_diameter_m,
                ..
            } = &comp.kind
            {
                if comp.contained_by.as_deref() == Some(vessel_id) {
                    return *rod_count as f64 * PI * (rod_diameter_m / 2.0).powi(2);
                }
            }
        }
        0.0
    }

    fn create_cores(&mut self) {
        let doc = self.doc;
        for comp in &doc.components {
            let ComponentKind::Core {
                rod_count,
                rod_diameter_m,
                rod_height_m,
                rated_power_w,
                kinetics,
            } = &comp.kind
            else {
                continue;
            };

            let Some(vessel_id) = &comp.contained_by else {
                self.errors.push(PlantError::UnknownComponent {
                    id: "(none)".into(),
                    context: format!("core {:?} must be contained by a vessel", comp.id),
                });
                continue;
            };
            let Some(vessel) = self.components_by_id.get(vessel_id.as_str()).copied() else {
                self.errors.push(PlantError::UnknownComponent {
                    id: vessel_id.clone(),
                    context: format!("host vessel of core {:?}", comp.id),
                });
                continue;
            };
            let ComponentKind::Vessel {
                barrel_inner_radius_m,
                inner_height_m,
                top_gap_m,
                bottom_gap_m,
                initial,
                ..
            } = &vessel.kind
            else {
                self.bad_geometry(&comp.id, "core must be contained by a Vessel component");
                continue;
            };

            let bundle_area = *rod_count as f64 * PI * (rod_diameter_m / 2.0).powi(2);
            if bundle_area >= 0.9 * PI * barrel_inner_radius_m * barrel_inner_radius_m {
                self.bad_geometry(
                    &comp.id,
                    "fuel bundle cross-section exceeds the barrel flow area",
                );
                continue;
            }
            let brh = inner_height_m - top_gap_m - bottom_gap_m;
            if *rod_height_m > brh {
                self.bad_geometry(&comp.id, "fuel rods are taller than the barrel region");
                continue;
            }
            let Some(&barrel_node) = self
                .nodes_by_component
                .get(vessel_id.as_str())
                .and_then(|v| v.first())
            else {
                continue;
            };
            if self.kinetics.is_some() {
                self.bad_geometry(&comp.id, "only one core per plant is supported");
                continue;
            }

            let rod_surface =
                *rod_count as f64 * PI * rod_diameter_m * rod_height_m;
            let fuel_mass =
                *rod_count as f64 * PI * (rod_diameter_m / 2.0).powi(2) * rod_height_m
                    * RHO_UO2_KG_M3;
            let clad_mass = *rod_count as f64
                * PI
                * rod_diameter_m
                * CLAD_THICKNESS_M
                * rod_height_m
                * RHO_ZIRC_KG_M3;

            let t_coolant = initial
                .temperature_k
                .or_else(|| self.props.t_sat(pa(initial.pressure_pa)).ok().map(|t| t.value))
                .unwrap_or(550.0);
            let pf = kinetics.initial_power_fraction;

            let clad = self.net.add_thermal(ThermalNode {
                id: NodeId::from_index(0),
                label: format!("{}:cladding", comp.name),
                heat_capacity_j_k: clad_mass * CP_ZIRC_J_KG_K,
                t_k: t_coolant + 25.0 * pf,
                heat_source_w: 0.0,
                power_fraction: 0.0,
                convects_to: Some(barrel_node),
                hta_w_k: H_COOLANT_W_M2_K * rod_surface,
                conduct_to: None,
                conductance_w_k: 0.0,
            });
            self.net.add_thermal(ThermalNode {
                id: NodeId::from_index(0),
                label: format!("{}:fuel", comp.name),
                heat_capacity_j_k: fuel_mass * CP_UO2_J_KG_K,
                t_k: t_coolant + 350.0 * pf,
                heat_source_w: 0.0,
                power_fraction: 1.0,
                convects_to: None,
                hta_w_k: 0.0,
                conduct_to: Some(clad),
                conductance_w_k: H_GAP_W_M2_K * rod_surface,
            });

            let params = KineticsParams {
                rod_worth: kinetics.rod_worth,
                reference_insertion: kinetics.reference_insertion,
                doppler_coeff_per_k: kinetics.doppler_coeff_per_k,
                moderator_coeff_per_k: kinetics.moderator_coeff_per_k,
                scram_fall_time_s: kinetics.scram_fall_time_s,
                rated_power_w: *rated_power_w,
                xenon_enabled: kinetics.xenon_enabled,
                fuel_t_ref_k: t_coolant + 350.0 * pf,
                moderator_t_ref_k: t_coolant,
                ..KineticsParams::default()
            };
            self.kinetics = Some((params, pf));
        }
    }

    fn resolve_port(&self, pref: &PortRef) -> Result<PortTarget, PlantError> {
        let comp = self
            .components_by_id
            .get(&pref.component)
            .copied()
            .ok_or_else(|| PlantError::UnknownComponent {
                id: pref.component.clone(),
                context: "connection endpoint".into(),
            })?;
        let nodes = self.nodes_by_component.get(&pref.component);
        let port = pref.port.as_str();

        match &comp.kind {
            ComponentKind::Pump { .. }
            | ComponentKind::Valve { .. }
            | ComponentKind::CheckValve { .. } => match port {
                "in" | "inlet" => Ok(PortTarget::EdgeIn(comp.id.clone())),
                "out" | "outlet" => Ok(PortTarget::EdgeOut(comp.id.clone())),
                _ => Err(PlantError::UnknownPort {
                    component: pref.component.clone(),
                    port: pref.port.clone(),
                }),
            },
            ComponentKind::Vessel { .. } => {
                let node = match port {
                    "barrel" | "outlet" => nodes.and_then(|n| n.first()).copied(),
                    "annulus" | "inlet" | "downcomer" => nodes.and_then(|n| n.get(1)).copied(),
                    _ => {
                        return Err(PlantError::UnknownPort {
                            component: pref.component.clone(),
                            port: pref.port.clone(),
                        })
                    }
                };
                node.map(PortTarget::Node)
                    .ok_or_else(|| PlantError::UnknownComponent {
                        id: pref.component.clone(),
                        context: "connection endpoint".into(),
                    })
            }
            ComponentKind::HeatExchanger { .. } => {
                let node = match port {
                    "shell" | "shell_in" | "shell_out" => nodes.and_then(|n| n.first()).copied(),
                    "tube" | "tube_in" | "tube_out" => nodes.and_then(|n| n.get(1)).copied(),
                    _ => {
                        return Err(PlantError::UnknownPort {
                            component: pref.component.clone(),
                            port: pref.port.clone(),
                        })
                    }
                };
                node.map(PortTarget::Node)
                    .ok_or_else(|| PlantError::UnknownComponent {
                        id: pref.component.clone(),
                        context: "connection endpoint".into(),
                    })
            }
            ComponentKind::Core { .. } => Err(PlantError::UnknownPort {
                component: pref.component.clone(),
                port: pref.port.clone(),
            }),
            _ => nodes
                .and_then(|n| n.first())
                .copied()
                .map(PortTarget::Node)
                .ok_or_else(|| PlantError::UnknownComponent {
                    id: pref.component.clone(),
                    context: "connection endpoint".into(),
                }),
        }
    }

    fn check_span(&mut self, context: &str, from: NodeId, from_tap: f64, to: NodeId, to_tap: f64, length_m: f64) {
        let (Ok(f), Ok(t)) = (self.net.node(from), self.net.node(to)) else {
            return;
        };
        let dz = (t.elevation_m + to_tap) - (f.elevation_m + from_tap);
        if dz.abs() > length_m + 1.0e-9 {
            self.bad_geometry(
                context,
                format!(
                    "connection length {length_m} m is shorter than the {:.3} m port-to-port rise",
                    dz.abs()
                ),
            );
        }
    }

    fn wire_connections(&mut self) {
        let doc = self.doc;
        for def in &doc.connections {
            let from = match self.resolve_port(&def.from) {
                Ok(t) => t,
                Err(e) => {
                    self.errors.push(e);
                    continue;
                }
            };
            let to = match self.resolve_port(&def.to) {
                Ok(t) => t,
                Err(e) => {
                    self.errors.push(e);
                    continue;
                }
            };

            match (from, to) {
                (PortTarget::Node(a), PortTarget::Node(b)) => {
                    self.check_span(
                        &def.from.component,
                        a,
                        def.from_elevation_m,
                        b,
                        def.to_elevation_m,
                        def.length_m,
                    );
                    let mut conn = FlowConnection::new(
                        NodeId::from_index(0),
                        a,
                        b,
                        def.flow_area_m2,
                        def.resistance_k,
                        def.length_m,
                    );
                    conn.from_elevation_m = def.from_elevation_m;
                    conn.to_elevation_m = def.to_elevation_m;
                    self.net.add_connection(conn);
                }
                (PortTarget::Node(node), PortTarget::EdgeIn(edge)) => {
                    self.attach_edge_half(
                        &edge,
                        "inlet",
                        EdgeHalf {
                            node,
                            tap_elevation_m: def.from_elevation_m,
                            flow_area_m2: def.flow_area_m2,
                            length_m: def.length_m,
                            resistance_k: def.resistance_k,
                        },
                    );
                }
                (PortTarget::EdgeOut(edge), PortTarget::Node(node)) => {
                    self.attach_edge_half(
                        &edge,
                        "outlet",
                        EdgeHalf {
                            node,
                            tap_elevation_m: def.to_elevation_m,
                            flow_area_m2: def.flow_area_m2,
                            length_m: def.length_m,
                            resistance_k: def.resistance_k,
                        },
                    );
                }
                // Backwards orientations are accepted; the device still
                // sees the node on the matching side.
                (PortTarget::EdgeIn(edge), PortTarget::Node(node)) => {
                    self.attach_edge_half(
                        &edge,
                        "inlet",
                        EdgeHalf {
                            node,
                            tap_elevation_m: def.to_elevation_m,
                            flow_area_m2: def.flow_area_m2,
                            length_m: def.length_m,
                            resistance_k: def.resistance_k,
                        },
                    );
                }
                (PortTarget::Node(node), PortTarget::EdgeOut(edge)) => {
                    self.attach_edge_half(
                        &edge,
                        "outlet",
                        EdgeHalf {
                            node,
                            tap_elevation_m: def.from_elevation_m,
                            flow_area_m2: def.flow_area_m2,
                            length_m: def.length_m,
                            resistance_k: def.resistance_k,
                        },
                    );
                }
                _ => {
                    self.errors.push(PlantError::DeviceToDevice {
                        from: def.from.component.clone(),
                        to: def.to.component.clone(),
                    });
                }
            }
        }
    }

    fn attach_edge_half(&mut self, edge_id: &str, side: &'static str, half: EdgeHalf) {
        let Some(parts) = self.edge_parts.get_mut(edge_id) else {
            return;
        };
        let slot = match side {
            "inlet" => &mut parts.inlet,
            _ => &mut parts.outlet,
        };
        if slot.is_some() {
            self.errors.push(PlantError::PortConflict {
                component: edge_id.to_string(),
                port: side.to_string(),
            });
            return;
        }
        *slot = Some(half);
    }

    fn assemble_edges(&mut self) {
        let edge_ids: Vec<String> = self.edge_parts.keys().cloned().collect();
        let mut sorted = edge_ids;
        sorted.sort();
        for edge_id in sorted {
            let comp = match self.components_by_id.get(edge_id.as_str()) {
                Some(c) => *c,
                None => continue,
            };
            let parts = self.edge_parts.remove(&edge_id).unwrap_or_default();
            let (Some(inlet), Some(outlet)) = (parts.inlet, parts.outlet) else {
                let side = if parts.inlet.is_none() { "inlet" } else { "outlet" };
                self.errors.push(PlantError::DeviceNotWired {
                    id: edge_id.clone(),
                    side,
                });
                continue;
            };

            let device_k = match comp.kind {
                ComponentKind::Pump { .. } => K_PUMP_BODY,
                ComponentKind::Valve { .. } => K_VALVE_BODY,
                _ => K_CHECK_VALVE_BODY,
            };
            let length = inlet.length_m + outlet.length_m;
            self.check_span(
                &edge_id,
                inlet.node,
                inlet.tap_elevation_m,
                outlet.node,
                outlet.tap_elevation_m,
                length,
            );
            let mut conn = FlowConnection::new(
                NodeId::from_index(0),
                inlet.node,
                outlet.node,
                inlet.flow_area_m2.min(outlet.flow_area_m2),
                inlet.resistance_k + outlet.resistance_k + device_k,
                length,
            );
            conn.from_elevation_m = inlet.tap_elevation_m;
            conn.to_elevation_m = outlet.tap_elevation_m;
            let conn = self.net.add_connection(conn);

            match &comp.kind {
                ComponentKind::Pump {
                    rated_head_m,
                    rated_flow_kg_s,
                    efficiency,
                    ramp_up_s,
                    coast_down_s,
                } => {
                    let mut pump =
                        PumpState::new(comp.name.clone(), conn, *rated_head_m, *rated_flow_kg_s);
                    pump.efficiency = *efficiency;
                    pump.ramp_up_s = *ramp_up_s;
                    pump.coast_down_s = *coast_down_s;
                    self.net.add_pump(pump);
                }
                ComponentKind::Valve {
                    position,
                    stroke_time_s,
                } => {
                    let mut valve = ValveState::new(comp.name.clone(), conn, *position);
                    valve.stroke_time_s = *stroke_time_s;
                    self.net.add_valve(valve);
                }
                ComponentKind::CheckValve {
                    cracking_pressure_pa,
                } => {
                    self.net.add_check_valve(CheckValveState::new(
                        comp.name.clone(),
                        conn,
                        *cracking_pressure_pa,
                    ));
                }
                _ => {}
            }
        }
    }

    /// Burst records: every rated pressure boundary gets a margin drawn
    /// from the plant seed, plus a per-record seed for break geometry.
    fn register_bursts(&mut self) {
        let doc = self.doc;
        for (idx, comp) in doc.components.iter().enumerate() {
            let mut rng = ChaCha8Rng::seed_from_u64(
                doc.seed
                    .wrapping_add((idx as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            );
            let nodes = match self.nodes_by_component.get(&comp.id) {
                Some(n) if !n.is_empty() => n.clone(),
                _ => continue,
            };

            match &comp.kind {
                ComponentKind::Tank {
                    volume_m3,
                    height_m,
                    design_pressure_pa: Some(rating),
                    ..
                } => {
                    // Nozzle-scale break opening on the tank shell.
                    let area = (0.01 * volume_m3 / height_m).max(1.0e-6);
                    let margin = rng.gen_range(0.0..0.4);
                    let seed = rng.gen();
                    self.net.add_burst(BurstState::with_margin(
                        comp.name.clone(),
                        nodes[0],
                        *rating,
                        margin,
                        seed,
                        area,
                    ));
                }
                ComponentKind::Vessel {
                    inner_radius_m,
                    design_pressure_pa: Some(rating),
                    ..
                } => {
                    let area = (0.01 * PI * inner_radius_m * inner_radius_m).max(1.0e-6);
                    let node = self.primary_node(&comp.id).unwrap_or(nodes[0]);
                    let margin = rng.gen_range(0.0..0.4);
                    let seed = rng.gen();
                    self.net.add_burst(BurstState::with_margin(
                        comp.name.clone(),
                        node,
                        *rating,
                        margin,
                        seed,
                        area,
                    ));
                }
                ComponentKind::Pipe {
                    inner_diameter_m,
                    design_pressure_pa: Some(rating),
                    ..
                } => {
                    let area = (PI * (inner_diameter_m / 2.0).powi(2)).max(1.0e-6);
                    let margin = rng.gen_range(0.0..0.4);
                    let seed = rng.gen();
                    self.net.add_burst(BurstState::with_margin(
                        comp.name.clone(),
                        nodes[0],
                        *rating,
                        margin,
                        seed,
                        area,
                    ));
                }
                ComponentKind::HeatExchanger {
                    shell_volume_m3,
                    shell_height_m,
                    tube_inner_diameter_m,
                    tube_design_pressure_pa,
                    shell_design_pressure_pa,
                    ..
                } => {
                    if nodes.len() < 2 {
                        continue;
                    }
                    let (shell, tube) = (nodes[0], nodes[1]);
                    if let Some(rating) = tube_design_pressure_pa {
                        let area = (PI * (tube_inner_diameter_m / 2.0).powi(2)).max(1.0e-6);
                        let margin = rng.gen_range(0.0..0.4);
                        let seed = rng.gen();
                        self.net.add_burst(
                            BurstState::with_margin(
                                format!("{}:tube", comp.name),
                                tube,
                                *rating,
                                margin,
                                seed,
                                area,
                            )
                            .tube_side(shell),
                        );
                    }
                    if let Some(rating) = shell_design_pressure_pa {
                        let area = (0.01 * shell_volume_m3 / shell_height_m).max(1.0e-6);
                        let margin = rng.gen_range(0.0..0.4);
                        let seed = rng.gen();
                        self.net.add_burst(BurstState::with_margin(
                            format!("{}:shell", comp.name),
                            shell,
                            *rating,
                            margin,
                            seed,
                            area,
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    /// The explicit atmosphere node: a fixed-pressure, effectively
    /// unbounded sink for uncontained break discharge.
    fn create_atmosphere(&mut self) {
        let id = self.net.add_node(FlowNode {
            id: NodeId::from_index(0),
            label: "atmosphere".into(),
            volume_m3: ATMOSPHERE_VOLUME_M3,
            elevation_m: 0.0,
            height_m: 1.0e3,
            container: None,
            is_atmosphere: true,
            mass_kg: ATMOSPHERE_MASS_KG,
            energy_j: ATMOSPHERE_MASS_KG * ATMOSPHERE_U_J_KG,
            t_k: 300.0,
            p_pa: rf_core::units::constants::P_ATM_PA,
            phase: Phase::Vapor,
            quality: 1.0,
        });
        self.net.set_atmosphere(id);
    }
}
