//! Compiler integration tests: documents in, networks out.

use std::sync::Arc;

use rf_plant::{build_network, PlantDoc, PlantError};
use rf_steam::{SteamTableStore, WaterProperties};

fn props() -> Arc<WaterProperties> {
    Arc::new(WaterProperties::new(Arc::new(
        SteamTableStore::builtin().unwrap(),
    )))
}

const TWO_TANKS_WITH_VALVE: &str = r#"
version: 1
name: two tanks
seed: 42
components:
  - id: tank-a
    name: Tank A
    elevation_m: 0.0
    kind:
      type: Tank
      volume_m3: 10.0
      height_m: 2.5
      design_pressure_pa: 2.0e6
      initial:
        pressure_pa: 5.0e5
        fill_fraction: 0.6
  - id: tank-b
    name: Tank B
    elevation_m: 0.0
    kind:
      type: Tank
      volume_m3: 10.0
      height_m: 2.5
      initial:
        pressure_pa: 1.0e5
        fill_fraction: 0.4
  - id: drain-valve
    name: Drain Valve
    kind:
      type: Valve
      position: 1.0
connections:
  - from: { component: tank-a, port: bottom }
    to: { component: drain-valve, port: in }
    from_elevation_m: 0.1
    flow_area_m2: 0.01
    length_m: 2.0
  - from: { component: drain-valve, port: out }
    to: { component: tank-b, port: bottom }
    to_elevation_m: 0.1
    flow_area_m2: 0.01
    length_m: 2.0
"#;

#[test]
fn two_tank_document_compiles() {
    let doc = PlantDoc::from_yaml_str(TWO_TANKS_WITH_VALVE).unwrap();
    let plant = build_network(&doc, props()).unwrap();
    let net = &plant.state.network;

    // Two tanks plus the explicit atmosphere node.
    assert_eq!(net.nodes().len(), 3);
    assert!(net.atmosphere().is_some());
    let atm = net.node(net.atmosphere().unwrap()).unwrap();
    assert!(atm.is_atmosphere);

    // The two half-connections through the valve merged into one.
    assert_eq!(net.connections().len(), 1);
    let conn = &net.connections()[0];
    assert_eq!(conn.length_m, 4.0);
    assert!(conn.valve.is_some());
    assert_eq!(net.valves().len(), 1);

    // Initial inventories came from the water-property service.
    let a = net.node_by_label("Tank A").unwrap();
    assert!(a.mass_kg > 5000.0, "mass {}", a.mass_kg);
    assert!(a.t_k > 400.0, "t {}", a.t_k);
    let b = net.node_by_label("Tank B").unwrap();
    assert!(b.mass_kg > 3000.0);

    // The rated tank got a burst record with a seeded margin.
    assert_eq!(net.bursts().len(), 1);
    let burst = &net.bursts()[0];
    assert!(burst.margin >= 0.0 && burst.margin < 0.4);
    assert_eq!(
        burst.burst_pressure_pa,
        2.0e6 * (1.0 + burst.margin)
    );
}

#[test]
fn burst_margins_are_deterministic_in_the_seed() {
    let doc = PlantDoc::from_yaml_str(TWO_TANKS_WITH_VALVE).unwrap();
    let m1 = build_network(&doc, props()).unwrap().state.network.bursts()[0].margin;
    let m2 = build_network(&doc, props()).unwrap().state.network.bursts()[0].margin;
    assert_eq!(m1, m2);

    let mut other = doc.clone();
    other.seed = 43;
    let m3 = build_network(&other, props()).unwrap().state.network.bursts()[0].margin;
    assert_ne!(m1, m3);
}

const VESSEL_WITH_CORE: &str = r#"
version: 1
name: reactor vessel
seed: 7
components:
  - id: rpv
    name: RPV
    elevation_m: 1.0
    kind:
      type: Vessel
      inner_radius_m: 2.0
      inner_height_m: 10.0
      barrel_inner_radius_m: 1.2
      barrel_wall_thickness_m: 0.05
      top_gap_m: 0.5
      bottom_gap_m: 0.5
      design_pressure_pa: 1.7e7
      initial:
        pressure_pa: 1.55e7
        temperature_k: 565.0
  - id: core
    name: Core
    contained_by: rpv
    kind:
      type: Core
      rod_count: 20000
      rod_diameter_m: 0.0095
      rod_height_m: 3.7
      rated_power_w: 1.0e9
"#;

#[test]
fn vessel_decomposes_into_barrel_and_annulus() {
    let doc = PlantDoc::from_yaml_str(VESSEL_WITH_CORE).unwrap();
    let plant = build_network(&doc, props()).unwrap();
    let net = &plant.state.network;

    let nodes = &plant.nodes_by_component["rpv"];
    assert_eq!(nodes.len(), 2);
    let barrel = net.node(nodes[0]).unwrap();
    let annulus = net.node(nodes[1]).unwrap();
    assert!(barrel.label.ends_with("barrel"));
    assert!(annulus.label.ends_with("annulus"));

    // Barrel interior: pi r^2 * (h - gaps) minus the rod bundle.
    let brh = 10.0 - 1.0;
    let bundle = 20000.0 * std::f64::consts::PI * (0.0095f64 / 2.0).powi(2) * 3.7;
    let v_barrel = std::f64::consts::PI * 1.2 * 1.2 * brh - bundle;
    assert!((barrel.volume_m3 - v_barrel).abs() < 1.0e-9);

    // Wall thickness consumes annulus space, not barrel interior.
    let v_annulus = std::f64::consts::PI * (2.0 * 2.0 * 10.0 - 1.25 * 1.25 * brh);
    assert!((annulus.volume_m3 - v_annulus).abs() < 1.0e-9);

    // Internal gap connections at top and bottom, derated by the bundle.
    assert_eq!(net.connections().len(), 2);
    let gap_area = std::f64::consts::PI * 1.2 * 1.2
        - 20000.0 * std::f64::consts::PI * (0.0095f64 / 2.0).powi(2);
    for conn in net.connections() {
        assert!((conn.flow_area_m2 - gap_area).abs() < 1.0e-9);
    }

    // Fuel and cladding thermal masses, wired fuel -> clad -> coolant.
    assert_eq!(net.thermals().len(), 2);
    let fuel = net.thermals().iter().find(|t| t.label.ends_with("fuel")).unwrap();
    let clad = net
        .thermals()
        .iter()
        .find(|t| t.label.ends_with("cladding"))
        .unwrap();
    assert_eq!(fuel.power_fraction, 1.0);
    assert!(fuel.conduct_to.is_some());
    assert_eq!(clad.convects_to, Some(nodes[0]));

    // Point kinetics attached at full power.
    let kin = plant.state.kinetics.as_ref().unwrap();
    assert_eq!(kin.params.rated_power_w, 1.0e9);
    assert!((kin.power - 1.0).abs() < 1.0e-12);
}

#[test]
fn oversized_core_is_rejected() {
    let yaml = VESSEL_WITH_CORE.replace("rod_count: 20000", "rod_count: 4000000");
    let doc = PlantDoc::from_yaml_str(&yaml).unwrap();
    let errors = build_network(&doc, props()).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, PlantError::BadGeometry { .. })));
}

#[test]
fn unknown_port_is_reported() {
    let yaml = TWO_TANKS_WITH_VALVE.replace("port: in }", "port: sideways }");
    let doc = PlantDoc::from_yaml_str(&yaml).unwrap();
    let errors = build_network(&doc, props()).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, PlantError::UnknownPort { .. })));
}

#[test]
fn unwired_device_is_reported() {
    let yaml = r#"
version: 1
name: dangling pump
components:
  - id: t1
    name: Tank
    kind:
      type: Tank
      volume_m3: 5.0
      height_m: 2.0
  - id: p1
    name: Pump
    kind:
      type: Pump
      rated_head_m: 50.0
      rated_flow_kg_s: 100.0
connections:
  - from: { component: t1, port: bottom }
    to: { component: p1, port: in }
    flow_area_m2: 0.01
    length_m: 1.0
"#;
    let doc = PlantDoc::from_yaml_str(yaml).unwrap();
    let errors = build_network(&doc, props()).unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        PlantError::DeviceNotWired { side: "outlet", .. }
    )));
}

#[test]
fn too_short_connection_is_reported() {
    let yaml = r#"
version: 1
name: short hop
components:
  - id: low
    name: Low Tank
    elevation_m: 0.0
    kind:
      type: Tank
      volume_m3: 5.0
      height_m: 2.0
  - id: high
    name: High Tank
    elevation_m: 20.0
    kind:
      type: Tank
      volume_m3: 5.0
      height_m: 2.0
connections:
  - from: { component: low, port: top }
    to: { component: high, port: bottom }
    flow_area_m2: 0.01
    length_m: 3.0
"#;
    let doc = PlantDoc::from_yaml_str(yaml).unwrap();
    let errors = build_network(&doc, props()).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, PlantError::BadGeometry { .. })));
}

#[test]
fn containment_assigns_container_node() {
    let yaml = r#"
version: 1
name: contained pipe
components:
  - id: building
    name: Containment
    kind:
      type: Tank
      volume_m3: 50000.0
      height_m: 40.0
      initial:
        pressure_pa: 1.0e5
        fill_fraction: 0.0
  - id: hot-leg
    name: Hot Leg
    contained_by: building
    kind:
      type: Pipe
      inner_diameter_m: 0.7
      length_m: 8.0
      design_pressure_pa: 1.7e7
      initial:
        pressure_pa: 1.55e7
        temperature_k: 565.0
"#;
    let doc = PlantDoc::from_yaml_str(yaml).unwrap();
    let plant = build_network(&doc, props()).unwrap();
    let net = &plant.state.network;
    let pipe = net.node_by_label("Hot Leg").unwrap();
    let building = net.node_by_label("Containment").unwrap();
    assert_eq!(pipe.container, Some(building.id));
}

#[test]
fn heat_exchanger_gets_two_sides_and_a_tube_burst_record() {
    let yaml = r#"
version: 1
name: steam generator
components:
  - id: sg
    name: SG
    kind:
      type: HeatExchanger
      shell_volume_m3: 80.0
      shell_height_m: 12.0
      tube_count: 3000
      tube_inner_diameter_m: 0.017
      tube_length_m: 18.0
      tube_design_pressure_pa: 1.2e7
      initial_shell:
        pressure_pa: 6.0e6
        fill_fraction: 0.7
      initial_tube:
        pressure_pa: 1.55e7
        temperature_k: 570.0
"#;
    let doc = PlantDoc::from_yaml_str(yaml).unwrap();
    let plant = build_network(&doc, props()).unwrap();
    let net = &plant.state.network;

    let nodes = &plant.nodes_by_component["sg"];
    assert_eq!(nodes.len(), 2);
    assert_eq!(net.heat_exchangers().len(), 1);
    let hx = &net.heat_exchangers()[0];
    assert_eq!(hx.shell, nodes[0]);
    assert_eq!(hx.tube, nodes[1]);
    assert!(hx.ua_w_k > 1.0e6);

    assert_eq!(net.bursts().len(), 1);
    let burst = &net.bursts()[0];
    assert!(burst.is_tube_side);
    assert_eq!(burst.shell_node, Some(nodes[0]));
}

#[test]
fn duplicate_ids_are_rejected() {
    let yaml = r#"
version: 1
name: duplicates
components:
  - id: t1
    name: Tank
    kind:
      type: Tank
      volume_m3: 5.0
      height_m: 2.0
  - id: t1
    name: Tank Again
    kind:
      type: Tank
      volume_m3: 5.0
      height_m: 2.0
"#;
    let doc = PlantDoc::from_yaml_str(yaml).unwrap();
    let errors = build_network(&doc, props()).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, PlantError::DuplicateId { .. })));
}
