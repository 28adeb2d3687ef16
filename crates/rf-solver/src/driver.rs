//! The solver driver: clone, apply, audit, commit.

use std::sync::Arc;

use rf_core::numeric::{ensure_finite, nearly_equal, Tolerances};
use rf_core::timing::Timer;
use rf_physics::{
    BurstCheck, Convection, FluidFlow, FluidStateUpdate, FuelHeatConduction, Neutronics,
    PhysicsOperator, SimEvent, SimState, TurbineCondenser,
};
use rf_steam::{LookupTrace, WaterProperties};
use tracing::{error, warn};

use crate::config::SolverConfig;
use crate::error::{SolverError, SolverResult};
use crate::metrics::{OperatorTiming, SolverMetrics};

/// Result of one committed internal step.
#[derive(Clone, Debug)]
pub struct StepReport {
    pub dt_s: f64,
    pub time_s: f64,
    pub retries: u32,
    pub events: Vec<SimEvent>,
}

/// Result of one cooperative frame (possibly many internal steps).
#[derive(Clone, Debug, Default)]
pub struct FrameReport {
    pub advanced_s: f64,
    pub steps: u32,
    pub events: Vec<SimEvent>,
}

/// Owns the authoritative state and the operator chain.
pub struct Solver {
    state: SimState,
    props: Arc<WaterProperties>,
    operators: Vec<Box<dyn PhysicsOperator>>,
    config: SolverConfig,
    metrics: SolverMetrics,
    paused: bool,
    /// Events raised by commands between steps; merged into the next
    /// report.
    command_events: Vec<SimEvent>,
}

impl Solver {
    /// Build the driver. The operator order is fixed: Neutronics ->
    /// FuelHeatConduction -> Convection -> FluidFlow ->
    /// TurbineCondenser -> BurstCheck -> FluidStateUpdate.
    pub fn new(
        mut state: SimState,
        props: Arc<WaterProperties>,
        config: SolverConfig,
    ) -> SolverResult<Self> {
        let mut fluid_flow = FluidFlow::new(props.clone());
        fluid_flow.flow_ceiling_kg_s = config.flow_ceiling_kg_s;
        let operators: Vec<Box<dyn PhysicsOperator>> = vec![
            Box::new(Neutronics),
            Box::new(FuelHeatConduction),
            Box::new(Convection::new(props.clone())),
            Box::new(fluid_flow),
            Box::new(TurbineCondenser::new(props.clone())),
            Box::new(BurstCheck),
            Box::new(FluidStateUpdate::new(props.clone())),
        ];

        // Derived node states must be valid before the first flow pass.
        FluidStateUpdate::new(props.clone()).apply(&mut state, 0.0)?;
        state
            .network
            .assert_invariants()
            .map_err(rf_physics::PhysicsError::from)?;

        let metrics = SolverMetrics {
            operator_timings: operators
                .iter()
                .map(|op| OperatorTiming {
                    name: op.name(),
                    timer: Default::default(),
                })
                .collect(),
            ..Default::default()
        };

        Ok(Self {
            state,
            props,
            operators,
            config,
            metrics,
            paused: false,
            command_events: Vec::new(),
        })
    }

    // ---- inspect --------------------------------------------------------

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn metrics(&self) -> &SolverMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    // ---- commands -------------------------------------------------------

    fn unit_interval(value: f64, what: &str) -> SolverResult<f64> {
        if !(0.0..=1.0).contains(&value) || !value.is_finite() {
            return Err(SolverError::InvalidCommand {
                what: format!("{what} must be in [0, 1], got {value}"),
            });
        }
        Ok(value)
    }

    pub fn set_pump_speed(&mut self, pump_index: usize, speed: f64) -> SolverResult<()> {
        let speed = Self::unit_interval(speed, "pump speed")?;
        let pumps = self.state.network.pumps_mut();
        let pump = pumps
            .get_mut(pump_index)
            .ok_or_else(|| SolverError::InvalidCommand {
                what: format!("no pump with index {pump_index}"),
            })?;
        pump.commanded_speed = speed;
        pump.running = speed > 0.0;
        Ok(())
    }

    pub fn set_valve_position(&mut self, valve_index: usize, position: f64) -> SolverResult<()> {
        let position = Self::unit_interval(position, "valve position")?;
        let valves = self.state.network.valves_mut();
        let valve = valves
            .get_mut(valve_index)
            .ok_or_else(|| SolverError::InvalidCommand {
                what: format!("no valve with index {valve_index}"),
            })?;
        valve.commanded_position = position;
        Ok(())
    }

    pub fn set_control_rod_insertion(&mut self, insertion: f64) -> SolverResult<()> {
        let insertion = Self::unit_interval(insertion, "rod insertion")?;
        let kin = self
            .state
            .kinetics
            .as_mut()
            .ok_or_else(|| SolverError::InvalidCommand {
                what: "plant has no reactor core".into(),
            })?;
        kin.commanded_insertion = insertion;
        Ok(())
    }

    pub fn manual_scram(&mut self) -> SolverResult<()> {
        let time_s = self.state.time_s;
        let kin = self
            .state
            .kinetics
            .as_mut()
            .ok_or_else(|| SolverError::InvalidCommand {
                what: "plant has no reactor core".into(),
            })?;
        if !kin.scram {
            kin.scram = true;
            kin.scram_time_s = 0.0;
            self.command_events.push(SimEvent::Scram {
                time_s,
                reason: "manual scram".into(),
            });
        }
        Ok(())
    }

    pub fn reset_scram(&mut self) -> SolverResult<()> {
        let kin = self
            .state
            .kinetics
            .as_mut()
            .ok_or_else(|| SolverError::InvalidCommand {
                what: "plant has no reactor core".into(),
            })?;
        kin.scram = false;
        // Hold the rods where they fell; withdrawal is a fresh command.
        kin.commanded_insertion = kin.rod_insertion;
        Ok(())
    }

    // ---- debug ----------------------------------------------------------

    pub fn set_verbose_water_logging(&self, on: bool) {
        self.props.set_verbose(on);
    }

    pub fn dump_lookup_traces(&self) -> Vec<LookupTrace> {
        self.props.take_traces()
    }

    /// Advance exactly one internal dt, ignoring pause.
    pub fn single_step(&mut self) -> SolverResult<StepReport> {
        self.step(f64::INFINITY)
    }

    // ---- the step loop --------------------------------------------------

    /// Stability-limited dt for the next step.
    fn stable_dt(&self, max_dt_s: f64) -> f64 {
        let mut dt = self.config.max_dt_s.min(max_dt_s);
        for op in &self.operators {
            dt = dt.min(op.max_stable_dt(&self.state));
        }
        dt.max(self.config.min_dt_s)
    }

    /// Conservation and finiteness audit over a trial state.
    fn audit(
        &self,
        trial: &SimState,
        mass_before_kg: f64,
        energy_before_j: f64,
    ) -> Result<(f64, f64), String> {
        if let Err(e) = trial.network.assert_invariants() {
            return Err(format!("invariant: {e}"));
        }
        let n_nodes = trial.network.nodes().len().max(1) as f64;

        let mass_after = ensure_finite(trial.audited_mass_kg(), "audited total mass")
            .map_err(|e| e.to_string())?;
        let mass_drift = mass_after - mass_before_kg;
        let mass_tol = Tolerances {
            abs: 1.0e-6,
            rel: self.config.mass_tol_rel * n_nodes,
        };
        if !nearly_equal(mass_after, mass_before_kg, mass_tol) {
            return Err(format!(
                "mass drift {mass_drift} kg exceeds tolerance ({mass_tol:?})"
            ));
        }

        let energy_after = ensure_finite(trial.audited_energy_j(), "audited total energy")
            .map_err(|e| e.to_string())?;
        let energy_drift = energy_after - energy_before_j;
        let energy_tol = Tolerances {
            abs: 1.0,
            rel: self.config.energy_tol_rel,
        };
        if !nearly_equal(energy_after, energy_before_j, energy_tol) {
            return Err(format!(
                "energy drift {energy_drift} J exceeds tolerance ({energy_tol:?})"
            ));
        }

        Ok((mass_drift, energy_drift))
    }

    /// One internal step: pick dt, clone, apply, audit, commit. On audit
    /// failure the clone is discarded, dt is halved, and the step is
    /// retried a bounded number of times.
    pub fn step(&mut self, max_dt_s: f64) -> SolverResult<StepReport> {
        let mut dt = self.stable_dt(max_dt_s);
        let mass_before = self.state.audited_mass_kg();
        let energy_before = self.state.audited_energy_j();

        let mut last_failure = String::new();
        for attempt in 0..=self.config.max_retries {
            let mut trial = self.state.clone();

            let mut failed = None;
            for (i, op) in self.operators.iter().enumerate() {
                let timer = Timer::start();
                let result = op.apply(&mut trial, dt);
                self.metrics.operator_timings[i].timer.record(timer.stop());
                if let Err(e) = result {
                    failed = Some(format!("{}: {e}", op.name()));
                    break;
                }
            }

            let audit_result = match failed {
                Some(msg) => Err(msg),
                None => self.audit(&trial, mass_before, energy_before),
            };

            match audit_result {
                Ok((mass_drift, energy_drift)) => {
                    let mut trial = trial;
                    trial.time_s += dt;
                    let mut events: Vec<SimEvent> = std::mem::take(&mut self.command_events);
                    events.append(&mut trial.events);
                    // Commit: swap snapshots atomically.
                    self.state = trial;

                    self.metrics.steps += 1;
                    self.metrics.last_dt_s = dt;
                    self.metrics.retries_last_step = attempt;
                    self.metrics.total_retries += attempt as u64;
                    self.metrics.mass_drift_kg = mass_drift;
                    self.metrics.energy_drift_j = energy_drift;
                    self.metrics.totals = self.state.totals.clone();

                    return Ok(StepReport {
                        dt_s: dt,
                        time_s: self.state.time_s,
                        retries: attempt,
                        events,
                    });
                }
                Err(msg) => {
                    warn!(dt_s = dt, attempt, failure = %msg, "step rejected; halving dt");
                    last_failure = msg;
                    dt *= 0.5;
                }
            }
        }

        error!(failure = %last_failure, "step failed after retries");
        Err(SolverError::RetriesExhausted {
            retries: self.config.max_retries,
            dt_s: dt,
            last_failure,
        })
    }

    /// Cooperative frame: advance simulation time by `wall_frame_s`
    /// scaled by the configured simulation speed, within the wall-clock
    /// budget. Honors the paused flag between steps; a long step is
    /// never preempted mid-operator.
    pub fn run_frame(&mut self, wall_frame_s: f64) -> SolverResult<FrameReport> {
        let sim_target_s = wall_frame_s * self.config.speed;
        let mut report = FrameReport::default();
        if self.paused {
            return Ok(report);
        }
        let wall = Timer::start();
        while report.advanced_s < sim_target_s {
            if self.paused {
                break;
            }
            if wall.elapsed_s() > self.config.frame_budget_s {
                report.events.push(SimEvent::FallingBehindRealTime {
                    sim_dt_s: sim_target_s - report.advanced_s,
                    wall_dt_s: wall.elapsed_s(),
                });
                break;
            }
            let step = self.step(sim_target_s - report.advanced_s)?;
            report.advanced_s += step.dt_s;
            report.steps += 1;
            report.events.extend(step.events);
        }
        Ok(report)
    }
}
