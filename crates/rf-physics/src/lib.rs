//! rf-physics: state-advancing operators for reactorflow.
//!
//! Each operator implements [`PhysicsOperator`]: it advances the cloned
//! simulation snapshot by `dt` and reports its own stability limit. The
//! solver driver applies operators in a fixed order every tick:
//! Neutronics -> FuelHeatConduction -> Convection -> FluidFlow ->
//! TurbineCondenser -> BurstCheck -> FluidStateUpdate.
//!
//! Operators are pure over the snapshot they are given; all
//! observability goes through [`state::EnergyTotals`] and the pending
//! event queue rather than globals.

pub mod burst_check;
pub mod convection;
pub mod error;
pub mod events;
pub mod fluid_flow;
pub mod fuel_heat;
pub mod neutronics;
pub mod operator;
pub mod state;
pub mod state_update;
pub mod turbine_condenser;

pub use burst_check::BurstCheck;
pub use convection::Convection;
pub use error::{PhysicsError, PhysicsResult};
pub use events::SimEvent;
pub use fluid_flow::FluidFlow;
pub use fuel_heat::FuelHeatConduction;
pub use neutronics::{KineticsParams, KineticsState, Neutronics};
pub use operator::PhysicsOperator;
pub use state::{EnergyTotals, SimState};
pub use state_update::FluidStateUpdate;
pub use turbine_condenser::TurbineCondenser;
