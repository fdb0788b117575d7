//! The managed project: filesystem confinement and lifecycle state.

mod sandbox;
pub mod state;

pub use sandbox::ProjectContext;
pub use state::{Mode, ProjectStateManager, Stage, StateRecord};
