// Use cases layer: the replicated store, simulation node and world loop.

pub mod game;
pub mod node;
pub mod snapshot;
pub mod store;
pub mod templates;
pub mod types;
pub mod view;
pub mod warp;

#[cfg(test)]
pub(crate) mod test_support;

pub use node::SimulationNode;
pub use store::{ApplyOutcome, SpatialStore};
pub use types::{NodeEvent, ReplicationBatch};
pub use view::{ClientView, RenderedEntity};
