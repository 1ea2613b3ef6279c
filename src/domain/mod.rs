// Domain layer: core simulation types and rules.

pub mod components;
pub mod errors;
pub mod floating_origin;
pub mod orbit;
pub mod planets;
pub mod ports;
pub mod scales;
pub mod ship;
pub mod time;
pub mod tuning;

pub use components::{
    ComponentDelta, ComponentKind, ComponentValue, EntityId, EntityType, OrbitInfo, Position,
    ReplicationMessage, ShipControls, ShipControlsDelta, TransformDelta, TransformInfo,
    WarpCommand, WarpTarget,
};
pub use errors::SimError;
pub use ports::{AuthorityAssignment, EntityQuery, NodeId, QueryHit};
pub use tuning::SimulationConfig;
