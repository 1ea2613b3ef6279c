// Component records carried by networked entities, plus the partial deltas replicated between
// nodes. Spatial values are in wire units.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Position,
    TransformInfo,
    OrbitInfo,
    PlanetIndex,
    EntityType,
    ShipControls,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Position => "Position",
            ComponentKind::TransformInfo => "TransformInfo",
            ComponentKind::OrbitInfo => "OrbitInfo",
            ComponentKind::PlanetIndex => "PlanetIndex",
            ComponentKind::EntityType => "EntityType",
            ComponentKind::ShipControls => "ShipControls",
        };
        f.write_str(name)
    }
}

/// Coarse position every spatial entity carries next to its full transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coords: DVec3,
}

/// Full spatial state of an entity, in wire units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformInfo {
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for TransformInfo {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

/// Circular orbit parameters. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitInfo {
    /// Degrees.
    pub initial_angle: f64,
    /// Wire units.
    pub orbit_radius: f64,
    /// Days.
    pub orbit_period: f64,
    /// Days.
    pub rotation_period: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    PlayerCreator,
    Planet,
    Asteroid,
    PlayerShip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarpTarget {
    ReturnToStart,
    Body(u32),
}

/// Discrete warp request, stamped so late query results can be recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarpCommand {
    pub sequence: u64,
    pub target: WarpTarget,
}

/// Input component written only by the client controlling the ship.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShipControls {
    pub target_speed: f32,
    pub target_steering: f32,
    pub warp_speed: u32,
    pub warp: Option<WarpCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ComponentValue {
    Position(Position),
    TransformInfo(TransformInfo),
    OrbitInfo(OrbitInfo),
    PlanetIndex(u32),
    EntityType(EntityType),
    ShipControls(ShipControls),
}

impl ComponentValue {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentValue::Position(_) => ComponentKind::Position,
            ComponentValue::TransformInfo(_) => ComponentKind::TransformInfo,
            ComponentValue::OrbitInfo(_) => ComponentKind::OrbitInfo,
            ComponentValue::PlanetIndex(_) => ComponentKind::PlanetIndex,
            ComponentValue::EntityType(_) => ComponentKind::EntityType,
            ComponentValue::ShipControls(_) => ComponentKind::ShipControls,
        }
    }

    /// Delta that turns `prev` into `self`; `None` when nothing changed.
    pub fn diff(&self, prev: Option<&ComponentValue>) -> Option<ComponentDelta> {
        match (self, prev) {
            (ComponentValue::TransformInfo(next), Some(ComponentValue::TransformInfo(prev))) => {
                TransformDelta::between(prev, next).map(ComponentDelta::TransformInfo)
            }
            (ComponentValue::ShipControls(next), Some(ComponentValue::ShipControls(prev))) => {
                ShipControlsDelta::between(prev, next).map(ComponentDelta::ShipControls)
            }
            (next, Some(prev)) if next == prev => None,
            (next, _) => Some(ComponentDelta::full(*next)),
        }
    }
}

/// Transform change with independently optional fields.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<DVec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<DQuat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<DVec3>,
}

impl TransformDelta {
    pub fn between(prev: &TransformInfo, next: &TransformInfo) -> Option<Self> {
        let delta = Self {
            position: (prev.position != next.position).then_some(next.position),
            rotation: (prev.rotation != next.rotation).then_some(next.rotation),
            scale: (prev.scale != next.scale).then_some(next.scale),
        };
        (!delta.is_empty()).then_some(delta)
    }

    pub fn full(value: &TransformInfo) -> Self {
        Self {
            position: Some(value.position),
            rotation: Some(value.rotation),
            scale: Some(value.scale),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.rotation.is_none() && self.scale.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.position.is_some() && self.rotation.is_some() && self.scale.is_some()
    }

    pub fn apply_to(&self, target: &mut TransformInfo) {
        if let Some(position) = self.position {
            target.position = position;
        }
        if let Some(rotation) = self.rotation {
            target.rotation = rotation;
        }
        if let Some(scale) = self.scale {
            target.scale = scale;
        }
    }

    pub fn merge(&mut self, later: &TransformDelta) {
        self.position = later.position.or(self.position);
        self.rotation = later.rotation.or(self.rotation);
        self.scale = later.scale.or(self.scale);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShipControlsDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_steering: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warp_speed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warp: Option<WarpCommand>,
}

impl ShipControlsDelta {
    pub fn between(prev: &ShipControls, next: &ShipControls) -> Option<Self> {
        let delta = Self {
            target_speed: (prev.target_speed != next.target_speed).then_some(next.target_speed),
            target_steering: (prev.target_steering != next.target_steering)
                .then_some(next.target_steering),
            warp_speed: (prev.warp_speed != next.warp_speed).then_some(next.warp_speed),
            warp: if prev.warp != next.warp { next.warp } else { None },
        };
        (!delta.is_empty()).then_some(delta)
    }

    pub fn full(value: &ShipControls) -> Self {
        Self {
            target_speed: Some(value.target_speed),
            target_steering: Some(value.target_steering),
            warp_speed: Some(value.warp_speed),
            warp: value.warp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.target_speed.is_none()
            && self.target_steering.is_none()
            && self.warp_speed.is_none()
            && self.warp.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.target_speed.is_some() && self.target_steering.is_some() && self.warp_speed.is_some()
    }

    pub fn apply_to(&self, target: &mut ShipControls) {
        if let Some(speed) = self.target_speed {
            target.target_speed = speed;
        }
        if let Some(steering) = self.target_steering {
            target.target_steering = steering;
        }
        if let Some(warp_speed) = self.warp_speed {
            target.warp_speed = warp_speed;
        }
        if let Some(warp) = self.warp {
            target.warp = Some(warp);
        }
    }

    pub fn merge(&mut self, later: &ShipControlsDelta) {
        self.target_speed = later.target_speed.or(self.target_speed);
        self.target_steering = later.target_steering.or(self.target_steering);
        self.warp_speed = later.warp_speed.or(self.warp_speed);
        self.warp = later.warp.or(self.warp);
    }
}

/// What actually travels over the replication channel for one component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ComponentDelta {
    Position(Position),
    TransformInfo(TransformDelta),
    OrbitInfo(OrbitInfo),
    PlanetIndex(u32),
    EntityType(EntityType),
    ShipControls(ShipControlsDelta),
}

impl ComponentDelta {
    pub fn full(value: ComponentValue) -> Self {
        match value {
            ComponentValue::Position(p) => ComponentDelta::Position(p),
            ComponentValue::TransformInfo(t) => ComponentDelta::TransformInfo(TransformDelta::full(&t)),
            ComponentValue::OrbitInfo(o) => ComponentDelta::OrbitInfo(o),
            ComponentValue::PlanetIndex(i) => ComponentDelta::PlanetIndex(i),
            ComponentValue::EntityType(t) => ComponentDelta::EntityType(t),
            ComponentValue::ShipControls(c) => {
                ComponentDelta::ShipControls(ShipControlsDelta::full(&c))
            }
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentDelta::Position(_) => ComponentKind::Position,
            ComponentDelta::TransformInfo(_) => ComponentKind::TransformInfo,
            ComponentDelta::OrbitInfo(_) => ComponentKind::OrbitInfo,
            ComponentDelta::PlanetIndex(_) => ComponentKind::PlanetIndex,
            ComponentDelta::EntityType(_) => ComponentKind::EntityType,
            ComponentDelta::ShipControls(_) => ComponentKind::ShipControls,
        }
    }

    /// True when the delta alone fully describes the component.
    pub fn is_complete(&self) -> bool {
        match self {
            ComponentDelta::TransformInfo(d) => d.is_complete(),
            ComponentDelta::ShipControls(d) => d.is_complete(),
            _ => true,
        }
    }

    /// Folds a later delta of the same kind into this one; later fields win.
    pub fn merge(&mut self, later: &ComponentDelta) {
        match (self, later) {
            (ComponentDelta::TransformInfo(a), ComponentDelta::TransformInfo(b)) => a.merge(b),
            (ComponentDelta::ShipControls(a), ComponentDelta::ShipControls(b)) => a.merge(b),
            (this, later) => *this = *later,
        }
    }

    /// Applies the delta to an existing value. Kinds must match; a mismatch replaces the value.
    pub fn apply_to(&self, target: &mut ComponentValue) {
        match (self, target) {
            (ComponentDelta::TransformInfo(d), ComponentValue::TransformInfo(t)) => d.apply_to(t),
            (ComponentDelta::ShipControls(d), ComponentValue::ShipControls(c)) => d.apply_to(c),
            (delta, target) => *target = delta.to_value(),
        }
    }

    /// Builds a value from the delta, filling missing fields with defaults.
    pub fn to_value(&self) -> ComponentValue {
        match self {
            ComponentDelta::Position(p) => ComponentValue::Position(*p),
            ComponentDelta::TransformInfo(d) => {
                let mut value = TransformInfo::default();
                d.apply_to(&mut value);
                ComponentValue::TransformInfo(value)
            }
            ComponentDelta::OrbitInfo(o) => ComponentValue::OrbitInfo(*o),
            ComponentDelta::PlanetIndex(i) => ComponentValue::PlanetIndex(*i),
            ComponentDelta::EntityType(t) => ComponentValue::EntityType(*t),
            ComponentDelta::ShipControls(d) => {
                let mut value = ShipControls::default();
                d.apply_to(&mut value);
                ComponentValue::ShipControls(value)
            }
        }
    }
}

/// One replicated component change for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplicationMessage {
    pub entity: EntityId,
    pub delta: ComponentDelta,
}
