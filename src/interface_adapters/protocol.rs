// Wire protocol DTOs and conversions for the public WebSocket surface.

use crate::domain::time::TimeCommand;
use crate::domain::{EntityId, ReplicationMessage, WarpTarget};
use crate::use_cases::ReplicationBatch;
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // The ship entity this connection controls, sent once after Join.
    Identity { entity_id: EntityId },
    // Every known component, sent after Identity and again after lag recovery.
    Snapshot(SnapshotDto),
    // One tick of coalesced deltas.
    Replication(ReplicationDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    Join(JoinPayload),
    Controls(ControlsDto),
    Warp(WarpPayload),
    TimeControl(TimeCommandDto),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub display_name: String,
}

/// Raw ship input; values are sanitized before they reach the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControlsDto {
    #[serde(default)]
    pub target_speed: f32,
    #[serde(default)]
    pub target_steering: f32,
    #[serde(default)]
    pub warp_speed: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WarpPayload {
    pub target: WarpTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeCommandDto {
    Pause,
    Resume,
    Faster,
    Slower,
    Reset,
}

impl From<TimeCommandDto> for TimeCommand {
    fn from(command: TimeCommandDto) -> Self {
        match command {
            TimeCommandDto::Pause => TimeCommand::Pause,
            TimeCommandDto::Resume => TimeCommand::Resume,
            TimeCommandDto::Faster => TimeCommand::Faster,
            TimeCommandDto::Slower => TimeCommand::Slower,
            TimeCommandDto::Reset => TimeCommand::Reset,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDto {
    pub messages: Vec<ReplicationMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationDto {
    pub tick: u64,
    pub messages: Vec<ReplicationMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub despawned: Vec<EntityId>,
}

impl From<ReplicationBatch> for ReplicationDto {
    fn from(batch: ReplicationBatch) -> Self {
        Self {
            tick: batch.tick,
            messages: batch.messages,
            despawned: batch.despawned,
        }
    }
}

impl From<ReplicationDto> for ReplicationBatch {
    fn from(dto: ReplicationDto) -> Self {
        Self {
            tick: dto.tick,
            messages: dto.messages,
            despawned: dto.despawned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::components::{ComponentDelta, TransformDelta};
    use glam::DVec3;

    #[test]
    fn when_client_sends_controls_then_missing_fields_default_to_zero() {
        let parsed: ClientMessage =
            serde_json::from_str(r#"{"type":"Controls","data":{"target_speed":0.5}}"#)
                .expect("valid json");

        let ClientMessage::Controls(controls) = parsed else {
            panic!("expected controls");
        };
        assert_eq!(controls.target_speed, 0.5);
        assert_eq!(controls.target_steering, 0.0);
        assert_eq!(controls.warp_speed, 0);
    }

    #[test]
    fn when_client_warps_to_a_body_then_target_carries_the_index() {
        let parsed: ClientMessage =
            serde_json::from_str(r#"{"type":"Warp","data":{"target":{"Body":4}}}"#)
                .expect("valid json");

        assert!(matches!(
            parsed,
            ClientMessage::Warp(WarpPayload {
                target: WarpTarget::Body(4)
            })
        ));
    }

    #[test]
    fn when_partial_delta_is_serialized_then_absent_fields_are_omitted() {
        let message = ServerMessage::Replication(ReplicationDto {
            tick: 7,
            messages: vec![ReplicationMessage {
                entity: EntityId(1),
                delta: ComponentDelta::TransformInfo(TransformDelta {
                    position: Some(DVec3::X),
                    rotation: None,
                    scale: None,
                }),
            }],
            despawned: Vec::new(),
        });

        let json = serde_json::to_string(&message).expect("serializable");

        assert!(json.contains(r#""type":"Replication""#));
        assert!(json.contains("position"));
        assert!(!json.contains("rotation"));
        assert!(!json.contains("despawned"));
    }
}
