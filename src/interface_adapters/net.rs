use crate::domain::{ComponentKind, EntityId, NodeId};
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{
    ClientMessage, ControlsDto, ReplicationDto, ServerMessage, SnapshotDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::conn_id;
use crate::use_cases::templates::player_ship;
use crate::use_cases::{ClientView, NodeEvent, ReplicationBatch};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    SnapshotUnavailable,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_DISPLAY_NAME_LEN: usize = 64;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

// Components the simulating node owns on a player ship; controls stay with the client.
const SIMULATED_SHIP_KINDS: [ComponentKind; 3] = [
    ComponentKind::TransformInfo,
    ComponentKind::Position,
    ComponentKind::EntityType,
];

pub async fn replication_serializer(
    mut world_rx: broadcast::Receiver<ReplicationBatch>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
) {
    // Serialize each batch once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(batch) => {
                let msg = ServerMessage::Replication(ReplicationDto::from(batch));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize replication batch");
                        continue;
                    }
                };
                let _ = world_bytes_tx.send(Utf8Bytes::from(txt));
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // Every client sees the gap and resyncs from a snapshot.
                warn!(missed = n, "replication serializer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("replication channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if state.input_tx.is_closed() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "simulation stopped");
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Connection id for correlating logs before a ship exists.
    let conn_id = conn_id();
    let span = info_span!("conn", conn_id, entity = tracing::field::Empty);
    serve_connection(socket, state, conn_id, span.clone())
        .instrument(span)
        .await;
}

async fn serve_connection(
    mut socket: WebSocket,
    state: Arc<AppState>,
    conn_id: u64,
    span: tracing::Span,
) {
    let mut ctx = match bootstrap_connection(&mut socket, &state, conn_id).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = send_close_with_reason(&mut socket, close_code::POLICY, "bootstrap failed")
                .await;
            return;
        }
    };

    span.record("entity", ctx.ship.0);
    info!(
        entity = %ctx.ship,
        node = %ctx.client_node,
        display_name = %ctx.display_name,
        "client connected"
    );

    if let Err(e) = run_client_loop(&mut socket, &mut ctx, &state).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

struct ConnCtx {
    pub ship: EntityId,
    pub client_node: NodeId,
    pub display_name: String,
    // Client-side node: authors this ship's controls under the client's authority.
    pub view: ClientView,
    pub input_tx: mpsc::Sender<NodeEvent>,
    pub world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    // Count snapshot resyncs sent after falling behind the batch stream.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_world_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    display_name: String,
    bytes_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    conn_id: u64,
) -> Result<ConnCtx, NetError> {
    // Subscribe before any await so no batch falls between the snapshot and the stream.
    let world_bytes_rx = state.world_bytes_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // Split authority: the client writes controls, the simulating node writes the transform.
    let ship = state.entity_ids.next();
    let client_node = NodeId::new(format!("client-{conn_id}"));
    state
        .authority
        .grant(ship, ComponentKind::ShipControls, &client_node);
    state
        .authority
        .grant_all(ship, &SIMULATED_SHIP_KINDS, &state.sim_node);

    // Spawn before the snapshot request so the snapshot already holds the ship.
    let spawned = async {
        state
            .input_tx
            .send(NodeEvent::Spawn {
                entity: ship,
                components: player_ship(&state.config.spawn),
            })
            .await
            .map_err(|_| NetError::InputClosed)?;
        state
            .input_tx
            .send(NodeEvent::AuthorityGranted {
                entity: ship,
                kind: ComponentKind::TransformInfo,
            })
            .await
            .map_err(|_| NetError::InputClosed)?;

        send_message(socket, &ServerMessage::Identity { entity_id: ship }).await?;
        let snapshot = request_snapshot(&state.input_tx).await?;
        send_message(socket, &snapshot).await
    }
    .await;

    let bytes_out = match spawned {
        Ok(bytes) => bytes as u64,
        Err(err) => {
            // Compensate so a half-joined ship does not linger in the world.
            release_ship(state, ship).await;
            return Err(err);
        }
    };

    let authority = Arc::new(state.authority.view_for(client_node.clone()));
    let mut view = ClientView::new(authority, state.config.floating_origin_threshold);
    view.attach(ship);

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        ship,
        client_node,
        display_name: join.display_name,
        view,
        input_tx: state.input_tx.clone(),
        world_bytes_rx,
        lag_recovery_count: 0,

        msgs_in: 1,
        msgs_out: 2,
        bytes_in: join.bytes_in,
        bytes_out,

        invalid_json: 0,

        last_world_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                let display_name: String = payload
                    .display_name
                    .trim()
                    .chars()
                    .take(MAX_DISPLAY_NAME_LEN)
                    .collect();
                return Ok(JoinHandshake {
                    display_name,
                    bytes_in,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

async fn request_snapshot(input_tx: &mpsc::Sender<NodeEvent>) -> Result<ServerMessage, NetError> {
    let (reply, response) = oneshot::channel();
    input_tx
        .send(NodeEvent::Snapshot { reply })
        .await
        .map_err(|_| NetError::InputClosed)?;
    let messages = timeout(SNAPSHOT_TIMEOUT, response)
        .await
        .map_err(|_| NetError::SnapshotUnavailable)?
        .map_err(|_| NetError::SnapshotUnavailable)?;
    Ok(ServerMessage::Snapshot(SnapshotDto { messages }))
}

// Revokes every assignment on the ship and removes it from the world.
async fn release_ship(state: &AppState, ship: EntityId) {
    for (kind, _) in state.authority.revoke_entity(ship) {
        let _ = state
            .input_tx
            .send(NodeEvent::AuthorityRevoked { entity: ship, kind })
            .await;
    }
    let _ = state
        .input_tx
        .send(NodeEvent::Despawn { entity: ship })
        .await;
}

enum LoopControl {
    Continue,
    Disconnect,
}

enum Inbound {
    Socket(Option<Result<Message, Error>>),
    World(Result<Utf8Bytes, broadcast::error::RecvError>),
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn sanitize_controls(mut controls: ControlsDto) -> Option<ControlsDto> {
    if !controls.target_speed.is_finite() || !controls.target_steering.is_finite() {
        return None;
    }

    controls.target_speed = controls.target_speed.clamp(-1.0, 1.0);
    controls.target_steering = controls.target_steering.clamp(-1.0, 1.0);

    Some(controls)
}

async fn run_client_loop(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    state: &AppState,
) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        let inbound = tokio::select! {
            incoming = socket.recv() => Inbound::Socket(incoming),
            world = ctx.world_bytes_rx.recv() => Inbound::World(world),
        };

        let control = match inbound {
            Inbound::Socket(incoming) => handle_incoming_ws(incoming, ctx).await,
            Inbound::World(Ok(bytes)) => Ok(forward_world_bytes(bytes, socket, ctx).await),
            Inbound::World(Err(broadcast::error::RecvError::Lagged(n))) => {
                if should_log(&mut ctx.last_world_lag_log) {
                    warn!(missed = n, "replication lagged; sending snapshot");
                }
                // Missed deltas cannot be replayed; resync from full state instead.
                ctx.lag_recovery_count += 1;
                match request_snapshot(&ctx.input_tx).await {
                    Ok(snapshot) => Ok(forward_message(&snapshot, socket, ctx).await),
                    Err(e) => Err(e),
                }
            }
            Inbound::World(Err(broadcast::error::RecvError::Closed)) => {
                Err(NetError::WorldUpdatesClosed)
            }
        };

        let disconnect = match control {
            Ok(LoopControl::Continue) => false,
            Ok(LoopControl::Disconnect) => true,
            Err(e) => {
                fatal = Some(e);
                true
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    disconnect_cleanup(ctx, state).await;

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let ship = ctx.ship;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Ignore repeated Join packets after bootstrap to keep the session stable.
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(%ship, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Controls(controls)) => {
                        let Some(controls) = sanitize_controls(controls) else {
                            if should_log(&mut ctx.last_invalid_input_log) {
                                warn!(%ship, "invalid control values (NaN/inf); dropping");
                            }
                            return Ok(LoopControl::Continue);
                        };
                        if let Err(err) = ctx.view.set_controls(
                            controls.target_speed,
                            controls.target_steering,
                            controls.warp_speed,
                        ) {
                            warn!(%ship, error = %err, "controls rejected");
                        }
                        forward_control_deltas(ctx).await
                    }
                    Ok(ClientMessage::Warp(payload)) => {
                        match ctx.view.request_warp(payload.target) {
                            Ok(sequence) => {
                                info!(%ship, target = ?payload.target, sequence, "warp requested")
                            }
                            Err(err) => warn!(%ship, error = %err, "warp rejected"),
                        }
                        forward_control_deltas(ctx).await
                    }
                    Ok(ClientMessage::TimeControl(command)) => {
                        ctx.input_tx
                            .send(NodeEvent::Time(command.into()))
                            .await
                            .map_err(|_| NetError::InputClosed)?;
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                %ship,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(%ship, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(%ship, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

// Deltas are not idempotent: wait for room rather than drop one.
async fn forward_control_deltas(ctx: &mut ConnCtx) -> Result<LoopControl, NetError> {
    for message in ctx.view.flush() {
        ctx.input_tx
            .send(NodeEvent::Remote(message))
            .await
            .map_err(|_| NetError::InputClosed)?;
    }
    Ok(LoopControl::Continue)
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send replication batch");
            LoopControl::Disconnect
        }
    }
}

async fn forward_message(
    msg: &ServerMessage,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send snapshot");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx, state: &AppState) {
    release_ship(state, ctx.ship).await;

    debug!(
        entity = %ctx.ship,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!(entity = %ctx.ship, "client disconnected");
}
