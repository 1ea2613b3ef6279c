// Framework bootstrap for the simulation server runtime.

use crate::domain::{ComponentKind, NodeId, SimulationConfig};
use crate::frameworks::config;
use crate::interface_adapters::authority::AuthorityTable;
use crate::interface_adapters::http::health_handler;
use crate::interface_adapters::net::{replication_serializer, ws_handler};
use crate::interface_adapters::query::WorldQuery;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::EntityIdAllocator;
use crate::use_cases::game::world_task;
use crate::use_cases::snapshot::load_or_generate;
use crate::use_cases::{NodeEvent, ReplicationBatch, SimulationNode};

use axum::{Router, extract::ws::Utf8Bytes, routing::get};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::{io::Result, sync::Arc};
use tokio::sync::{Notify, broadcast, mpsc};

// Everything the simulating node owns on snapshot entities.
const SIMULATED_KINDS: [ComponentKind; 5] = [
    ComponentKind::Position,
    ComponentKind::TransformInfo,
    ComponentKind::OrbitInfo,
    ComponentKind::PlanetIndex,
    ComponentKind::EntityType,
];

/// What a server instance needs to boot; `from_env` reads the process environment.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub node_id: NodeId,
    pub snapshot_path: PathBuf,
    pub simulation: SimulationConfig,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self> {
        let simulation = config::simulation_config().map_err(std::io::Error::other)?;
        Ok(Self {
            node_id: config::node_id(),
            snapshot_path: config::snapshot_path(),
            simulation,
        })
    }
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    run_with_settings(listener, ServerSettings::from_env()?).await
}

pub async fn run_with_settings(
    listener: tokio::net::TcpListener,
    settings: ServerSettings,
) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(settings)?;
    let shutdown = state.shutdown.clone();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    let served = axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    });
    shutdown.notify_one();
    served
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state(settings: ServerSettings) -> Result<Arc<AppState>> {
    let ServerSettings {
        node_id,
        snapshot_path,
        simulation,
    } = settings;

    let snapshot = load_or_generate(&snapshot_path, &simulation).map_err(|e| {
        tracing::error!(path = %snapshot_path.display(), error = %e, "failed to load snapshot");
        std::io::Error::other(e)
    })?;

    // Setup Channels
    // input_tx/rx: network events and warp queries all go to the single world task.
    let (input_tx, input_rx) = mpsc::channel::<NodeEvent>(simulation.input_channel_capacity);
    // world_tx/rx: replication batches, serialized once and fanned out to every client.
    let (world_tx, world_rx) =
        broadcast::channel::<ReplicationBatch>(simulation.replication_broadcast_capacity);
    let (world_bytes_tx, _world_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(simulation.replication_broadcast_capacity);

    let authority = AuthorityTable::new();
    let query = WorldQuery::new(input_tx.clone(), config::QUERY_TIMEOUT);
    let mut node = SimulationNode::new(
        node_id.clone(),
        simulation.clone(),
        Arc::new(authority.view_for(node_id.clone())),
        Arc::new(query),
    );

    for entity in &snapshot.entities {
        authority.grant_all(entity.id, &SIMULATED_KINDS, &node_id);
        node.seed(entity.id, entity.components.clone());
    }
    tracing::info!(
        node = %node_id,
        entities = snapshot.entities.len(),
        "world bootstrapped"
    );

    let shutdown = Arc::new(Notify::new());
    tokio::spawn(world_task(
        node,
        input_rx,
        world_tx,
        simulation.tick_interval(),
        shutdown.clone(),
    ));
    tokio::spawn(replication_serializer(world_rx, world_bytes_tx.clone()));

    Ok(Arc::new(AppState {
        input_tx,
        world_bytes_tx,
        authority,
        sim_node: node_id,
        entity_ids: EntityIdAllocator::starting_at(snapshot.next_free_id()),
        config: simulation,
        shutdown,
    }))
}
