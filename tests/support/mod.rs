// Shared primitives for one-time server bootstrapping across integration tests.
use orrery::domain::{NodeId, SimulationConfig};
use orrery::ServerSettings;
use std::{
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    time::Duration,
};

// Global base address ("host:port") used by all tests after the server publishes it.
static SERVER_ADDR: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// A small, slow world: few asteroids and real-time orbits keep assertions stable.
fn test_settings() -> ServerSettings {
    let snapshot_path = std::env::temp_dir()
        .join(format!("orrery-it-{}", uuid::Uuid::new_v4()))
        .join("world.json");
    ServerSettings {
        node_id: NodeId::new("sim-test"),
        snapshot_path,
        simulation: SimulationConfig {
            asteroid_count: 20,
            time_acceleration: 1.0,
            ..SimulationConfig::default()
        },
    }
}

// Ensure the test server is running and return the shared "host:port".
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_addr = Arc::new(OnceLock::<String>::new());
        let published_addr_thread = Arc::clone(&published_addr);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_addr_thread.set(addr.to_string());
                orrery::run_with_settings(listener, test_settings())
                    .await
                    .expect("server failed");
            });
        });
        wait_for_server_addr_and_readiness(published_addr);
    });

    SERVER_ADDR
        .get()
        .expect("server addr should be initialized")
        .as_str()
}

// Wait for address publication and then for the server socket to accept TCP connections.
fn wait_for_server_addr_and_readiness(published_addr: Arc<OnceLock<String>>) {
    let addr = loop {
        if let Some(addr) = published_addr.get() {
            break addr.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_ADDR.set(addr.clone());

    // Snapshot generation happens before the listener is served, so allow a little longer.
    for _ in 0..250 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
