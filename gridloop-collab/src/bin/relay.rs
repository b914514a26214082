//! Standalone relay process.
//!
//! Usage: `gridloop-relay [bind-addr]`, or set `GRIDLOOP_RELAY_ADDR`.

use gridloop_collab::{RelayConfig, RelayServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let bind_addr = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GRIDLOOP_RELAY_ADDR").ok())
        .unwrap_or_else(|| RelayConfig::default().bind_addr);

    let relay = RelayServer::new(RelayConfig {
        bind_addr,
        ..RelayConfig::default()
    });

    relay.run().await
}
