use async_trait::async_trait;
use crafthost_protocol::management::server::{ServerDefinition, ServerStats};
use rand::Rng;

/// Sampling strategy boundary. Swapping in an OS-introspection probe must
/// not touch the supervisor or the manager.
#[async_trait]
pub trait StatsProbe: Send + Sync {
    async fn sample(&self, definition: &ServerDefinition) -> ServerStats;
}

/// Fabricates numbers around nominal values. A real probe would read cpu and
/// ram from the OS process table and players/tps from the server's own
/// query protocol.
pub struct SyntheticProbe;

#[async_trait]
impl StatsProbe for SyntheticProbe {
    async fn sample(&self, definition: &ServerDefinition) -> ServerStats {
        let mut rng = rand::thread_rng();
        ServerStats {
            players: rng.gen_range(0..=definition.max_players.min(10)),
            tps: 19.8 + rng.gen::<f64>() * 0.4,
            cpu: rng.gen_range(10.0..50.0),
            ram_mb: rng.gen_range(0..=u64::from(definition.ram_mb)),
        }
    }
}
