use serde::{Deserialize, Serialize};

/// A point-in-time resource snapshot for one online server. `tps` is the
/// simulation tick rate, nominally 20.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServerStats {
    pub players: u32,
    pub tps: f64,
    pub cpu: f64,
    pub ram_mb: u64,
}
