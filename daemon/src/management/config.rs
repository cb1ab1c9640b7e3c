use crafthost_protocol::management::server::ServerDefinition;
use std::path::PathBuf;

/// The launch artifact expected inside every server directory.
pub const SERVER_JAR: &str = "server.jar";

/// File name of the persisted definition list under the storage root.
pub const SERVERS_INDEX: &str = "servers.json";

pub struct ProcessStartInfo {
    pub target: String,
    pub args: Vec<String>,
}

pub trait ServerDefinitionExt {
    fn jar_path(&self) -> PathBuf;
    fn start_info(&self) -> ProcessStartInfo;
}

impl ServerDefinitionExt for ServerDefinition {
    fn jar_path(&self) -> PathBuf {
        self.path.join(SERVER_JAR)
    }

    // max heap = allocated ram, initial heap = half of it
    fn start_info(&self) -> ProcessStartInfo {
        ProcessStartInfo {
            target: self.java_path.clone(),
            args: vec![
                format!("-Xmx{}M", self.ram_mb),
                format!("-Xms{}M", self.ram_mb / 2),
                "-jar".to_owned(),
                SERVER_JAR.to_owned(),
                "nogui".to_owned(),
            ],
        }
    }
}
