use crate::management::server::ServerStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerType {
    Vanilla,
    Paper,
    Spigot,
    Forge,
    Fabric,
}

/// One persisted server record. `id` and `path` are allocated once at
/// creation and never change; `status` mirrors the supervisor's last
/// observation for this id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDefinition {
    #[serde(default = "uuid::Uuid::new_v4")]
    pub id: Uuid,

    pub name: String,
    pub server_type: ServerType,
    pub version: String,
    pub port: u16,
    pub ram_mb: u32,
    pub path: PathBuf,

    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default = "default_java_path")]
    pub java_path: String,

    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ServerStatus,
}

/// The create-server form as submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateServerRequest {
    pub name: String,
    pub server_type: ServerType,
    pub version: String,
    pub port: u16,
    pub ram_mb: u32,
}

impl CreateServerRequest {
    /// Expands the form into a full definition rooted at `path`.
    pub fn into_definition(self, id: Uuid, path: PathBuf) -> ServerDefinition {
        ServerDefinition {
            id,
            name: self.name,
            server_type: self.server_type,
            version: self.version,
            port: self.port,
            ram_mb: self.ram_mb,
            path,
            max_players: default_max_players(),
            auto_start: false,
            java_path: default_java_path(),
            created_at: Utc::now(),
            last_started: None,
            status: ServerStatus::default(),
        }
    }
}

fn default_max_players() -> u32 {
    20
}

fn default_java_path() -> String {
    "java".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn definition_defaults_apply() {
        let raw = r#"{
            "id": "a1829c2d-4357-4aef-8a95-544515243faf",
            "name": "survival",
            "server_type": "paper",
            "version": "1.21.4",
            "port": 25565,
            "ram_mb": 4096,
            "path": "/srv/crafthost/servers/a1829c2d-4357-4aef-8a95-544515243faf",
            "created_at": "2025-01-01T00:00:00Z"
        }"#;

        let definition: ServerDefinition = serde_json::from_str(raw).unwrap();
        assert_eq!(definition.max_players, 20);
        assert_eq!(definition.java_path, "java");
        assert_eq!(definition.status, ServerStatus::Offline);
        assert_eq!(definition.last_started, None);
        assert!(!definition.auto_start);
    }

    #[test]
    fn server_type_uses_snake_case_names() {
        assert_eq!(
            serde_json::to_string(&ServerType::Vanilla).unwrap(),
            "\"vanilla\""
        );
        assert_eq!(
            serde_json::from_str::<ServerType>("\"fabric\"").unwrap(),
            ServerType::Fabric
        );
    }

    #[test]
    fn request_expands_into_definition() {
        let request = CreateServerRequest {
            name: "creative".to_owned(),
            server_type: ServerType::Vanilla,
            version: "1.21".to_owned(),
            port: 25566,
            ram_mb: 2048,
        };
        let id = Uuid::new_v4();
        let definition = request.into_definition(id, PathBuf::from("/tmp/creative"));

        assert_eq!(definition.id, id);
        assert_eq!(definition.status, ServerStatus::Offline);
        assert_eq!(definition.ram_mb, 2048);
        assert_eq!(definition.path, PathBuf::from("/tmp/creative"));
    }
}
