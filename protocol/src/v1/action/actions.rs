use crate::files::ServerFileEntry;
use crate::management::server::{
    LogEntry, ServerDefinition, ServerStats, ServerType,
};
use crate::v1::action::retcode::Retcode;
use crate::v1::action::status::ActionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
#[serde(bound(deserialize = "'de: 'req"))]
pub enum ActionParameters<'req> {
    // server lifecycle
    ListServers {},
    CreateServer {
        name: &'req str,
        server_type: ServerType,
        version: &'req str,
        port: u16,
        ram_mb: u32,
    },
    StartServer {
        server_id: Uuid,
    },
    StopServer {
        server_id: Uuid,
    },
    DeleteServer {
        server_id: Uuid,
    },

    // console
    SendCommand {
        server_id: Uuid,
        command: &'req str,
    },
    GetLogs {
        server_id: Uuid,
        #[serde(default = "default_log_limit")]
        limit: usize,
    },
    GetStats {
        server_id: Uuid,
    },

    // file operations
    ListFiles {
        server_id: Uuid,
        #[serde(default)]
        path: String,
    },
    ReadFile {
        server_id: Uuid,
        path: &'req str,
    },
    WriteFile {
        server_id: Uuid,
        path: &'req str,
        content: &'req str,
    },
    DeleteFile {
        server_id: Uuid,
        path: &'req str,
    },
    CreateFolder {
        server_id: Uuid,
        path: &'req str,
    },
    UploadFile {
        server_id: Uuid,
        path: &'req str,
        data: Vec<u8>,
    },
}

fn default_log_limit() -> usize {
    100
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ActionResults {
    Empty {},
    ServerList { servers: Vec<ServerDefinition> },
    Server { server: ServerDefinition },
    Logs { logs: Vec<LogEntry> },
    Stats { stats: Option<ServerStats> },
    Files { files: Vec<ServerFileEntry> },
    FileContent { content: String },
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(bound(deserialize = "'de: 'req"))]
pub struct ActionRequest<'req> {
    #[serde(flatten)]
    pub parameters: ActionParameters<'req>, // flattened
    pub id: Uuid,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ActionResponse {
    pub status: ActionStatus,
    pub data: ActionResults,
    #[serde(flatten)]
    pub retcode: Retcode,
    pub id: Uuid,
}
