use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::management::logs::LogBuffers;
use crate::management::registry::ServerRegistry;
use crate::management::stats::{StatsProbe, SyntheticProbe};
use crate::management::supervisor::ProcessSupervisor;
use crate::storage::Files;
use crafthost_protocol::files::ServerFileEntry;
use crafthost_protocol::management::server::{
    CreateServerRequest, LogEntry, ServerDefinition, ServerStats,
};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// How long a delete waits for the stopped process to die before the
/// directory tree is removed underneath it.
const DELETE_TEARDOWN_WAIT: Duration = Duration::from_secs(5);

/// The operation surface the UI consumes. Owns the component graph; every
/// result is a plain value or a typed error, nothing panics across this
/// boundary.
pub struct ServerManager {
    registry: Arc<ServerRegistry>,
    supervisor: Arc<ProcessSupervisor>,
    logs: Arc<LogBuffers>,
    probe: Box<dyn StatsProbe>,
    files: Files,
}

impl ServerManager {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let registry = Arc::new(ServerRegistry::new(&config.storage.root)?);
        let logs = Arc::new(LogBuffers::new(config.management.log_cap));
        let supervisor = ProcessSupervisor::new(
            Arc::clone(&registry),
            Arc::clone(&logs),
            config.management.stop_timeout_secs,
        );

        Ok(Self {
            registry,
            supervisor,
            logs,
            probe: Box::new(SyntheticProbe),
            files: Files::new(config.files.sandbox),
        })
    }

    pub fn with_probe(mut self, probe: Box<dyn StatsProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub async fn create_server(&self, request: CreateServerRequest) -> Result<ServerDefinition> {
        validate(&request)?;
        self.registry.create(request).await
    }

    pub async fn list_servers(&self) -> Result<Vec<ServerDefinition>> {
        self.registry.list().await
    }

    pub async fn start_server(&self, id: Uuid) -> Result<()> {
        self.supervisor.start(id).await
    }

    pub async fn stop_server(&self, id: Uuid) -> Result<()> {
        self.supervisor.stop(id).await.map(|_| ())
    }

    /// Stop first, wait for teardown, then drop the definition, its
    /// directory tree and its console history.
    pub async fn delete_server(&self, id: Uuid) -> Result<()> {
        if let Some(process) = self.supervisor.stop(id).await? {
            let deadline = tokio::time::Instant::now() + DELETE_TEARDOWN_WAIT;
            while !process.exited() && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            if !process.exited() {
                warn!("server {} still shutting down, killing before delete", id);
                process.kill();
            }
        }

        self.registry.remove(id).await?;
        self.logs.remove(id);
        info!("server {} deleted", id);
        Ok(())
    }

    pub async fn send_command(&self, id: Uuid, command: &str) -> Result<()> {
        self.supervisor.send_input(id, command).await
    }

    /// The most recent `limit` entries in emission order. Never blocks on
    /// the producing process.
    pub async fn get_logs(&self, id: Uuid, limit: usize) -> Result<Vec<LogEntry>> {
        self.registry.get(id).await?;
        Ok(self
            .logs
            .get(id)
            .map(|buffer| buffer.tail(limit))
            .unwrap_or_default())
    }

    /// `None` while the server is not online; the probe is only consulted
    /// for live processes.
    pub async fn get_stats(&self, id: Uuid) -> Result<Option<ServerStats>> {
        let definition = self.registry.get(id).await?;
        if !self.supervisor.is_running(id).await {
            return Ok(None);
        }
        Ok(Some(self.probe.sample(&definition).await))
    }

    pub async fn list_files(&self, id: Uuid, sub: &str) -> Result<Vec<ServerFileEntry>> {
        let definition = self.registry.get(id).await?;
        self.files.list_dir(&definition.path, sub).await
    }

    pub async fn read_file(&self, id: Uuid, path: &str) -> Result<String> {
        let definition = self.registry.get(id).await?;
        self.files.read_file(&definition.path, path).await
    }

    pub async fn write_file(&self, id: Uuid, path: &str, content: &str) -> Result<()> {
        let definition = self.registry.get(id).await?;
        self.files.write_file(&definition.path, path, content).await
    }

    pub async fn delete_file(&self, id: Uuid, path: &str) -> Result<()> {
        let definition = self.registry.get(id).await?;
        self.files.delete_path(&definition.path, path).await
    }

    pub async fn create_folder(&self, id: Uuid, path: &str) -> Result<()> {
        let definition = self.registry.get(id).await?;
        self.files.create_folder(&definition.path, path).await
    }

    pub async fn upload_file(&self, id: Uuid, path: &str, data: &[u8]) -> Result<()> {
        let definition = self.registry.get(id).await?;
        self.files.upload_file(&definition.path, path, data).await
    }

    /// Boot pass: normalize statuses left behind by a previous run.
    pub async fn restore(&self) -> Result<()> {
        self.registry.reset_runtime_statuses().await
    }

    /// Boot pass: start everything flagged `auto_start`. Failures are
    /// logged, not fatal.
    pub async fn autostart(&self) -> Result<()> {
        for server in self.registry.list().await? {
            if server.auto_start {
                if let Err(err) = self.supervisor.start(server.id).await {
                    warn!("auto-start of server {} failed: {}", server.id, err);
                }
            }
        }
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.supervisor.shutdown_all().await;
    }
}

fn validate(request: &CreateServerRequest) -> Result<()> {
    if request.name.trim().is_empty() {
        return Err(Error::Validation("name must not be empty".to_owned()));
    }
    if request.port == 0 {
        return Err(Error::Validation("port must be in 1..=65535".to_owned()));
    }
    if request.ram_mb == 0 {
        return Err(Error::Validation(
            "ram_mb must be a positive integer".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilesConfig, ManagementConfig, StorageConfig};
    use crafthost_protocol::management::server::{ServerStatus, ServerType};

    fn config(root: &std::path::Path) -> AppConfig {
        AppConfig {
            storage: StorageConfig {
                root: root.to_path_buf(),
            },
            management: ManagementConfig {
                log_cap: 1000,
                stop_timeout_secs: 5,
            },
            files: FilesConfig { sandbox: false },
        }
    }

    fn request() -> CreateServerRequest {
        CreateServerRequest {
            name: "Test".to_owned(),
            server_type: ServerType::Paper,
            version: "1.21.4".to_owned(),
            port: 25565,
            ram_mb: 4096,
        }
    }

    #[tokio::test]
    async fn create_validates_input() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ServerManager::new(&config(temp_dir.path())).unwrap();

        let empty_name = CreateServerRequest {
            name: "  ".to_owned(),
            ..request()
        };
        assert!(matches!(
            manager.create_server(empty_name).await,
            Err(Error::Validation(_))
        ));

        let zero_port = CreateServerRequest {
            port: 0,
            ..request()
        };
        assert!(matches!(
            manager.create_server(zero_port).await,
            Err(Error::Validation(_))
        ));

        let zero_ram = CreateServerRequest {
            ram_mb: 0,
            ..request()
        };
        assert!(matches!(
            manager.create_server(zero_ram).await,
            Err(Error::Validation(_))
        ));

        assert!(manager.list_servers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_then_list_shows_one_offline_server() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ServerManager::new(&config(temp_dir.path())).unwrap();

        let definition = manager.create_server(request()).await.unwrap();
        let listed = manager.list_servers().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, definition.id);
        assert_eq!(listed[0].status, ServerStatus::Offline);

        // fresh tree: only the required subfolders
        let entries = manager.list_files(definition.id, "").await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["mods", "plugins", "world"]);
    }

    #[tokio::test]
    async fn command_to_offline_server_is_not_running() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ServerManager::new(&config(temp_dir.path())).unwrap();
        let definition = manager.create_server(request()).await.unwrap();

        let result = manager.send_command(definition.id, "list").await;
        assert!(matches!(result, Err(Error::NotRunning(_))));
    }

    #[tokio::test]
    async fn logs_and_stats_for_unknown_server_are_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ServerManager::new(&config(temp_dir.path())).unwrap();

        assert!(matches!(
            manager.get_logs(Uuid::new_v4(), 10).await,
            Err(Error::ServerNotFound(_))
        ));
        assert!(matches!(
            manager.get_stats(Uuid::new_v4()).await,
            Err(Error::ServerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_definition_and_tree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ServerManager::new(&config(temp_dir.path())).unwrap();
        let definition = manager.create_server(request()).await.unwrap();

        manager.delete_server(definition.id).await.unwrap();
        assert!(!definition.path.exists());
        assert!(manager.list_servers().await.unwrap().is_empty());
    }

    #[cfg(unix)]
    mod with_process {
        use super::*;
        use crate::management::config::SERVER_JAR;
        use std::time::Duration;

        fn fake_java(dir: &std::path::Path) -> String {
            use std::os::unix::fs::PermissionsExt;
            let path = dir.join("fake_java.sh");
            std::fs::write(
                &path,
                "#!/bin/sh\necho booted\nwhile read line; do\n  if [ \"$line\" = \"stop\" ]; then echo halting; exit 0; fi\n  echo \"cmd:$line\"\ndone\n",
            )
            .unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        /// The full lifecycle: create, start without jar, start with jar,
        /// command, stats, stop, delete.
        #[tokio::test]
        async fn full_lifecycle_scenario() {
            let temp_dir = tempfile::tempdir().unwrap();
            let manager = ServerManager::new(&config(temp_dir.path())).unwrap();

            let definition = manager.create_server(request()).await.unwrap();
            let id = definition.id;
            assert_eq!(definition.status, ServerStatus::Offline);

            // no jar yet
            let missing = manager.start_server(id).await;
            assert!(matches!(missing, Err(Error::MissingArtifact(_))));
            assert_eq!(
                manager.list_servers().await.unwrap()[0].status,
                ServerStatus::Offline
            );

            // place a dummy artifact and point the launcher at the script
            std::fs::write(definition.path.join(SERVER_JAR), b"dummy").unwrap();
            let java = fake_java(&definition.path);
            manager
                .registry
                .update(id, |server| server.java_path = java)
                .await
                .unwrap();

            manager.start_server(id).await.unwrap();
            let stored = manager.registry.get(id).await.unwrap();
            assert_eq!(stored.status, ServerStatus::Online);
            assert!(stored.last_started.is_some());

            manager.send_command(id, "list").await.unwrap();
            for _ in 0..100 {
                let logs = manager.get_logs(id, 50).await.unwrap();
                if logs.iter().any(|e| e.message.contains("cmd:list")) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let logs = manager.get_logs(id, 50).await.unwrap();
            assert!(logs.iter().any(|e| e.message.contains("booted")));
            assert!(logs.iter().any(|e| e.message.contains("cmd:list")));

            let stats = manager.get_stats(id).await.unwrap().expect("online stats");
            assert!(stats.tps > 19.0);

            manager.stop_server(id).await.unwrap();
            assert_eq!(
                manager.registry.get(id).await.unwrap().status,
                ServerStatus::Offline
            );
            assert_eq!(manager.get_stats(id).await.unwrap(), None);

            // stopping again is still a success
            manager.stop_server(id).await.unwrap();

            manager.delete_server(id).await.unwrap();
            assert!(!definition.path.exists());
            assert!(manager.list_servers().await.unwrap().is_empty());
            assert!(matches!(
                manager.get_logs(id, 10).await,
                Err(Error::ServerNotFound(_))
            ));
        }

        #[tokio::test]
        async fn delete_stops_a_running_server_first() {
            let temp_dir = tempfile::tempdir().unwrap();
            let manager = ServerManager::new(&config(temp_dir.path())).unwrap();
            let definition = manager.create_server(request()).await.unwrap();

            std::fs::write(definition.path.join(SERVER_JAR), b"dummy").unwrap();
            let java = fake_java(&definition.path);
            manager
                .registry
                .update(definition.id, |server| server.java_path = java)
                .await
                .unwrap();

            manager.start_server(definition.id).await.unwrap();
            manager.delete_server(definition.id).await.unwrap();

            assert!(!definition.path.exists());
            assert!(manager.list_servers().await.unwrap().is_empty());
        }
    }
}
