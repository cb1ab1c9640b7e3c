use crate::error::{Error, Result};
use crate::management::config::SERVERS_INDEX;
use crate::storage::file::FileIoWithBackup;
use crafthost_protocol::management::server::{
    CreateServerRequest, ServerDefinition, ServerStatus,
};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Durable list of server definitions, one JSON document under the storage
/// root. Every mutation is a locked read-modify-write of the whole list, so
/// concurrent callers cannot lose entries.
pub struct ServerRegistry {
    root: PathBuf,
    index_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileIoWithBackup for ServerRegistry {}

impl ServerRegistry {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("servers"))?;
        Ok(Self {
            index_path: root.join(SERVERS_INDEX),
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn load(&self) -> Result<Vec<ServerDefinition>> {
        if !self.index_path.is_file() {
            return Ok(vec![]);
        }
        let content = std::fs::read_to_string(&self.index_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, servers: &[ServerDefinition]) -> Result<()> {
        let content = serde_json::to_string_pretty(servers)?;
        Self::write_with_backup(&self.index_path, &content)?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ServerDefinition>> {
        let _guard = self.write_lock.lock().await;
        self.load()
    }

    pub async fn get(&self, id: Uuid) -> Result<ServerDefinition> {
        let _guard = self.write_lock.lock().await;
        self.load()?
            .into_iter()
            .find(|server| server.id == id)
            .ok_or(Error::ServerNotFound(id))
    }

    /// Allocates an id, provisions the directory tree and appends the new
    /// definition to the persisted list.
    pub async fn create(&self, request: CreateServerRequest) -> Result<ServerDefinition> {
        let _guard = self.write_lock.lock().await;

        let id = Uuid::new_v4();
        let path = self.root.join("servers").join(id.to_string());
        for sub in ["mods", "plugins", "world"] {
            std::fs::create_dir_all(path.join(sub))?;
        }

        let definition = request.into_definition(id, path);
        let mut servers = self.load()?;
        servers.push(definition.clone());
        self.save(&servers)?;
        debug!(
            "server {} registered at {}",
            definition.id,
            definition.path.display()
        );

        Ok(definition)
    }

    pub async fn update<F>(&self, id: Uuid, mutation: F) -> Result<ServerDefinition>
    where
        F: FnOnce(&mut ServerDefinition),
    {
        let _guard = self.write_lock.lock().await;
        let mut servers = self.load()?;
        let definition = servers
            .iter_mut()
            .find(|server| server.id == id)
            .ok_or(Error::ServerNotFound(id))?;
        mutation(definition);
        let updated = definition.clone();
        self.save(&servers)?;
        Ok(updated)
    }

    /// Drops the definition and deletes its directory tree. The caller
    /// guarantees the process is stopped.
    pub async fn remove(&self, id: Uuid) -> Result<ServerDefinition> {
        let _guard = self.write_lock.lock().await;
        let mut servers = self.load()?;
        let position = servers
            .iter()
            .position(|server| server.id == id)
            .ok_or(Error::ServerNotFound(id))?;
        let definition = servers.remove(position);
        self.save(&servers)?;

        if let Err(err) = std::fs::remove_dir_all(&definition.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Err(err.into());
            }
        }
        debug!("server {} removed", id);
        Ok(definition)
    }

    /// A freshly started daemon holds no runtime handles, so any persisted
    /// running state is stale. `crashed` stays visible to the operator.
    pub async fn reset_runtime_statuses(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut servers = self.load()?;
        let mut changed = false;
        for server in servers.iter_mut() {
            if server.status.is_running() {
                warn!(
                    "server {} had stale status {:?}, resetting to offline",
                    server.id, server.status
                );
                server.status = ServerStatus::Offline;
                changed = true;
            }
        }
        if changed {
            self.save(&servers)?;
        }
        Ok(())
    }
}
