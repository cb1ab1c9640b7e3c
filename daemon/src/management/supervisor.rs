use crate::error::{Error, Result};
use crate::management::config::ServerDefinitionExt;
use crate::management::logs::LogBuffers;
use crate::management::process::ServerProcess;
use crate::management::registry::ServerRegistry;
use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};
use scc::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crafthost_protocol::management::server::ServerStatus;

/// Owns zero-or-one live process per server id and keeps the registry's
/// status column in line with what it observes. The handle map is the
/// single authority on "is this server running".
pub struct ProcessSupervisor {
    registry: Arc<ServerRegistry>,
    logs: Arc<LogBuffers>,
    // use ahash to speed up ops
    handles: scc::HashMap<Uuid, Arc<ServerProcess>, ahash::RandomState>,
    stop_timeout: Duration,
}

impl ProcessSupervisor {
    pub fn new(
        registry: Arc<ServerRegistry>,
        logs: Arc<LogBuffers>,
        stop_timeout_secs: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            logs,
            handles: scc::HashMap::default(),
            stop_timeout: Duration::from_secs(stop_timeout_secs),
        })
    }

    /// Launches the server process. A second start for an id that already
    /// holds a handle is a successful no-op; the map entry is held across
    /// the spawn so two racing starts cannot both launch.
    pub async fn start(self: &Arc<Self>, id: Uuid) -> Result<()> {
        let definition = self.registry.get(id).await?;

        let entry = match self.handles.entry_async(id).await {
            Entry::Occupied(_) => {
                debug!("server {} already running, start is a no-op", id);
                return Ok(());
            }
            Entry::Vacant(entry) => entry,
        };

        let jar = definition.jar_path();
        if !jar.is_file() {
            return Err(Error::MissingArtifact(jar));
        }

        self.registry
            .update(id, |server| server.status = ServerStatus::Starting)
            .await?;

        let (status_tx, status_rx) = mpsc::channel(8);
        let buffer = self.logs.acquire(id);
        let process = match ServerProcess::spawn(&definition, buffer, status_tx).await {
            Ok(process) => Arc::new(process),
            Err(err) => {
                self.registry
                    .update(id, |server| server.status = ServerStatus::Offline)
                    .await?;
                return Err(Error::Launch(err));
            }
        };

        info!("server {} spawned (pid={})", id, process.pid());
        entry.insert_entry(Arc::clone(&process));

        self.registry
            .update(id, |server| {
                server.status = ServerStatus::Online;
                server.last_started = Some(Utc::now());
            })
            .await?;

        tokio::spawn(Self::observe_exit(Arc::clone(self), id, process, status_rx));
        Ok(())
    }

    /// Runs until the process reports a terminal status, then clears the
    /// handle and records the status, unless a restart has already put a
    /// newer process in place.
    async fn observe_exit(
        self: Arc<Self>,
        id: Uuid,
        process: Arc<ServerProcess>,
        mut status_rx: mpsc::Receiver<ServerStatus>,
    ) {
        while let Some(status) = status_rx.recv().await {
            if !matches!(status, ServerStatus::Offline | ServerStatus::Crashed) {
                continue;
            }
            debug!("server {} exit observed: {:?}", id, status);
            self.handles
                .remove_if_async(&id, |live| Arc::ptr_eq(live, &process))
                .await;
            let superseded = self.handles.contains_async(&id).await;
            if !superseded {
                if let Err(err) = self
                    .registry
                    .update(id, |server| server.status = status)
                    .await
                {
                    warn!("could not record status of server {}: {}", id, err);
                }
            }
            break;
        }
    }

    /// Requests a graceful shutdown and forgets the handle immediately; the
    /// OS process exits on its own time. After `stop_timeout` a straggler
    /// is force-killed. Returns the handle so callers can await teardown.
    pub async fn stop(&self, id: Uuid) -> Result<Option<Arc<ServerProcess>>> {
        let process = match self.handles.remove_async(&id).await {
            Some((_, process)) => process,
            None => return Ok(None),
        };

        process.mark_stop_requested();
        if let Err(err) = process.write_line("stop").await {
            warn!("stop command could not reach server {}: {}, killing", id, err);
            process.kill();
        }

        self.registry
            .update(id, |server| server.status = ServerStatus::Offline)
            .await?;

        if !self.stop_timeout.is_zero() {
            let timeout = self.stop_timeout;
            let straggler = Arc::clone(&process);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if !straggler.exited() {
                    warn!(
                        "server {} still alive {}s after stop, killing",
                        id,
                        timeout.as_secs()
                    );
                    straggler.kill();
                }
            });
        }
        Ok(Some(process))
    }

    /// Writes one console line to the server's stdin.
    pub async fn send_input(&self, id: Uuid, text: &str) -> Result<()> {
        let process = self
            .handles
            .read_async(&id, |_, process| Arc::clone(process))
            .await
            .ok_or(Error::NotRunning(id))?;
        process.write_line(text).await.map_err(Error::Io)
    }

    pub async fn is_running(&self, id: Uuid) -> bool {
        self.handles.contains_async(&id).await
    }

    /// Graceful stop of every live process, awaited together.
    pub async fn shutdown_all(self: &Arc<Self>) {
        let mut ids = vec![];
        self.handles.scan_async(|id, _| ids.push(*id)).await;

        let stops = ids.into_iter().map(|id| {
            let supervisor = Arc::clone(self);
            async move {
                if let Err(err) = supervisor.stop(id).await {
                    warn!("could not stop server {}: {}", id, err);
                }
            }
        });
        join_all(stops).await;
    }
}
