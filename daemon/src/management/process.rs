use crate::management::config::ServerDefinitionExt;
use crate::management::logs::LogBuffer;
use crafthost_protocol::management::server::{LogLevel, ServerDefinition, ServerStatus};
use log::{debug, warn};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::select;
use tokio::sync::{mpsc, Mutex, Notify};

const READ_BUF_SIZE: usize = 8 * 1024;

/// One live child process. The child itself is owned by its reader task;
/// this handle only signals it (stdin writes, kill requests) and observes
/// the exit flag. The terminal status, offline or crashed, arrives on the
/// channel passed to `spawn`.
pub struct ServerProcess {
    pid: u32,
    stdin: Mutex<ChildStdin>,
    kill_notify: Arc<Notify>,
    exited: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
}

impl ServerProcess {
    pub async fn spawn(
        definition: &ServerDefinition,
        logs: Arc<LogBuffer>,
        status_tx: mpsc::Sender<ServerStatus>,
    ) -> Result<Self, std::io::Error> {
        let start_info = definition.start_info();
        let mut cmd = Command::new(&start_info.target);
        cmd.args(&start_info.args)
            .current_dir(&definition.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // prepare process resource
        let mut process = cmd.spawn()?;
        let pid = process.id().unwrap_or(0);

        let stdin = process.stdin.take().unwrap();
        let mut stdout = process.stdout.take().unwrap();
        let mut stderr = process.stderr.take().unwrap();

        let kill_notify = Arc::new(Notify::new());
        let exited = Arc::new(AtomicBool::new(false));
        let stop_requested = Arc::new(AtomicBool::new(false));

        tokio::spawn({
            let kill_notify = kill_notify.clone();
            let exited = exited.clone();
            let stop_requested = stop_requested.clone();

            async move {
                let mut out_buf = [0u8; READ_BUF_SIZE];
                let mut err_buf = [0u8; READ_BUF_SIZE];
                let mut stdout_open = true;
                let mut stderr_open = true;

                loop {
                    select! {
                        read = stdout.read(&mut out_buf), if stdout_open => {
                            match read {
                                Ok(n) if n > 0 => {
                                    logs.push(LogLevel::Info, String::from_utf8_lossy(&out_buf[..n]));
                                }
                                _ => stdout_open = false,
                            }
                        }
                        read = stderr.read(&mut err_buf), if stderr_open => {
                            match read {
                                Ok(n) if n > 0 => {
                                    logs.push(LogLevel::Error, String::from_utf8_lossy(&err_buf[..n]));
                                }
                                _ => stderr_open = false,
                            }
                        }
                        result = process.wait() => {
                            exited.store(true, Ordering::SeqCst);
                            let crashed = match result {
                                Ok(exit) => {
                                    !exit.success() && !stop_requested.load(Ordering::SeqCst)
                                }
                                Err(err) => {
                                    warn!("could not observe exit of pid {}: {}", pid, err);
                                    false
                                }
                            };
                            let status = if crashed {
                                ServerStatus::Crashed
                            } else {
                                ServerStatus::Offline
                            };
                            let _ = status_tx.send(status).await;
                            break;
                        }
                        _ = kill_notify.notified() => {
                            if let Err(err) = process.kill().await {
                                warn!("could not kill process (pid={}): {}", pid, err);
                            }
                            exited.store(true, Ordering::SeqCst);
                            let _ = status_tx.send(ServerStatus::Offline).await;
                            break;
                        }
                    }
                }

                // the pipes may still hold buffered output after exit
                while stdout_open {
                    match stdout.read(&mut out_buf).await {
                        Ok(n) if n > 0 => {
                            logs.push(LogLevel::Info, String::from_utf8_lossy(&out_buf[..n]));
                        }
                        _ => stdout_open = false,
                    }
                }
                while stderr_open {
                    match stderr.read(&mut err_buf).await {
                        Ok(n) if n > 0 => {
                            logs.push(LogLevel::Error, String::from_utf8_lossy(&err_buf[..n]));
                        }
                        _ => stderr_open = false,
                    }
                }
                debug!("reader task for pid {} finished", pid);
            }
        });

        Ok(ServerProcess {
            pid,
            stdin: Mutex::new(stdin),
            kill_notify,
            exited,
            stop_requested,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Marks the upcoming exit as operator-requested so it is recorded as
    /// offline, not crashed.
    pub fn mark_stop_requested(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn kill(&self) {
        self.kill_notify.notify_one();
    }

    /// Writes `line` plus a newline to the process stdin.
    pub async fn write_line(&self, line: &str) -> Result<(), std::io::Error> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crafthost_protocol::management::server::{CreateServerRequest, ServerType};
    use std::path::Path;
    use std::time::Duration;
    use uuid::Uuid;

    /// A stand-in for the java runtime: accepts the heap/jar arguments and
    /// speaks the console protocol of the tests.
    fn fake_java(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake_java.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn definition(dir: &Path, java_path: String) -> ServerDefinition {
        let mut definition = CreateServerRequest {
            name: "test".to_owned(),
            server_type: ServerType::Paper,
            version: "1.21.4".to_owned(),
            port: 25565,
            ram_mb: 512,
        }
        .into_definition(Uuid::new_v4(), dir.to_path_buf());
        definition.java_path = java_path;
        definition
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("condition not reached within 5s");
    }

    #[tokio::test]
    async fn captures_output_and_reports_clean_exit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let java = fake_java(temp_dir.path(), "echo ready; echo oops >&2");
        let definition = definition(temp_dir.path(), java);
        let logs = Arc::new(LogBuffer::new(100));
        let (status_tx, mut status_rx) = mpsc::channel(8);

        let process = ServerProcess::spawn(&definition, logs.clone(), status_tx)
            .await
            .unwrap();

        assert_eq!(status_rx.recv().await, Some(ServerStatus::Offline));
        wait_for(|| logs.len() >= 2).await;
        assert!(process.exited());

        let entries = logs.tail(10);
        let stdout_entry = entries
            .iter()
            .find(|e| e.level == LogLevel::Info)
            .expect("stdout chunk captured");
        assert!(stdout_entry.message.contains("ready"));
        let stderr_entry = entries
            .iter()
            .find(|e| e.level == LogLevel::Error)
            .expect("stderr chunk captured");
        assert!(stderr_entry.message.contains("oops"));
    }

    #[tokio::test]
    async fn relays_stdin_and_stops_on_command() {
        let temp_dir = tempfile::tempdir().unwrap();
        let java = fake_java(
            temp_dir.path(),
            r#"while read line; do
  if [ "$line" = "stop" ]; then exit 0; fi
  echo "cmd:$line"
done"#,
        );
        let definition = definition(temp_dir.path(), java);
        let logs = Arc::new(LogBuffer::new(100));
        let (status_tx, mut status_rx) = mpsc::channel(8);

        let process = ServerProcess::spawn(&definition, logs.clone(), status_tx)
            .await
            .unwrap();

        process.write_line("say hello").await.unwrap();
        wait_for(|| {
            logs.tail(10)
                .iter()
                .any(|e| e.message.contains("cmd:say hello"))
        })
        .await;

        process.mark_stop_requested();
        process.write_line("stop").await.unwrap();
        assert_eq!(status_rx.recv().await, Some(ServerStatus::Offline));
    }

    #[tokio::test]
    async fn nonzero_exit_without_stop_is_a_crash() {
        let temp_dir = tempfile::tempdir().unwrap();
        let java = fake_java(temp_dir.path(), "echo boom >&2; exit 3");
        let definition = definition(temp_dir.path(), java);
        let logs = Arc::new(LogBuffer::new(100));
        let (status_tx, mut status_rx) = mpsc::channel(8);

        ServerProcess::spawn(&definition, logs, status_tx)
            .await
            .unwrap();

        assert_eq!(status_rx.recv().await, Some(ServerStatus::Crashed));
    }

    #[tokio::test]
    async fn nonzero_exit_after_stop_request_stays_offline() {
        let temp_dir = tempfile::tempdir().unwrap();
        let java = fake_java(temp_dir.path(), "read line; exit 7");
        let definition = definition(temp_dir.path(), java);
        let logs = Arc::new(LogBuffer::new(100));
        let (status_tx, mut status_rx) = mpsc::channel(8);

        let process = ServerProcess::spawn(&definition, logs, status_tx)
            .await
            .unwrap();
        process.mark_stop_requested();
        process.write_line("stop").await.unwrap();

        assert_eq!(status_rx.recv().await, Some(ServerStatus::Offline));
    }

    #[tokio::test]
    async fn kill_terminates_a_stuck_process() {
        let temp_dir = tempfile::tempdir().unwrap();
        // ignores its stdin, would run for a minute
        let java = fake_java(temp_dir.path(), "sleep 60");
        let definition = definition(temp_dir.path(), java);
        let logs = Arc::new(LogBuffer::new(100));
        let (status_tx, mut status_rx) = mpsc::channel(8);

        let process = ServerProcess::spawn(&definition, logs, status_tx)
            .await
            .unwrap();
        process.kill();

        assert_eq!(status_rx.recv().await, Some(ServerStatus::Offline));
        assert!(process.exited());
    }
}
