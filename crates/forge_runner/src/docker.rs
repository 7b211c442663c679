//! Docker-backed sandbox.
//!
//! Each session is one long-lived container with the session directory
//! bind-mounted at `/workspace`. Commands run through the exec API; the
//! container is force-removed when the session is destroyed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, RemoveContainerOptions, StartContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::service::{HostConfig, Mount, MountTypeEnum};
use bollard::Docker;
use chrono::Utc;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::Command;
use crate::error::{SandboxError, SandboxResult};
use crate::sandbox::{ExecOutput, SandboxProvider, SandboxSession, SandboxState};

/// Mount point of the session directory inside the container.
pub const CONTAINER_ROOT: &str = "/workspace";

/// Options for the Docker sandbox.
#[derive(Debug, Clone)]
pub struct DockerSandboxOptions {
    /// Image to run sessions in
    pub image: String,
    /// Image tag
    pub tag: String,
    /// Memory limit in bytes
    pub memory_limit: Option<i64>,
    /// CPU limit (number of CPUs)
    pub cpu_limit: Option<f64>,
    /// Network mode (e.g. "none" to cut network access)
    pub network_mode: Option<String>,
    /// Parent directory for session directories on the host
    pub base_dir: Option<PathBuf>,
}

impl Default for DockerSandboxOptions {
    fn default() -> Self {
        Self {
            image: "node".to_string(),
            tag: "20-slim".to_string(),
            memory_limit: Some(2 * 1024 * 1024 * 1024),
            cpu_limit: Some(2.0),
            network_mode: None,
            base_dir: None,
        }
    }
}

impl DockerSandboxOptions {
    pub fn image(mut self, image: impl Into<String>, tag: impl Into<String>) -> Self {
        self.image = image.into();
        self.tag = tag.into();
        self
    }

    pub fn network(mut self, mode: impl Into<String>) -> Self {
        self.network_mode = Some(mode.into());
        self
    }

    pub fn full_image(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

struct DockerSession {
    container_id: String,
    dir: TempDir,
}

/// Runs its cleanup on drop unless disarmed.
///
/// Held across the awaits in `create`, so a container whose creation is
/// cancelled or fails half-way is still removed.
struct CleanupGuard<F: FnOnce()> {
    cleanup: Option<F>,
}

impl<F: FnOnce()> CleanupGuard<F> {
    fn new(cleanup: F) -> Self {
        Self { cleanup: Some(cleanup) }
    }

    fn disarm(mut self) {
        self.cleanup = None;
    }
}

impl<F: FnOnce()> Drop for CleanupGuard<F> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

/// Force-remove a container from a background task.
fn remove_detached(client: Docker, container: String) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                let options = RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                };
                match client.remove_container(&container, Some(options)).await {
                    Ok(()) => debug!("Removed abandoned container {}", container),
                    Err(e) => warn!("Failed to remove abandoned container {}: {}", container, e),
                }
            });
        }
        Err(_) => warn!("No runtime left to remove container {}", container),
    }
}

/// Sandbox running each session in its own container.
pub struct DockerSandbox {
    client: Docker,
    options: DockerSandboxOptions,
    sessions: Mutex<HashMap<String, DockerSession>>,
}

impl DockerSandbox {
    /// Connect to the local Docker daemon.
    pub async fn new(options: DockerSandboxOptions) -> SandboxResult<Self> {
        let client = Docker::connect_with_local_defaults()?;
        client.ping().await?;

        Ok(Self {
            client,
            options,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    async fn ensure_image(&self) -> SandboxResult<()> {
        let full_image = self.options.full_image();
        match self.client.inspect_image(&full_image).await {
            Ok(_) => return Ok(()),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {}
            Err(e) => return Err(e.into()),
        }

        info!("Pulling image {}", full_image);
        let options = CreateImageOptions {
            from_image: self.options.image.as_str(),
            tag: self.options.tag.as_str(),
            ..Default::default()
        };

        let mut stream = self.client.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(status) = info.status {
                        debug!("Pull status: {}", status);
                    }
                }
                Err(e) => return Err(SandboxError::ImagePullFailed(e.to_string())),
            }
        }
        Ok(())
    }

    fn container_id(&self, session: &SandboxSession) -> SandboxResult<String> {
        self.sessions
            .lock()
            .get(&session.id)
            .map(|s| s.container_id.clone())
            .ok_or_else(|| SandboxError::SessionNotFound(session.id.clone()))
    }

    async fn run_exec(&self, container_id: &str, command: &Command) -> SandboxResult<(i64, String, String)> {
        let workdir = match &command.working_dir {
            Some(dir) => format!("{}/{}", CONTAINER_ROOT, dir.trim_start_matches('/')),
            None => CONTAINER_ROOT.to_string(),
        };

        let mut cmd = vec![command.program.clone()];
        cmd.extend(command.args.iter().cloned());

        let env: Vec<String> = command
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let exec = self
            .client
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(cmd),
                    env: Some(env),
                    working_dir: Some(workdir),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached { mut output, .. } =
            self.client.start_exec(&exec.id, None).await?
        {
            while let Some(chunk) = output.next().await {
                match chunk {
                    Ok(LogOutput::StdOut { message }) => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(_) => {}
                    Err(e) => return Err(SandboxError::ExecutionFailed(e.to_string())),
                }
            }
        }

        let exit_code = self
            .client
            .inspect_exec(&exec.id)
            .await?
            .exit_code
            .unwrap_or(-1);

        Ok((exit_code, stdout, stderr))
    }
}

#[async_trait]
impl SandboxProvider for DockerSandbox {
    fn name(&self) -> &str {
        "docker"
    }

    async fn is_available(&self) -> bool {
        self.client.ping().await.is_ok()
    }

    async fn create(&self) -> SandboxResult<SandboxSession> {
        self.ensure_image().await?;

        let id = Uuid::new_v4().to_string();
        let mut builder = tempfile::Builder::new();
        builder.prefix("forge-docker-");
        let dir = match &self.options.base_dir {
            Some(base) => builder.tempdir_in(base),
            None => builder.tempdir(),
        }
        .map_err(|e| SandboxError::CreateFailed(e.to_string()))?;

        let host_config = HostConfig {
            mounts: Some(vec![Mount {
                target: Some(CONTAINER_ROOT.to_string()),
                source: Some(dir.path().to_string_lossy().to_string()),
                typ: Some(MountTypeEnum::BIND),
                read_only: Some(false),
                ..Default::default()
            }]),
            memory: self.options.memory_limit,
            nano_cpus: self.options.cpu_limit.map(|c| (c * 1_000_000_000.0) as i64),
            network_mode: self.options.network_mode.clone(),
            ..Default::default()
        };

        let config = Config {
            image: Some(self.options.full_image()),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            working_dir: Some(CONTAINER_ROOT.to_string()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let name = format!("forge-{}", &id[..8]);

        // Removal goes by name: the daemon may create the container even if
        // this future is dropped before the response arrives.
        let guard = {
            let client = self.client.clone();
            let name = name.clone();
            CleanupGuard::new(move || remove_detached(client, name))
        };

        let created = self
            .client
            .create_container(
                Some(CreateContainerOptions {
                    name: name.as_str(),
                    platform: None,
                }),
                config,
            )
            .await;
        let container = match created {
            Ok(container) => container,
            Err(e) => {
                // A rejected create leaves nothing behind, and the name may
                // belong to someone else.
                guard.disarm();
                return Err(SandboxError::CreateFailed(e.to_string()));
            }
        };

        if let Err(e) = self
            .client
            .start_container(&container.id, None::<StartContainerOptions<String>>)
            .await
        {
            guard.disarm();
            let options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            if let Err(remove_err) = self.client.remove_container(&container.id, Some(options)).await {
                warn!("Failed to remove unstarted container {}: {}", container.id, remove_err);
            }
            return Err(SandboxError::CreateFailed(e.to_string()));
        }

        let session = SandboxSession::new(&id, dir.path().to_path_buf(), self.name());
        info!("Created docker sandbox {} (container {})", id, container.id);

        guard.disarm();
        self.sessions.lock().insert(
            id,
            DockerSession {
                container_id: container.id,
                dir,
            },
        );
        Ok(session)
    }

    async fn execute(&self, session: &SandboxSession, command: &Command) -> SandboxResult<ExecOutput> {
        session.ensure_active()?;
        let container_id = self.container_id(session)?;

        debug!("[{}] $ {}", session.id, command.display());
        let started_at = Utc::now();
        let start = Instant::now();

        let (exit_code, stdout, stderr) = match command.timeout() {
            Some(limit) => match timeout(limit, self.run_exec(&container_id, command)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("[{}] '{}' timed out", session.id, command.display());
                    return Err(SandboxError::Timeout(limit.as_secs()));
                }
            },
            None => self.run_exec(&container_id, command).await?,
        };

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at: Utc::now(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn destroy(&self, session: &mut SandboxSession) -> SandboxResult<()> {
        let entry = self
            .sessions
            .lock()
            .remove(&session.id)
            .ok_or_else(|| SandboxError::SessionNotFound(session.id.clone()))?;

        session.state = SandboxState::Destroyed;

        let removal = self
            .client
            .remove_container(
                &entry.container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;

        // The directory goes regardless of whether the daemon cooperated.
        entry.dir.close()?;
        removal?;

        info!("Destroyed docker sandbox {}", session.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DockerSandboxOptions::default();
        assert_eq!(options.full_image(), "node:20-slim");
        assert!(options.network_mode.is_none());
    }

    #[test]
    fn test_options_builder() {
        let options = DockerSandboxOptions::default()
            .image("oven/bun", "1.1")
            .network("none");
        assert_eq!(options.full_image(), "oven/bun:1.1");
        assert_eq!(options.network_mode.as_deref(), Some("none"));
    }

    #[test]
    fn test_cleanup_guard_runs_unless_disarmed() {
        let cleaned = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let counter = cleaned.clone();
        drop(CleanupGuard::new(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }));
        assert_eq!(cleaned.load(std::sync::atomic::Ordering::SeqCst), 1);

        let counter = cleaned.clone();
        CleanupGuard::new(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .disarm();
        assert_eq!(cleaned.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cleanup_guard_runs_when_future_is_cancelled() {
        let cleaned = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = cleaned.clone();

        let creating = async move {
            let guard = CleanupGuard::new(move || {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            });
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            guard.disarm();
        };
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(50), creating).await;

        assert!(outcome.is_err());
        assert_eq!(cleaned.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
