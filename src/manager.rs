use futures::stream::{self, Stream, StreamExt};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::TunnelError;
use crate::prompt::Confirm;
use crate::ssh::tunnel::{self, CreateRequest, Tunnel};
use crate::systemd::store::DescriptorStore;
use crate::systemd::supervisor::{Supervisor, UnitStatus};
use crate::systemd::unit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelEntry {
    pub name: String,
    pub status: UnitStatus,
}

/// Create, list, start, stop and delete tunnels. Holds no state of its own:
/// every call re-reads the unit directory and asks the supervisor.
pub struct TunnelManager<D, S, C> {
    store: D,
    supervisor: S,
    prompt: C,
    ssh_path: PathBuf,
}

impl<D, S, C> TunnelManager<D, S, C>
where
    D: DescriptorStore,
    S: Supervisor,
    C: Confirm,
{
    pub fn new(store: D, supervisor: S, prompt: C, ssh_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            supervisor,
            prompt,
            ssh_path: ssh_path.into(),
        }
    }

    /// Write the unit file and start it, enabling it first when persistent.
    /// Overwriting an existing tunnel also brings its login registration in
    /// line with the request and restarts it when the unit changed.
    /// Returns the tunnel as written, including a generated name if none was given.
    pub async fn create(&mut self, request: &CreateRequest) -> Result<Tunnel, TunnelError> {
        let name = request.name.clone().unwrap_or_else(generate_name);
        let tunnel = Tunnel::from_request(request, name)?;

        let previous = match request.name {
            Some(_) => self.store.read(&tunnel.name)?,
            None => None,
        };
        if previous.is_some() {
            let question = format!("Tunnel '{}' already exists. Overwrite it?", tunnel.name);
            if !self.prompt.confirm(&question)? {
                return Err(TunnelError::Aborted);
            }
        } else if !tunnel::is_port_available(tunnel.local_port) {
            tracing::warn!(
                port = tunnel.local_port,
                "local port is already in use; the tunnel will keep restarting until it is free"
            );
        }

        let descriptor = unit::render(&tunnel, &self.ssh_path);
        let changed = previous.as_deref() != Some(descriptor.as_str());
        if changed {
            self.store.write(&tunnel.name, &descriptor)?;
            self.reload().await;
        } else {
            tracing::debug!(name = %tunnel.name, "unit file unchanged");
        }

        let service = unit::unit_name(&tunnel.name);
        match (previous.is_some(), tunnel.persistent) {
            (false, true) => self.supervisor.enable_now(&service).await?,
            (false, false) => self.supervisor.start(&service).await?,
            (true, persistent) => {
                if persistent {
                    self.supervisor.enable(&service).await?;
                } else {
                    self.supervisor.disable(&service).await?;
                }
                // A running instance keeps its old command line until restarted.
                if changed {
                    self.supervisor.restart(&service).await?;
                } else {
                    self.supervisor.start(&service).await?;
                }
            }
        }

        tracing::info!(
            name = %tunnel.name,
            forward = %tunnel.forward_spec(),
            persistent = tunnel.persistent,
            replaced = previous.is_some(),
            "tunnel created"
        );
        Ok(tunnel)
    }

    /// Every known tunnel with its current status, in name order. Statuses are
    /// queried as the stream is polled; call again for a fresh pass.
    pub fn list(&self) -> Result<impl Stream<Item = TunnelEntry> + '_, TunnelError> {
        let names = self.store.names()?;
        Ok(stream::iter(names).then(move |name| async move {
            let status = self.supervisor.status(&unit::unit_name(&name)).await;
            TunnelEntry { name, status }
        }))
    }

    pub async fn start(&self, name: &str) -> Result<(), TunnelError> {
        self.ensure_exists(name)?;
        self.supervisor.start(&unit::unit_name(name)).await?;
        tracing::info!(name, "tunnel started");
        Ok(())
    }

    pub async fn stop(&self, name: &str) -> Result<(), TunnelError> {
        self.ensure_exists(name)?;
        self.supervisor.stop(&unit::unit_name(name)).await?;
        tracing::info!(name, "tunnel stopped");
        Ok(())
    }

    /// Stop, unregister, and remove a tunnel after confirmation.
    pub async fn delete(&mut self, name: &str) -> Result<(), TunnelError> {
        self.ensure_exists(name)?;

        let question = format!("Delete tunnel '{name}'?");
        if !self.prompt.confirm(&question)? {
            return Err(TunnelError::Aborted);
        }

        // Stop before unlinking so no process outlives its unit file.
        let service = unit::unit_name(name);
        if let Err(e) = self.supervisor.stop(&service).await {
            tracing::warn!(name, error = %e, "stop failed, removing anyway");
        }
        if let Err(e) = self.supervisor.disable(&service).await {
            tracing::warn!(name, error = %e, "disable failed, removing anyway");
        }

        self.store.remove(name)?;
        self.reload().await;

        tracing::info!(name, "tunnel deleted");
        Ok(())
    }

    fn ensure_exists(&self, name: &str) -> Result<(), TunnelError> {
        // A name no tunnel could have been created with cannot exist.
        if tunnel::validate_name(name).is_err() || !self.store.exists(name)? {
            return Err(TunnelError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn reload(&self) {
        if let Err(e) = self.supervisor.reload().await {
            tracing::warn!(error = %e, "daemon-reload failed");
        }
    }
}

fn generate_name() -> String {
    Uuid::new_v4().to_string()
}
