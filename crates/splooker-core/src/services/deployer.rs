use crate::error::{DeployError, Result};
use crate::models::{
    DeployPhase, DeploymentReport, InstanceRecord, ProvisionalLaunch, Registry, Settings,
    SweepReport,
};

use super::docker::ContainerRuntime;
use super::journal::ProvisionalJournal;
use super::lock::DeployLock;
use super::nginx::ReverseProxy;
use super::ports;
use super::probe::ReadinessProbe;
use super::registry_store::RegistryStore;
use super::service_loader;

/// Create the directory layout and write an empty registry with the default
/// pool. An existing registry is only replaced when `force` is set.
pub async fn initialize(settings: &Settings, force: bool) -> Result<Registry> {
    for dir in [
        settings.base_path.clone(),
        settings.services_dir(),
        settings.staging_dir(),
    ] {
        tracing::info!("creating directory {}", dir.display());
        tokio::fs::create_dir_all(&dir).await?;
    }

    let store = RegistryStore::new(&settings.registry_path());
    if store.exists() && !force {
        return Err(DeployError::RegistryExists(store.path().to_path_buf()));
    }
    let registry = Registry::default();
    store.save(&registry).await?;
    tracing::info!(path = %store.path().display(), "registry initialized");
    Ok(registry)
}

/// Records the phases a deployment walks through.
struct Progress<'a> {
    service: &'a str,
    phases: Vec<DeployPhase>,
}

impl<'a> Progress<'a> {
    fn new(service: &'a str) -> Self {
        let mut progress = Self {
            service,
            phases: Vec::with_capacity(DeployPhase::ALL.len()),
        };
        progress.advance(DeployPhase::Start);
        progress
    }

    fn advance(&mut self, phase: DeployPhase) {
        tracing::info!(service = %self.service, %phase, "deployment phase");
        self.phases.push(phase);
    }
}

/// Runs the staged cutover for one service at a time.
pub struct Deployer<R, P> {
    settings: Settings,
    store: RegistryStore,
    journal: ProvisionalJournal,
    runtime: R,
    proxy: P,
    probe: ReadinessProbe,
}

impl<R: ContainerRuntime, P: ReverseProxy> Deployer<R, P> {
    pub fn new(settings: Settings, runtime: R, proxy: P) -> Self {
        let store = RegistryStore::new(&settings.registry_path());
        let journal = ProvisionalJournal::new(&settings.journal_path());
        let probe = ReadinessProbe::from_settings(&settings.probe);
        Self {
            settings,
            store,
            journal,
            runtime,
            proxy,
            probe,
        }
    }

    /// Deploy a fresh instance of `service` and cut traffic over to it.
    ///
    /// Fatal errors leave the registry untouched. Side effects already
    /// performed (a promoted proxy fragment, a launched instance) are not
    /// undone; a launched instance stays in the provisional journal for
    /// [`Deployer::sweep`].
    pub async fn deploy(&self, service: &str) -> Result<DeploymentReport> {
        let definition = service_loader::load(&self.settings.services_dir(), service).await?;
        let _lock = DeployLock::acquire(&self.settings.lock_path()).await?;

        let mut progress = Progress::new(service);
        let mut registry = self.store.load().await?;
        let port = ports::allocate(&registry)?;
        tracing::info!(%service, port, "allocated port");
        progress.advance(DeployPhase::PortAllocated);

        self.proxy.stage(service, port).await?;
        progress.advance(DeployPhase::ProxyStaged);

        self.proxy.validate().await?;
        progress.advance(DeployPhase::ProxyValidated);

        let instance_id = self.runtime.launch(service, port, &definition).await?;
        progress.advance(DeployPhase::InstanceLaunched);

        if let Err(e) = self
            .journal
            .record(ProvisionalLaunch::new(service, &instance_id, port))
            .await
        {
            tracing::warn!(%service, %instance_id, error = %e, "failed to journal provisional launch");
        }

        let probe_settings = &self.settings.probe;
        let ready = self
            .probe
            .wait_ready(&probe_settings.host, port, probe_settings.max_attempts)
            .await;
        if !ready {
            tracing::warn!(
                %service,
                port,
                attempts = probe_settings.max_attempts,
                "instance did not become reachable, activating anyway"
            );
        }
        progress.advance(DeployPhase::Probed);

        self.proxy.activate().await?;
        progress.advance(DeployPhase::ProxyActivated);

        let previous = registry.services.get(service).cloned();
        let mut retire_failed = false;
        if let Some(old) = &previous {
            tracing::info!(%service, instance_id = %old.instance_id, "retiring old instance");
            match self.runtime.retire(&old.instance_id).await {
                Ok(()) => {}
                Err(DeployError::InstanceNotFound(id)) => {
                    tracing::info!(%service, instance_id = %id, "old instance already gone");
                }
                Err(e) => {
                    tracing::error!(%service, error = %e, "failed to retire old instance; it may still be running");
                    retire_failed = true;
                }
            }
        }
        progress.advance(DeployPhase::OldInstanceRetired);

        registry.commit(
            service,
            InstanceRecord {
                instance_id: instance_id.clone(),
                port,
            },
        );
        self.store.save(&registry).await?;
        progress.advance(DeployPhase::RegistryCommitted);

        if let Err(e) = self.journal.clear(service, &instance_id).await {
            tracing::warn!(%service, %instance_id, error = %e, "failed to clear provisional launch");
        }
        progress.advance(DeployPhase::Done);

        Ok(DeploymentReport {
            service: service.to_string(),
            instance_id,
            port,
            previous,
            ready,
            retire_failed,
            phases: progress.phases,
        })
    }

    /// Retire instances left behind by deployments that launched but never
    /// committed. An instance that no longer exists counts as retired.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let _lock = DeployLock::acquire(&self.settings.lock_path()).await?;
        let registry = self.store.load().await?;
        let mut report = SweepReport::default();

        for entry in self.journal.load().await? {
            let committed = registry
                .services
                .get(&entry.service)
                .is_some_and(|r| r.instance_id == entry.instance_id);

            if committed {
                tracing::info!(service = %entry.service, instance_id = %entry.instance_id, "journal entry already committed");
                self.journal.clear(&entry.service, &entry.instance_id).await?;
                report.cleared.push(entry.instance_id);
                continue;
            }

            match self.runtime.retire(&entry.instance_id).await {
                Ok(()) | Err(DeployError::InstanceNotFound(_)) => {
                    tracing::info!(service = %entry.service, instance_id = %entry.instance_id, "retired provisional instance");
                    self.journal.clear(&entry.service, &entry.instance_id).await?;
                    report.retired.push(entry.instance_id);
                }
                Err(e) => {
                    tracing::warn!(service = %entry.service, error = %e, "provisional instance left in journal");
                    report.failed.push(entry.instance_id);
                }
            }
        }
        Ok(report)
    }
}
