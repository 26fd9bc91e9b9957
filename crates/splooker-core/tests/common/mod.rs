// Each test binary compiles this module independently and uses a different
// subset of helpers, so unused-function warnings are expected.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use splooker_core::models::{Registry, ServiceDefinition, Settings};
use splooker_core::services::registry_store::RegistryStore;
use splooker_core::services::{initialize, ContainerRuntime, Deployer, ReverseProxy};
use splooker_core::{DeployError, Result};

/// Ordered record of every collaborator call, shared by the fakes.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

#[derive(Clone)]
pub struct FakeRuntime {
    log: EventLog,
    launches: Arc<AtomicU32>,
    pub fail_launch: Arc<AtomicBool>,
    pub fail_retire: Arc<AtomicBool>,
    pub missing: Arc<AtomicBool>,
}

impl FakeRuntime {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            launches: Arc::new(AtomicU32::new(0)),
            fail_launch: Arc::new(AtomicBool::new(false)),
            fail_retire: Arc::new(AtomicBool::new(false)),
            missing: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn launch(
        &self,
        service: &str,
        port: u16,
        _definition: &ServiceDefinition,
    ) -> Result<String> {
        self.log.push(format!("launch {service} {port}"));
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(DeployError::Launch {
                stderr: "pull access denied".into(),
            });
        }
        let n = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{service}-id-{n}"))
    }

    async fn retire(&self, instance_id: &str) -> Result<()> {
        self.log.push(format!("retire {instance_id}"));
        if self.missing.load(Ordering::SeqCst) {
            return Err(DeployError::InstanceNotFound(instance_id.to_string()));
        }
        if self.fail_retire.load(Ordering::SeqCst) {
            return Err(DeployError::Retire {
                instance_id: instance_id.to_string(),
                reason: "device or resource busy".into(),
            });
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeProxy {
    log: EventLog,
    pub fail_validate: Arc<AtomicBool>,
    pub fail_reload: Arc<AtomicBool>,
}

impl FakeProxy {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_validate: Arc::new(AtomicBool::new(false)),
            fail_reload: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl ReverseProxy for FakeProxy {
    async fn stage(&self, service: &str, port: u16) -> Result<()> {
        self.log.push(format!("stage {service} {port}"));
        Ok(())
    }

    async fn validate(&self) -> Result<()> {
        self.log.push("validate".into());
        if self.fail_validate.load(Ordering::SeqCst) {
            return Err(DeployError::Validation("unexpected \"}\"".into()));
        }
        Ok(())
    }

    async fn activate(&self) -> Result<()> {
        self.log.push("activate".into());
        if self.fail_reload.load(Ordering::SeqCst) {
            return Err(DeployError::Reload("exit 1: nginx is not running".into()));
        }
        Ok(())
    }
}

/// An initialized base directory with `web` and `api` service definitions.
pub struct TestEnv {
    pub dir: TempDir,
    pub settings: Settings,
    pub log: EventLog,
    pub runtime: FakeRuntime,
    pub proxy: FakeProxy,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::with_base_path(dir.path());
        settings.probe.max_attempts = 1;
        settings.probe.connect_timeout_ms = 50;
        settings.probe.retry_interval_ms = 0;

        initialize(&settings, false).await.unwrap();

        let log = EventLog::default();
        let env = Self {
            runtime: FakeRuntime::new(log.clone()),
            proxy: FakeProxy::new(log.clone()),
            dir,
            settings,
            log,
        };
        env.write_service("web");
        env.write_service("api");
        env
    }

    pub fn write_service(&self, name: &str) {
        let json = r#"{
  "image": "ghcr.io/acme/app:latest",
  "command": [],
  "docker_args": ["-p", "127.0.0.1:$port:80"]
}"#;
        std::fs::write(self.settings.services_dir().join(format!("{name}.json")), json).unwrap();
    }

    pub fn deployer(&self) -> Deployer<FakeRuntime, FakeProxy> {
        Deployer::new(
            self.settings.clone(),
            self.runtime.clone(),
            self.proxy.clone(),
        )
    }

    pub fn store(&self) -> RegistryStore {
        RegistryStore::new(&self.settings.registry_path())
    }

    pub async fn registry(&self) -> Registry {
        self.store().load().await.unwrap()
    }

    pub fn registry_bytes(&self) -> Vec<u8> {
        std::fs::read(self.settings.registry_path()).unwrap()
    }
}

pub fn set(flag: &AtomicBool, value: bool) {
    flag.store(value, Ordering::SeqCst);
}
