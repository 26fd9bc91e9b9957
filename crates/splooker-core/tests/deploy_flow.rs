mod common;

use splooker_core::models::{DeployPhase, InstanceRecord, ProvisionalLaunch, Registry};
use splooker_core::services::initialize;
use splooker_core::services::journal::ProvisionalJournal;
use splooker_core::DeployError;

use common::{set, TestEnv};

fn journal(env: &TestEnv) -> ProvisionalJournal {
    ProvisionalJournal::new(&env.settings.journal_path())
}

#[tokio::test]
async fn first_deploy_records_single_instance() {
    let env = TestEnv::new().await;
    let report = env.deployer().deploy("web").await.unwrap();

    assert_eq!(report.port, 8002);
    assert_eq!(report.instance_id, "web-id-1");
    assert!(report.previous.is_none());
    assert!(!report.retire_failed);
    assert_eq!(report.phases, DeployPhase::ALL.to_vec());

    let registry = env.registry().await;
    assert_eq!(registry.services.len(), 1);
    assert_eq!(
        registry.services["web"],
        InstanceRecord {
            instance_id: "web-id-1".into(),
            port: 8002,
        }
    );
    assert_eq!(registry.last_allocated_port, 8002);

    assert_eq!(
        env.log.events(),
        vec!["stage web 8002", "validate", "launch web 8002", "activate"]
    );
    assert!(journal(&env).load().await.unwrap().is_empty());
}

#[tokio::test]
async fn redeploy_retires_previous_instance() {
    let env = TestEnv::new().await;
    let deployer = env.deployer();
    let first = deployer.deploy("web").await.unwrap();
    env.log.clear();

    let second = deployer.deploy("web").await.unwrap();

    assert_ne!(first.port, second.port);
    assert_eq!(second.port, 8003);
    assert_eq!(
        second.previous,
        Some(InstanceRecord {
            instance_id: first.instance_id.clone(),
            port: first.port,
        })
    );
    assert_eq!(
        env.log.events(),
        vec![
            "stage web 8003",
            "validate",
            "launch web 8003",
            "activate",
            "retire web-id-1",
        ]
    );

    let registry = env.registry().await;
    assert_eq!(registry.services.len(), 1);
    assert_eq!(registry.services["web"].instance_id, second.instance_id);
    assert_eq!(registry.last_allocated_port, 8003);
}

#[tokio::test]
async fn services_get_distinct_ports() {
    let env = TestEnv::new().await;
    let deployer = env.deployer();
    let web = deployer.deploy("web").await.unwrap();
    let api = deployer.deploy("api").await.unwrap();

    assert_ne!(web.port, api.port);
    let registry = env.registry().await;
    assert_eq!(registry.services.len(), 2);
    assert!(!env.log.events().iter().any(|e| e.starts_with("retire")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_deploys_get_distinct_ports() {
    let env = TestEnv::new().await;
    let (a, b) = (env.deployer(), env.deployer());

    let (web, api) = tokio::join!(a.deploy("web"), b.deploy("api"));
    let (web, api) = (web.unwrap(), api.unwrap());

    assert_ne!(web.port, api.port);
    let mut ports = vec![web.port, api.port];
    ports.sort_unstable();
    assert_eq!(ports, vec![8002, 8003]);

    let registry = env.registry().await;
    assert_eq!(registry.services.len(), 2);
    assert_eq!(
        registry.services["web"],
        InstanceRecord {
            instance_id: web.instance_id,
            port: web.port,
        }
    );
    assert_eq!(
        registry.services["api"],
        InstanceRecord {
            instance_id: api.instance_id,
            port: api.port,
        }
    );
    assert!(journal(&env).load().await.unwrap().is_empty());
}

#[tokio::test]
async fn launch_failure_leaves_registry_unchanged() {
    let env = TestEnv::new().await;
    let deployer = env.deployer();
    deployer.deploy("web").await.unwrap();
    let before = env.registry_bytes();
    env.log.clear();

    set(&env.runtime.fail_launch, true);
    let err = deployer.deploy("web").await.unwrap_err();

    match err {
        DeployError::Launch { stderr } => assert_eq!(stderr, "pull access denied"),
        other => panic!("expected launch error, got {other:?}"),
    }
    assert_eq!(env.registry_bytes(), before);
    assert_eq!(
        env.log.events(),
        vec!["stage web 8003", "validate", "launch web 8003"]
    );
}

#[tokio::test]
async fn validation_failure_stops_before_launch() {
    let env = TestEnv::new().await;
    set(&env.proxy.fail_validate, true);

    let err = env.deployer().deploy("web").await.unwrap_err();

    assert!(matches!(err, DeployError::Validation(_)));
    assert_eq!(env.log.events(), vec!["stage web 8002", "validate"]);
    assert_eq!(env.registry().await, Registry::default());
}

#[tokio::test]
async fn reload_failure_keeps_instance_in_journal() {
    let env = TestEnv::new().await;
    set(&env.proxy.fail_reload, true);

    let err = env.deployer().deploy("web").await.unwrap_err();

    assert!(matches!(err, DeployError::Reload(_)));
    assert_eq!(env.registry().await, Registry::default());
    assert!(!env.log.events().iter().any(|e| e.starts_with("retire")));

    let entries = journal(&env).load().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].service, "web");
    assert_eq!(entries[0].instance_id, "web-id-1");
    assert_eq!(entries[0].port, 8002);
}

#[tokio::test]
async fn sweep_retires_uncommitted_instances() {
    let env = TestEnv::new().await;
    set(&env.proxy.fail_reload, true);
    let deployer = env.deployer();
    deployer.deploy("web").await.unwrap_err();
    env.log.clear();

    let report = deployer.sweep().await.unwrap();

    assert_eq!(report.retired, vec!["web-id-1".to_string()]);
    assert!(report.cleared.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(env.log.events(), vec!["retire web-id-1"]);
    assert!(journal(&env).load().await.unwrap().is_empty());
}

#[tokio::test]
async fn sweep_clears_committed_entries_without_retiring() {
    let env = TestEnv::new().await;
    let deployer = env.deployer();
    let report = deployer.deploy("web").await.unwrap();
    journal(&env)
        .record(ProvisionalLaunch::new("web", &report.instance_id, report.port))
        .await
        .unwrap();
    env.log.clear();

    let sweep = deployer.sweep().await.unwrap();

    assert_eq!(sweep.cleared, vec![report.instance_id.clone()]);
    assert!(sweep.retired.is_empty());
    assert!(env.log.events().is_empty());
    assert_eq!(env.registry().await.services["web"].instance_id, report.instance_id);
}

#[tokio::test]
async fn sweep_keeps_entries_it_cannot_retire() {
    let env = TestEnv::new().await;
    set(&env.proxy.fail_reload, true);
    let deployer = env.deployer();
    deployer.deploy("web").await.unwrap_err();

    set(&env.runtime.fail_retire, true);
    let report = deployer.sweep().await.unwrap();

    assert_eq!(report.failed, vec!["web-id-1".to_string()]);
    assert_eq!(journal(&env).load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn sweep_treats_vanished_instance_as_retired() {
    let env = TestEnv::new().await;
    let deployer = env.deployer();
    let first = deployer.deploy("web").await.unwrap();
    deployer.deploy("web").await.unwrap();
    // Leftover entry for an instance that was committed, then replaced.
    journal(&env)
        .record(ProvisionalLaunch::new("web", &first.instance_id, first.port))
        .await
        .unwrap();
    env.log.clear();

    set(&env.runtime.missing, true);
    let report = deployer.sweep().await.unwrap();

    assert_eq!(report.retired, vec![first.instance_id.clone()]);
    assert!(report.failed.is_empty());
    assert_eq!(env.log.events(), vec![format!("retire {}", first.instance_id)]);
    assert!(journal(&env).load().await.unwrap().is_empty());
}

#[tokio::test]
async fn redeploy_tolerates_vanished_previous_instance() {
    let env = TestEnv::new().await;
    let deployer = env.deployer();
    deployer.deploy("web").await.unwrap();

    set(&env.runtime.missing, true);
    let report = deployer.deploy("web").await.unwrap();

    assert!(!report.retire_failed);
    assert_eq!(env.registry().await.services["web"].instance_id, report.instance_id);
}

#[tokio::test]
async fn retire_failure_is_not_fatal() {
    let env = TestEnv::new().await;
    let deployer = env.deployer();
    deployer.deploy("web").await.unwrap();

    set(&env.runtime.fail_retire, true);
    let report = deployer.deploy("web").await.unwrap();

    assert!(report.retire_failed);
    assert_eq!(report.phases.last(), Some(&DeployPhase::Done));
    let registry = env.registry().await;
    assert_eq!(registry.services["web"].instance_id, "web-id-2");
}

#[tokio::test]
async fn full_pool_aborts_before_any_side_effect() {
    let env = TestEnv::new().await;
    let mut registry = Registry::new(8000, 1);
    registry.commit(
        "api",
        InstanceRecord {
            instance_id: "api-id-0".into(),
            port: 8000,
        },
    );
    env.store().save(&registry).await.unwrap();

    let err = env.deployer().deploy("web").await.unwrap_err();

    assert!(matches!(err, DeployError::PoolExhausted { pool_size: 1 }));
    assert!(env.log.events().is_empty());
    assert_eq!(env.registry().await, registry);
}

#[tokio::test]
async fn pool_wraps_to_freed_port() {
    let env = TestEnv::new().await;
    let mut registry = Registry::new(8000, 3);
    registry.commit(
        "api",
        InstanceRecord {
            instance_id: "api-id-0".into(),
            port: 8001,
        },
    );
    registry.last_allocated_port = 8002;
    env.store().save(&registry).await.unwrap();

    let report = env.deployer().deploy("web").await.unwrap();

    assert_eq!(report.port, 8000);
    assert_eq!(env.registry().await.last_allocated_port, 8000);
}

#[tokio::test]
async fn unknown_service_is_not_found() {
    let env = TestEnv::new().await;
    let err = env.deployer().deploy("billing").await.unwrap_err();
    assert!(matches!(err, DeployError::ServiceNotFound(_)));
    assert!(env.log.events().is_empty());
}

#[tokio::test]
async fn invalid_service_name_is_rejected() {
    let env = TestEnv::new().await;
    let err = env.deployer().deploy("../web").await.unwrap_err();
    assert!(matches!(err, DeployError::InvalidServiceName(_)));
}

#[tokio::test]
async fn missing_registry_is_not_found() {
    let env = TestEnv::new().await;
    std::fs::remove_file(env.settings.registry_path()).unwrap();
    let err = env.deployer().deploy("web").await.unwrap_err();
    assert!(matches!(err, DeployError::RegistryNotFound(_)));
    assert!(env.log.events().is_empty());
}

#[tokio::test]
async fn initialize_refuses_to_overwrite_without_force() {
    let env = TestEnv::new().await;
    env.deployer().deploy("web").await.unwrap();

    let err = initialize(&env.settings, false).await.unwrap_err();
    assert!(matches!(err, DeployError::RegistryExists(_)));
    assert_eq!(env.registry().await.services.len(), 1);

    let registry = initialize(&env.settings, true).await.unwrap();
    assert_eq!(registry, Registry::default());
    assert_eq!(env.registry().await, Registry::default());
    assert!(env.settings.staging_dir().is_dir());
}
