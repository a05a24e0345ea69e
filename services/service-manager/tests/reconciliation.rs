//! Integration tests for service reconciliation.
//!
//! These drive `ServiceManager` directly against an in-memory store and
//! check which start/stop calls each configured/discovered pair produces.

use std::sync::Arc;

use corral_id::{NodeId, ServiceId};
use corral_reconcile::{NoopReason, ProcessState, ServiceState, SyncAction};
use corral_service_manager::{Registry, ServiceInstanceUpdate, ServiceManager};
use corral_state::{service_state_path, MemoryStateStore, StateStore};
use corral_testing::RecordingService;
use rstest::rstest;
use tokio::sync::mpsc;

use ServiceState::*;

struct Fixture {
    node: NodeId,
    manager: ServiceManager,
    store: Arc<MemoryStateStore>,
    svc: Arc<RecordingService>,
    updates: mpsc::Receiver<ServiceInstanceUpdate>,
}

async fn fixture() -> Fixture {
    let node = NodeId::new();
    let (tx, updates) = mpsc::channel(16);
    let store = Arc::new(MemoryStateStore::new());
    let manager = ServiceManager::new(
        node,
        Registry::new(tx, "/run/corral/test.sock"),
        Arc::clone(&store) as Arc<dyn StateStore>,
    );
    let svc = Arc::new(RecordingService::new("svc-a"));
    manager.add_service(svc.clone()).await;

    Fixture {
        node,
        manager,
        store,
        svc,
        updates,
    }
}

fn svc_a() -> ServiceId {
    ServiceId::parse("svc-a").unwrap()
}

impl Fixture {
    async fn set(&self, configured: Option<ServiceState>, discovered: Option<ServiceState>) {
        let path = service_state_path(&svc_a());
        if let Some(c) = configured {
            self.store
                .set_configured(&self.node, &path, c.to_value())
                .await
                .unwrap();
        }
        if let Some(d) = discovered {
            self.store
                .set_discovered(&self.node, &path, d.to_value())
                .await
                .unwrap();
        }
    }

    async fn discovered(&self) -> Option<serde_json::Value> {
        self.store
            .discovered_value(&self.node, &service_state_path(&svc_a()))
            .await
    }
}

#[rstest]
#[case(Run)]
#[case(Stop)]
#[case(Init)]
#[case(Error)]
#[tokio::test]
async fn test_in_sync_is_idempotent(#[case] state: ServiceState) {
    let f = fixture().await;
    f.set(Some(state), Some(state)).await;

    let action = f.manager.sync_service(&svc_a()).await;

    assert_eq!(action, Some(SyncAction::Noop(NoopReason::InSync)));
    assert_eq!(f.svc.starts(), 0);
    assert_eq!(f.svc.stops(), 0);
    assert_eq!(f.discovered().await, Some(state.to_value()));
}

#[tokio::test]
async fn test_no_duplicate_start_while_init() {
    let f = fixture().await;
    f.set(Some(Run), Some(Init)).await;

    f.manager.sync_service(&svc_a()).await;
    f.manager.sync_service(&svc_a()).await;

    assert_eq!(f.svc.starts(), 0);
}

#[rstest]
#[case(None)]
#[case(Some(Unknown))]
#[case(Some(Stop))]
#[tokio::test]
async fn test_start_issued(#[case] discovered: Option<ServiceState>) {
    let f = fixture().await;
    f.set(Some(Run), discovered).await;

    let action = f.manager.sync_service(&svc_a()).await;

    assert_eq!(action, Some(SyncAction::Start));
    assert_eq!(f.svc.starts(), 1);
    assert_eq!(f.svc.stops(), 0);
    // discovered state is left for the instance to report
    assert_eq!(f.discovered().await, discovered.map(ServiceState::to_value));
}

#[rstest]
#[case(Init)]
#[case(Run)]
#[case(Unknown)]
#[tokio::test]
async fn test_stop_always_issued(#[case] discovered: ServiceState) {
    let f = fixture().await;
    f.set(Some(Stop), Some(discovered)).await;

    f.manager.sync_service(&svc_a()).await;
    f.manager.sync_service(&svc_a()).await;

    assert_eq!(f.svc.stops(), 2);
    assert_eq!(f.svc.starts(), 0);
}

#[rstest]
#[case(Run)]
#[case(Stop)]
#[case(Unknown)]
#[case(Init)]
#[tokio::test]
async fn test_error_is_sticky(#[case] configured: ServiceState) {
    let f = fixture().await;
    f.set(Some(configured), Some(Error)).await;

    f.manager.sync_service(&svc_a()).await;

    assert_eq!(f.svc.starts(), 0);
    assert_eq!(f.svc.stops(), 0);
    assert_eq!(f.discovered().await, Some(Error.to_value()));
}

#[tokio::test]
async fn test_configured_without_action_is_noop() {
    let f = fixture().await;
    f.set(Some(Init), Some(Stop)).await;

    assert_eq!(
        f.manager.sync_service(&svc_a()).await,
        Some(SyncAction::Noop(NoopReason::NoTransition))
    );
    assert_eq!(f.svc.starts() + f.svc.stops(), 0);
}

#[tokio::test]
async fn test_failed_start_is_not_propagated() {
    let f = fixture().await;
    f.set(Some(Run), Some(Stop)).await;
    f.svc.fail_starts(true);

    assert_eq!(f.manager.sync_service(&svc_a()).await, Some(SyncAction::Start));
    assert_eq!(f.svc.starts(), 1);
}

#[rstest]
#[case(ProcessState::Run, Init)]
#[case(ProcessState::Stop, Stop)]
#[case(ProcessState::Error, Error)]
#[tokio::test]
async fn test_update_mapping(#[case] reported: ProcessState, #[case] expected: ServiceState) {
    let f = fixture().await;

    f.manager
        .process_update(ServiceInstanceUpdate::new(svc_a(), reported))
        .await;

    assert_eq!(f.discovered().await, Some(expected.to_value()));
}

#[tokio::test]
async fn test_update_does_not_trigger_sync() {
    let f = fixture().await;
    f.set(Some(Run), None).await;

    f.manager
        .process_update(ServiceInstanceUpdate::new(svc_a(), ProcessState::Stop))
        .await;

    assert_eq!(f.svc.starts(), 0);
    assert_eq!(f.discovered().await, Some(Stop.to_value()));
}

#[tokio::test]
async fn test_registration_lifecycle() {
    let mut f = fixture().await;
    assert!(f.svc.is_watched());
    assert_eq!(f.svc.sock(), "/run/corral/test.sock");

    assert!(f.svc.report(ProcessState::Run).await);
    assert_eq!(f.updates.recv().await.unwrap().state, ProcessState::Run);

    let removed = f.manager.del_service(&svc_a()).await;
    assert!(removed.is_some());
    assert!(f.manager.get_service(&svc_a()).await.is_none());
    assert!(!f.svc.is_watched());
    assert_eq!(f.svc.sock(), "");
    assert!(!f.svc.report(ProcessState::Run).await);

    f.set(Some(Run), None).await;
    assert_eq!(f.manager.sync_service(&svc_a()).await, None);
    assert_eq!(f.svc.starts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_for_distinct_services() {
    let f = fixture().await;
    let manager = Arc::new(f.manager);

    let ids: Vec<ServiceId> = (0..200)
        .map(|i| ServiceId::parse(&format!("svc-{i}")).unwrap())
        .collect();
    let tasks: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager
                    .process_update(ServiceInstanceUpdate::new(id, ProcessState::Stop))
                    .await;
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    for id in &ids {
        assert_eq!(
            f.store.discovered_value(&f.node, &service_state_path(id)).await,
            Some(Stop.to_value()),
            "{id} missing from discovered tree"
        );
    }
}
