//! The whole daemon: supervised tasks, real timers, recording System A.

use std::time::Duration;

use traffic_manager::intercept::InterceptRecord;
use traffic_manager::lifecycle::{GroupConfig, SupervisorError, TaskGroup};
use traffic_manager::{Manager, Multiplexer, RpcServices};

mod common;
use common::{Event, RecordingConnector};

fn group() -> TaskGroup {
    TaskGroup::new(GroupConfig {
        enable_signal_handling: false,
        shutdown_timeout: None,
    })
}

#[tokio::test]
async fn lease_expiry_reaches_system_a() {
    let connector = RecordingConnector::new();
    let manager = Manager::new(common::local_config(), connector.clone());

    let mut group = group();
    let shutdown = group.shutdown();
    let mux = Multiplexer::new(manager.config().server.clone(), RpcServices::new());
    let addr = common::serving_addr(mux.state());
    manager.spawn_tasks(&mut group, mux);
    let addr = addr.await;

    manager
        .create_intercept_with_lease(
            InterceptRecord::new("i1")
                .with_api_key("k")
                .with_preview_domain("d.example"),
            Duration::from_millis(200),
        )
        .await
        .unwrap();

    // The expiration interval is one second.
    common::eventually(|| {
        let connector = connector.clone();
        async move { connector.events().contains(&Event::Disconnect) }
    })
    .await;
    assert_eq!(
        connector.events(),
        vec![
            Event::Connect,
            Event::DeleteDomain("d.example".into()),
            Event::ReportRemoved("i1".into()),
            Event::Disconnect,
        ]
    );
    assert_eq!(manager.systema().ref_count().await, 0);

    let body = reqwest::get(format!("http://{addr}/status"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "Hello World from: /status\n");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), group.wait())
        .await
        .expect("tasks did not stop")
        .unwrap();
}

#[tokio::test]
async fn unexpired_intercept_survives() {
    let connector = RecordingConnector::new();
    let manager = Manager::new(common::local_config(), connector.clone());

    let mut group = group();
    let shutdown = group.shutdown();
    let mux = Multiplexer::new(manager.config().server.clone(), RpcServices::new());
    manager.spawn_tasks(&mut group, mux);

    manager
        .create_intercept(InterceptRecord::new("long").with_api_key("k"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(manager.store().get("long").is_some());
    assert!(!connector.events().contains(&Event::ReportRemoved("long".into())));
    assert_eq!(manager.systema().ref_count().await, 1);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), group.wait())
        .await
        .expect("tasks did not stop")
        .unwrap();
}

#[tokio::test]
async fn bind_failure_stops_every_task() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = common::local_config();
    config.server.port = occupied.local_addr().unwrap().port();

    let manager = Manager::new(config, RecordingConnector::new());
    let mut group = group();
    let mux = Multiplexer::new(manager.config().server.clone(), RpcServices::new());
    manager.spawn_tasks(&mut group, mux);

    let err = tokio::time::timeout(Duration::from_secs(5), group.wait())
        .await
        .expect("tasks did not stop")
        .unwrap_err();
    match err {
        SupervisorError::Task { name, .. } => assert_eq!(name, "httpd"),
        other => panic!("unexpected error {other:?}"),
    }
}
