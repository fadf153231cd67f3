//! Worker loop behavior: task serving, status publishing, queue limits.

mod util;

use std::sync::Arc;

use openflow_common::{MemStore, MemoryOfcDriver, OfcStatus};
use openflowd::{EnqueueError, OfcWorker, Task, WorkerConfig};

use util::{data_net, port, ptp_net, test_config};

fn wired(
    config: WorkerConfig,
    switch_ports: &[&str],
) -> (Arc<MemStore>, Arc<MemoryOfcDriver>) {
    let store = Arc::new(MemStore::new());
    let driver = Arc::new(MemoryOfcDriver::with_ports(
        switch_ports.iter().copied().map(str::to_string),
    ));
    (store, driver)
}

#[tokio::test]
async fn test_worker_serves_update_and_exit() {
    let (store, driver) = wired(test_config(), &["s1", "s2"]);
    store.add_net(ptp_net("net-a"));
    store.add_port(port("p1", "net-a", "s1", None, Some("aa:bb:cc:dd:ee:01")));
    store.add_port(port("p2", "net-a", "s2", None, Some("aa:bb:cc:dd:ee:02")));

    let (handle, join) = OfcWorker::spawn(store.clone(), driver.clone(), test_config());
    handle
        .insert_task(Task::UpdateNet("net-a".to_string()))
        .await
        .unwrap();
    handle.insert_task(Task::Exit).await.unwrap();
    join.await.unwrap();

    assert_eq!(driver.rules().len(), 2);
    let (status, last_error) = store.net_status("net-a").unwrap();
    assert_eq!(status, OfcStatus::Active);
    assert_eq!(last_error, None);
    // exit leaves the controller row INACTIVE
    let (status, _) = store.ofc_status("ofc-1").unwrap();
    assert_eq!(status, OfcStatus::Inactive);
}

#[tokio::test]
async fn test_worker_records_controller_failure() {
    let (store, driver) = wired(test_config(), &["s1", "s2"]);
    store.add_net(ptp_net("net-a"));
    store.add_port(port("p1", "net-a", "s1", None, Some("aa:bb:cc:dd:ee:01")));
    store.add_port(port("p2", "net-a", "s2", None, Some("aa:bb:cc:dd:ee:02")));
    driver.set_failing(true);

    let (handle, join) = OfcWorker::spawn(store.clone(), driver.clone(), test_config());
    handle
        .insert_task(Task::UpdateNet("net-a".to_string()))
        .await
        .unwrap();
    handle.insert_task(Task::Exit).await.unwrap();
    join.await.unwrap();

    let (status, last_error) = store.net_status("net-a").unwrap();
    assert_eq!(status, OfcStatus::Error);
    assert!(last_error.unwrap().contains("openflow controller"));
    assert!(store.flow_rows().is_empty());
}

#[tokio::test]
async fn test_worker_continues_after_failed_task() {
    let (store, driver) = wired(test_config(), &["s1", "s2", "s3"]);
    // a ptp net with three ports always fails validation
    store.add_net(ptp_net("net-bad"));
    store.add_port(port("b1", "net-bad", "s1", None, Some("aa:bb:cc:dd:ee:01")));
    store.add_port(port("b2", "net-bad", "s2", None, Some("aa:bb:cc:dd:ee:02")));
    store.add_port(port("b3", "net-bad", "s3", None, Some("aa:bb:cc:dd:ee:03")));
    store.add_net(data_net("net-ok"));
    store.add_port(port("g1", "net-ok", "s1", None, Some("aa:bb:cc:dd:ee:04")));
    store.add_port(port("g2", "net-ok", "s2", None, Some("aa:bb:cc:dd:ee:05")));

    let (handle, join) = OfcWorker::spawn(store.clone(), driver.clone(), test_config());
    handle
        .insert_task(Task::UpdateNet("net-bad".to_string()))
        .await
        .unwrap();
    handle
        .insert_task(Task::UpdateNet("net-ok".to_string()))
        .await
        .unwrap();
    handle.insert_task(Task::Exit).await.unwrap();
    join.await.unwrap();

    let (status, last_error) = store.net_status("net-bad").unwrap();
    assert_eq!(status, OfcStatus::Error);
    assert!(last_error.unwrap().contains("only 2"));
    let (status, _) = store.net_status("net-ok").unwrap();
    assert_eq!(status, OfcStatus::Active);
    assert_eq!(driver.rules().len(), 2);
}

#[tokio::test]
async fn test_clear_all_task() {
    let (store, driver) = wired(test_config(), &["s1", "s2"]);
    store.add_net(ptp_net("net-a"));
    store.add_port(port("p1", "net-a", "s1", None, Some("aa:bb:cc:dd:ee:01")));
    store.add_port(port("p2", "net-a", "s2", None, Some("aa:bb:cc:dd:ee:02")));

    let (handle, join) = OfcWorker::spawn(store.clone(), driver.clone(), test_config());
    handle
        .insert_task(Task::UpdateNet("net-a".to_string()))
        .await
        .unwrap();
    handle.insert_task(Task::ClearAll).await.unwrap();
    handle.insert_task(Task::Exit).await.unwrap();
    join.await.unwrap();

    assert!(store.flow_rows().is_empty());
    assert!(driver.rules().is_empty());
    assert_eq!(driver.clear_calls(), 1);
}

#[tokio::test]
async fn test_full_queue_reports_timeout() {
    let mut config = test_config();
    config.queue_capacity = 1;
    let (store, driver) = wired(config.clone(), &[]);

    // the worker is built but never driven, so the queue cannot drain
    let (_worker, handle) = OfcWorker::new(store, driver, config);
    handle.insert_task(Task::ClearAll).await.unwrap();
    let err = handle.insert_task(Task::ClearAll).await.unwrap_err();
    assert_eq!(err, EnqueueError::QueueFull("ofc-1".to_string()));
}

#[tokio::test]
async fn test_enqueue_after_worker_is_gone() {
    let config = test_config();
    let (store, driver) = wired(config.clone(), &[]);
    let (worker, handle) = OfcWorker::new(store, driver, config);
    drop(worker);

    let err = handle.insert_task(Task::ClearAll).await.unwrap_err();
    assert_eq!(err, EnqueueError::WorkerGone("ofc-1".to_string()));
}

#[tokio::test]
async fn test_default_controller_row_is_never_written() {
    let mut config = test_config();
    config.ofc_uuid = openflowd::DEFAULT_OFC_UUID.to_string();
    let (store, driver) = wired(config.clone(), &[]);

    let (handle, join) = OfcWorker::spawn(store.clone(), driver, config);
    handle.insert_task(Task::Exit).await.unwrap();
    join.await.unwrap();

    assert!(store.ofc_status(openflowd::DEFAULT_OFC_UUID).is_none());
}

#[tokio::test]
async fn test_long_error_text_is_elided_for_the_store() {
    let (store, driver) = wired(test_config(), &["s1", "s2"]);
    store.add_net(ptp_net("net-a"));
    store.add_port(port("p1", "net-a", "s1", None, Some("aa:bb:cc:dd:ee:01")));
    store.add_port(port("p2", "net-a", "s2", None, Some("aa:bb:cc:dd:ee:02")));
    driver.set_failing(true);

    let (handle, join) = OfcWorker::spawn(store.clone(), driver, test_config());
    handle
        .insert_task(Task::UpdateNet("net-a".to_string()))
        .await
        .unwrap();
    handle.insert_task(Task::Exit).await.unwrap();
    join.await.unwrap();

    let (_, last_error) = store.net_status("net-a").unwrap();
    assert!(last_error.unwrap().len() <= 255);
}
