//! Shared fixtures for the reconciliation integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use openflow_common::{MemStore, MemoryOfcDriver};
use openflow_types::{NetKind, NetRow, PortKind, PortRow, PORT_STATUS_ACTIVE};
use openflowd::{Reconciler, WorkerConfig};

pub fn data_net(uuid: &str) -> NetRow {
    NetRow {
        uuid: uuid.to_string(),
        kind: NetKind::Data,
        admin_state_up: true,
        vlan: None,
        provider: None,
        bind_net: None,
        bind_type: None,
    }
}

pub fn ptp_net(uuid: &str) -> NetRow {
    NetRow {
        kind: NetKind::Ptp,
        ..data_net(uuid)
    }
}

pub fn port(uuid: &str, net_id: &str, sp: &str, vlan: Option<u16>, mac: Option<&str>) -> PortRow {
    PortRow {
        uuid: uuid.to_string(),
        net_id: net_id.to_string(),
        switch_port: sp.to_string(),
        vlan,
        mac: mac.map(str::to_string),
        kind: PortKind::Internal,
        model: None,
        admin_state_up: true,
        status: PORT_STATUS_ACTIVE.to_string(),
    }
}

/// Config tuned for tests: short waits, a named controller row.
pub fn test_config() -> WorkerConfig {
    let mut config = WorkerConfig::for_ofc("ofc-1");
    config.enqueue_timeout = Duration::from_millis(20);
    config.idle_poll = Duration::from_millis(5);
    config
}

/// Store, driver (knowing the given switch ports) and a reconciler wired to
/// both.
pub fn setup(
    config: WorkerConfig,
    switch_ports: &[&str],
) -> (Arc<MemStore>, Arc<MemoryOfcDriver>, Reconciler) {
    let store = Arc::new(MemStore::new());
    let driver = Arc::new(MemoryOfcDriver::with_ports(
        switch_ports.iter().copied().map(str::to_string),
    ));
    let reconciler = Reconciler::new(store.clone(), driver.clone(), config);
    (store, driver, reconciler)
}
