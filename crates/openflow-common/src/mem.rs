//! In-memory store backend.
//!
//! Backs the test suite and stand-alone runs of the daemon. Mutation helpers
//! not on the [`Store`] trait (`add_net`, `remove_net`, ...) play the role
//! the REST/CLI producers play against the real store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use openflow_types::{FlowRow, NetRow, PortRow, PORT_STATUS_ACTIVE};

use crate::error::StoreResult;
use crate::store::{OfcStatus, Store};

#[derive(Default)]
struct Inner {
    nets: BTreeMap<String, NetRow>,
    ports: Vec<PortRow>,
    flows: Vec<FlowRow>,
    next_flow_id: i64,
    net_status: BTreeMap<String, (OfcStatus, Option<String>)>,
    ofc_status: BTreeMap<String, (OfcStatus, Option<String>)>,
}

/// In-memory [`Store`] implementation.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts or replaces a network row.
    pub fn add_net(&self, net: NetRow) {
        self.lock().nets.insert(net.uuid.clone(), net);
    }

    /// Inserts a port row.
    pub fn add_port(&self, port: PortRow) {
        self.lock().ports.push(port);
    }

    /// Removes a network and its ports. Flow rows lose their owner instead
    /// of disappearing, matching the schema's ON DELETE SET NULL.
    pub fn remove_net(&self, uuid: &str) {
        let mut inner = self.lock();
        inner.nets.remove(uuid);
        inner.ports.retain(|p| p.net_id != uuid);
        for flow in &mut inner.flows {
            if flow.net_id.as_deref() == Some(uuid) {
                flow.net_id = None;
            }
        }
    }

    /// Seeds a flow row directly, as if a previous worker run inserted it.
    pub fn seed_flow(&self, mut flow: FlowRow) -> i64 {
        let mut inner = self.lock();
        inner.next_flow_id += 1;
        let id = inner.next_flow_id;
        flow.id = Some(id);
        inner.flows.push(flow);
        id
    }

    /// Snapshot of every flow row.
    pub fn flow_rows(&self) -> Vec<FlowRow> {
        self.lock().flows.clone()
    }

    /// Last status written for a network, if any.
    pub fn net_status(&self, uuid: &str) -> Option<(OfcStatus, Option<String>)> {
        self.lock().net_status.get(uuid).cloned()
    }

    /// Last status written for a controller, if any.
    pub fn ofc_status(&self, uuid: &str) -> Option<(OfcStatus, Option<String>)> {
        self.lock().ofc_status.get(uuid).cloned()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn get_net(&self, uuid: &str) -> StoreResult<Option<NetRow>> {
        Ok(self.lock().nets.get(uuid).cloned())
    }

    async fn nets_in_group(&self, anchor: &str) -> StoreResult<Vec<NetRow>> {
        Ok(self
            .lock()
            .nets
            .values()
            .filter(|n| n.uuid == anchor || n.bind_net.as_deref() == Some(anchor))
            .cloned()
            .collect())
    }

    async fn active_ports(&self, net_id: &str) -> StoreResult<Vec<PortRow>> {
        Ok(self
            .lock()
            .ports
            .iter()
            .filter(|p| p.net_id == net_id && p.admin_state_up && p.status == PORT_STATUS_ACTIVE)
            .cloned()
            .collect())
    }

    async fn flows_for_net(&self, net_id: Option<&str>) -> StoreResult<Vec<FlowRow>> {
        Ok(self
            .lock()
            .flows
            .iter()
            .filter(|f| f.net_id.as_deref() == net_id)
            .cloned()
            .collect())
    }

    async fn insert_flow(&self, flow: FlowRow) -> StoreResult<i64> {
        Ok(self.seed_flow(flow))
    }

    async fn delete_flow(&self, id: i64) -> StoreResult<()> {
        self.lock().flows.retain(|f| f.id != Some(id));
        Ok(())
    }

    async fn delete_all_flows(&self) -> StoreResult<()> {
        self.lock().flows.clear();
        Ok(())
    }

    async fn update_net_status(
        &self,
        uuid: &str,
        status: OfcStatus,
        last_error: Option<&str>,
    ) -> StoreResult<()> {
        self.lock()
            .net_status
            .insert(uuid.to_string(), (status, last_error.map(str::to_string)));
        Ok(())
    }

    async fn update_ofc_status(
        &self,
        uuid: &str,
        status: OfcStatus,
        last_error: Option<&str>,
    ) -> StoreResult<()> {
        self.lock()
            .ofc_status
            .insert(uuid.to_string(), (status, last_error.map(str::to_string)));
        Ok(())
    }
}
