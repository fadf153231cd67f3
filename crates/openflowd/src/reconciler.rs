//! Store/controller reconciliation for one network binding group.
//!
//! `update_net` is the convergence step: load declarative state, compute the
//! desired flow set, then walk the union of store-known and controller-known
//! rules issuing the minimal create/delete traffic. Deletion failures on the
//! controller leave the store row alone so the next cycle retries; rules the
//! controller lost are re-installed from the store copy.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use openflow_common::{OfcDriver, Store};
use openflow_types::{find_equal, FlowRow, FlowRule, NetKind, NetState, OpenflowProvider};

use crate::config::WorkerConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::planner::{check_same_vlan_mix, compute_net_flows, PlannerOptions};

/// One store flow row during reconciliation.
struct StoredFlow {
    id: Option<i64>,
    rule: FlowRule,
    keep: bool,
}

/// Drives one controller toward the flow set its networks require.
pub struct Reconciler {
    store: Arc<dyn Store>,
    driver: Arc<dyn OfcDriver>,
    config: WorkerConfig,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, driver: Arc<dyn OfcDriver>, config: WorkerConfig) -> Self {
        Self {
            store,
            driver,
            config,
        }
    }

    /// Reconciles the binding group around `net_id`.
    ///
    /// A network that no longer exists yields an empty group, which still
    /// purges the flow rows orphaned by its deletion.
    #[instrument(skip(self))]
    pub async fn update_net(&self, net_id: &str) -> ReconcileResult<()> {
        let (anchor, group) = match self.store.get_net(net_id).await? {
            Some(net) => {
                let anchor = net.bind_net.clone().unwrap_or_else(|| net.uuid.clone());
                let group = self.store.nets_in_group(&anchor).await?;
                (Some(anchor), group)
            }
            None => (None, Vec::new()),
        };

        let mut nets: Vec<NetState> = Vec::with_capacity(group.len());
        let mut total_ports = 0usize;
        let mut db_rows: Vec<FlowRow> = Vec::new();
        for net in group {
            let ports = if !net.admin_state_up {
                Vec::new()
            } else {
                let mut ports = self.store.active_ports(&net.uuid).await?;
                if let Some(provider) = net.provider.as_deref() {
                    if let Some(of_provider) = OpenflowProvider::parse(provider)? {
                        ports.push(of_provider.external_port(&net));
                    }
                }
                ports
            };
            total_ports += ports.len();
            db_rows.extend(self.store.flows_for_net(Some(&net.uuid)).await?);
            nets.push(NetState { net, ports });
        }
        // rows orphaned by a net delete (net_id set NULL by the schema)
        db_rows.extend(self.store.flows_for_net(None).await?);

        let of_rules = self.driver.get_of_rules().await?;

        self.validate_topology(&nets, total_ports, anchor.as_deref())?;

        let desired = {
            let port_check = |switch_port: &str| self.driver.knows_switch_port(switch_port);
            let opts = PlannerOptions {
                same_vlan_policy: self.config.nets_with_same_vlan,
                port_check: if self.config.test_mode {
                    None
                } else {
                    Some(&port_check)
                },
            };
            compute_net_flows(&nets, &opts)?
        };

        let mut store_flows: Vec<StoredFlow> = Vec::new();
        let mut used_names: HashSet<String> = HashSet::new();
        for row in db_rows {
            match FlowRule::from_row(&row) {
                Ok(rule) => {
                    used_names.insert(rule.name.clone());
                    store_flows.push(StoredFlow {
                        id: row.id,
                        rule,
                        keep: false,
                    });
                }
                Err(e) => {
                    error!("flow row '{}' has undecodable actions: {}", row.name, e);
                }
            }
        }

        for mut flow in desired {
            if let Some(index) = find_equal(&flow, store_flows.iter().map(|f| &f.rule)) {
                store_flows[index].keep = true;
                debug!(name = %store_flows[index].rule.name, "flow already present");
                continue;
            }
            flow.name = fresh_name(
                flow.net_id.as_deref().unwrap_or(net_id),
                &used_names,
                &of_rules,
            );
            used_names.insert(flow.name.clone());
            self.driver.new_flow(&flow).await?;
            self.store.insert_flow(flow.to_row()).await?;
        }

        for stored in &store_flows {
            if stored.keep {
                if !of_rules.contains_key(&stored.rule.name) {
                    // the controller lost this rule, put it back
                    debug!(name = %stored.rule.name, "re-installing flow missing from controller");
                    self.driver.new_flow(&stored.rule).await?;
                }
                continue;
            }
            if of_rules.contains_key(&stored.rule.name) {
                if let Err(e) = self.driver.del_flow(&stored.rule.name).await {
                    warn!(
                        "cannot delete flow '{}' from the openflow controller: {}",
                        stored.rule.name, e
                    );
                    // the store row stays so the next cycle retries
                    continue;
                }
            }
            if let Some(id) = stored.id {
                if let Err(e) = self.store.delete_flow(id).await {
                    error!(
                        "cannot delete flow '{}' from the store: {}",
                        stored.rule.name, e
                    );
                }
            }
        }

        Ok(())
    }

    /// Wipes every flow from the controller (skipped in test mode) and from
    /// the store.
    pub async fn clear_all(&self) -> ReconcileResult<()> {
        if !self.config.test_mode {
            self.driver.clear_all_flows().await?;
        }
        self.store.delete_all_flows().await?;
        Ok(())
    }

    /// Checks the group's shape before planning. Groups with fewer than two
    /// ports program nothing and always pass; anything that is neither ptp
    /// nor data is rejected.
    fn validate_topology(
        &self,
        nets: &[NetState],
        total_ports: usize,
        anchor: Option<&str>,
    ) -> ReconcileResult<()> {
        if total_ports < 2 {
            return Ok(());
        }
        let kind_net = anchor
            .and_then(|a| nets.iter().find(|n| n.net.uuid == a))
            .or_else(|| nets.last());
        let Some(kind_net) = kind_net else {
            return Ok(());
        };
        match &kind_net.net.kind {
            NetKind::Ptp => {
                if total_ports > 2 {
                    return Err(ReconcileError::topology(format!(
                        "'ptp' type network cannot connect {total_ports} interfaces, only 2"
                    )));
                }
                Ok(())
            }
            NetKind::Data => {
                if total_ports > 2 && self.config.nets_with_same_vlan {
                    check_same_vlan_mix(nets)?;
                }
                Ok(())
            }
            NetKind::Other(kind) => Err(ReconcileError::topology(format!(
                "only 'ptp' and 'data' networks are supported for openflow, not '{kind}'"
            ))),
        }
    }
}

/// Smallest `<net_id>.<k>` not colliding with a store name or a rule already
/// on the controller.
fn fresh_name(
    net_id: &str,
    used_names: &HashSet<String>,
    of_rules: &std::collections::BTreeMap<String, FlowRule>,
) -> String {
    let mut k = 0usize;
    loop {
        let name = format!("{net_id}.{k}");
        if !used_names.contains(&name) && !of_rules.contains_key(&name) {
            return name;
        }
        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn rule(name: &str) -> FlowRule {
        FlowRule {
            name: name.to_string(),
            net_id: Some("n1".to_string()),
            priority: 1000,
            vlan_id: None,
            ingress_port: "s1".to_string(),
            dst_mac: None,
            src_mac: None,
            actions: vec![],
        }
    }

    #[test]
    fn test_fresh_name_skips_store_and_controller_names() {
        let used: HashSet<String> = ["n1.0".to_string()].into_iter().collect();
        let mut of_rules = BTreeMap::new();
        of_rules.insert("n1.1".to_string(), rule("n1.1"));

        assert_eq!(fresh_name("n1", &used, &of_rules), "n1.2");
        assert_eq!(fresh_name("n2", &used, &of_rules), "n2.0");
    }
}
