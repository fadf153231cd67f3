//! Openflow controller driver contract and the in-memory reference driver.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use openflow_types::FlowRule;

use crate::error::{OfcError, OfcResult};

/// One openflow controller, as the reconciliation worker sees it.
///
/// Concrete drivers wrap the controller's HTTP API. Rules are addressed by
/// name: `new_flow` overwrites any rule with the same name, which is what
/// makes re-installation after controller-side loss safe.
#[async_trait]
pub trait OfcDriver: Send + Sync {
    /// Whether the controller knows the given logical switch port, i.e.
    /// whether the port appears in its port-name mapping.
    fn knows_switch_port(&self, switch_port: &str) -> bool;

    /// Rules currently installed on the controller, keyed by rule name.
    async fn get_of_rules(&self) -> OfcResult<BTreeMap<String, FlowRule>>;

    /// Installs a rule, overwriting by name.
    async fn new_flow(&self, flow: &FlowRule) -> OfcResult<()>;

    /// Removes the named rule.
    async fn del_flow(&self, name: &str) -> OfcResult<()>;

    /// Removes every rule on the controller.
    async fn clear_all_flows(&self) -> OfcResult<()>;
}

#[derive(Default)]
struct DriverInner {
    ports: HashSet<String>,
    rules: BTreeMap<String, FlowRule>,
    new_flow_calls: Vec<String>,
    del_flow_calls: Vec<String>,
    clear_calls: usize,
    failing: bool,
    failing_deletes: bool,
}

impl DriverInner {
    fn check_reachable(&self) -> OfcResult<()> {
        if self.failing {
            Err(OfcError::Unreachable("forced failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// In-memory [`OfcDriver`] implementation.
///
/// Keeps installed rules in a map and records the order of `new_flow` and
/// `del_flow` calls so tests can assert on reconciliation traffic. Forced
/// failure makes every controller call return an error, simulating an
/// unreachable controller.
#[derive(Default)]
pub struct MemoryOfcDriver {
    inner: Mutex<DriverInner>,
}

impl MemoryOfcDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver that already knows the given switch ports.
    pub fn with_ports<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let driver = Self::new();
        driver.lock().ports = ports.into_iter().map(Into::into).collect();
        driver
    }

    fn lock(&self) -> MutexGuard<'_, DriverInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_switch_port(&self, name: impl Into<String>) {
        self.lock().ports.insert(name.into());
    }

    /// Makes every subsequent controller call fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Makes only `del_flow` fail, leaving reads and installs working.
    pub fn set_failing_deletes(&self, failing: bool) {
        self.lock().failing_deletes = failing;
    }

    /// Drops a rule behind the worker's back, simulating controller-side
    /// loss. Returns whether the rule existed.
    pub fn lose_rule(&self, name: &str) -> bool {
        self.lock().rules.remove(name).is_some()
    }

    /// Snapshot of the installed rules.
    pub fn rules(&self) -> BTreeMap<String, FlowRule> {
        self.lock().rules.clone()
    }

    /// Names passed to `new_flow`, in call order.
    pub fn new_flow_calls(&self) -> Vec<String> {
        self.lock().new_flow_calls.clone()
    }

    /// Names passed to `del_flow`, in call order.
    pub fn del_flow_calls(&self) -> Vec<String> {
        self.lock().del_flow_calls.clone()
    }

    pub fn clear_calls(&self) -> usize {
        self.lock().clear_calls
    }

    /// Forgets recorded calls; installed rules stay.
    pub fn reset_calls(&self) {
        let mut inner = self.lock();
        inner.new_flow_calls.clear();
        inner.del_flow_calls.clear();
        inner.clear_calls = 0;
    }
}

#[async_trait]
impl OfcDriver for MemoryOfcDriver {
    fn knows_switch_port(&self, switch_port: &str) -> bool {
        self.lock().ports.contains(switch_port)
    }

    async fn get_of_rules(&self) -> OfcResult<BTreeMap<String, FlowRule>> {
        let inner = self.lock();
        inner.check_reachable()?;
        Ok(inner.rules.clone())
    }

    async fn new_flow(&self, flow: &FlowRule) -> OfcResult<()> {
        let mut inner = self.lock();
        inner.check_reachable()?;
        if flow.name.is_empty() {
            return Err(OfcError::Controller("flow has no name".to_string()));
        }
        inner.new_flow_calls.push(flow.name.clone());
        inner.rules.insert(flow.name.clone(), flow.clone());
        Ok(())
    }

    async fn del_flow(&self, name: &str) -> OfcResult<()> {
        let mut inner = self.lock();
        inner.check_reachable()?;
        inner.del_flow_calls.push(name.to_string());
        if inner.failing_deletes {
            return Err(OfcError::Controller(format!("cannot delete '{name}'")));
        }
        if inner.rules.remove(name).is_none() {
            return Err(OfcError::Controller(format!("unknown rule '{name}'")));
        }
        Ok(())
    }

    async fn clear_all_flows(&self) -> OfcResult<()> {
        let mut inner = self.lock();
        inner.check_reachable()?;
        inner.clear_calls += 1;
        inner.rules.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openflow_types::Action;

    fn flow(name: &str) -> FlowRule {
        FlowRule {
            name: name.to_string(),
            net_id: Some("n1".to_string()),
            priority: 1000,
            vlan_id: None,
            ingress_port: "s1".to_string(),
            dst_mac: None,
            src_mac: None,
            actions: vec![Action::Out("s2".to_string())],
        }
    }

    #[tokio::test]
    async fn test_install_and_delete() {
        let driver = MemoryOfcDriver::with_ports(["s1", "s2"]);
        assert!(driver.knows_switch_port("s1"));
        assert!(!driver.knows_switch_port("s9"));

        driver.new_flow(&flow("n1.0")).await.unwrap();
        assert!(driver.get_of_rules().await.unwrap().contains_key("n1.0"));

        driver.del_flow("n1.0").await.unwrap();
        assert!(driver.get_of_rules().await.unwrap().is_empty());
        assert!(driver.del_flow("n1.0").await.is_err());

        assert_eq!(driver.new_flow_calls(), vec!["n1.0"]);
        assert_eq!(driver.del_flow_calls(), vec!["n1.0", "n1.0"]);
    }

    #[tokio::test]
    async fn test_new_flow_overwrites_by_name() {
        let driver = MemoryOfcDriver::new();
        driver.new_flow(&flow("n1.0")).await.unwrap();
        let mut updated = flow("n1.0");
        updated.priority = 995;
        driver.new_flow(&updated).await.unwrap();

        let rules = driver.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules["n1.0"].priority, 995);
    }

    #[tokio::test]
    async fn test_unnamed_flow_rejected() {
        let driver = MemoryOfcDriver::new();
        assert!(driver.new_flow(&flow("")).await.is_err());
    }

    #[tokio::test]
    async fn test_forced_failure() {
        let driver = MemoryOfcDriver::new();
        driver.set_failing(true);
        assert!(driver.get_of_rules().await.is_err());
        assert!(driver.new_flow(&flow("n1.0")).await.is_err());
        assert!(driver.clear_all_flows().await.is_err());

        driver.set_failing(false);
        assert!(driver.get_of_rules().await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let driver = MemoryOfcDriver::new();
        driver.new_flow(&flow("n1.0")).await.unwrap();
        driver.new_flow(&flow("n1.1")).await.unwrap();
        driver.clear_all_flows().await.unwrap();
        assert!(driver.rules().is_empty());
        assert_eq!(driver.clear_calls(), 1);
    }
}
