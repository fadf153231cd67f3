//! Flow descriptors and reconciliation equality.

use serde::{Deserialize, Serialize};

/// Destination MAC used by broadcast flows.
pub const BROADCAST_MAC: &str = "ff:ff:ff:ff:ff:ff";

/// One entry of a flow's ordered action list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Set the VLAN tag to the given id, or strip the tag when `None`.
    Vlan(Option<u16>),
    /// Forward out of the named switch port.
    Out(String),
}

/// In-memory flow descriptor: match fields plus the ordered action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRule {
    /// Rule name, unique per controller. Empty until the reconciler assigns
    /// one; never part of flow equality.
    pub name: String,
    /// Owning network; `None` for rows orphaned by a network delete.
    pub net_id: Option<String>,
    pub priority: i32,
    /// VLAN id the match requires on ingress, if any.
    pub vlan_id: Option<u16>,
    pub ingress_port: String,
    pub dst_mac: Option<String>,
    /// Never produced by the planner; carried for store fidelity.
    pub src_mac: Option<String>,
    pub actions: Vec<Action>,
}

impl FlowRule {
    pub fn is_broadcast(&self) -> bool {
        self.dst_mac.as_deref() == Some(BROADCAST_MAC)
    }

    /// Reconciliation equality: every match field and the action list, with
    /// `name` ignored.
    pub fn same_flow(&self, other: &FlowRule) -> bool {
        self.priority == other.priority
            && self.vlan_id == other.vlan_id
            && self.ingress_port == other.ingress_port
            && self.actions == other.actions
            && self.dst_mac == other.dst_mac
            && self.src_mac == other.src_mac
            && self.net_id == other.net_id
    }
}

/// Index of the first candidate equal to `flow` under [`FlowRule::same_flow`].
pub fn find_equal<'a, I>(flow: &FlowRule, candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a FlowRule>,
{
    candidates.into_iter().position(|c| c.same_flow(flow))
}

/// Store representation of a flow: the same match fields with the action
/// list encoded as comma-joined `key=value` text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRow {
    /// Store row id; `None` before insertion.
    pub id: Option<i64>,
    pub name: String,
    pub net_id: Option<String>,
    pub priority: i32,
    pub vlan_id: Option<u16>,
    pub ingress_port: String,
    pub dst_mac: Option<String>,
    pub src_mac: Option<String>,
    pub actions: String,
}
