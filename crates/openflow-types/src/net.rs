//! Network and port rows as read from the store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port status value required for a port to participate in flow planning.
pub const PORT_STATUS_ACTIVE: &str = "ACTIVE";

/// Network type as recorded in the `nets` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetKind {
    /// Point-to-point network; connects at most two ports.
    Ptp,
    /// Multipoint data network.
    Data,
    /// Anything else; rejected during topology validation.
    Other(String),
}

impl NetKind {
    /// Returns the type string as stored in the `nets` table.
    pub fn as_str(&self) -> &str {
        match self {
            NetKind::Ptp => "ptp",
            NetKind::Data => "data",
            NetKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for NetKind {
    fn from(kind: &str) -> Self {
        match kind {
            "ptp" => NetKind::Ptp,
            "data" => NetKind::Data,
            other => NetKind::Other(other.to_string()),
        }
    }
}

/// One row of the `nets` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetRow {
    pub uuid: String,
    pub kind: NetKind,
    /// Admin-down networks contribute no ports.
    pub admin_state_up: bool,
    /// Network VLAN tag; consumed by tagged `openflow:` providers.
    pub vlan: Option<u16>,
    /// Provider string, e.g. `openflow:eth0` or `openflow:eth0:vlan`.
    pub provider: Option<String>,
    /// Back-reference to the network this one binds to.
    pub bind_net: Option<String>,
    /// Binding flavour; `vlan:<id>` carries a VLAN translation on the edge.
    pub bind_type: Option<String>,
}

/// Port type as recorded in the `ports` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortKind {
    /// Port synthesized from an `openflow:` provider or declared external.
    External,
    /// Any instance-attached port.
    Internal,
}

/// Hardware model of an instance port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortModel {
    /// Passthrough physical function.
    Pf,
    /// Shared SR-IOV virtual function.
    Vf,
    /// SR-IOV virtual function reserved for a single instance.
    VfNotShared,
    Other(String),
}

impl PortModel {
    pub fn as_str(&self) -> &str {
        match self {
            PortModel::Pf => "PF",
            PortModel::Vf => "VF",
            PortModel::VfNotShared => "VFnotShared",
            PortModel::Other(model) => model,
        }
    }
}

impl From<&str> for PortModel {
    fn from(model: &str) -> Self {
        match model {
            "PF" => PortModel::Pf,
            "VF" => PortModel::Vf,
            "VFnotShared" => PortModel::VfNotShared,
            other => PortModel::Other(other.to_string()),
        }
    }
}

/// One row of the `ports` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRow {
    pub uuid: String,
    pub net_id: String,
    /// Logical switch port name; must be known to the controller driver.
    pub switch_port: String,
    /// VLAN tag carried by traffic on this port, if any.
    pub vlan: Option<u16>,
    pub mac: Option<String>,
    pub kind: PortKind,
    pub model: Option<PortModel>,
    pub admin_state_up: bool,
    pub status: String,
}

/// A network together with its participating ports, ready for planning.
#[derive(Debug, Clone)]
pub struct NetState {
    pub net: NetRow,
    pub ports: Vec<PortRow>,
}

/// Malformed provider string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("provider '{0}' names no switch port")]
    EmptySwitchPort(String),
}

/// Decoded `openflow:<sp>(:vlan)?` provider string.
///
/// Networks with such a provider get one synthetic external port attached to
/// the named switch port, tagged with the network VLAN when the `:vlan`
/// suffix is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenflowProvider {
    pub switch_port: String,
    pub tagged: bool,
}

impl OpenflowProvider {
    /// Parses a provider string. Returns `Ok(None)` for providers of other
    /// flavours; a provider that names the openflow scheme but no switch
    /// port is an error rather than silently internal.
    pub fn parse(provider: &str) -> Result<Option<Self>, ProviderError> {
        let Some(rest) = provider.strip_prefix("openflow:") else {
            return Ok(None);
        };
        let (switch_port, tagged) = match rest.strip_suffix(":vlan") {
            Some(sp) => (sp, true),
            None => (rest, false),
        };
        if switch_port.is_empty() {
            return Err(ProviderError::EmptySwitchPort(provider.to_string()));
        }
        Ok(Some(Self {
            switch_port: switch_port.to_string(),
            tagged,
        }))
    }

    /// Synthesizes the external port this provider contributes to `net`.
    ///
    /// The port uuid is derived from the net uuid so repeated planning keeps
    /// a stable identity for broadcast grouping.
    pub fn external_port(&self, net: &NetRow) -> PortRow {
        PortRow {
            uuid: format!("{}.1", net.uuid),
            net_id: net.uuid.clone(),
            switch_port: self.switch_port.clone(),
            vlan: if self.tagged { net.vlan } else { None },
            mac: None,
            kind: PortKind::External,
            model: None,
            admin_state_up: true,
            status: PORT_STATUS_ACTIVE.to_string(),
        }
    }
}
