//! Textual action codec between flow descriptors and store rows.
//!
//! The store keeps a flow's action list as comma-joined `key=value` pairs,
//! e.g. `vlan=100,out=port0/2` or `vlan=None,out=eth4`. Recognized keys are
//! `vlan` (an integer, `none`, or `strip`) and `out` (a switch port name).

use thiserror::Error;

use crate::flow::{Action, FlowRow, FlowRule};

/// Malformed textual action list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowFormatError {
    #[error("expected key=value format at actions, got '{0}'")]
    MalformedPair(String),
    #[error("expected an integer after vlan= at actions, got '{0}'")]
    BadVlanValue(String),
    #[error("unexpected key '{0}' at actions")]
    UnknownKey(String),
}

/// Renders an action list in store form. A cleared VLAN becomes the literal
/// `None`.
pub fn encode_actions(actions: &[Action]) -> String {
    let rendered: Vec<String> = actions
        .iter()
        .map(|action| match action {
            Action::Vlan(Some(vlan)) => format!("vlan={vlan}"),
            Action::Vlan(None) => "vlan=None".to_string(),
            Action::Out(switch_port) => format!("out={switch_port}"),
        })
        .collect();
    rendered.join(",")
}

/// Parses a store-form action list. Accepts `none` and `strip` (in any ASCII
/// case) for a cleared VLAN; any other key or malformed pair is rejected.
pub fn decode_actions(text: &str) -> Result<Vec<Action>, FlowFormatError> {
    let mut actions = Vec::new();
    for item in text.split(',') {
        let pair: Vec<&str> = item.split('=').collect();
        let &[key, value] = pair.as_slice() else {
            return Err(FlowFormatError::MalformedPair(item.to_string()));
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "vlan" => {
                let value = value.trim().to_ascii_lowercase();
                if value == "none" || value == "strip" {
                    actions.push(Action::Vlan(None));
                } else {
                    let vlan = value
                        .parse::<u16>()
                        .map_err(|_| FlowFormatError::BadVlanValue(value.clone()))?;
                    actions.push(Action::Vlan(Some(vlan)));
                }
            }
            "out" => actions.push(Action::Out(value.to_string())),
            other => return Err(FlowFormatError::UnknownKey(other.to_string())),
        }
    }
    Ok(actions)
}

impl FlowRule {
    /// Store form of this flow; every field other than the action list
    /// carries over unchanged.
    pub fn to_row(&self) -> FlowRow {
        FlowRow {
            id: None,
            name: self.name.clone(),
            net_id: self.net_id.clone(),
            priority: self.priority,
            vlan_id: self.vlan_id,
            ingress_port: self.ingress_port.clone(),
            dst_mac: self.dst_mac.clone(),
            src_mac: self.src_mac.clone(),
            actions: encode_actions(&self.actions),
        }
    }

    /// Decodes a store row back into a flow descriptor.
    pub fn from_row(row: &FlowRow) -> Result<FlowRule, FlowFormatError> {
        Ok(FlowRule {
            name: row.name.clone(),
            net_id: row.net_id.clone(),
            priority: row.priority,
            vlan_id: row.vlan_id,
            ingress_port: row.ingress_port.clone(),
            dst_mac: row.dst_mac.clone(),
            src_mac: row.src_mac.clone(),
            actions: decode_actions(&row.actions)?,
        })
    }
}
