//! Pure flow computation for a network binding group.
//!
//! [`compute_net_flows`] turns a set of networks (each already populated
//! with its participating ports) into the canonical rule set: per-pair
//! unicast flows, per-ingress broadcast flows, and a final unification pass
//! that collapses per-destination rules into point-to-point rules where the
//! destinations are indistinguishable. The function performs no I/O and is
//! deterministic for a fixed input.

use std::collections::HashMap;

use tracing::debug;

use openflow_types::{find_equal, Action, FlowRule, NetRow, NetState, PortKind, PortModel};

use crate::error::{ReconcileError, ReconcileResult};

/// Priority of rules forwarding within one network.
const INTRA_NET_PRIORITY: i32 = 1000;

/// Priority of rules crossing a network binding.
const BINDING_PRIORITY: i32 = 1100;

/// Priority drop for rules that match no destination MAC.
const NO_MAC_PRIORITY_DELTA: i32 = 5;

/// Planner switches.
pub struct PlannerOptions<'a> {
    /// Enforce the single-VLAN constraints on broadcast groups.
    pub same_vlan_policy: bool,
    /// Switch-port validity check, normally backed by the controller
    /// driver's port mapping. `None` skips the pre-check (test mode).
    pub port_check: Option<&'a dyn Fn(&str) -> bool>,
}

impl Default for PlannerOptions<'_> {
    fn default() -> Self {
        Self {
            same_vlan_policy: false,
            port_check: None,
        }
    }
}

/// Broadcast flow under construction: output ports are collected as
/// `(vlan, switch_port)` pairs and only folded into an action list once the
/// whole group has been walked.
struct BroadcastAcc {
    net_id: String,
    priority: i32,
    vlan_id: Option<u16>,
    ingress_port: String,
    outs: Vec<(Option<u16>, String)>,
}

/// VLAN id carried on a binding edge, from a `vlan:<id>` bind type.
fn bind_vlan(net: &NetRow) -> ReconcileResult<Option<u16>> {
    let Some(bind_type) = net.bind_type.as_deref() else {
        return Ok(None);
    };
    let Some(tail) = bind_type.strip_prefix("vlan:") else {
        return Ok(None);
    };
    tail.parse::<u16>().map(Some).map_err(|_| {
        ReconcileError::topology(format!(
            "network '{}' has a malformed bind_type '{}'",
            net.uuid, bind_type
        ))
    })
}

/// Computes the canonical flow set for a binding group.
///
/// Flows come back without names; the reconciler assigns them on insertion.
pub fn compute_net_flows(
    nets: &[NetState],
    opts: &PlannerOptions<'_>,
) -> ReconcileResult<Vec<FlowRule>> {
    if let Some(port_check) = opts.port_check {
        for net in nets {
            for port in &net.ports {
                if !port_check(&port.switch_port) {
                    return Err(ReconcileError::topology(format!(
                        "switch port name '{}' is not valid for the openflow controller",
                        port.switch_port
                    )));
                }
            }
        }
    }
    let nb_ports: usize = nets.iter().map(|n| n.ports.len()).sum();

    let mut new_flows: Vec<FlowRule> = Vec::new();
    let mut broadcast: Vec<((String, Option<u16>), BroadcastAcc)> = Vec::new();

    for net_src in nets {
        let net_id = &net_src.net.uuid;
        for net_dst in nets {
            let mut vlan_net_in: Option<u16> = None;
            let mut vlan_net_out: Option<u16> = None;
            let priority = if net_src.net.uuid == net_dst.net.uuid {
                INTRA_NET_PRIORITY
            } else if net_src.net.bind_net.as_deref() == Some(net_dst.net.uuid.as_str()) {
                vlan_net_out = bind_vlan(&net_src.net)?;
                BINDING_PRIORITY
            } else if net_dst.net.bind_net.as_deref() == Some(net_src.net.uuid.as_str()) {
                vlan_net_in = bind_vlan(&net_dst.net)?;
                BINDING_PRIORITY
            } else {
                // nets not binding
                continue;
            };

            for src_port in &net_src.ports {
                let vlan_in = match (vlan_net_in, src_port.vlan) {
                    (None, port_vlan) => port_vlan,
                    (Some(vlan), None) => Some(vlan),
                    // stacked-VLAN rules are not emitted
                    (Some(_), Some(_)) => continue,
                };

                let broadcast_key = (src_port.uuid.clone(), vlan_in);
                if !broadcast.iter().any(|(key, _)| *key == broadcast_key) {
                    broadcast.push((
                        broadcast_key.clone(),
                        BroadcastAcc {
                            net_id: net_id.clone(),
                            priority,
                            vlan_id: vlan_in,
                            ingress_port: src_port.switch_port.clone(),
                            outs: Vec::new(),
                        },
                    ));
                }

                for dst_port in &net_dst.ports {
                    let vlan_out = match (vlan_net_out, dst_port.vlan) {
                        (None, port_vlan) => port_vlan,
                        (Some(vlan), None) => Some(vlan),
                        (Some(_), Some(_)) => continue,
                    };
                    if src_port.switch_port == dst_port.switch_port && vlan_in == vlan_out {
                        continue;
                    }

                    let mut flow = FlowRule {
                        name: String::new(),
                        net_id: Some(net_id.clone()),
                        priority,
                        vlan_id: vlan_in,
                        ingress_port: src_port.switch_port.clone(),
                        dst_mac: None,
                        src_mac: None,
                        actions: Vec::new(),
                    };
                    // a port without a MAC, or a two-port group, turns the
                    // rule into a catch-all at lower priority
                    if dst_port.mac.is_none() || nb_ports == 2 {
                        flow.priority = priority - NO_MAC_PRIORITY_DELTA;
                    } else {
                        flow.dst_mac = dst_port.mac.clone();
                    }
                    match vlan_out {
                        None => {
                            if vlan_in.is_some() {
                                flow.actions.push(Action::Vlan(None));
                            }
                        }
                        Some(vlan) => flow.actions.push(Action::Vlan(Some(vlan))),
                    }
                    flow.actions.push(Action::Out(dst_port.switch_port.clone()));

                    if find_equal(&flow, &new_flows).is_some() {
                        debug!(ingress = %flow.ingress_port, "skipping repeated flow");
                        continue;
                    }
                    new_flows.push(flow);

                    if nb_ports <= 2 {
                        continue;
                    }
                    if let Some((_, acc)) =
                        broadcast.iter_mut().find(|(key, _)| *key == broadcast_key)
                    {
                        let out = (vlan_out, dst_port.switch_port.clone());
                        if !acc.outs.contains(&out) {
                            acc.outs.push(out);
                        }
                    }
                }
            }
        }
    }

    finalize_broadcast(broadcast, &mut new_flows, opts.same_vlan_policy)?;

    Ok(unify_point_to_point(new_flows))
}

/// Folds accumulated broadcast outputs into action lists and appends the
/// resulting flows, dropping empties and duplicates of unicast flows.
fn finalize_broadcast(
    broadcast: Vec<((String, Option<u16>), BroadcastAcc)>,
    new_flows: &mut Vec<FlowRule>,
    same_vlan_policy: bool,
) -> ReconcileResult<()> {
    for (_, mut acc) in broadcast {
        if acc.outs.is_empty() {
            continue;
        }
        acc.outs.sort();

        // VLAN state starts at whatever the match guarantees is on the
        // packet; a vlan action is only emitted when the state changes
        let mut previous_vlan = acc.vlan_id;
        let mut vlan_changes = 0u32;
        let mut actions = Vec::new();
        for (vlan_out, switch_port) in acc.outs {
            if vlan_out != previous_vlan {
                if same_vlan_policy && vlan_changes > 0 {
                    return Err(ReconcileError::topology(
                        "cannot interconnect different vlan tags in a network \
                         when the nets_with_same_vlan flag is set",
                    ));
                }
                actions.push(Action::Vlan(vlan_out));
                previous_vlan = vlan_out;
                vlan_changes += 1;
            }
            actions.push(Action::Out(switch_port));
        }

        let flow = FlowRule {
            name: String::new(),
            net_id: Some(acc.net_id),
            priority: acc.priority,
            vlan_id: acc.vlan_id,
            ingress_port: acc.ingress_port,
            dst_mac: Some(openflow_types::BROADCAST_MAC.to_string()),
            src_mac: None,
            actions,
        };
        if find_equal(&flow, new_flows.iter()).is_some() {
            debug!(ingress = %flow.ingress_port, "skipping repeated broadcast flow");
            continue;
        }
        new_flows.push(flow);
    }
    Ok(())
}

/// Collapses groups of unicast flows that share `(vlan_id, ingress_port)`
/// and an identical action list into a single rule without a destination
/// MAC at lower priority; every other group is kept as is.
fn unify_point_to_point(flows: Vec<FlowRule>) -> Vec<FlowRule> {
    let mut groups: HashMap<(Option<u16>, String), Vec<usize>> = HashMap::new();
    for (index, flow) in flows.iter().enumerate() {
        if flow.is_broadcast() {
            continue;
        }
        groups
            .entry((flow.vlan_id, flow.ingress_port.clone()))
            .or_default()
            .push(index);
    }

    let mut drop = vec![false; flows.len()];
    let mut collapse = vec![false; flows.len()];
    for indices in groups.values() {
        if indices.len() < 2 {
            continue;
        }
        let first = &flows[indices[0]];
        if indices.iter().all(|&i| flows[i].actions == first.actions) {
            debug!(
                ingress = %first.ingress_port,
                rules = indices.len(),
                "collapsing per-destination rules into a point-to-point rule"
            );
            collapse[indices[0]] = true;
            for &index in &indices[1..] {
                drop[index] = true;
            }
        }
    }

    flows
        .into_iter()
        .enumerate()
        .filter_map(|(index, mut flow)| {
            if drop[index] {
                return None;
            }
            if collapse[index] {
                flow.dst_mac = None;
                flow.priority -= NO_MAC_PRIORITY_DELTA;
            }
            Some(flow)
        })
        .collect()
}

/// Port-mix constraints for multipoint data networks sharing one VLAN:
/// passthrough-style ports (PF, VFnotShared, untagged external) cannot join
/// SR-IOV-style ports (VF, tagged external), and a tagged external port must
/// carry the network's own VLAN.
pub fn check_same_vlan_mix(nets: &[NetState]) -> ReconcileResult<()> {
    let mut tagged: Option<bool> = None;
    for net in nets {
        for port in &net.ports {
            match (port.kind, port.model.as_ref()) {
                (PortKind::External, _) => {
                    if let Some(vlan) = port.vlan {
                        if Some(vlan) != net.net.vlan {
                            return Err(ReconcileError::topology(
                                "external port vlan-tag and net vlan-tag must be the same \
                                 when the nets_with_same_vlan flag is set",
                            ));
                        }
                        expect_tagging(
                            &mut tagged,
                            true,
                            "passthrough and vlan-tagged external ports cannot be connected \
                             when the nets_with_same_vlan flag is set",
                        )?;
                    } else {
                        expect_tagging(
                            &mut tagged,
                            false,
                            "SR-IOV and untagged external ports cannot be connected \
                             when the nets_with_same_vlan flag is set",
                        )?;
                    }
                }
                (_, Some(PortModel::Pf)) | (_, Some(PortModel::VfNotShared)) => expect_tagging(
                    &mut tagged,
                    false,
                    "passthrough and SR-IOV ports cannot be connected \
                     when the nets_with_same_vlan flag is set",
                )?,
                (_, Some(PortModel::Vf)) => expect_tagging(
                    &mut tagged,
                    true,
                    "passthrough and SR-IOV ports cannot be connected \
                     when the nets_with_same_vlan flag is set",
                )?,
                _ => {}
            }
        }
    }
    Ok(())
}

fn expect_tagging(
    state: &mut Option<bool>,
    tagged: bool,
    conflict: &'static str,
) -> ReconcileResult<()> {
    match *state {
        None => {
            *state = Some(tagged);
            Ok(())
        }
        Some(seen) if seen == tagged => Ok(()),
        Some(_) => Err(ReconcileError::topology(conflict)),
    }
}
