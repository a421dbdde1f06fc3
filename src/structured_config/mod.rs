pub mod router_path_selection;

pub use router_path_selection::RouterPathSelectionBuilder;

use serde_json::{json, Map, Value};

use crate::errors::Result;
use crate::ip_addressing::{AddressingFacts, AvdIpAddressing, IpAddressingUtils};
use crate::shared_utils::SharedUtils;
use crate::utils::strip_empties;

/// Structured config of one device.
///
/// Each key is only derived when its inputs are declared; the first error
/// aborts the whole device.
pub fn build(shared: &SharedUtils<'_>) -> Result<Value> {
    let ip_addressing = AvdIpAddressing::new(IpAddressingUtils::new(shared));
    let facts = ip_addressing.facts();
    let mut structured_config = Map::new();

    if facts.loopback_ipv4_pool().is_some() {
        structured_config.insert("router_id".to_string(), json!(ip_addressing.router_id()?));
    }
    if facts.loopback_ipv6_pool().is_some() {
        structured_config.insert("ipv6_router_id".to_string(), json!(ip_addressing.ipv6_router_id()?));
    }
    if facts.vtep_loopback_ipv4_pool().is_some() {
        structured_config.insert("vtep_ip".to_string(), json!(ip_addressing.vtep_ip()?));
    }

    if facts.is_mlag() {
        let mut mlag_peer_ips = Map::new();
        if facts.mlag_peer_ipv4_pool().is_some() {
            mlag_peer_ips.insert("primary".to_string(), json!(ip_addressing.mlag_ip_primary()?));
            mlag_peer_ips.insert("secondary".to_string(), json!(ip_addressing.mlag_ip_secondary()?));
        }
        if facts.mlag_peer_l3_ipv4_pool().is_some() {
            mlag_peer_ips.insert("l3_primary".to_string(), json!(ip_addressing.mlag_l3_ip_primary()?));
            mlag_peer_ips.insert("l3_secondary".to_string(), json!(ip_addressing.mlag_l3_ip_secondary()?));
        }
        structured_config.insert("mlag_peer_ips".to_string(), Value::Object(mlag_peer_ips));
    }

    let mut uplinks = Vec::with_capacity(facts.uplink_switches().len());
    for (index, uplink_switch) in facts.uplink_switches().iter().enumerate() {
        let uplink = shared.uplinks().get(index);
        uplinks.push(json!({
            "interface": uplink.map(|u| u.interface.as_str()),
            "peer": uplink_switch,
            "peer_interface": shared.uplink_switch_interfaces().get(index),
            "ip_address": ip_addressing.p2p_uplinks_ip(index)?,
            "peer_ip_address": ip_addressing.p2p_uplinks_peer_ip(index)?,
            "prefix_length": facts.fabric_ip_addressing_p2p_uplinks_ipv4_prefix_length(),
        }));
    }
    structured_config.insert("uplinks".to_string(), Value::Array(uplinks));

    let router_path_selection = RouterPathSelectionBuilder::new(shared).router_path_selection()?;
    if let Some(router_path_selection) = router_path_selection {
        structured_config.insert("router_path_selection".to_string(), router_path_selection);
    }

    tracing::debug!(
        "{}: derived {} structured config keys",
        shared.hostname(),
        structured_config.len()
    );
    Ok(strip_empties(Value::Object(structured_config)))
}
