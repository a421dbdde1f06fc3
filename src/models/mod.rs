mod path_selection;

pub use path_selection::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical MLAG addressing algorithm values
pub mod mlag_algorithm {
    pub const FIRST_ID: &str = "first_id";
    pub const ODD_ID: &str = "odd_id";
    pub const SAME_SUBNET: &str = "same_subnet";

    pub const ALL: &[&str] = &[FIRST_ID, ODD_ID, SAME_SUBNET];

    pub fn is_valid(algorithm: &str) -> bool {
        ALL.contains(&algorithm)
    }
}

/// Fabric model file: global variables, per-device facts and peer facts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FabricModel {
    #[serde(default)]
    pub hostvars: serde_json::Value,
    #[serde(default)]
    pub devices: BTreeMap<String, SwitchFacts>,
    #[serde(default)]
    pub peer_facts: BTreeMap<String, serde_json::Value>,
}

/// MLAG switch ids of the pair this device belongs to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MlagSwitchIds {
    #[serde(default)]
    pub primary: Option<i64>,
    #[serde(default)]
    pub secondary: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlagAddressing {
    #[serde(default = "default_mlag_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_p2p_prefix_length")]
    pub ipv4_prefix_length: u8,
}

impl Default for MlagAddressing {
    fn default() -> Self {
        Self {
            algorithm: default_mlag_algorithm(),
            ipv4_prefix_length: default_p2p_prefix_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct P2pUplinksAddressing {
    #[serde(default = "default_p2p_prefix_length")]
    pub ipv4_prefix_length: u8,
}

impl Default for P2pUplinksAddressing {
    fn default() -> Self {
        Self {
            ipv4_prefix_length: default_p2p_prefix_length(),
        }
    }
}

/// fabric_ip_addressing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FabricIpAddressing {
    #[serde(default)]
    pub mlag: MlagAddressing,
    #[serde(default)]
    pub p2p_uplinks: P2pUplinksAddressing,
}

/// One entry of the "uplinks" switch fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UplinkFact {
    pub interface: String,
    #[serde(default)]
    pub peer: Option<String>,
    #[serde(default)]
    pub peer_interface: Option<String>,
    #[serde(default)]
    pub vrf: Option<String>,
}

/// Interface declared under a WAN path-group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanInterface {
    pub name: String,
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// WAN path-group declaration (global, local or on a route server)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanPathGroup {
    pub name: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default = "default_true")]
    pub ipsec: bool,
    /// Absent and empty are distinct; route servers must declare their interfaces
    #[serde(default)]
    pub interfaces: Option<Vec<WanInterface>>,
}

/// WAN route server (pathfinder or AutoVPN RR) this device connects to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanRouteServer {
    pub name: String,
    #[serde(default)]
    pub vtep_ip: Option<String>,
    #[serde(default)]
    pub wan_path_groups: Vec<WanPathGroup>,
}

/// WAN role flags and path-group declarations for one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanSettings {
    #[serde(default)]
    pub is_wan_router: bool,
    #[serde(default)]
    pub is_wan_server: bool,
    #[serde(default)]
    pub is_wan_client: bool,
    #[serde(default)]
    pub is_cv_pathfinder_server: bool,
    #[serde(default)]
    pub wan_ha: bool,
    #[serde(default)]
    pub wan_ha_peer: Option<String>,
    #[serde(default)]
    pub wan_ha_peer_ip_addresses: Vec<String>,
    #[serde(default = "default_ha_path_group_name")]
    pub wan_ha_path_group_name: String,
    #[serde(default)]
    pub wan_path_groups: Vec<WanPathGroup>,
    #[serde(default)]
    pub wan_local_path_groups: Vec<WanPathGroup>,
    #[serde(default)]
    pub filtered_wan_route_servers: Vec<WanRouteServer>,
}

impl Default for WanSettings {
    fn default() -> Self {
        Self {
            is_wan_router: false,
            is_wan_server: false,
            is_wan_client: false,
            is_cv_pathfinder_server: false,
            wan_ha: false,
            wan_ha_peer: None,
            wan_ha_peer_ip_addresses: Vec::new(),
            wan_ha_path_group_name: default_ha_path_group_name(),
            wan_path_groups: Vec::new(),
            wan_local_path_groups: Vec::new(),
            filtered_wan_route_servers: Vec::new(),
        }
    }
}

/// Already-validated topology facts for one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchFacts {
    pub hostname: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub mlag_switch_ids: Option<MlagSwitchIds>,
    #[serde(default)]
    pub fabric_ip_addressing: FabricIpAddressing,

    #[serde(default)]
    pub loopback_ipv4_pool: Option<String>,
    #[serde(default)]
    pub loopback_ipv4_offset: i64,
    #[serde(default)]
    pub loopback_ipv6_pool: Option<String>,
    #[serde(default)]
    pub loopback_ipv6_offset: i64,
    #[serde(default)]
    pub vtep_loopback_ipv4_pool: Option<String>,
    #[serde(default)]
    pub mlag_peer_ipv4_pool: Option<String>,
    #[serde(default)]
    pub mlag_peer_l3_ipv4_pool: Option<String>,
    #[serde(default)]
    pub uplink_ipv4_pool: Option<String>,

    #[serde(default = "default_one")]
    pub max_uplink_switches: i64,
    #[serde(default = "default_one")]
    pub max_parallel_uplinks: i64,
    #[serde(default)]
    pub uplink_switches: Vec<String>,
    #[serde(default)]
    pub uplink_switch_interfaces: Vec<String>,
    #[serde(default)]
    pub uplinks: Vec<UplinkFact>,

    #[serde(default)]
    pub wan: WanSettings,

    /// Node settings merged from defaults, group and node levels
    #[serde(default)]
    pub switch_data_combined: serde_json::Value,
}

impl SwitchFacts {
    /// Bare facts for a device, used to build fixtures
    #[cfg(test)]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            id: None,
            mlag_switch_ids: None,
            fabric_ip_addressing: FabricIpAddressing::default(),
            loopback_ipv4_pool: None,
            loopback_ipv4_offset: 0,
            loopback_ipv6_pool: None,
            loopback_ipv6_offset: 0,
            vtep_loopback_ipv4_pool: None,
            mlag_peer_ipv4_pool: None,
            mlag_peer_l3_ipv4_pool: None,
            uplink_ipv4_pool: None,
            max_uplink_switches: default_one(),
            max_parallel_uplinks: default_one(),
            uplink_switches: Vec::new(),
            uplink_switch_interfaces: Vec::new(),
            uplinks: Vec::new(),
            wan: WanSettings::default(),
            switch_data_combined: serde_json::Value::Null,
        }
    }
}

/// Downlink pool declaration advertised in a peer's facts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownlinkPool {
    pub downlink_interfaces: String,
    #[serde(default)]
    pub downlink_ipv4_pool: Option<String>,
}

fn default_true() -> bool { true }
fn default_one() -> i64 { 1 }
fn default_p2p_prefix_length() -> u8 { 31 }
fn default_mlag_algorithm() -> String { mlag_algorithm::FIRST_ID.to_string() }
fn default_ha_path_group_name() -> String { "LAN_HA".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_switch_facts_defaults() {
        let switch: SwitchFacts = serde_json::from_value(json!({"hostname": "leaf1"})).unwrap();
        assert_eq!(switch.max_uplink_switches, 1);
        assert_eq!(switch.max_parallel_uplinks, 1);
        assert_eq!(switch.fabric_ip_addressing.mlag.algorithm, mlag_algorithm::FIRST_ID);
        assert_eq!(switch.fabric_ip_addressing.p2p_uplinks.ipv4_prefix_length, 31);
        assert_eq!(switch.wan.wan_ha_path_group_name, "LAN_HA");
        assert!(switch.mlag_switch_ids.is_none());
    }

    #[test]
    fn test_wan_path_group_ipsec_defaults_on() {
        let pg: WanPathGroup = serde_json::from_value(json!({"name": "INET"})).unwrap();
        assert!(pg.ipsec);
        assert!(pg.interfaces.is_none());
        assert_eq!(pg.id, None);
    }

    #[test]
    fn test_mlag_algorithm_is_valid() {
        assert!(mlag_algorithm::is_valid("odd_id"));
        assert!(!mlag_algorithm::is_valid("even_id"));
    }
}
