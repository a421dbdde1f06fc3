use serde::{Deserialize, Serialize};

/// router_path_selection structured config (DPS)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterPathSelection {
    pub tcp_mss_ceiling: TcpMssCeiling,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_groups: Vec<PathGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_dynamic_source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpMssCeiling {
    /// Either a segment size or "auto"
    pub ipv4_segment_size: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathGroup {
    pub name: String,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_interfaces: Vec<LocalInterface>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_peers: Option<DynamicPeers>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_peers: Vec<StaticPeer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipsec_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_assignment: Option<String>,
}

impl PathGroup {
    pub fn new(name: impl Into<String>, id: i64) -> Self {
        Self {
            name: name.into(),
            id,
            local_interfaces: Vec::new(),
            dynamic_peers: None,
            static_peers: Vec::new(),
            ipsec_profile: None,
            flow_assignment: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalInterface {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stun: Option<Stun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stun {
    pub server_profiles: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DynamicPeers {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPeer {
    pub router_ip: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<String>,
}

/// STUN server profile resolved for a WAN client path-group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StunServerProfile {
    pub name: String,
    pub ip_address: String,
}
