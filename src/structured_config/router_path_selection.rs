use std::cell::OnceCell;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::{DesignError, Result};
use crate::models::{
    DynamicPeers, LocalInterface, PathGroup, RouterPathSelection, StaticPeer, Stun, StunServerProfile,
    TcpMssCeiling, UplinkFact,
};
use crate::shared_utils::SharedUtils;
use crate::utils::{get, get_bool_or, get_required, get_str_or, sanitize_interface_name, strip_empties, strip_mask};

/// Id reserved for the LAN HA path-group
pub const HA_PATH_GROUP_ID: i64 = 65535;
/// Id given to every other path-group without an explicit id
pub const DEFAULT_PATH_GROUP_ID: i64 = 500;

const DEFAULT_CP_IPSEC_PROFILE: &str = "CP-PROFILE";
const DEFAULT_DP_IPSEC_PROFILE: &str = "DP-PROFILE";

/// Builds the router_path_selection (DPS) structured config of one device
pub struct RouterPathSelectionBuilder<'a> {
    shared: &'a SharedUtils<'a>,
    stun_server_profiles: OnceCell<BTreeMap<String, Vec<StunServerProfile>>>,
}

impl<'a> RouterPathSelectionBuilder<'a> {
    pub fn new(shared: &'a SharedUtils<'a>) -> Self {
        Self {
            shared,
            stun_server_profiles: OnceCell::new(),
        }
    }

    /// Structured config for router path-selection, None unless this is a WAN router.
    /// Empty values are pruned from the result.
    pub fn router_path_selection(&self) -> Result<Option<Value>> {
        if !self.shared.is_wan_router() {
            return Ok(None);
        }

        let router_path_selection = RouterPathSelection {
            tcp_mss_ceiling: TcpMssCeiling {
                ipv4_segment_size: get(self.shared.switch_data_combined(), "dps_mss_ipv4")
                    .cloned()
                    .unwrap_or_else(|| Value::from("auto")),
            },
            path_groups: self.get_path_groups()?,
            peer_dynamic_source: self.shared.is_wan_server().then(|| "stun".to_string()),
        };

        let value = serde_json::to_value(&router_path_selection).map_err(|e| {
            DesignError::config(format!("Unable to build router_path_selection: {}", e))
        })?;
        Ok(Some(strip_empties(value)))
    }

    /// IPsec profile name used for the control plane
    pub fn cp_ipsec_profile_name(&self) -> &'a str {
        get_str_or(
            self.shared.hostvars(),
            "wan_ipsec_profiles.control_plane.profile_name",
            DEFAULT_CP_IPSEC_PROFILE,
        )
    }

    /// IPsec profile name used for the data plane
    pub fn dp_ipsec_profile_name(&self) -> &'a str {
        get_str_or(
            self.shared.hostvars(),
            "wan_ipsec_profiles.data_plane.profile_name",
            DEFAULT_DP_IPSEC_PROFILE,
        )
    }

    pub fn get_path_groups(&self) -> Result<Vec<PathGroup>> {
        // Pathfinders and AutoVPN RRs carry every path-group
        let path_groups_to_configure = if self.shared.is_wan_server() {
            self.shared.wan_path_groups()
        } else {
            self.shared.wan_local_path_groups()
        };
        let local_path_group_names = self.shared.wan_local_path_group_names();

        let mut path_groups = Vec::with_capacity(path_groups_to_configure.len() + 1);
        for path_group in path_groups_to_configure {
            let name = path_group.name.as_str();
            let mut path_group_data = PathGroup::new(name, self.get_path_group_id(name, path_group.id));
            path_group_data.local_interfaces = self.get_local_interfaces_for_path_group(name);
            path_group_data.dynamic_peers = self.get_dynamic_peers();
            path_group_data.static_peers = self.get_static_peers_for_path_group(name)?;

            // Non local path-groups on a pathfinder need no IPsec profile
            if local_path_group_names.contains(&name) && path_group.ipsec {
                path_group_data.ipsec_profile = Some(self.cp_ipsec_profile_name().to_string());
            }

            path_groups.push(path_group_data);
        }

        if self.shared.wan_ha() || self.shared.is_cv_pathfinder_server() {
            path_groups.push(self.generate_ha_path_group()?);
        }

        Ok(path_groups)
    }

    /// Only used with WAN HA or on pathfinders
    pub fn generate_ha_path_group(&self) -> Result<PathGroup> {
        let name = self.shared.wan_ha_path_group_name();
        let mut ha_path_group = PathGroup::new(name, self.get_path_group_id(name, None));
        ha_path_group.flow_assignment = Some("lan".to_string());

        if self.shared.is_cv_pathfinder_server() {
            tracing::debug!("{}: advertising HA path-group {} as pathfinder", self.shared.hostname(), name);
            return Ok(ha_path_group);
        }

        let wan_ha_peer = self.shared.wan_ha_peer().ok_or_else(|| {
            DesignError::missing("'wan_ha_peer' is required to build the WAN HA path-group")
        })?;
        tracing::debug!("{}: building HA path-group {} towards {}", self.shared.hostname(), name, wan_ha_peer);

        // LAN interfaces over which the DPS tunnel to the HA peer is built
        ha_path_group.local_interfaces = self
            .wan_ha_interfaces()
            .into_iter()
            .map(|uplink| LocalInterface {
                name: uplink.interface.clone(),
                stun: None,
            })
            .collect();
        ha_path_group.static_peers = vec![StaticPeer {
            router_ip: self.wan_ha_peer_vtep_ip(wan_ha_peer)?,
            name: wan_ha_peer.to_string(),
            ipv4_addresses: self
                .shared
                .wan_ha_peer_ip_addresses()
                .iter()
                .map(|ip_address| strip_mask(ip_address).to_string())
                .collect(),
        }];

        if get_bool_or(self.shared.switch_data_combined(), "wan_ha.ipsec", true) {
            ha_path_group.ipsec_profile = Some(self.dp_ipsec_profile_name().to_string());
        }

        Ok(ha_path_group)
    }

    /// Uplinks in the default VRF
    fn wan_ha_interfaces(&self) -> Vec<&'a UplinkFact> {
        self.shared
            .uplinks()
            .iter()
            .filter(|uplink| uplink.vrf.is_none())
            .collect()
    }

    fn wan_ha_peer_vtep_ip(&self, wan_ha_peer: &str) -> Result<String> {
        let peer_facts = self
            .shared
            .get_peer_facts(wan_ha_peer, true)?
            .ok_or_else(|| DesignError::missing(format!("Facts not found for node '{}'", wan_ha_peer)))?;
        vtep_ip_string(get_required(peer_facts, "vtep_ip")?, wan_ha_peer)
    }

    /// The HA path-group always uses 65535, an explicit id wins otherwise,
    /// and everything else falls back to 500.
    pub fn get_path_group_id(&self, path_group_name: &str, config_id: Option<i64>) -> i64 {
        if path_group_name == self.shared.wan_ha_path_group_name() {
            return HA_PATH_GROUP_ID;
        }
        config_id.unwrap_or(DEFAULT_PATH_GROUP_ID)
    }

    /// Local interfaces of a path-group; AutoVPN/pathfinder clients get the
    /// STUN server profiles of the route servers they reach over it.
    pub fn get_local_interfaces_for_path_group(&self, path_group_name: &str) -> Vec<LocalInterface> {
        let Some(path_group) = self
            .shared
            .wan_local_path_groups()
            .iter()
            .find(|pg| pg.name == path_group_name)
        else {
            return Vec::new();
        };

        let stun = if self.shared.is_wan_client() && self.shared.should_connect_to_wan_rs(&[path_group_name]) {
            self.stun_server_profiles()
                .get(path_group_name)
                .filter(|profiles| !profiles.is_empty())
                .map(|profiles| Stun {
                    server_profiles: profiles.iter().map(|profile| profile.name.clone()).collect(),
                })
        } else {
            None
        };

        path_group
            .interfaces
            .iter()
            .flatten()
            .map(|interface| LocalInterface {
                name: interface.name.clone(),
                stun: stun.clone(),
            })
            .collect()
    }

    pub fn get_dynamic_peers(&self) -> Option<DynamicPeers> {
        self.shared.is_wan_client().then_some(DynamicPeers { enabled: true })
    }

    /// Static peers of a path-group, taken from the connected WAN route servers
    pub fn get_static_peers_for_path_group(&self, path_group_name: &str) -> Result<Vec<StaticPeer>> {
        if !self.shared.is_wan_router() {
            return Ok(Vec::new());
        }

        let mut static_peers = Vec::new();
        for wan_route_server in self.shared.filtered_wan_route_servers() {
            let Some(path_group) = wan_route_server
                .wan_path_groups
                .iter()
                .find(|pg| pg.name == path_group_name)
            else {
                continue;
            };

            let router_ip = wan_route_server.vtep_ip.clone().ok_or_else(|| {
                DesignError::missing(format!(
                    "'vtep_ip' is required for WAN route server '{}'",
                    wan_route_server.name
                ))
            })?;
            let interfaces = path_group.interfaces.as_deref().ok_or_else(|| {
                DesignError::missing(format!(
                    "'interfaces' is required for path-group '{}' of WAN route server '{}'",
                    path_group.name, wan_route_server.name
                ))
            })?;
            let ipv4_addresses = interfaces
                .iter()
                .filter_map(|interface| interface.ip_address.as_deref())
                .map(|ip_address| strip_mask(ip_address).to_string())
                .collect();

            static_peers.push(StaticPeer {
                router_ip,
                name: wan_route_server.name.clone(),
                ipv4_addresses,
            });
        }

        Ok(static_peers)
    }

    /// STUN server profiles per path-group, one per route server interface with an address
    pub fn stun_server_profiles(&self) -> &BTreeMap<String, Vec<StunServerProfile>> {
        self.stun_server_profiles.get_or_init(|| {
            let mut stun_server_profiles: BTreeMap<String, Vec<StunServerProfile>> = BTreeMap::new();
            for wan_route_server in self.shared.filtered_wan_route_servers() {
                for path_group in &wan_route_server.wan_path_groups {
                    let profiles = stun_server_profiles.entry(path_group.name.clone()).or_default();
                    for interface in path_group.interfaces.iter().flatten() {
                        let Some(ip_address) = interface.ip_address.as_deref() else {
                            continue;
                        };
                        profiles.push(StunServerProfile {
                            name: format!(
                                "{}-{}-{}",
                                path_group.name,
                                wan_route_server.name,
                                sanitize_interface_name(&interface.name)
                            ),
                            ip_address: strip_mask(ip_address).to_string(),
                        });
                    }
                }
            }
            stun_server_profiles
        })
    }
}

fn vtep_ip_string(vtep_ip: &Value, peer: &str) -> Result<String> {
    vtep_ip.as_str().map(str::to_string).ok_or_else(|| {
        DesignError::config(format!("'vtep_ip' in the facts of '{}' is not a string", peer))
    })
}
