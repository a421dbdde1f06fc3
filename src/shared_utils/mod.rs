use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::errors::{DesignError, Result};
use crate::models::{SwitchFacts, UplinkFact, WanPathGroup, WanRouteServer};

/// Lookup of facts published by other devices, keyed by hostname
pub trait PeerFactsLookup {
    fn peer_facts(&self, name: &str) -> Option<&Value>;
}

impl PeerFactsLookup for BTreeMap<String, Value> {
    fn peer_facts(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl PeerFactsLookup for HashMap<String, Value> {
    fn peer_facts(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Per-device context handed to every derivation.
///
/// Holds the device's own facts, the global variables and the peer facts
/// lookup. Nothing here is mutated during a device pass.
pub struct SharedUtils<'a> {
    switch: &'a SwitchFacts,
    hostvars: &'a Value,
    peers: &'a dyn PeerFactsLookup,
}

impl<'a> SharedUtils<'a> {
    pub fn new(switch: &'a SwitchFacts, hostvars: &'a Value, peers: &'a dyn PeerFactsLookup) -> Self {
        Self {
            switch,
            hostvars,
            peers,
        }
    }

    pub fn hostname(&self) -> &'a str {
        &self.switch.hostname
    }

    pub fn switch(&self) -> &'a SwitchFacts {
        self.switch
    }

    pub fn hostvars(&self) -> &'a Value {
        self.hostvars
    }

    pub fn switch_data_combined(&self) -> &'a Value {
        &self.switch.switch_data_combined
    }

    /// Facts of another device. With `required`, missing facts are an error.
    pub fn get_peer_facts(&self, name: &str, required: bool) -> Result<Option<&'a Value>> {
        match self.peers.peer_facts(name) {
            Some(facts) => Ok(Some(facts)),
            None if required => Err(DesignError::missing(format!(
                "Facts not found for node '{}'. Something in the input vars is pointing to this node. \
                 Check that '{}' is in the inventory and is part of the group set by 'fabric_name'.",
                name, name
            ))),
            None => Ok(None),
        }
    }

    /// The "uplinks" switch fact of this device
    pub fn uplinks(&self) -> &'a [UplinkFact] {
        &self.switch.uplinks
    }

    pub fn uplink_switches(&self) -> &'a [String] {
        &self.switch.uplink_switches
    }

    pub fn uplink_switch_interfaces(&self) -> &'a [String] {
        &self.switch.uplink_switch_interfaces
    }

    pub fn is_wan_router(&self) -> bool {
        self.switch.wan.is_wan_router
    }

    pub fn is_wan_server(&self) -> bool {
        self.switch.wan.is_wan_server
    }

    pub fn is_wan_client(&self) -> bool {
        self.switch.wan.is_wan_client
    }

    pub fn is_cv_pathfinder_server(&self) -> bool {
        self.switch.wan.is_cv_pathfinder_server
    }

    pub fn wan_ha(&self) -> bool {
        self.switch.wan.wan_ha
    }

    pub fn wan_ha_peer(&self) -> Option<&'a str> {
        self.switch.wan.wan_ha_peer.as_deref()
    }

    pub fn wan_ha_peer_ip_addresses(&self) -> &'a [String] {
        &self.switch.wan.wan_ha_peer_ip_addresses
    }

    pub fn wan_ha_path_group_name(&self) -> &'a str {
        &self.switch.wan.wan_ha_path_group_name
    }

    /// Every path-group known to the WAN domain
    pub fn wan_path_groups(&self) -> &'a [WanPathGroup] {
        &self.switch.wan.wan_path_groups
    }

    /// Path-groups this device has interfaces in
    pub fn wan_local_path_groups(&self) -> &'a [WanPathGroup] {
        &self.switch.wan.wan_local_path_groups
    }

    pub fn wan_local_path_group_names(&self) -> Vec<&'a str> {
        self.wan_local_path_groups()
            .iter()
            .map(|pg| pg.name.as_str())
            .collect()
    }

    /// WAN route servers this device peers with, in declaration order
    pub fn filtered_wan_route_servers(&self) -> &'a [WanRouteServer] {
        &self.switch.wan.filtered_wan_route_servers
    }

    /// True when this WAN client reaches a route server over one of the given path-groups
    pub fn should_connect_to_wan_rs(&self, path_group_names: &[&str]) -> bool {
        self.is_wan_client()
            && self.filtered_wan_route_servers().iter().any(|rs| {
                rs.wan_path_groups
                    .iter()
                    .any(|pg| path_group_names.contains(&pg.name.as_str()))
            })
    }
}
