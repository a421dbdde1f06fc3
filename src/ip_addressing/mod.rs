mod pool;
pub mod utils;

pub use pool::{get_ip_from_pool, pool_prefix_len};
pub use utils::{AddressingFacts, IpAddressingUtils};

use crate::errors::{DesignError, Result};
use crate::models::mlag_algorithm;

/// IP addresses derived from the device's id, MLAG pairing and uplinks.
///
/// Pool selection and offsets come from the `AddressingFacts` accessors; this
/// type only decides which subnet and host to take.
pub struct AvdIpAddressing<F: AddressingFacts> {
    facts: F,
}

impl<F: AddressingFacts> AvdIpAddressing<F> {
    pub fn new(facts: F) -> Self {
        Self { facts }
    }

    pub fn facts(&self) -> &F {
        &self.facts
    }

    /// Loopback0 IPv4 address
    pub fn router_id(&self) -> Result<String> {
        let pool = self
            .facts
            .loopback_ipv4_pool()
            .ok_or_else(|| DesignError::missing("'loopback_ipv4_pool' is required to calculate the router ID"))?;
        let offset = self.facts.id()? + self.facts.loopback_ipv4_offset();
        Ok(get_ip_from_pool(pool, 32, offset, 0)?.to_string())
    }

    /// Loopback0 IPv6 address
    pub fn ipv6_router_id(&self) -> Result<String> {
        let pool = self
            .facts
            .loopback_ipv6_pool()
            .ok_or_else(|| DesignError::missing("'loopback_ipv6_pool' is required to calculate the IPv6 router ID"))?;
        let offset = self.facts.id()? + self.facts.loopback_ipv6_offset();
        Ok(get_ip_from_pool(pool, 128, offset, 0)?.to_string())
    }

    /// VTEP loopback; both members of an MLAG pair share the primary's address
    pub fn vtep_ip(&self) -> Result<String> {
        let pool = self
            .facts
            .vtep_loopback_ipv4_pool()
            .ok_or_else(|| DesignError::missing("'vtep_loopback_ipv4_pool' is required to calculate the VTEP IP"))?;
        let switch_id = if self.facts.is_mlag() {
            self.facts.mlag_primary_id()?
        } else {
            self.facts.id()?
        };
        let offset = switch_id + self.facts.loopback_ipv4_offset();
        Ok(get_ip_from_pool(pool, 32, offset, 0)?.to_string())
    }

    pub fn mlag_ip_primary(&self) -> Result<String> {
        self.mlag_ip(self.mlag_peer_pool()?, 0)
    }

    pub fn mlag_ip_secondary(&self) -> Result<String> {
        self.mlag_ip(self.mlag_peer_pool()?, 1)
    }

    pub fn mlag_l3_ip_primary(&self) -> Result<String> {
        self.mlag_ip(self.mlag_peer_l3_pool()?, 0)
    }

    pub fn mlag_l3_ip_secondary(&self) -> Result<String> {
        self.mlag_ip(self.mlag_peer_l3_pool()?, 1)
    }

    /// Our end of the point-to-point uplink
    pub fn p2p_uplinks_ip(&self, uplink_switch_index: usize) -> Result<String> {
        self.p2p_ip(uplink_switch_index, 1)
    }

    /// The uplink switch's end of the point-to-point uplink
    pub fn p2p_uplinks_peer_ip(&self, uplink_switch_index: usize) -> Result<String> {
        self.p2p_ip(uplink_switch_index, 0)
    }

    fn mlag_peer_pool(&self) -> Result<&str> {
        self.facts
            .mlag_peer_ipv4_pool()
            .ok_or_else(|| DesignError::missing("'mlag_peer_ipv4_pool' is required to calculate MLAG IP addresses"))
    }

    fn mlag_peer_l3_pool(&self) -> Result<&str> {
        self.facts.mlag_peer_l3_ipv4_pool().ok_or_else(|| {
            DesignError::missing("'mlag_peer_l3_ipv4_pool' is required to calculate MLAG L3 IP addresses")
        })
    }

    fn mlag_ip(&self, pool: &str, ip_offset: u64) -> Result<String> {
        let prefix_len = self.facts.fabric_ip_addressing_mlag_ipv4_prefix_length();
        let subnet_offset = match self.facts.fabric_ip_addressing_mlag_algorithm()? {
            mlag_algorithm::ODD_ID => self.facts.mlag_odd_id_based_offset()?,
            mlag_algorithm::SAME_SUBNET => {
                let pool_prefix_len = pool_prefix_len(pool)?;
                if pool_prefix_len != prefix_len {
                    return Err(DesignError::config(format!(
                        "MLAG same_subnet addressing requires the pool '{}' to be a /{} subnet",
                        pool, prefix_len
                    )));
                }
                0
            }
            _ => self.facts.mlag_primary_id()? - 1,
        };
        Ok(get_ip_from_pool(pool, prefix_len, subnet_offset, ip_offset)?.to_string())
    }

    fn p2p_ip(&self, uplink_switch_index: usize, ip_offset: u64) -> Result<String> {
        let prefix_len = self.facts.fabric_ip_addressing_p2p_uplinks_ipv4_prefix_length();
        let (pool, offset) = self.facts.p2p_ipv4_pool_and_offset(uplink_switch_index)?;
        tracing::debug!(
            "{}: uplink {} uses subnet {} of {}",
            self.facts.hostname(),
            uplink_switch_index,
            offset,
            pool
        );
        Ok(get_ip_from_pool(&pool, prefix_len, offset, ip_offset)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MlagSwitchIds, SwitchFacts};
    use crate::shared_utils::SharedUtils;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn leaf() -> SwitchFacts {
        let mut switch = SwitchFacts::new("leaf1");
        switch.id = Some(3);
        switch.loopback_ipv4_pool = Some("192.168.255.0/24".to_string());
        switch.loopback_ipv6_pool = Some("2001:db8:255::/64".to_string());
        switch.vtep_loopback_ipv4_pool = Some("192.168.254.0/24".to_string());
        switch.mlag_peer_ipv4_pool = Some("10.255.252.0/24".to_string());
        switch.mlag_peer_l3_ipv4_pool = Some("10.255.251.0/24".to_string());
        switch
    }

    fn mlag_leaf(primary: i64, secondary: i64) -> SwitchFacts {
        let mut switch = leaf();
        switch.mlag_switch_ids = Some(MlagSwitchIds {
            primary: Some(primary),
            secondary: Some(secondary),
        });
        switch
    }

    #[test]
    fn test_router_ids() {
        let mut switch = leaf();
        switch.loopback_ipv4_offset = 2;
        let hostvars = Value::Null;
        let peers: BTreeMap<String, Value> = BTreeMap::new();
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));

        assert_eq!(ip.router_id().unwrap(), "192.168.255.5");
        assert_eq!(ip.ipv6_router_id().unwrap(), "2001:db8:255::3");
        assert_eq!(ip.vtep_ip().unwrap(), "192.168.254.5");
    }

    #[test]
    fn test_router_id_requires_pool_and_id() {
        let mut switch = leaf();
        switch.loopback_ipv4_pool = None;
        let hostvars = Value::Null;
        let peers: BTreeMap<String, Value> = BTreeMap::new();
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));
        assert!(ip.router_id().unwrap_err().is_missing_variable());

        let mut switch = leaf();
        switch.id = None;
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));
        assert!(ip.router_id().unwrap_err().to_string().contains("'id'"));
    }

    #[test]
    fn test_vtep_ip_shared_by_mlag_pair() {
        let hostvars = Value::Null;
        let peers: BTreeMap<String, Value> = BTreeMap::new();

        let mut primary = mlag_leaf(3, 4);
        primary.id = Some(3);
        let mut secondary = mlag_leaf(3, 4);
        secondary.id = Some(4);

        let shared = SharedUtils::new(&primary, &hostvars, &peers);
        let a = AvdIpAddressing::new(IpAddressingUtils::new(&shared)).vtep_ip().unwrap();
        let shared = SharedUtils::new(&secondary, &hostvars, &peers);
        let b = AvdIpAddressing::new(IpAddressingUtils::new(&shared)).vtep_ip().unwrap();
        assert_eq!(a, "192.168.254.3");
        assert_eq!(a, b);
    }

    #[test]
    fn test_mlag_first_id() {
        let switch = mlag_leaf(3, 4);
        let hostvars = Value::Null;
        let peers: BTreeMap<String, Value> = BTreeMap::new();
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));

        // subnet 2 of /31s
        assert_eq!(ip.mlag_ip_primary().unwrap(), "10.255.252.4");
        assert_eq!(ip.mlag_ip_secondary().unwrap(), "10.255.252.5");
        assert_eq!(ip.mlag_l3_ip_primary().unwrap(), "10.255.251.4");
        assert_eq!(ip.mlag_l3_ip_secondary().unwrap(), "10.255.251.5");
    }

    #[test]
    fn test_mlag_odd_id() {
        let mut switch = mlag_leaf(6, 5);
        switch.fabric_ip_addressing.mlag.algorithm = "odd_id".to_string();
        let hostvars = Value::Null;
        let peers: BTreeMap<String, Value> = BTreeMap::new();
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));

        // odd id 5 -> subnet 2
        assert_eq!(ip.mlag_ip_primary().unwrap(), "10.255.252.4");

        let mut switch = mlag_leaf(6, 8);
        switch.fabric_ip_addressing.mlag.algorithm = "odd_id".to_string();
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));
        assert!(ip.mlag_ip_primary().unwrap_err().is_config());
    }

    #[test]
    fn test_mlag_same_subnet() {
        let mut switch = mlag_leaf(9, 10);
        switch.fabric_ip_addressing.mlag.algorithm = "same_subnet".to_string();
        switch.mlag_peer_ipv4_pool = Some("10.255.252.0/31".to_string());
        let hostvars = Value::Null;
        let peers: BTreeMap<String, Value> = BTreeMap::new();
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));

        assert_eq!(ip.mlag_ip_primary().unwrap(), "10.255.252.0");
        assert_eq!(ip.mlag_ip_secondary().unwrap(), "10.255.252.1");
        // the L3 pool is a /24 and not allowed with same_subnet
        assert!(ip.mlag_l3_ip_primary().unwrap_err().is_config());
    }

    #[test]
    fn test_mlag_requires_pool() {
        let mut switch = mlag_leaf(1, 2);
        switch.mlag_peer_l3_ipv4_pool = None;
        let hostvars = Value::Null;
        let peers: BTreeMap<String, Value> = BTreeMap::new();
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));
        assert!(ip.mlag_l3_ip_primary().unwrap_err().is_missing_variable());
    }

    #[test]
    fn test_p2p_uplinks_from_uplink_pool() {
        let mut switch = leaf();
        switch.uplink_ipv4_pool = Some("10.0.0.0/24".to_string());
        switch.max_uplink_switches = 2;
        switch.max_parallel_uplinks = 1;
        switch.uplink_switches = vec!["spine1".to_string(), "spine2".to_string()];
        switch.uplink_switch_interfaces = vec!["Ethernet3".to_string(), "Ethernet3".to_string()];
        let hostvars = Value::Null;
        let mut peers: BTreeMap<String, Value> = BTreeMap::new();
        peers.insert("spine1".to_string(), json!({}));
        peers.insert("spine2".to_string(), json!({}));
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));

        // id 3 -> offsets 4 and 5
        assert_eq!(ip.p2p_uplinks_peer_ip(0).unwrap(), "10.0.0.8");
        assert_eq!(ip.p2p_uplinks_ip(0).unwrap(), "10.0.0.9");
        assert_eq!(ip.p2p_uplinks_peer_ip(1).unwrap(), "10.0.0.10");
        assert_eq!(ip.p2p_uplinks_ip(1).unwrap(), "10.0.0.11");
    }

    #[test]
    fn test_p2p_uplinks_from_downlink_pool() {
        let mut switch = leaf();
        switch.uplink_switches = vec!["spine1".to_string()];
        switch.uplink_switch_interfaces = vec!["Ethernet5".to_string()];
        let hostvars = Value::Null;
        let mut peers: BTreeMap<String, Value> = BTreeMap::new();
        peers.insert(
            "spine1".to_string(),
            json!({"downlink_pools": [{"downlink_interfaces": "Ethernet1-8", "downlink_ipv4_pool": "10.8.0.0/24"}]}),
        );
        let shared = SharedUtils::new(&switch, &hostvars, &peers);
        let ip = AvdIpAddressing::new(IpAddressingUtils::new(&shared));

        assert_eq!(ip.p2p_uplinks_peer_ip(0).unwrap(), "10.8.0.8");
        assert_eq!(ip.p2p_uplinks_ip(0).unwrap(), "10.8.0.9");
    }
}
