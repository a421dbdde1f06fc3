use std::cell::OnceCell;

use crate::errors::{DesignError, Result};
use crate::models::{mlag_algorithm, DownlinkPool};
use crate::shared_utils::SharedUtils;
use crate::utils::{get, range_expand};

/// Facts the IP addressing derivations read.
///
/// Required values fail fast with `MissingVariable` so callers never see a
/// partially defined device.
pub trait AddressingFacts {
    fn hostname(&self) -> &str;
    fn id(&self) -> Result<i64>;
    fn is_mlag(&self) -> bool;
    fn mlag_primary_id(&self) -> Result<i64>;
    fn mlag_secondary_id(&self) -> Result<i64>;
    /// Subnet offset of an MLAG pair based on its odd id
    fn mlag_odd_id_based_offset(&self) -> Result<i64>;
    fn fabric_ip_addressing_mlag_algorithm(&self) -> Result<&str>;
    fn fabric_ip_addressing_mlag_ipv4_prefix_length(&self) -> u8;
    fn fabric_ip_addressing_p2p_uplinks_ipv4_prefix_length(&self) -> u8;
    fn mlag_peer_ipv4_pool(&self) -> Option<&str>;
    fn mlag_peer_l3_ipv4_pool(&self) -> Option<&str>;
    fn uplink_ipv4_pool(&self) -> Result<&str>;
    fn loopback_ipv4_pool(&self) -> Option<&str>;
    fn loopback_ipv4_offset(&self) -> i64;
    fn loopback_ipv6_pool(&self) -> Option<&str>;
    fn loopback_ipv6_offset(&self) -> i64;
    fn vtep_loopback_ipv4_pool(&self) -> Option<&str>;
    fn max_uplink_switches(&self) -> i64;
    fn max_parallel_uplinks(&self) -> i64;
    fn uplink_switches(&self) -> &[String];
    fn parallel_uplink_index(&self, uplink_switch_index: usize) -> Result<usize>;
    fn downlink_ipv4_pool(&self, uplink_switch_index: usize) -> Result<Option<String>>;
    fn p2p_ipv4_pool(&self, uplink_switch_index: usize) -> Result<String>;
    /// Pool and subnet offset of the point-to-point link behind an uplink
    fn p2p_ipv4_pool_and_offset(&self, uplink_switch_index: usize) -> Result<(String, i64)>;
}

/// Memoized accessors over one device's shared facts
pub struct IpAddressingUtils<'a> {
    shared: &'a SharedUtils<'a>,
    mlag_primary_id: OnceCell<Result<i64>>,
    mlag_secondary_id: OnceCell<Result<i64>>,
    mlag_odd_id_based_offset: OnceCell<Result<i64>>,
}

impl<'a> IpAddressingUtils<'a> {
    pub fn new(shared: &'a SharedUtils<'a>) -> Self {
        Self {
            shared,
            mlag_primary_id: OnceCell::new(),
            mlag_secondary_id: OnceCell::new(),
            mlag_odd_id_based_offset: OnceCell::new(),
        }
    }

    fn uplink_switch(&self, uplink_switch_index: usize) -> Result<&'a str> {
        self.shared
            .uplink_switches()
            .get(uplink_switch_index)
            .map(String::as_str)
            .ok_or_else(|| {
                DesignError::config(format!(
                    "Uplink index {} is out of range, {} uplink switches are defined",
                    uplink_switch_index,
                    self.shared.uplink_switches().len()
                ))
            })
    }

    fn uplink_switch_interface(&self, uplink_switch_index: usize) -> Result<&'a str> {
        self.shared
            .uplink_switch_interfaces()
            .get(uplink_switch_index)
            .map(String::as_str)
            .ok_or_else(|| {
                DesignError::missing(format!(
                    "'uplink_switch_interfaces' has no entry for uplink index {}",
                    uplink_switch_index
                ))
            })
    }

    /// Position of the uplink switch among the distinct uplink switches, in order of first appearance
    fn uplink_switch_ordinal(&self, uplink_switch_index: usize) -> Result<usize> {
        let uplink_switch = self.uplink_switch(uplink_switch_index)?;
        let mut seen: Vec<&str> = Vec::new();
        for switch in self.shared.uplink_switches() {
            if !seen.contains(&switch.as_str()) {
                seen.push(switch);
            }
        }
        Ok(seen.iter().position(|s| *s == uplink_switch).unwrap_or_default())
    }

    /// First downlink declaration of the uplink switch matching our remote interface.
    /// Returns the pool and the position of the interface in the declaration.
    fn downlink_pool_match(&self, uplink_switch_index: usize) -> Result<Option<(Option<String>, usize)>> {
        let uplink_switch = self.uplink_switch(uplink_switch_index)?;
        let uplink_switch_interface = self.uplink_switch_interface(uplink_switch_index)?;
        let peer_facts = self.shared.get_peer_facts(uplink_switch, true)?;

        let Some(downlink_pools) = peer_facts.and_then(|facts| get(facts, "downlink_pools")) else {
            return Ok(None);
        };
        let downlink_pools: Vec<DownlinkPool> = serde_json::from_value(downlink_pools.clone())
            .map_err(|e| {
                DesignError::config(format!(
                    "Invalid 'downlink_pools' in the facts of '{}': {}",
                    uplink_switch, e
                ))
            })?;

        for declaration in downlink_pools {
            let downlink_interfaces = range_expand(&declaration.downlink_interfaces)?;
            if let Some(position) = downlink_interfaces
                .iter()
                .position(|interface| interface == uplink_switch_interface)
            {
                tracing::debug!(
                    "{}: {} on {} matches downlink pool {:?}",
                    self.shared.hostname(),
                    uplink_switch_interface,
                    uplink_switch,
                    declaration.downlink_ipv4_pool
                );
                return Ok(Some((declaration.downlink_ipv4_pool, position)));
            }
        }

        Ok(None)
    }
}

impl AddressingFacts for IpAddressingUtils<'_> {
    fn hostname(&self) -> &str {
        self.shared.hostname()
    }

    fn id(&self) -> Result<i64> {
        self.shared
            .switch()
            .id
            .ok_or_else(|| DesignError::missing("'id' is required to calculate IP addresses"))
    }

    fn is_mlag(&self) -> bool {
        self.shared.switch().mlag_switch_ids.is_some()
    }

    fn mlag_primary_id(&self) -> Result<i64> {
        self.mlag_primary_id
            .get_or_init(|| {
                self.shared
                    .switch()
                    .mlag_switch_ids
                    .and_then(|ids| ids.primary)
                    .ok_or_else(|| {
                        DesignError::missing("'mlag_switch_ids' is required to calculate MLAG IP addresses")
                    })
            })
            .clone()
    }

    fn mlag_secondary_id(&self) -> Result<i64> {
        self.mlag_secondary_id
            .get_or_init(|| {
                self.shared
                    .switch()
                    .mlag_switch_ids
                    .and_then(|ids| ids.secondary)
                    .ok_or_else(|| {
                        DesignError::missing("'mlag_switch_ids' is required to calculate MLAG IP addresses")
                    })
            })
            .clone()
    }

    fn mlag_odd_id_based_offset(&self) -> Result<i64> {
        self.mlag_odd_id_based_offset
            .get_or_init(|| {
                let primary = self.mlag_primary_id()?;
                let secondary = self.mlag_secondary_id()?;
                if primary.rem_euclid(2) == secondary.rem_euclid(2) {
                    return Err(DesignError::config(
                        "MLAG compact addressing mode requires all MLAG pairs to have a single odd and even ID",
                    ));
                }
                let odd_id = if primary.rem_euclid(2) == 1 { primary } else { secondary };
                Ok((odd_id - 1).div_euclid(2))
            })
            .clone()
    }

    fn fabric_ip_addressing_mlag_algorithm(&self) -> Result<&str> {
        let algorithm = self.shared.switch().fabric_ip_addressing.mlag.algorithm.as_str();
        if !mlag_algorithm::is_valid(algorithm) {
            return Err(DesignError::config(format!(
                "Unsupported 'fabric_ip_addressing.mlag.algorithm' '{}', expected one of {:?}",
                algorithm,
                mlag_algorithm::ALL
            )));
        }
        Ok(algorithm)
    }

    fn fabric_ip_addressing_mlag_ipv4_prefix_length(&self) -> u8 {
        self.shared.switch().fabric_ip_addressing.mlag.ipv4_prefix_length
    }

    fn fabric_ip_addressing_p2p_uplinks_ipv4_prefix_length(&self) -> u8 {
        self.shared.switch().fabric_ip_addressing.p2p_uplinks.ipv4_prefix_length
    }

    fn mlag_peer_ipv4_pool(&self) -> Option<&str> {
        self.shared.switch().mlag_peer_ipv4_pool.as_deref()
    }

    fn mlag_peer_l3_ipv4_pool(&self) -> Option<&str> {
        self.shared.switch().mlag_peer_l3_ipv4_pool.as_deref()
    }

    fn uplink_ipv4_pool(&self) -> Result<&str> {
        self.shared
            .switch()
            .uplink_ipv4_pool
            .as_deref()
            .ok_or_else(|| DesignError::missing("'uplink_ipv4_pool' is required to calculate uplink IP addresses"))
    }

    fn loopback_ipv4_pool(&self) -> Option<&str> {
        self.shared.switch().loopback_ipv4_pool.as_deref()
    }

    fn loopback_ipv4_offset(&self) -> i64 {
        self.shared.switch().loopback_ipv4_offset
    }

    fn loopback_ipv6_pool(&self) -> Option<&str> {
        self.shared.switch().loopback_ipv6_pool.as_deref()
    }

    fn loopback_ipv6_offset(&self) -> i64 {
        self.shared.switch().loopback_ipv6_offset
    }

    fn vtep_loopback_ipv4_pool(&self) -> Option<&str> {
        self.shared.switch().vtep_loopback_ipv4_pool.as_deref()
    }

    fn max_uplink_switches(&self) -> i64 {
        self.shared.switch().max_uplink_switches
    }

    fn max_parallel_uplinks(&self) -> i64 {
        self.shared.switch().max_parallel_uplinks
    }

    fn uplink_switches(&self) -> &[String] {
        self.shared.uplink_switches()
    }

    fn parallel_uplink_index(&self, uplink_switch_index: usize) -> Result<usize> {
        let uplink_switch = self.uplink_switch(uplink_switch_index)?;
        // Uplinks before this one going to the same uplink switch
        Ok(self.shared.uplink_switches()[..uplink_switch_index]
            .iter()
            .filter(|switch| *switch == uplink_switch)
            .count())
    }

    fn downlink_ipv4_pool(&self, uplink_switch_index: usize) -> Result<Option<String>> {
        Ok(self
            .downlink_pool_match(uplink_switch_index)?
            .and_then(|(pool, _)| pool))
    }

    fn p2p_ipv4_pool(&self, uplink_switch_index: usize) -> Result<String> {
        let uplink_pool = self.uplink_ipv4_pool();
        let downlink_pool = self.downlink_ipv4_pool(uplink_switch_index)?;

        match (uplink_pool, downlink_pool) {
            (Ok(_), Some(_)) => Err(DesignError::config(
                "Either 'uplink_ipv4_pool' is set on this switch or 'downlink_pools' is set on all uplink switches, not both.",
            )),
            (Err(_), None) => Err(DesignError::missing(
                "To calculate uplink IP addresses 'uplink_ipv4_pool' must be set on this switch or 'downlink_ipv4_pool' on all the uplink switches.",
            )),
            (Err(_), Some(pool)) => Ok(pool),
            (Ok(pool), None) => Ok(pool.to_string()),
        }
    }

    fn p2p_ipv4_pool_and_offset(&self, uplink_switch_index: usize) -> Result<(String, i64)> {
        let pool = self.p2p_ipv4_pool(uplink_switch_index)?;

        if let Some((Some(_), position)) = self.downlink_pool_match(uplink_switch_index)? {
            return Ok((pool, position as i64));
        }

        let max_uplink_switches = self.max_uplink_switches();
        let max_parallel_uplinks = self.max_parallel_uplinks();
        let ordinal = self.uplink_switch_ordinal(uplink_switch_index)? as i64;
        let parallel_index = self.parallel_uplink_index(uplink_switch_index)? as i64;
        if ordinal >= max_uplink_switches {
            return Err(DesignError::config(format!(
                "Uplink switch number {} exceeds 'max_uplink_switches' ({})",
                ordinal + 1,
                max_uplink_switches
            )));
        }
        if parallel_index >= max_parallel_uplinks {
            return Err(DesignError::config(format!(
                "Parallel uplink number {} exceeds 'max_parallel_uplinks' ({})",
                parallel_index + 1,
                max_parallel_uplinks
            )));
        }
        let offset = (self.id()? - 1) * max_uplink_switches * max_parallel_uplinks
            + ordinal * max_parallel_uplinks
            + parallel_index;
        Ok((pool, offset))
    }
}
