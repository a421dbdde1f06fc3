use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;

use crate::errors::{DesignError, Result};

/// Parse one network of a pool, host bits cleared
fn parse_network(network: &str) -> Result<IpNet> {
    network
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|e| DesignError::config(format!("Invalid IP pool '{}': {}", network, e)))
}

fn networks(pool: &str) -> impl Iterator<Item = &str> {
    pool.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Prefix length of the first network of a pool
pub fn pool_prefix_len(pool: &str) -> Result<u8> {
    let first = networks(pool)
        .next()
        .ok_or_else(|| DesignError::config(format!("Invalid IP pool '{}'", pool)))?;
    Ok(parse_network(first)?.prefix_len())
}

/// Pick subnet number `subnet_offset` of size `prefix_len` from `pool` and
/// return its host number `ip_offset` (0 is the network address).
///
/// A pool may list several networks separated by commas; they are consumed in
/// order, so the offset continues into the next network once a network is used up.
pub fn get_ip_from_pool(pool: &str, prefix_len: u8, subnet_offset: i64, ip_offset: u64) -> Result<IpAddr> {
    if subnet_offset < 0 {
        return Err(DesignError::config(format!(
            "Invalid negative subnet offset {} for pool '{}'",
            subnet_offset, pool
        )));
    }
    let mut remaining = subnet_offset as u128;

    for network in networks(pool) {
        let net = parse_network(network)?;
        let max_prefix_len = net.max_prefix_len();
        if prefix_len > max_prefix_len || prefix_len < net.prefix_len() {
            return Err(DesignError::config(format!(
                "Unable to get subnets of size /{} from pool '{}'",
                prefix_len, network
            )));
        }

        let subnet_count = pow2(prefix_len - net.prefix_len());
        if remaining >= subnet_count {
            remaining -= subnet_count;
            continue;
        }

        let subnet_size = pow2(max_prefix_len - prefix_len);
        if u128::from(ip_offset) >= subnet_size {
            return Err(DesignError::config(format!(
                "Unable to get IP number {} from a /{} subnet of pool '{}'",
                ip_offset, prefix_len, network
            )));
        }

        let address = remaining
            .checked_mul(subnet_size)
            .and_then(|offset| offset.checked_add(addr_to_u128(net.network())))
            .and_then(|base| base.checked_add(u128::from(ip_offset)))
            .ok_or_else(|| DesignError::config(format!("Address overflow in pool '{}'", network)))?;

        return Ok(u128_to_addr(address, &net));
    }

    Err(DesignError::config(format!(
        "Unable to get subnet number {} of size /{} from pool '{}', the pool is exhausted",
        subnet_offset, prefix_len, pool
    )))
}

fn pow2(bits: u8) -> u128 {
    1u128.checked_shl(u32::from(bits)).unwrap_or(u128::MAX)
}

fn addr_to_u128(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(a) => u128::from(u32::from(a)),
        IpAddr::V6(a) => u128::from(a),
    }
}

fn u128_to_addr(value: u128, net: &IpNet) -> IpAddr {
    match net {
        IpNet::V4(_) => IpAddr::V4(Ipv4Addr::from(value as u32)),
        IpNet::V6(_) => IpAddr::V6(Ipv6Addr::from(value)),
    }
}
