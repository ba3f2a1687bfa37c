use std::net::IpAddr;

const IPV4_LEN: usize = 4;
const IPV6_LEN: usize = 16;

/// Checks that a raw address is structurally possible, i.e. 4 bytes for
/// IPv4 or 16 bytes for IPv6, and turns it into an `IpAddr`.
///
/// No semantic checks are done: loopback, multicast, unspecified and so
/// on are all fine. A 16 byte IPv4-mapped address stays an IPv6 address,
/// so `::ffff:127.0.0.1` and `127.0.0.1` are different entries.
pub fn valid_ip(ip: &[u8]) -> Option<IpAddr> {
    match ip.len() {
        IPV4_LEN => <[u8; IPV4_LEN]>::try_from(ip).ok().map(IpAddr::from),
        IPV6_LEN => <[u8; IPV6_LEN]>::try_from(ip).ok().map(IpAddr::from),
        _ => None,
    }
}

pub fn is_valid_ip(ip: &[u8]) -> bool {
    valid_ip(ip).is_some()
}
