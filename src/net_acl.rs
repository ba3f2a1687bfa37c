use std::fmt::{Debug, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ipnet::IpNet;
use log::debug;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::acl::{Acl, NetAcl};
use crate::codec::{compact_tokens, dump_lines, quote, unquote};
use crate::exceptions::AllowlistException;
use crate::ip_validator::valid_ip;

/// A network allowlist backed by a plain vector and a single mutex.
///
/// Lookups scan the networks in insertion order, so this will not scale
/// to routing-table sized lists. Overlapping networks are neither merged
/// nor detected: with `10.0.0.0/8` and `10.1.0.0/16` both present,
/// removing `10.1.0.0/16` leaves `10.1.2.3` permitted through the /8.
pub struct BasicNetAcl {
    allowlist: Mutex<Vec<IpNet>>,
}

impl BasicNetAcl {
    pub fn new() -> Self {
        Self {
            allowlist: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<IpNet>> {
        self.allowlist.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn entries(&self) -> Vec<String> {
        self.lock().iter().map(IpNet::to_string).collect()
    }

    /// Stored networks that contain, or are contained in, `net`. Purely
    /// informational; `add` and `remove` never consult it.
    pub fn overlapping(&self, net: &IpNet) -> Vec<IpNet> {
        self.lock().iter()
            .filter(|n| n.contains(net) || net.contains(*n))
            .copied()
            .collect()
    }

    /// Compact form: comma separated networks in insertion order, wrapped
    /// in double quotes.
    pub fn to_json(&self) -> String {
        quote(&self.entries())
    }

    pub fn from_json(input: &[u8]) -> Result<Self, AllowlistException> {
        Self::from_tokens(compact_tokens(unquote(input)?))
    }

    /// One network per line, sorted.
    pub fn dump(&self) -> String {
        let mut nets = self.entries();
        nets.sort();
        nets.join("\n")
    }

    pub fn load(input: &[u8]) -> Result<Self, AllowlistException> {
        Self::from_tokens(dump_lines(input)?)
    }

    fn from_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Self, AllowlistException> {
        let mut allowlist = Vec::new();
        for token in tokens {
            let net = token.parse::<IpNet>()
                .map_err(|_| AllowlistException::invalid_address(token))?;
            // host bits are dropped, 10.1.2.3/8 is stored as 10.0.0.0/8
            allowlist.push(net.trunc());
        }
        Ok(Self {
            allowlist: Mutex::new(allowlist),
        })
    }
}

impl Default for BasicNetAcl {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for BasicNetAcl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicNetAcl")
            .field("allowlist", &self.entries())
            .finish()
    }
}

impl Acl for BasicNetAcl {
    fn permitted(&self, ip: &[u8]) -> bool {
        match valid_ip(ip) {
            None => false,
            Some(ip) => self.lock().iter().any(|net| net.contains(&ip)),
        }
    }
}

impl NetAcl for BasicNetAcl {
    fn add(&self, net: IpNet) {
        self.lock().push(net);
        debug!("network {} added to allowlist", net);
    }

    fn remove(&self, net: &IpNet) {
        let target = net.to_string();
        let mut allowlist = self.lock();
        if let Some(index) = allowlist.iter().position(|n| n.to_string() == target) {
            allowlist.remove(index);
            drop(allowlist);
            debug!("network {} removed from allowlist", target);
        }
    }
}

impl Serialize for BasicNetAcl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.entries().join(","))
    }
}

impl<'de> Deserialize<'de> for BasicNetAcl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_tokens(compact_tokens(&s)).map_err(DeError::custom)
    }
}

#[cfg(test)]
mod net_acl_test {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::thread;

    use ipnet::IpNet;

    use crate::acl::{Acl, NetAcl};
    use crate::exceptions::AlexKind;

    use super::BasicNetAcl;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[test]
    fn test_add_then_remove() {
        let acl = BasicNetAcl::new();
        acl.add(net("192.168.0.0/24"));
        assert!(acl.permitted(&[192, 168, 0, 77]));
        assert!(!acl.permitted(&[192, 168, 1, 77]));
        acl.remove(&net("192.168.0.0/24"));
        assert!(!acl.permitted(&[192, 168, 0, 77]));
        assert!(acl.is_empty());
    }

    #[test]
    fn test_overlap_asymmetry() {
        let acl = BasicNetAcl::new();
        acl.add(net("10.0.0.0/8"));
        acl.add(net("10.1.0.0/16"));

        acl.remove(&net("10.1.0.0/16"));
        assert_eq!(acl.len(), 1);
        assert!(acl.permitted(&[10, 1, 2, 3]));

        acl.add(net("10.1.0.0/16"));
        acl.remove(&net("10.0.0.0/8"));
        assert_eq!(acl.len(), 1);
        assert!(acl.permitted(&[10, 1, 2, 3]));
        assert!(!acl.permitted(&[10, 2, 0, 1]));
    }

    #[test]
    fn test_remove_narrower_keeps_broad() {
        let acl = BasicNetAcl::new();
        acl.add(net("10.0.0.0/8"));
        acl.remove(&net("10.1.2.0/24"));
        assert_eq!(acl.len(), 1);
        assert!(acl.permitted(&[10, 1, 2, 3]));
    }

    #[test]
    fn test_remove_first_duplicate_only() {
        let acl = BasicNetAcl::new();
        acl.add(net("172.16.0.0/12"));
        acl.add(net("172.16.0.0/12"));
        acl.remove(&net("172.16.0.0/12"));
        assert_eq!(acl.len(), 1);
        assert!(acl.permitted(&[172, 20, 0, 1]));
        acl.remove(&net("172.16.0.0/12"));
        acl.remove(&net("172.16.0.0/12"));
        assert!(acl.is_empty());
    }

    #[test]
    fn test_malformed_address_not_permitted() {
        let acl = BasicNetAcl::new();
        acl.add(net("0.0.0.0/0"));
        assert!(acl.permitted(&[1, 2, 3, 4]));
        assert!(!acl.permitted(&[1, 2, 3]));
        assert!(!acl.permitted(&[0u8; 5]));
    }

    #[test]
    fn test_families_do_not_mix() {
        let acl = BasicNetAcl::new();
        acl.add(net("127.0.0.0/8"));
        assert!(acl.permitted_addr(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(!acl.permitted_addr(IpAddr::V6(Ipv4Addr::LOCALHOST.to_ipv6_mapped())));
        acl.add(net("::1/128"));
        assert!(acl.permitted_addr(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    }

    #[test]
    fn test_overlapping_is_informational() {
        let acl = BasicNetAcl::new();
        acl.add(net("10.0.0.0/8"));
        acl.add(net("192.168.0.0/16"));
        assert_eq!(acl.overlapping(&net("10.1.0.0/16")), vec![net("10.0.0.0/8")]);
        assert_eq!(acl.overlapping(&net("0.0.0.0/0")).len(), 2);
        assert!(acl.overlapping(&net("fd00::/8")).is_empty());
        acl.add(net("10.1.0.0/16"));
        assert_eq!(acl.len(), 3);
    }

    #[test]
    fn test_json_round_trip() {
        let acl = BasicNetAcl::new();
        acl.add(net("10.0.0.0/8"));
        acl.add(net("fd00::/8"));
        assert_eq!(acl.to_json(), "\"10.0.0.0/8,fd00::/8\"");
        let loaded = BasicNetAcl::from_json(acl.to_json().as_bytes()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.permitted(&[10, 200, 0, 1]));
        assert!(loaded.permitted(&"fd12::1".parse::<Ipv6Addr>().unwrap().octets()));
        assert!(!loaded.permitted(&[11, 0, 0, 1]));
    }

    #[test]
    fn test_from_json_truncates_host_bits() {
        let acl = BasicNetAcl::from_json(b"\" 10.1.2.3/8 ,, \"").unwrap();
        assert_eq!(acl.len(), 1);
        assert_eq!(acl.to_json(), "\"10.0.0.0/8\"");
    }

    #[test]
    fn test_from_json_errors() {
        assert_eq!(BasicNetAcl::from_json(b"abc").unwrap_err().kind(), AlexKind::InvalidFormat);
        assert_eq!(BasicNetAcl::from_json(b"\"10.0.0.0/33\"").unwrap_err().kind(), AlexKind::InvalidAddress);
        assert_eq!(BasicNetAcl::from_json(b"\"10.0.0.1\"").unwrap_err().kind(), AlexKind::InvalidAddress);
        assert!(BasicNetAcl::from_json(b"\"\"").unwrap().is_empty());
    }

    #[test]
    fn test_dump_load_round_trip() {
        let acl = BasicNetAcl::new();
        acl.add(net("192.168.0.0/16"));
        acl.add(net("10.0.0.0/8"));
        assert_eq!(acl.dump(), "10.0.0.0/8\n192.168.0.0/16");
        let loaded = BasicNetAcl::load(acl.dump().as_bytes()).unwrap();
        assert_eq!(loaded.dump(), acl.dump());
        assert!(BasicNetAcl::load(b"").unwrap().is_empty());
        assert!(BasicNetAcl::load(b"10.0.0.0/8\nnope").is_err());
    }

    #[test]
    fn test_serde() {
        let acl: BasicNetAcl = serde_json::from_str("\"10.0.0.0/8,::1/128\"").unwrap();
        assert_eq!(serde_json::to_string(&acl).unwrap(), "\"10.0.0.0/8,::1/128\"");
        assert!(serde_json::from_str::<BasicNetAcl>("\"10.0.0.0/8,bad\"").is_err());
    }

    #[test]
    fn test_concurrent_add_then_check() {
        let acl = BasicNetAcl::new();
        let nets: Vec<IpNet> = (0..64u8).map(|i| net(&format!("10.{}.0.0/16", i))).collect();
        thread::scope(|s| {
            for n in nets.iter() {
                let acl = &acl;
                s.spawn(move || acl.add(*n));
            }
        });
        assert_eq!(acl.len(), nets.len());
        thread::scope(|s| {
            let handles: Vec<_> = (0..64u8)
                .map(|i| {
                    let acl = &acl;
                    s.spawn(move || acl.permitted(&[10, i, 9, 9]))
                })
                .collect();
            for h in handles {
                assert!(h.join().unwrap());
            }
        });
    }
}
