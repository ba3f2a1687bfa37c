use std::net::IpAddr;

use ipnet::IpNet;

/// An access control list of permitted IP addresses. Implementations
/// handle their own concurrency, so a single instance can be shared by
/// every request handler via `Arc<dyn Acl>`.
pub trait Acl: Sync + Send {
    /// Takes a raw 4 or 16 byte address and returns true if it is
    /// allowlisted. Malformed addresses are never permitted.
    fn permitted(&self, ip: &[u8]) -> bool;

    fn permitted_addr(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.permitted(&v4.octets()),
            IpAddr::V6(v6) => self.permitted(&v6.octets()),
        }
    }
}

/// An ACL keyed by individual hosts.
pub trait HostAcl: Acl {
    /// Adds the address so that it is now permitted. Malformed
    /// addresses are ignored.
    fn add(&self, ip: &[u8]);

    /// Drops the address so that it is no longer permitted. Malformed
    /// or absent addresses are ignored.
    fn remove(&self, ip: &[u8]);

    fn add_addr(&self, ip: IpAddr) {
        match ip {
            IpAddr::V4(v4) => self.add(&v4.octets()),
            IpAddr::V6(v6) => self.add(&v6.octets()),
        }
    }

    fn remove_addr(&self, ip: IpAddr) {
        match ip {
            IpAddr::V4(v4) => self.remove(&v4.octets()),
            IpAddr::V6(v6) => self.remove(&v6.octets()),
        }
    }
}

/// An ACL keyed by networks.
pub trait NetAcl: Acl {
    /// Adds the network so that every address inside it is permitted.
    fn add(&self, net: IpNet);

    /// Drops the first entry whose string form equals `net`'s. Entries
    /// that merely contain or are contained in `net` are left alone.
    fn remove(&self, net: &IpNet);
}
