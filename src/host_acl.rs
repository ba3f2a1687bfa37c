use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::acl::{Acl, HostAcl};
use crate::codec::{compact_tokens, dump_lines, quote, unquote};
use crate::exceptions::AllowlistException;
use crate::ip_validator::valid_ip;

/// A set-backed host allowlist guarded by a single mutex.
///
/// Entries are keyed by the canonical string of the address, so an IPv4
/// address and its IPv4-mapped IPv6 form are different hosts: allowing
/// `127.0.0.1` does not allow `::ffff:127.0.0.1`.
pub struct BasicHostAcl {
    allowlist: Mutex<HashSet<String>>,
}

impl BasicHostAcl {
    pub fn new() -> Self {
        Self {
            allowlist: Mutex::new(HashSet::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // every mutation is a single insert or remove, nothing to roll back
        self.allowlist.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn entries(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    /// Compact form: the comma separated hosts wrapped in double quotes,
    /// in no particular order.
    pub fn to_json(&self) -> String {
        quote(&self.entries())
    }

    /// Parses the compact form into a new list. A single bad host fails
    /// the whole load.
    pub fn from_json(input: &[u8]) -> Result<Self, AllowlistException> {
        Self::from_tokens(compact_tokens(unquote(input)?))
    }

    /// One host per line, sorted, for writing to disk.
    pub fn dump(&self) -> String {
        let mut addrs = self.entries();
        addrs.sort();
        addrs.join("\n")
    }

    /// Loads a list written by `dump`. Blank lines are skipped.
    pub fn load(input: &[u8]) -> Result<Self, AllowlistException> {
        Self::from_tokens(dump_lines(input)?)
    }

    fn from_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Self, AllowlistException> {
        let mut allowlist = HashSet::new();
        for token in tokens {
            let ip = token.parse::<IpAddr>()
                .map_err(|_| AllowlistException::invalid_address(token))?;
            allowlist.insert(ip.to_string());
        }
        Ok(Self {
            allowlist: Mutex::new(allowlist),
        })
    }
}

impl Default for BasicHostAcl {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for BasicHostAcl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicHostAcl")
            .field("allowlist", &self.entries())
            .finish()
    }
}

impl Acl for BasicHostAcl {
    fn permitted(&self, ip: &[u8]) -> bool {
        match valid_ip(ip) {
            None => false,
            Some(ip) => {
                let key = ip.to_string();
                self.lock().contains(&key)
            }
        }
    }
}

impl HostAcl for BasicHostAcl {
    fn add(&self, ip: &[u8]) {
        let Some(ip) = valid_ip(ip) else {
            return;
        };
        let key = ip.to_string();
        self.lock().insert(key);
        debug!("host {} added to allowlist", ip);
    }

    fn remove(&self, ip: &[u8]) {
        let Some(ip) = valid_ip(ip) else {
            return;
        };
        let key = ip.to_string();
        if self.lock().remove(&key) {
            debug!("host {} removed from allowlist", ip);
        }
    }
}

impl Serialize for BasicHostAcl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.entries().join(","))
    }
}

impl<'de> Deserialize<'de> for BasicHostAcl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_tokens(compact_tokens(&s)).map_err(DeError::custom)
    }
}
