use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;
use log::warn;

use crate::acl::{Acl, HostAcl, NetAcl};
use crate::ip_validator::valid_ip;

/// Where stubbed ACLs report that allowlisting is not enforced.
/// Closures of the shape `Fn(&str)` can be used directly.
pub trait WarningSink: Sync + Send {
    fn warn(&self, message: &str);
}

impl<F: Send + Sync + 'static> WarningSink for F
    where F: Fn(&str)
{
    fn warn(&self, message: &str) {
        self(message)
    }
}

/// Forwards stub warnings to the `log` facade.
pub struct LogWarningSink;

impl LogWarningSink {
    pub const fn new() -> Self {
        LogWarningSink {}
    }
}

impl WarningSink for LogWarningSink {
    fn warn(&self, message: &str) {
        warn!(target: "scr_axum_allowlist::stub", "{}", message);
    }
}

fn display_ip(ip: &[u8]) -> String {
    valid_ip(ip)
        .map(|ip: IpAddr| ip.to_string())
        .unwrap_or_else(|| format!("?{:?}", ip))
}

/// Lets host allowlisting be wired into a request flow without
/// enforcing anything yet: every address is permitted and every call
/// emits a warning.
#[derive(Clone)]
pub struct HostStub {
    sink: Arc<dyn WarningSink>,
}

impl HostStub {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LogWarningSink::new()))
    }

    pub fn with_sink(sink: Arc<dyn WarningSink>) -> Self {
        sink.warn("WARNING: allowlisting is being stubbed");
        Self { sink }
    }
}

impl Default for HostStub {
    fn default() -> Self {
        Self::new()
    }
}

impl Acl for HostStub {
    fn permitted(&self, ip: &[u8]) -> bool {
        self.sink.warn(&format!("WARNING: allowlist check for {} but allowlisting is stubbed", display_ip(ip)));
        true
    }
}

impl HostAcl for HostStub {
    fn add(&self, ip: &[u8]) {
        self.sink.warn(&format!("WARNING: IP {} added to allowlist but allowlisting is stubbed", display_ip(ip)));
    }

    fn remove(&self, ip: &[u8]) {
        self.sink.warn(&format!("WARNING: IP {} removed from allowlist but allowlisting is stubbed", display_ip(ip)));
    }
}

/// The network counterpart of [`HostStub`].
#[derive(Clone)]
pub struct NetStub {
    sink: Arc<dyn WarningSink>,
}

impl NetStub {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LogWarningSink::new()))
    }

    pub fn with_sink(sink: Arc<dyn WarningSink>) -> Self {
        sink.warn("WARNING: allowlisting is being stubbed");
        Self { sink }
    }
}

impl Default for NetStub {
    fn default() -> Self {
        Self::new()
    }
}

impl Acl for NetStub {
    fn permitted(&self, ip: &[u8]) -> bool {
        self.sink.warn(&format!("WARNING: allowlist check for {} but allowlisting is stubbed", display_ip(ip)));
        true
    }
}

impl NetAcl for NetStub {
    fn add(&self, net: IpNet) {
        self.sink.warn(&format!("WARNING: IP network {} added to allowlist but allowlisting is stubbed", net));
    }

    fn remove(&self, net: &IpNet) {
        self.sink.warn(&format!("WARNING: IP network {} removed from allowlist but allowlisting is stubbed", net));
    }
}
