use std::net::{IpAddr, SocketAddr};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use tokio::net::TcpStream;

use crate::exceptions::AllowlistException;

/// Extracts the caller's address from an inbound request.
///
/// The default, [`ConnectInfoLookup`], reads the peer address axum
/// records when serving with `into_make_service_with_connect_info`.
/// Deployments behind a proxy can plug in a closure reading a trusted
/// header instead.
pub trait AddrLookup: Sync + Send {
    fn lookup(&self, req: &Request<Body>) -> Result<IpAddr, AllowlistException>;
}

impl<F: Send + Sync + 'static> AddrLookup for F
    where F: Fn(&Request<Body>) -> Result<IpAddr, AllowlistException>
{
    fn lookup(&self, req: &Request<Body>) -> Result<IpAddr, AllowlistException> {
        self(req)
    }
}

pub struct ConnectInfoLookup;

impl ConnectInfoLookup {
    pub const fn new() -> Self {
        ConnectInfoLookup {}
    }
}

impl AddrLookup for ConnectInfoLookup {
    fn lookup(&self, req: &Request<Body>) -> Result<IpAddr, AllowlistException> {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or_else(|| AllowlistException::extraction("no address returned".to_string()))
    }
}

/// Parses a `host:port` remote address, e.g. `127.0.0.1:53124` or
/// `[::1]:53124`.
pub fn remote_addr_lookup(remote_addr: &str) -> Result<IpAddr, AllowlistException> {
    remote_addr.parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .map_err(|e| AllowlistException::extraction(format!("bad remote address {}: {}", remote_addr, e)))
}

/// Peer address of an accepted connection.
pub fn net_conn_lookup(conn: Option<&TcpStream>) -> Result<IpAddr, AllowlistException> {
    let conn = conn.ok_or_else(|| AllowlistException::extraction("no connection".to_string()))?;
    conn.peer_addr()
        .map(|addr| addr.ip())
        .map_err(|e| AllowlistException::extraction(format!("no address returned: {}", e)))
}
