//! Minimal administrative endpoints for editing a live allowlist over
//! HTTP. They perform no access control of their own; wrap them in an
//! [`AllowlistHandler`](crate::handler::AllowlistHandler) or the
//! [`check_allowlist`](crate::handler::check_allowlist) middleware with an
//! admin-only list.
//!
//! | Route             | Effect                                   |
//! |-------------------|------------------------------------------|
//! | `GET /add?ip=..`  | add a host (`?net=..` for networks)      |
//! | `GET /del?ip=..`  | remove a host (`?net=..` for networks)   |
//! | `GET /dump`       | the list as a JSON string value          |

use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use ipnet::IpNet;
use log::info;
use serde::Deserialize;

use crate::acl::{HostAcl, NetAcl};
use crate::exceptions::AllowlistException;
use crate::host_acl::BasicHostAcl;
use crate::net_acl::BasicNetAcl;

#[derive(Deserialize)]
struct HostParam {
    ip: String,
}

#[derive(Deserialize)]
struct NetParam {
    net: String,
}

pub fn host_admin_router(acl: Arc<BasicHostAcl>) -> Router {
    Router::new()
        .route("/add", get(add_host))
        .route("/del", get(del_host))
        .route("/dump", get(dump_hosts))
        .with_state(acl)
}

pub fn net_admin_router(acl: Arc<BasicNetAcl>) -> Router {
    Router::new()
        .route("/add", get(add_net))
        .route("/del", get(del_net))
        .route("/dump", get(dump_nets))
        .with_state(acl)
}

fn json(body: String) -> Response {
    ([(CONTENT_TYPE, "application/json")], body).into_response()
}

async fn add_host(State(acl): State<Arc<BasicHostAcl>>, Query(param): Query<HostParam>) -> Response {
    let ip = match param.ip.trim().parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => return AllowlistException::invalid_address(&param.ip).into_response(),
    };
    info!("request to add {} to the allowlist", ip);
    acl.add_addr(ip);
    format!("Added {} to allowlist.\n", ip).into_response()
}

async fn del_host(State(acl): State<Arc<BasicHostAcl>>, Query(param): Query<HostParam>) -> Response {
    let ip = match param.ip.trim().parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => return AllowlistException::invalid_address(&param.ip).into_response(),
    };
    info!("request to remove {} from the allowlist", ip);
    acl.remove_addr(ip);
    format!("Removed {} from allowlist.\n", ip).into_response()
}

async fn dump_hosts(State(acl): State<Arc<BasicHostAcl>>) -> Response {
    json(acl.to_json())
}

async fn add_net(State(acl): State<Arc<BasicNetAcl>>, Query(param): Query<NetParam>) -> Response {
    let net = match param.net.trim().parse::<IpNet>() {
        Ok(net) => net,
        Err(_) => return AllowlistException::invalid_address(&param.net).into_response(),
    };
    info!("request to add {} to the allowlist", net);
    acl.add(net);
    format!("Added {} to allowlist.\n", net).into_response()
}

async fn del_net(State(acl): State<Arc<BasicNetAcl>>, Query(param): Query<NetParam>) -> Response {
    let net = match param.net.trim().parse::<IpNet>() {
        Ok(net) => net,
        Err(_) => return AllowlistException::invalid_address(&param.net).into_response(),
    };
    info!("request to remove {} from the allowlist", net);
    acl.remove(&net);
    format!("Removed {} from allowlist.\n", net).into_response()
}

async fn dump_nets(State(acl): State<Arc<BasicNetAcl>>) -> Response {
    json(acl.to_json())
}

#[cfg(test)]
mod admin_test {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    use crate::acl::Acl;
    use crate::host_acl::BasicHostAcl;
    use crate::net_acl::BasicNetAcl;

    use super::{host_admin_router, net_admin_router};

    async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_host_admin() {
        let acl = Arc::new(BasicHostAcl::new());
        let app = host_admin_router(acl.clone());

        let (status, body) = get(&app, "/add?ip=10.0.0.7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Added 10.0.0.7 to allowlist.\n");
        assert!(acl.permitted(&[10, 0, 0, 7]));

        let (status, body) = get(&app, "/dump").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "\"10.0.0.7\"");
        assert!(BasicHostAcl::from_json(body.as_bytes()).unwrap().permitted(&[10, 0, 0, 7]));

        let (status, _) = get(&app, "/del?ip=10.0.0.7").await;
        assert_eq!(status, StatusCode::OK);
        assert!(acl.is_empty());
        assert_eq!(get(&app, "/dump").await.1, "\"\"");
    }

    #[tokio::test]
    async fn test_host_admin_bad_input() {
        let acl = Arc::new(BasicHostAcl::new());
        let app = host_admin_router(acl.clone());
        assert_eq!(get(&app, "/add?ip=nope").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(get(&app, "/add").await.0, StatusCode::BAD_REQUEST);
        assert!(acl.is_empty());
    }

    #[tokio::test]
    async fn test_net_admin() {
        let acl = Arc::new(BasicNetAcl::new());
        let app = net_admin_router(acl.clone());

        assert_eq!(get(&app, "/add?net=10.0.0.0/8").await.0, StatusCode::OK);
        assert_eq!(get(&app, "/add?net=10.1.0.0/16").await.0, StatusCode::OK);
        assert_eq!(get(&app, "/dump").await.1, "\"10.0.0.0/8,10.1.0.0/16\"");

        assert_eq!(get(&app, "/del?net=10.1.0.0/16").await.0, StatusCode::OK);
        assert!(acl.permitted(&[10, 1, 2, 3]));
        assert_eq!(get(&app, "/add?net=10.0.0.0").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(acl.len(), 1);
    }
}
