use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use log::LevelFilter::Debug;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::limit;
use tower_http::services::ServeDir;

use scr_axum_allowlist::admin::host_admin_router;
use scr_axum_allowlist::{AllowlistHandlerBuilder, BasicHostAcl, HostAcl};

// Serves the directory at ALW_ROOT under /files/ to allowlisted hosts,
// and exposes /admin/add, /admin/del and /admin/dump to loopback only.
//
//   curl 'http://127.0.0.1:8080/admin/add?ip=192.0.2.10'
//   curl 'http://127.0.0.1:8080/admin/dump'
#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let demo_env = get_demo_env();
    if !demo_env.is_nop_logger {
        SimpleLogger::new()
            .with_level(demo_env.log_level)
            .init()
            .unwrap();
    }

    let acl = Arc::new(BasicHostAcl::new());
    acl.add(&[127, 0, 0, 1]);

    let admin_acl = Arc::new(BasicHostAcl::new());
    admin_acl.add_addr(IpAddr::V4(Ipv4Addr::LOCALHOST));
    admin_acl.add_addr(IpAddr::V6(Ipv6Addr::LOCALHOST));

    let protected_files = match AllowlistHandlerBuilder::new()
        .with_allow(Router::new().fallback_service(ServeDir::new(&demo_env.root)))
        .with_acl(acl.clone())
        .build() {
        Ok(h) => h,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    let admin = match AllowlistHandlerBuilder::new()
        .with_allow(host_admin_router(acl.clone()))
        .with_acl(admin_acl)
        .build() {
        Ok(h) => h,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    let app = Router::new()
        .nest_service("/files", protected_files)
        .nest_service("/admin", admin)
        .layer(limit::RequestBodyLimitLayer::new(4096))
        .into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(format!("{}:{}", demo_env.addr, demo_env.port))
        .await
        .unwrap();
    info!("serving {} on {}", demo_env.root, listener.local_addr().unwrap());

    async fn sig() {
        if let Err(err) = signal::ctrl_c().await {
            eprintln!("Unable to listen for shutdown signal: {}", err);
        }
        eprintln!("stopping file server");
    }

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(sig()).await {
        error!("server error: {}", e);
    }
}

fn get_demo_env() -> DemoEnv {
    let addr = std::env::var("ALW_ADDR").ok()
        .and_then(|s| IpAddr::from_str(&s).ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::from([127, 0, 0, 1])));
    let port = std::env::var("ALW_PORT").ok()
        .and_then(|s| u16::from_str(&s).ok())
        .unwrap_or(8080);
    let root = std::env::var("ALW_ROOT").ok()
        .unwrap_or_else(|| "files/".to_string());
    let is_nop_logger = std::env::var("ALW_IS_NOP_LOGGER").ok()
        .and_then(|s| bool::from_str(&s).ok())
        .unwrap_or(false);
    let log_level = std::env::var("ALW_LOG_LEVEL").ok()
        .and_then(|s| LevelFilter::from_str(&s).ok())
        .unwrap_or(Debug);
    DemoEnv {
        addr,
        port,
        root,
        is_nop_logger,
        log_level,
    }
}

struct DemoEnv {
    addr: IpAddr,
    port: u16,
    root: String,
    is_nop_logger: bool,
    log_level: LevelFilter,
}
