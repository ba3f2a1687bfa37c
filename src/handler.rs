use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::future::BoxFuture;
use log::{debug, error, warn};
use tower::{Service, ServiceExt};

use crate::acl::Acl;
use crate::exceptions::AllowlistException;
use crate::lookup::{AddrLookup, ConnectInfoLookup};

/// Wraps a router with an allowlist check.
///
/// Requests from permitted addresses go to the allow router. Everything
/// else goes to the deny router, or gets a 401 when there is none. If the
/// caller's address cannot be determined the request fails with a 500.
///
/// It is a tower `Service`, so it mounts like any other:
/// ```ignore
/// let files = AllowlistHandlerBuilder::new()
///     .with_allow(Router::new().fallback_service(ServeDir::new("files")))
///     .with_acl(acl)
///     .build()?;
/// let app = Router::new().nest_service("/files", files);
/// ```
#[derive(Clone)]
pub struct AllowlistHandler {
    allow: Router,
    deny: Option<Router>,
    acl: Arc<dyn Acl>,
    lookup: Arc<dyn AddrLookup>,
}

impl AllowlistHandler {
    pub async fn handle(&self, req: Request<Body>) -> Response {
        let ip = match self.lookup.lookup(&req) {
            Ok(ip) => ip,
            Err(e) => {
                error!("failed to lookup request address: {}", e);
                return e.into_response();
            }
        };

        if self.acl.permitted_addr(ip) {
            debug!("{} is allowlisted, serving {}", ip, req.uri());
            return serve(self.allow.clone(), req).await;
        }

        match self.deny.as_ref() {
            Some(deny) => {
                debug!("{} is not allowlisted, handing {} to deny router", ip, req.uri());
                serve(deny.clone(), req).await
            }
            None => {
                warn!("{} is not allowlisted, rejecting {}", ip, req.uri());
                unauthorized()
            }
        }
    }
}

impl Service<Request<Body>> for AllowlistHandler {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(req).await) })
    }
}

async fn serve(router: Router, req: Request<Body>) -> Response {
    match router.oneshot(req).await {
        Ok(res) => res,
        Err(never) => match never {},
    }
}

fn unauthorized() -> Response {
    let status = StatusCode::UNAUTHORIZED;
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}

pub struct AllowlistHandlerBuilder {
    allow: Option<Router>,
    deny: Option<Router>,
    acl: Option<Arc<dyn Acl>>,
    lookup: Arc<dyn AddrLookup>,
}

impl AllowlistHandlerBuilder {
    pub fn new() -> Self {
        Self {
            allow: None,
            deny: None,
            acl: None,
            lookup: Arc::new(ConnectInfoLookup::new()),
        }
    }

    /// Mandatory. Serves requests from allowlisted addresses.
    pub fn with_allow(mut self, allow: Router) -> Self {
        self.allow = Some(allow);
        self
    }

    /// Optional. Serves requests from everybody else.
    pub fn with_deny(mut self, deny: Router) -> Self {
        self.deny = Some(deny);
        self
    }

    /// Mandatory.
    pub fn with_acl(mut self, acl: Arc<dyn Acl>) -> Self {
        self.acl = Some(acl);
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn AddrLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn build(self) -> Result<AllowlistHandler, AllowlistException> {
        let allow = self.allow
            .ok_or_else(|| AllowlistException::configuration("allow handler is required"))?;
        let acl = self.acl
            .ok_or_else(|| AllowlistException::configuration("ACL is required"))?;
        Ok(AllowlistHandler {
            allow,
            deny: self.deny,
            acl,
            lookup: self.lookup,
        })
    }
}

impl Default for AllowlistHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware flavour of [`AllowlistHandler`] for a single route, to be
/// layered with `from_fn_with_state(acl, check_allowlist)`. Non-allowlisted
/// callers always get a 401.
pub async fn check_allowlist(
    State(acl): State<Arc<dyn Acl>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = match ConnectInfoLookup::new().lookup(&request) {
        Ok(ip) => ip,
        Err(e) => {
            error!("failed to lookup request address: {}", e);
            return e.into_response();
        }
    };
    if acl.permitted_addr(ip) {
        next.run(request).await
    } else {
        warn!("{} is not allowlisted, rejecting {}", ip, request.uri());
        unauthorized()
    }
}
