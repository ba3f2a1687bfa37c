//! IP allowlisting for axum services.
//!
//! Two kinds of access control lists are provided, both behind the
//! [`Acl`] trait so call sites never care which one (or a stub) they hold:
//!
//! * [`BasicHostAcl`] permits individual addresses,
//! * [`BasicNetAcl`] permits whole networks.
//!
//! [`AllowlistHandler`] and [`check_allowlist`] put an ACL in front of
//! an axum router.
//!
//! ```ignore
//! let acl = Arc::new(BasicHostAcl::new());
//! acl.add(&[127, 0, 0, 1]);
//!
//! let files = AllowlistHandlerBuilder::new()
//!     .with_allow(Router::new().fallback_service(ServeDir::new("files")))
//!     .with_acl(acl.clone())
//!     .build()?;
//!
//! let app = Router::new()
//!     .nest_service("/files", files)
//!     .into_make_service_with_connect_info::<SocketAddr>();
//! ```

pub mod acl;
pub mod admin;
mod codec;
pub mod exceptions;
pub mod handler;
pub mod host_acl;
pub mod ip_validator;
pub mod lookup;
pub mod net_acl;
pub mod stub;

pub use acl::{Acl, HostAcl, NetAcl};
pub use exceptions::{AlexKind, AllowlistException};
pub use handler::{check_allowlist, AllowlistHandler, AllowlistHandlerBuilder};
pub use host_acl::BasicHostAcl;
pub use net_acl::BasicNetAcl;
pub use stub::{HostStub, NetStub, WarningSink};
