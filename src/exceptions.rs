use std::error::Error;
use std::fmt::{Display, Formatter};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// What went wrong, so callers can tell a bad dump file from a
/// misconfigured handler without matching on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlexKind {
    /// Compact form not delimited by double quotes
    InvalidFormat,
    /// A token in a serialized list failed to parse
    InvalidAddress,
    /// A gating handler was built without a mandatory part
    Configuration,
    /// No remote address could be obtained for a request or connection
    Extraction,
}

#[derive(Debug, Clone)]
pub struct AllowlistException {
    reason: String,
    kind: AlexKind,
}

impl AllowlistException {
    pub fn new(reason: String, kind: AlexKind) -> Self {
        Self { reason, kind }
    }

    pub fn invalid_format() -> Self {
        Self::new("invalid allowlist".to_string(), AlexKind::InvalidFormat)
    }

    pub fn invalid_address(addr: &str) -> Self {
        Self::new(format!("invalid address {}", addr), AlexKind::InvalidAddress)
    }

    pub fn configuration(reason: &str) -> Self {
        Self::new(reason.to_string(), AlexKind::Configuration)
    }

    pub fn extraction(reason: String) -> Self {
        Self::new(reason, AlexKind::Extraction)
    }

    pub fn kind(&self) -> AlexKind {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AlexKind::InvalidFormat | AlexKind::InvalidAddress => StatusCode::BAD_REQUEST,
            AlexKind::Configuration | AlexKind::Extraction => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for AllowlistException {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "allowlist: {}", self.reason)
    }
}

impl Error for AllowlistException {}

impl IntoResponse for AllowlistException {
    // Never echo the reason back to the client, it may carry addresses.
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, status.canonical_reason().unwrap_or_default()).into_response()
    }
}
