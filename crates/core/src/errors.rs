use std::fmt;

use thiserror::Error;

use crate::domain::order::OrderRecord;

/// Failure of the client-credentials exchange with the order backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("token exchange request failed: {0}")]
    Transport(String),
    #[error("token endpoint returned status {0}")]
    Status(u16),
    #[error("token response could not be decoded: {0}")]
    Decode(String),
    #[error("token endpoint returned an empty access token")]
    EmptyToken,
    #[error("token exchange recently failed; next attempt allowed in {retry_in_secs}s")]
    CoolingDown { retry_in_secs: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamService {
    OrderBackend,
    Completion,
}

impl UpstreamService {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderBackend => "order_backend",
            Self::Completion => "completion",
        }
    }
}

impl fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    Transport(String),
    Timeout,
    Status(u16),
    Decode(String),
}

/// A reachable external service failed to produce a usable answer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{service} {kind}")]
pub struct UpstreamError {
    pub service: UpstreamService,
    pub kind: UpstreamErrorKind,
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "request failed: {message}"),
            Self::Timeout => f.write_str("request timed out"),
            Self::Status(status) => write!(f, "returned status {status}"),
            Self::Decode(message) => write!(f, "response could not be decoded: {message}"),
        }
    }
}

impl UpstreamError {
    pub fn new(service: UpstreamService, kind: UpstreamErrorKind) -> Self {
        Self { service, kind }
    }

    pub fn transport(service: UpstreamService, message: impl Into<String>) -> Self {
        Self::new(service, UpstreamErrorKind::Transport(message.into()))
    }

    pub fn timeout(service: UpstreamService) -> Self {
        Self::new(service, UpstreamErrorKind::Timeout)
    }

    pub fn status(service: UpstreamService, status: u16) -> Self {
        Self::new(service, UpstreamErrorKind::Status(status))
    }

    pub fn decode(service: UpstreamService, message: impl Into<String>) -> Self {
        Self::new(service, UpstreamErrorKind::Decode(message.into()))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, UpstreamErrorKind::Timeout)
    }
}

/// Successful answer from the order backend. Absence of a match is not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum OrderLookup {
    Found(OrderRecord),
    NotFound,
}

impl OrderLookup {
    pub fn into_record(self) -> Option<OrderRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound => None,
        }
    }
}
