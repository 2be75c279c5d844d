use router_api::AddressFamily;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Kind of remote resource an error or compensation refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Router,
    Port,
    Instance,
    Interface,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Router => "router",
            ResourceKind::Port => "port",
            ResourceKind::Instance => "instance",
            ResourceKind::Interface => "interface",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing configuration: {0} not set")]
    ConfigurationMissing(String),

    #[error("No usable {family} internal address found for node {node}")]
    AddressNotFound { node: String, family: AddressFamily },

    #[error("{kind} not found: {id}")]
    ResourceNotFound { kind: ResourceKind, id: String },

    #[error("Multiple {kind}s match {id}")]
    AmbiguousResource { kind: ResourceKind, id: String },

    #[error("Invalid destination CIDR {cidr}: {reason}")]
    InvalidCidr { cidr: String, reason: String },

    #[error("Request for {kind} {id} failed: {reason}")]
    RemoteRequestFailed {
        kind: ResourceKind,
        id: String,
        reason: String,
    },

    #[error("Update of {kind} {id} failed: {reason}")]
    RemoteWriteFailed {
        kind: ResourceKind,
        id: String,
        reason: String,
    },
}

impl CoreError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        CoreError::ResourceNotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn request_failed(kind: ResourceKind, id: impl Into<String>, reason: impl fmt::Display) -> Self {
        CoreError::RemoteRequestFailed {
            kind,
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write_failed(kind: ResourceKind, id: impl Into<String>, reason: impl fmt::Display) -> Self {
        CoreError::RemoteWriteFailed {
            kind,
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Identifier of the resource the error refers to, if any
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            CoreError::ConfigurationMissing(key) => Some(key),
            CoreError::AddressNotFound { node, .. } => Some(node),
            CoreError::ResourceNotFound { id, .. }
            | CoreError::AmbiguousResource { id, .. }
            | CoreError::RemoteRequestFailed { id, .. }
            | CoreError::RemoteWriteFailed { id, .. } => Some(id),
            CoreError::InvalidCidr { cidr, .. } => Some(cidr),
        }
    }
}
