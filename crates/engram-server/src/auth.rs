//! Role-based access control
//!
//! Every endpoint is gated on the `x-role` header. An omitted or
//! unrecognized role is anonymous, and no endpoint permits anonymous
//! callers. Each rejection leaves a structured log entry naming the role,
//! endpoint, and reason.

use axum::http::HeaderMap;
use tracing::warn;

use crate::error::ApiError;

pub const ROLE_HEADER: &str = "x-role";

/// Caller roles, least privileged first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Viewer,
    Editor,
}

impl Role {
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" => Some(Role::Viewer),
            "editor" => Some(Role::Editor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
        }
    }
}

/// Access level an endpoint demands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read endpoints: viewer and editor
    View,
    /// Write endpoints: editor only
    Edit,
}

/// Admit or reject the request; rejections are logged with
/// `role, endpoint, reason`
pub fn authorize(headers: &HeaderMap, endpoint: &'static str, access: Access) -> Result<Role, ApiError> {
    let raw = headers.get(ROLE_HEADER).and_then(|v| v.to_str().ok());

    let Some(raw) = raw else {
        warn!(role = "<absent>", endpoint, reason = "missing x-role header", "authorization rejected");
        return Err(ApiError::forbidden());
    };
    let Some(role) = Role::parse_name(raw) else {
        warn!(role = raw, endpoint, reason = "unrecognized role", "authorization rejected");
        return Err(ApiError::forbidden());
    };

    match (access, role) {
        (Access::View, _) | (Access::Edit, Role::Editor) => Ok(role),
        (Access::Edit, Role::Viewer) => {
            warn!(
                role = role.as_str(),
                endpoint,
                reason = "role lacks edit access",
                "authorization rejected"
            );
            Err(ApiError::forbidden())
        }
    }
}
