#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the Fleetline backend API.
//!
//! These types are the wire contract between the client library, the CLI,
//! and the backend. Field names follow the backend's `camelCase` JSON
//! casing, so the serde rename rules here are the single source of truth
//! for the encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error body surfaced by the backend on non-success responses.
///
/// The backend is not consistent about which key carries the description,
/// so both are captured and callers pick whichever is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Human-readable failure description.
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Alternate key some endpoints use for the description.
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Best-effort description, preferring `message` over `error`.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.message.as_deref().or_else(|| self.error.as_deref())
    }
}

/// Request body for `POST /api/jwt-auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    /// Display name for the new account.
    pub username: String,
    /// Sign-in address for the new account.
    pub email: String,
    /// Plaintext password; the backend hashes it.
    pub password: String,
}

/// Request body for `POST /api/jwt-auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    /// Sign-in address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Response body carrying a session token, returned by the register, login,
/// and refresh endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// Opaque bearer credential for subsequent requests.
    pub token: String,
}

/// Profile of a signed-in user, returned by `GET /api/jwt-auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable account identifier.
    pub user_guid: Uuid,
    /// Display name.
    pub username: String,
    /// Sign-in address.
    pub email: String,
}

/// Inventory entry returned by the device endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Stable device identifier.
    pub device_guid: Uuid,
    /// Human-readable device name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Last heartbeat observed by the backend, when one has been seen.
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Liveness verdict from the backend's last probe.
    pub is_alive: Option<bool>,
    #[serde(default)]
    /// Invocable methods the device exposes.
    pub methods: Vec<Method>,
}

/// Invocable method exposed by a device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    /// Method name as exposed by the device firmware.
    pub method_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional operator-facing description.
    pub description: Option<String>,
    #[serde(default)]
    /// Parameters the method accepts.
    pub parameters: Vec<Parameter>,
}

/// Parameter accepted by a device [`Method`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Parameter name as exposed by the device firmware.
    pub parameter_name: String,
    /// Operator-facing description.
    pub description: String,
    /// Backend type discriminant for the value encoding.
    pub parameter_type: i32,
    /// Current or default value, stringly encoded on the wire.
    pub value: String,
}

/// Request body for device create and update calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevicePayload {
    /// Human-readable device name.
    pub name: String,
    #[serde(default)]
    /// Invocable methods the device exposes.
    pub methods: Vec<Method>,
}
