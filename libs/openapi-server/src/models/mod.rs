//! Control API models

use serde::{Deserialize, Serialize};

/// Outcome tag carried by every control response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiStatus {
    #[serde(rename = "STATUS_SUCCESS")]
    Success,
    #[serde(rename = "STATUS_FAIL")]
    Fail,
    #[serde(rename = "STATUS_ERROR")]
    Error,
}

/// Response envelope returned by the deployment endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiReturn {
    pub status: ApiStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StatusPayload>,
}

impl ApiReturn {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Success,
            message: message.into(),
            data: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Fail,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Error,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a status payload
    pub fn with_data(mut self, data: StatusPayload) -> Self {
        self.data = Some(data);
        self
    }
}

/// Structured part of a status response.
///
/// Both fields are absent when no deployment is tracked; `exit_value` is only
/// present once the deployment has halted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_value: Option<i32>,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}
