//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Per-call window override. Both fields replace the server defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRequest {
    pub window_ms: u64,
    pub max_limit: u32,
}

/// Result of a hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitResponse {
    pub bucket: String,
    pub key: String,
    pub remaining: u32,
    pub admitted: bool,
}
