use serde::{Deserialize, Serialize};

pub const DEFAULT_R_EXPONENT: f64 = 2.0;
pub const DEFAULT_K: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarpRequest {
    /// Source bitmap as a data URL.
    pub image: String,
    pub source_landmarks: Vec<[f64; 2]>,
    pub dest_landmarks: Vec<[f64; 2]>,
    pub percent: f64,
    pub r_exponent: f64,
    pub k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarpResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub image: String,
}

/// Error body returned by the warp service on non-success statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub warptps_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warptps_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformPointsRequest {
    pub points: Vec<[f64; 2]>,
    pub source_landmarks: Vec<[f64; 2]>,
    pub dest_landmarks: Vec<[f64; 2]>,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformPointsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub transformed_points: Vec<[f64; 2]>,
}
