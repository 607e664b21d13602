//! HTTP client for the remote TPS warp service.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    error::ErrorKind,
    protocol::{
        ErrorDetail, HealthResponse, ServerInfo, TransformPointsRequest, TransformPointsResponse,
        WarpRequest, WarpResponse,
    },
};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const FALLBACK_WARP_DETAIL: &str = "Failed to warp image";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarpServiceError {
    #[error("cannot reach warp server at {url}: {message}")]
    Unreachable { url: String, message: String },
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    #[error("unexpected response from warp server: {0}")]
    InvalidResponse(String),
}

impl WarpServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable { .. } => ErrorKind::ServerUnavailable,
            Self::Rejected { .. } | Self::InvalidResponse(_) => ErrorKind::RemoteRejected,
        }
    }
}

#[async_trait]
pub trait WarpService: Send + Sync {
    /// Base URL shown to the user in connectivity messages.
    fn endpoint(&self) -> &str;
    async fn health(&self) -> Result<(), WarpServiceError>;
    async fn warp(&self, request: &WarpRequest) -> Result<WarpResponse, WarpServiceError>;
}

pub struct HttpWarpClient {
    http: Client,
    base_url: String,
}

impl HttpWarpClient {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            http: Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn unreachable(&self, err: reqwest::Error) -> WarpServiceError {
        WarpServiceError::Unreachable {
            url: self.base_url.clone(),
            message: err.to_string(),
        }
    }

    pub async fn server_info(&self) -> Result<ServerInfo, WarpServiceError> {
        let res = self
            .http
            .get(self.url(""))
            .send()
            .await
            .map_err(|err| self.unreachable(err))?;
        decode(res).await
    }

    /// Maps arbitrary points through the TPS defined by the landmark pairs.
    pub async fn transform_points(
        &self,
        request: &TransformPointsRequest,
    ) -> Result<Vec<[f64; 2]>, WarpServiceError> {
        let res = self
            .http
            .post(self.url("transform/points"))
            .json(request)
            .send()
            .await
            .map_err(|err| self.unreachable(err))?;
        let body: TransformPointsResponse = decode(res).await?;
        Ok(body.transformed_points)
    }
}

#[async_trait]
impl WarpService for HttpWarpClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn health(&self) -> Result<(), WarpServiceError> {
        let res = self
            .http
            .get(self.url("health"))
            .send()
            .await
            .map_err(|err| self.unreachable(err))?;
        let status = res.status();
        debug!(status = status.as_u16(), "warp server health response");
        if status.is_success() {
            if let Ok(body) = res.json::<HealthResponse>().await {
                debug!(
                    status = %body.status,
                    warptps_available = body.warptps_available,
                    "warp server health body"
                );
            }
            Ok(())
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(WarpServiceError::Rejected {
                status: status.as_u16(),
                detail: extract_detail(&body),
            })
        }
    }

    async fn warp(&self, request: &WarpRequest) -> Result<WarpResponse, WarpServiceError> {
        let res = self
            .http
            .post(self.url("warp/base64"))
            .json(request)
            .send()
            .await
            .map_err(|err| self.unreachable(err))?;
        decode(res).await
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, WarpServiceError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(WarpServiceError::Rejected {
            status: status.as_u16(),
            detail: extract_detail(&body),
        });
    }
    res.json::<T>()
        .await
        .map_err(|err| WarpServiceError::InvalidResponse(err.to_string()))
}

/// `detail` from an error body; non-string details are rendered as JSON.
fn extract_detail(body: &str) -> String {
    if let Ok(ErrorDetail { detail }) = serde_json::from_str::<ErrorDetail>(body) {
        if !detail.is_empty() {
            return detail;
        }
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) if !detail.is_empty() => detail.clone(),
            Some(serde_json::Value::String(_)) | Some(serde_json::Value::Null) | None => {
                FALLBACK_WARP_DETAIL.to_string()
            }
            Some(other) => other.to_string(),
        },
        _ => FALLBACK_WARP_DETAIL.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/warp_client_tests.rs"]
mod tests;
