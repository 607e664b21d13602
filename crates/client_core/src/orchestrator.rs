//! Session state machine: guards, single in-flight warp submission, result/error
//! bookkeeping, and the effect request derived from the current transform set.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::Utc;
use serde::Serialize;
use shared::{
    domain::{Landmark, LandmarkMode, NamedTransform, RequestId, WarpResult},
    error::{ErrorKind, SessionError, ValidationError},
    protocol::{WarpRequest, DEFAULT_K, DEFAULT_R_EXPONENT},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    effects::EffectRequest,
    image_source::SourceImage,
    landmarks::LandmarkCoordinateController,
    transforms::TransformSetManager,
    warp_client::{WarpService, WarpServiceError},
};

pub const DEFAULT_MORPH_PERCENT: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPhase {
    Idle,
    Submitting,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a warp request is already in flight")]
    Busy,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] WarpServiceError),
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Busy => ErrorKind::Busy,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Service(err) => err.kind(),
        }
    }
}

/// Where rendered effects are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectTarget {
    pub cloud_name: String,
    pub public_id: String,
}

pub struct SessionState {
    pub transforms: TransformSetManager,
    pub landmarks: LandmarkCoordinateController,
    pub source_image: Option<SourceImage>,
    pub morph_percent: u8,
    pub last_error: Option<SessionError>,
    pub last_result: Option<WarpResult>,
    pub server_banner: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            transforms: TransformSetManager::new(),
            landmarks: LandmarkCoordinateController::new(),
            source_image: None,
            morph_percent: DEFAULT_MORPH_PERCENT,
            last_error: None,
            last_result: None,
            server_banner: None,
        }
    }
}

impl SessionState {
    fn build_warp_request(&self) -> Result<WarpRequest, ValidationError> {
        let image = self
            .source_image
            .as_ref()
            .ok_or(ValidationError::MissingImage)?;
        self.landmarks.validate_for_submission()?;
        let (source_landmarks, dest_landmarks) = self.landmarks.serialize();
        Ok(WarpRequest {
            image: image.to_data_url(),
            source_landmarks,
            dest_landmarks,
            percent: f64::from(self.morph_percent) / 100.0,
            r_exponent: DEFAULT_R_EXPONENT,
            k: DEFAULT_K,
        })
    }
}

/// Marks a warp as in flight; clears the mark on every exit path, including
/// when the `submit` future is dropped mid-request.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn begin(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: SubmitPhase,
    pub mode: LandmarkMode,
    pub image_loaded: bool,
    pub source_landmarks: Vec<[f64; 2]>,
    pub dest_landmarks: Vec<[f64; 2]>,
    pub morph_percent: u8,
    pub directives: Vec<NamedTransform>,
    pub last_error: Option<String>,
    pub last_result: Option<WarpResult>,
    pub server_banner: Option<String>,
}

pub struct RequestOrchestrator {
    service: Arc<dyn WarpService>,
    effect_target: EffectTarget,
    inner: Mutex<SessionState>,
    in_flight: AtomicBool,
}

impl RequestOrchestrator {
    pub fn new(service: Arc<dyn WarpService>, effect_target: EffectTarget) -> Arc<Self> {
        Arc::new(Self {
            service,
            effect_target,
            inner: Mutex::new(SessionState::default()),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn phase(&self) -> SubmitPhase {
        if self.in_flight.load(Ordering::Acquire) {
            SubmitPhase::Submitting
        } else {
            SubmitPhase::Idle
        }
    }

    fn ensure_idle(&self) -> Result<(), SubmitError> {
        match self.phase() {
            SubmitPhase::Idle => Ok(()),
            SubmitPhase::Submitting => Err(SubmitError::Busy),
        }
    }

    /// Startup probe. A failure sets a persistent banner but blocks nothing.
    pub async fn check_health(&self) -> Option<String> {
        let banner = match self.service.health().await {
            Ok(()) => None,
            Err(WarpServiceError::Unreachable { .. }) => Some(format!(
                "Cannot connect to WarpTPS server. Please start the server at {}",
                self.service.endpoint()
            )),
            Err(_) => Some("WarpTPS server is not available. Please start the server.".to_string()),
        };
        if let Some(banner) = &banner {
            warn!(endpoint = self.service.endpoint(), "health: {banner}");
        } else {
            info!(endpoint = self.service.endpoint(), "health: warp server reachable");
        }
        self.inner.lock().await.server_banner = banner.clone();
        banner
    }

    pub async fn load_image(&self, image: SourceImage) -> Result<(), SubmitError> {
        let mut guard = self.inner.lock().await;
        self.ensure_idle()?;
        info!(
            width = image.dimensions.width,
            height = image.dimensions.height,
            mime = %image.mime_type,
            "warp: source image loaded"
        );
        guard.landmarks.load_image(image.dimensions);
        guard.source_image = Some(image);
        guard.last_result = None;
        guard.last_error = None;
        Ok(())
    }

    pub async fn toggle_mode(&self) -> Result<LandmarkMode, SubmitError> {
        let mut guard = self.inner.lock().await;
        self.ensure_idle()?;
        Ok(guard.landmarks.toggle_mode())
    }

    pub async fn record_click(
        &self,
        display_x: f64,
        display_y: f64,
        displayed_width: f64,
        displayed_height: f64,
    ) -> Result<Option<Landmark>, SubmitError> {
        let mut guard = self.inner.lock().await;
        self.ensure_idle()?;
        Ok(guard
            .landmarks
            .record_click(display_x, display_y, displayed_width, displayed_height))
    }

    pub async fn undo_last(&self) -> Result<Option<Landmark>, SubmitError> {
        let mut guard = self.inner.lock().await;
        self.ensure_idle()?;
        Ok(guard.landmarks.undo_last())
    }

    /// Drops both landmark lists and the previous warp result.
    pub async fn clear_landmarks(&self) -> Result<(), SubmitError> {
        let mut guard = self.inner.lock().await;
        self.ensure_idle()?;
        guard.landmarks.clear();
        guard.last_result = None;
        Ok(())
    }

    pub async fn set_morph_percent(&self, percent: u8) -> Result<u8, SubmitError> {
        let mut guard = self.inner.lock().await;
        self.ensure_idle()?;
        guard.morph_percent = percent.min(100);
        Ok(guard.morph_percent)
    }

    /// The effect tab is independent of warp submission and is never blocked.
    pub async fn edit_transforms<R>(&self, edit: impl FnOnce(&mut TransformSetManager) -> R) -> R {
        let mut guard = self.inner.lock().await;
        edit(&mut guard.transforms)
    }

    /// Re-derived from the full transform set on every call.
    pub async fn effect_request(&self) -> EffectRequest {
        let guard = self.inner.lock().await;
        EffectRequest::new(
            self.effect_target.cloud_name.clone(),
            self.effect_target.public_id.clone(),
            guard.transforms.serialize(),
        )
    }

    pub async fn submit(&self) -> Result<WarpResult, SubmitError> {
        let request_id = RequestId::new();
        let (request, in_flight) = {
            let mut guard = self.inner.lock().await;
            if self.ensure_idle().is_err() {
                warn!(%request_id, "warp: submit rejected, request already in flight");
                return Err(SubmitError::Busy);
            }
            let request = match guard.build_warp_request() {
                Ok(request) => request,
                Err(err) => {
                    warn!(%request_id, "warp: submit guard failed: {err}");
                    guard.last_error = Some(err.clone().into());
                    return Err(err.into());
                }
            };
            if let Some(banner) = &guard.server_banner {
                warn!(%request_id, "warp: submitting despite health banner: {banner}");
            }
            guard.last_error = None;
            (request, InFlight::begin(&self.in_flight))
        };

        info!(
            %request_id,
            landmarks = request.source_landmarks.len(),
            percent = request.percent,
            "warp: submitting"
        );
        let outcome = self.service.warp(&request).await;

        let mut guard = self.inner.lock().await;
        drop(in_flight);
        match outcome {
            Ok(response) => {
                let result = WarpResult {
                    request_id,
                    image: response.image,
                    received_at: Utc::now(),
                };
                info!(%request_id, "warp: result received");
                guard.last_result = Some(result.clone());
                guard.last_error = None;
                Ok(result)
            }
            Err(err) => {
                error!(%request_id, kind = ?err.kind(), "warp: request failed: {err}");
                guard.last_error = Some(SessionError::new(
                    err.kind(),
                    format!("Error warping image: {err}"),
                ));
                Err(err.into())
            }
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.lock().await;
        let (source_landmarks, dest_landmarks) = guard.landmarks.serialize();
        SessionSnapshot {
            phase: self.phase(),
            mode: guard.landmarks.mode(),
            image_loaded: guard.source_image.is_some(),
            source_landmarks,
            dest_landmarks,
            morph_percent: guard.morph_percent,
            directives: guard.transforms.serialize(),
            last_error: guard.last_error.as_ref().map(|e| e.message.clone()),
            last_result: guard.last_result.clone(),
            server_banner: guard.server_banner.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
