//! Client-side state for the effects and warp workflows: the ordered transform
//! set, landmark capture in pixel space, and the request orchestrator driving
//! the remote warp service.

pub mod effects;
pub mod events;
pub mod image_source;
pub mod landmarks;
pub mod orchestrator;
pub mod transforms;
pub mod warp_client;

pub use effects::{fetch_rendered, EffectRequest};
pub use events::{dispatch_event, parse_script, SessionEvent};
pub use image_source::{decode_data_url, DecodedDataUrl, SourceImage, SourceImageError};
pub use landmarks::{DisplayScale, LandmarkCoordinateController, OverlayMarker, MIN_LANDMARKS};
pub use orchestrator::{
    EffectTarget, RequestOrchestrator, SessionSnapshot, SubmitError, SubmitPhase,
};
pub use transforms::{TransformError, TransformSetManager};
pub use warp_client::{HttpWarpClient, WarpService, WarpServiceError, DEFAULT_API_URL};
