use super::*;
use std::sync::Arc;

use async_trait::async_trait;
use shared::protocol::{WarpRequest, WarpResponse};

use crate::{
    orchestrator::EffectTarget,
    warp_client::{WarpService, WarpServiceError},
};

struct EchoWarpService;

#[async_trait]
impl WarpService for EchoWarpService {
    fn endpoint(&self) -> &str {
        "http://warp.test"
    }

    async fn health(&self) -> Result<(), WarpServiceError> {
        Ok(())
    }

    async fn warp(&self, request: &WarpRequest) -> Result<WarpResponse, WarpServiceError> {
        Ok(WarpResponse {
            success: Some(true),
            image: format!("data:,{}", request.source_landmarks.len()),
        })
    }
}

fn orchestrator() -> Arc<RequestOrchestrator> {
    RequestOrchestrator::new(
        Arc::new(EchoWarpService),
        EffectTarget {
            cloud_name: "demo".to_string(),
            public_id: "sample".to_string(),
        },
    )
}

#[test]
fn parses_tagged_script() {
    let events = parse_script(
        r#"[
            {"type": "load_image", "path": "face.png"},
            {"type": "click", "x": 1.5, "y": 2, "displayed_width": 100, "displayed_height": 80},
            {"type": "toggle_mode"},
            {"type": "upsert", "key": "vignette", "value": "30"},
            {"type": "slider", "key": "red", "value": -40},
            {"type": "reset_family", "family": "rgb"},
            {"type": "submit"}
        ]"#,
    )
    .expect("parse");

    assert_eq!(events.len(), 7);
    assert_eq!(
        events[0],
        SessionEvent::LoadImage {
            path: PathBuf::from("face.png")
        }
    );
    assert_eq!(
        events[3],
        SessionEvent::Upsert {
            key: "vignette".to_string(),
            value: TransformValue::Text("30".to_string()),
        }
    );
    assert_eq!(
        events[5],
        SessionEvent::ResetFamily {
            family: ControlFamily::Rgb
        }
    );
    assert_eq!(events[6].name(), "submit");
}

#[test]
fn rejects_non_array_script() {
    assert!(parse_script(r#"{"type": "submit"}"#).is_err());
}

#[tokio::test]
async fn transform_events_update_effect_request() {
    let orchestrator = orchestrator();
    let base = Path::new(".");
    for event in [
        SessionEvent::Preset {
            name: "all_green".to_string(),
        },
        SessionEvent::Upsert {
            key: "vibrance".to_string(),
            value: TransformValue::Text("70".to_string()),
        },
        SessionEvent::ResetKeys {
            keys: vec!["red".to_string(), "blue".to_string()],
        },
    ] {
        dispatch_event(&orchestrator, event, base).await.expect("dispatch");
    }

    let request = orchestrator.effect_request().await;
    assert_eq!(request.effect_strings(), vec!["green:100", "vibrance:70"]);

    let err = dispatch_event(
        &orchestrator,
        SessionEvent::Preset {
            name: "nope".to_string(),
        },
        base,
    )
    .await
    .expect_err("unknown preset");
    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn submit_event_records_guard_failure_without_erroring() {
    let orchestrator = orchestrator();
    dispatch_event(&orchestrator, SessionEvent::Submit, Path::new("."))
        .await
        .expect("submit is recovered");
    assert_eq!(
        orchestrator.snapshot().await.last_error.as_deref(),
        Some("Please upload an image first")
    );
}

#[tokio::test]
async fn clicks_before_image_load_are_ignored() {
    let orchestrator = orchestrator();
    dispatch_event(
        &orchestrator,
        SessionEvent::Click {
            x: 1.0,
            y: 1.0,
            displayed_width: 10.0,
            displayed_height: 10.0,
        },
        Path::new("."),
    )
    .await
    .expect("click");
    assert!(orchestrator.snapshot().await.source_landmarks.is_empty());
}

#[tokio::test]
async fn missing_image_file_is_reported() {
    let orchestrator = orchestrator();
    let err = dispatch_event(
        &orchestrator,
        SessionEvent::LoadImage {
            path: PathBuf::from("definitely-missing.png"),
        },
        Path::new("/nonexistent-dir"),
    )
    .await
    .expect_err("missing file");
    assert!(err.to_string().contains("definitely-missing.png"));
}
