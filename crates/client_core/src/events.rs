//! User interaction events and their dispatch onto a [`RequestOrchestrator`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::domain::{ControlFamily, TransformValue};
use tracing::debug;

use crate::{image_source::SourceImage, orchestrator::RequestOrchestrator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    LoadImage {
        path: PathBuf,
    },
    ToggleMode,
    Click {
        x: f64,
        y: f64,
        displayed_width: f64,
        displayed_height: f64,
    },
    Undo,
    ClearLandmarks,
    SetMorphPercent {
        percent: u8,
    },
    Submit,
    Upsert {
        key: String,
        value: TransformValue,
    },
    Slider {
        key: String,
        value: i32,
    },
    Preset {
        name: String,
    },
    ResetKeys {
        keys: Vec<String>,
    },
    ResetFamily {
        family: ControlFamily,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadImage { .. } => "load_image",
            Self::ToggleMode => "toggle_mode",
            Self::Click { .. } => "click",
            Self::Undo => "undo",
            Self::ClearLandmarks => "clear_landmarks",
            Self::SetMorphPercent { .. } => "set_morph_percent",
            Self::Submit => "submit",
            Self::Upsert { .. } => "upsert",
            Self::Slider { .. } => "slider",
            Self::Preset { .. } => "preset",
            Self::ResetKeys { .. } => "reset_keys",
            Self::ResetFamily { .. } => "reset_family",
        }
    }
}

pub fn parse_script(raw: &str) -> Result<Vec<SessionEvent>> {
    serde_json::from_str(raw).context("session script must be a JSON array of events")
}

/// Applies one event. Relative image paths resolve against `base_dir`.
/// Submission failures are recorded in the session and are not returned as errors.
pub async fn dispatch_event(
    orchestrator: &RequestOrchestrator,
    event: SessionEvent,
    base_dir: &Path,
) -> Result<()> {
    let name = event.name();
    debug!(event = name, "dispatching session event");
    match event {
        SessionEvent::LoadImage { path } => {
            let path = base_dir.join(path);
            let image = SourceImage::from_path(&path)?;
            orchestrator.load_image(image).await?;
        }
        SessionEvent::ToggleMode => {
            orchestrator.toggle_mode().await?;
        }
        SessionEvent::Click {
            x,
            y,
            displayed_width,
            displayed_height,
        } => {
            orchestrator
                .record_click(x, y, displayed_width, displayed_height)
                .await?;
        }
        SessionEvent::Undo => {
            orchestrator.undo_last().await?;
        }
        SessionEvent::ClearLandmarks => orchestrator.clear_landmarks().await?,
        SessionEvent::SetMorphPercent { percent } => {
            orchestrator.set_morph_percent(percent).await?;
        }
        SessionEvent::Submit => {
            let _ = orchestrator.submit().await;
        }
        SessionEvent::Upsert { key, value } => {
            orchestrator.edit_transforms(|t| t.upsert(key, value)).await;
        }
        SessionEvent::Slider { key, value } => {
            orchestrator
                .edit_transforms(|t| t.set_slider(&key, value))
                .await?;
        }
        SessionEvent::Preset { name } => {
            orchestrator
                .edit_transforms(|t| t.apply_preset(&name))
                .await?;
        }
        SessionEvent::ResetKeys { keys } => {
            orchestrator.edit_transforms(|t| t.reset_keys(keys)).await;
        }
        SessionEvent::ResetFamily { family } => {
            orchestrator.edit_transforms(|t| t.reset_family(family)).await;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/events_tests.rs"]
mod tests;
