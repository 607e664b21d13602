//! Landmark correspondence lists and the display <-> pixel coordinate mapping.
//!
//! Landmarks are always stored in intrinsic pixel space of the loaded image.
//! Pointer input arrives in display space (the image as currently drawn, which
//! may be scaled); [`DisplayScale`] converts between the two without rounding.

use shared::{
    domain::{ImageDimensions, Landmark, LandmarkMode},
    error::ValidationError,
};
use tracing::debug;

pub const MIN_LANDMARKS: usize = 3;

/// Ratio between intrinsic and displayed image size on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl DisplayScale {
    /// Returns `None` when either size is zero or not finite.
    pub fn new(
        intrinsic: ImageDimensions,
        displayed_width: f64,
        displayed_height: f64,
    ) -> Option<Self> {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if intrinsic.width == 0
            || intrinsic.height == 0
            || !usable(displayed_width)
            || !usable(displayed_height)
        {
            return None;
        }
        Some(Self {
            scale_x: f64::from(intrinsic.width) / displayed_width,
            scale_y: f64::from(intrinsic.height) / displayed_height,
        })
    }

    pub fn forward_map(&self, display_x: f64, display_y: f64) -> Landmark {
        Landmark::new(display_x * self.scale_x, display_y * self.scale_y)
    }

    pub fn inverse_map(&self, landmark: Landmark) -> (f64, f64) {
        (landmark.x / self.scale_x, landmark.y / self.scale_y)
    }
}

/// Display-space position of one landmark, labelled from 1 within its list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayMarker {
    pub mode: LandmarkMode,
    pub label: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LandmarkCoordinateController {
    image: Option<ImageDimensions>,
    mode: LandmarkMode,
    source: Vec<Landmark>,
    dest: Vec<Landmark>,
}

impl LandmarkCoordinateController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_image(&mut self, dimensions: ImageDimensions) {
        self.image = Some(dimensions);
        self.source.clear();
        self.dest.clear();
    }

    pub fn image(&self) -> Option<ImageDimensions> {
        self.image
    }

    pub fn mode(&self) -> LandmarkMode {
        self.mode
    }

    pub fn toggle_mode(&mut self) -> LandmarkMode {
        self.mode = self.mode.toggled();
        self.mode
    }

    /// Records a pointer click given in display space, clamped to the image
    /// bounds. Ignored when no image is loaded or the click or displayed size is
    /// not usable.
    pub fn record_click(
        &mut self,
        display_x: f64,
        display_y: f64,
        displayed_width: f64,
        displayed_height: f64,
    ) -> Option<Landmark> {
        let image = self.image?;
        let scale = DisplayScale::new(image, displayed_width, displayed_height)?;
        if !display_x.is_finite() || !display_y.is_finite() {
            debug!(display_x, display_y, "non-finite click ignored");
            return None;
        }
        let landmark = clamp_to_image(scale.forward_map(display_x, display_y), image);
        self.active_list_mut().push(landmark);
        Some(landmark)
    }

    pub fn undo_last(&mut self) -> Option<Landmark> {
        self.active_list_mut().pop()
    }

    pub fn clear(&mut self) {
        self.source.clear();
        self.dest.clear();
    }

    pub fn source_landmarks(&self) -> &[Landmark] {
        &self.source
    }

    pub fn dest_landmarks(&self) -> &[Landmark] {
        &self.dest
    }

    pub fn validate_for_submission(&self) -> Result<(), ValidationError> {
        let (source_count, dest_count) = (self.source.len(), self.dest.len());
        if source_count < MIN_LANDMARKS || dest_count < MIN_LANDMARKS {
            return Err(ValidationError::TooFewLandmarks {
                source_count,
                dest_count,
            });
        }
        if source_count != dest_count {
            return Err(ValidationError::LengthMismatch {
                source_count,
                dest_count,
            });
        }
        Ok(())
    }

    /// Pixel-space pairs in recorded order; index i of each list is one correspondence.
    pub fn serialize(&self) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
        (
            self.source.iter().map(|l| l.to_pair()).collect(),
            self.dest.iter().map(|l| l.to_pair()).collect(),
        )
    }

    pub fn overlay_markers(
        &self,
        displayed_width: f64,
        displayed_height: f64,
    ) -> Vec<OverlayMarker> {
        let Some(scale) = self
            .image
            .and_then(|image| DisplayScale::new(image, displayed_width, displayed_height))
        else {
            return Vec::new();
        };

        let markers = |mode: LandmarkMode, list: &[Landmark]| {
            list.iter()
                .enumerate()
                .map(|(index, landmark)| {
                    let (x, y) = scale.inverse_map(*landmark);
                    OverlayMarker {
                        mode,
                        label: index + 1,
                        x,
                        y,
                    }
                })
                .collect::<Vec<_>>()
        };

        let mut all = markers(LandmarkMode::Source, &self.source);
        all.extend(markers(LandmarkMode::Dest, &self.dest));
        all
    }

    fn active_list_mut(&mut self) -> &mut Vec<Landmark> {
        match self.mode {
            LandmarkMode::Source => &mut self.source,
            LandmarkMode::Dest => &mut self.dest,
        }
    }
}

/// Edge clicks can map a hair past the image under float scaling.
fn clamp_to_image(landmark: Landmark, image: ImageDimensions) -> Landmark {
    Landmark::new(
        landmark.x.clamp(0.0, f64::from(image.width)),
        landmark.y.clamp(0.0, f64::from(image.height)),
    )
}

#[cfg(test)]
#[path = "tests/landmarks_tests.rs"]
mod tests;
