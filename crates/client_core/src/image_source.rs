//! Source bitmaps: intrinsic dimensions and data-URL transport encoding.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageReader;
use shared::domain::ImageDimensions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceImageError {
    #[error("failed to read image file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unrecognized image format")]
    UnknownFormat,
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("malformed data URL: {0}")]
    InvalidDataUrl(&'static str),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Clone)]
pub struct SourceImage {
    pub dimensions: ImageDimensions,
    pub mime_type: String,
    bytes: Vec<u8>,
}

impl SourceImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SourceImageError> {
        let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|_| SourceImageError::UnknownFormat)?;
        let format = reader.format().ok_or(SourceImageError::UnknownFormat)?;
        let (width, height) = reader.into_dimensions()?;
        Ok(Self {
            dimensions: ImageDimensions::new(width, height),
            mime_type: format.to_mime_type().to_string(),
            bytes,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, SourceImageError> {
        let bytes = std::fs::read(path).map_err(|source| SourceImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDataUrl {
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DecodedDataUrl {
    /// Preferred file extension for the payload, if its mime type is known.
    pub fn extension(&self) -> Option<&'static str> {
        let mime = self.mime_type.as_deref()?;
        mime_guess::get_mime_extensions_str(mime)?.first().copied()
    }
}

/// Accepts either a full `data:<mime>;base64,<payload>` URL or a bare base64 payload.
pub fn decode_data_url(value: &str) -> Result<DecodedDataUrl, SourceImageError> {
    let value = value.trim();
    let (mime_type, payload) = match value.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or(SourceImageError::InvalidDataUrl("missing ',' separator"))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or(SourceImageError::InvalidDataUrl("payload is not base64"))?;
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            (mime, payload)
        }
        None => (None, value),
    };

    Ok(DecodedDataUrl {
        mime_type,
        bytes: STANDARD.decode(payload)?,
    })
}

#[cfg(test)]
#[path = "tests/image_source_tests.rs"]
mod tests;
