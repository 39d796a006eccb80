//! Fallback artifact resolver
//!
//! When every configured provider fails, the orchestrator returns a
//! fixed placeholder image instead of an error. The placeholder is
//! rendered and validated once at construction time; a corrupt
//! placeholder must fail startup, not poison every degraded request.

use crate::protocol::{ImageArtifact, MediaType};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use thiserror::Error;

/// Portrait canvas matching the generated outfit images
pub const FALLBACK_WIDTH: u32 = 512;
pub const FALLBACK_HEIGHT: u32 = 768;

const BACKGROUND: Rgb<u8> = Rgb([0xd9, 0xd9, 0xd9]);
const FRAME: Rgb<u8> = Rgb([0x9e, 0x9e, 0x9e]);
const FRAME_WIDTH: u32 = 8;

/// Errors preparing the fallback artifact
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("failed to encode placeholder image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("placeholder image failed validation: {0}")]
    Invalid(String),
}

/// The validated placeholder returned for exhausted requests
#[derive(Debug, Clone)]
pub struct FallbackArtifact {
    artifact: ImageArtifact,
}

impl FallbackArtifact {
    /// Render, encode, and validate the placeholder
    ///
    /// Called once at orchestrator construction; the resulting bytes
    /// are reused for every degraded request.
    pub fn prepare() -> Result<Self, FallbackError> {
        let bytes = render_placeholder()?;
        validate(&bytes)?;

        Ok(Self {
            artifact: ImageArtifact::new(bytes, MediaType::Png),
        })
    }

    /// The placeholder artifact
    pub fn artifact(&self) -> &ImageArtifact {
        &self.artifact
    }
}

/// Render the fixed placeholder: a neutral card with a darker frame
fn render_placeholder() -> Result<Vec<u8>, image::ImageError> {
    let image = RgbImage::from_fn(FALLBACK_WIDTH, FALLBACK_HEIGHT, |x, y| {
        let on_frame = x < FRAME_WIDTH
            || y < FRAME_WIDTH
            || x >= FALLBACK_WIDTH - FRAME_WIDTH
            || y >= FALLBACK_HEIGHT - FRAME_WIDTH;
        if on_frame {
            FRAME
        } else {
            BACKGROUND
        }
    });

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Confirm the encoded placeholder decodes to the expected canvas
fn validate(bytes: &[u8]) -> Result<(), FallbackError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| FallbackError::Invalid(format!("not decodable: {e}")))?;

    if decoded.width() != FALLBACK_WIDTH || decoded.height() != FALLBACK_HEIGHT {
        return Err(FallbackError::Invalid(format!(
            "unexpected dimensions {}x{}",
            decoded.width(),
            decoded.height()
        )));
    }

    Ok(())
}
