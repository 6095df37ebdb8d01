/// Image upload validation
///
/// An upload is accepted only if its bytes decode as a raster image in one of
/// the formats the `image` crate understands. Decoding runs on the blocking
/// pool so large uploads do not stall the async workers.
use crate::error::{AppError, Result};
use image::{GenericImageView, ImageFormat};

/// Raw image bytes as received from a client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Upload that passed decoding
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ValidatedImage {
    /// Canonical file extension for the detected format
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }
}

/// Check size and decodability of an upload
pub async fn validate_image(upload: ImageUpload, max_bytes: usize) -> Result<ValidatedImage> {
    if upload.data.is_empty() {
        return Err(AppError::InvalidImage(format!(
            "{}: the submitted file is empty",
            upload.filename
        )));
    }
    if upload.data.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "image exceeds {} bytes",
            max_bytes
        )));
    }

    let filename = upload.filename;
    let data = upload.data;
    tokio::task::spawn_blocking(move || decode(&filename, data))
        .await
        .map_err(|e| AppError::Internal(format!("image decode task failed: {}", e)))?
}

fn decode(filename: &str, data: Vec<u8>) -> Result<ValidatedImage> {
    let format = image::guess_format(&data).map_err(|_| {
        AppError::InvalidImage(format!(
            "{}: upload a valid image; the file is either not an image or corrupted",
            filename
        ))
    })?;

    let decoded = image::load_from_memory_with_format(&data, format).map_err(|e| {
        tracing::debug!(%filename, error = %e, "image decode failed");
        AppError::InvalidImage(format!(
            "{}: upload a valid image; the file is either not an image or corrupted",
            filename
        ))
    })?;

    let (width, height) = decoded.dimensions();
    Ok(ValidatedImage {
        data,
        format,
        width,
        height,
    })
}
