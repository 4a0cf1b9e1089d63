use crate::error::ImportError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;

const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

/// A recipe photo ready to be sent to a vision-capable model
///
/// Holds the media type and the base64 payload without any `data:` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub media_type: String,
    pub data: String,
}

impl ImageInput {
    /// Read a base64 payload or a `data:<type>;base64,<payload>` URL.
    ///
    /// The payload must decode to a non-empty image. When no type is
    /// declared it is detected from the decoded bytes, falling back to JPEG.
    pub fn parse(input: &str) -> Result<Self, ImportError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(image_required());
        }

        let (declared, payload) = match trimmed.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or_else(not_base64)?;
                let media_type = header.split(';').next().unwrap_or_default().trim();
                (Some(media_type).filter(|m| !m.is_empty()), payload)
            }
            None => (None, trimmed),
        };

        let data: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD.decode(&data).map_err(|_| not_base64())?;
        if bytes.is_empty() {
            return Err(image_required());
        }

        let media_type = match declared {
            Some(media_type) => media_type.to_ascii_lowercase(),
            None => sniff_media_type(&bytes)
                .unwrap_or(DEFAULT_MEDIA_TYPE)
                .to_string(),
        };
        if !media_type.starts_with("image/") {
            return Err(ImportError::InvalidInput(format!(
                "Unsupported file type {media_type}; send an image"
            )));
        }

        Ok(Self { media_type, data })
    }

    /// Encode raw image bytes, detecting the type from their signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImportError> {
        if bytes.is_empty() {
            return Err(image_required());
        }
        Ok(Self {
            media_type: sniff_media_type(bytes)
                .unwrap_or(DEFAULT_MEDIA_TYPE)
                .to_string(),
            data: STANDARD.encode(bytes),
        })
    }

    /// Read and encode an image file.
    pub async fn from_file(path: &Path) -> Result<Self, ImportError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ImportError::InvalidInput(format!("Could not read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn image_required() -> ImportError {
    ImportError::InvalidInput("Image is required".to_string())
}

fn not_base64() -> ImportError {
    ImportError::InvalidInput("Image must be base64 encoded".to_string())
}
