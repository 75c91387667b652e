use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::RemoteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
        }
    }

    /// Unknown or missing MIME types fall back to PNG, the requested output type.
    pub fn from_mime_type(mime: Option<&str>) -> Self {
        match mime.map(str::to_ascii_lowercase).as_deref() {
            Some("image/jpeg") | Some("image/jpg") => ImageFormat::Jpeg,
            Some("image/webp") => ImageFormat::Webp,
            _ => ImageFormat::Png,
        }
    }
}

/// Encoded raster bytes tagged with their format.
///
/// This is the single place where bytes cross to and from base64.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(format: ImageFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(ImageFormat::Png, bytes)
    }

    pub fn from_base64(format: ImageFormat, data: &str) -> Result<Self, RemoteError> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| RemoteError::Parse(format!("invalid base64 image data: {}", e)))?;
        Ok(Self { format, bytes })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}
