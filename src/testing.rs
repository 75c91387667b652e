//! In-memory fakes shared by the unit tests.

use std::collections::{HashSet, VecDeque};
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat as Codec, Rgba, RgbaImage};
use serde_json::Value;

use crate::{
    error::{GenFillError, RemoteError, Result},
    gemini::{image_client::inline_image_response, Transport, TransportResponse},
    host::{DocumentPort, LayerId, RasterDocument},
    models::{ImageFormat, ImagePayload, LayerBounds, PlacementTransform, SelectionBounds},
    pipeline::{Notice, NoticeLevel, Notifier},
};

fn solid_bytes(width: u32, height: u32, color: [u8; 4], codec: Codec) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, codec).unwrap();
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    solid_bytes(width, height, color, Codec::Png)
}

pub fn png_payload(width: u32, height: u32) -> ImagePayload {
    ImagePayload::png(png_bytes(width, height, [200, 100, 50, 255]))
}

pub fn webp_payload(width: u32, height: u32) -> ImagePayload {
    let bytes = solid_bytes(width, height, [20, 140, 220, 255], Codec::WebP);
    ImagePayload::new(ImageFormat::Webp, bytes)
}

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<std::result::Result<TransportResponse, RemoteError>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status: u16, body: String) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(TransportResponse { status, body }));
    }

    pub fn push_image(&self, payload: &ImagePayload) {
        self.push(200, inline_image_response(payload).to_string());
    }

    pub fn push_error(&self, error: RemoteError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
    ) -> std::result::Result<TransportResponse, RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Transport("no response queued".into())))
    }
}

/// Wraps a `RasterDocument` and fails the named port methods on demand.
pub struct FaultyDocument {
    inner: RasterDocument,
    failing: Mutex<HashSet<&'static str>>,
}

impl FaultyDocument {
    pub fn new(inner: RasterDocument) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn inner(&self) -> &RasterDocument {
        &self.inner
    }

    pub fn fail_on(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    fn check(&self, method: &'static str) -> Result<()> {
        if self.failing.lock().unwrap().contains(method) {
            return Err(GenFillError::host(format!("{} refused", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentPort for FaultyDocument {
    async fn has_document(&self) -> bool {
        self.check("has_document").is_ok() && self.inner.has_document().await
    }

    async fn selection_bounds(&self) -> Result<Option<SelectionBounds>> {
        self.check("selection_bounds")?;
        self.inner.selection_bounds().await
    }

    async fn copy_merged(&self) -> Result<()> {
        self.check("copy_merged")?;
        self.inner.copy_merged().await
    }

    async fn paste_as_layer(&self) -> Result<LayerId> {
        self.check("paste_as_layer")?;
        self.inner.paste_as_layer().await
    }

    async fn save_layer(&self, layer: LayerId, path: &Path, format: ImageFormat) -> Result<()> {
        self.check("save_layer")?;
        self.inner.save_layer(layer, path, format).await
    }

    async fn save_document(&self, path: &Path, format: ImageFormat) -> Result<()> {
        self.check("save_document")?;
        self.inner.save_document(path, format).await
    }

    async fn delete_layer(&self, layer: LayerId) -> Result<()> {
        self.check("delete_layer")?;
        self.inner.delete_layer(layer).await
    }

    async fn place_file(&self, path: &Path) -> Result<LayerId> {
        self.check("place_file")?;
        self.inner.place_file(path).await
    }

    async fn rename_layer(&self, layer: LayerId, name: &str) -> Result<()> {
        self.check("rename_layer")?;
        self.inner.rename_layer(layer, name).await
    }

    async fn layer_bounds(&self, layer: LayerId) -> Result<LayerBounds> {
        self.check("layer_bounds")?;
        self.inner.layer_bounds(layer).await
    }

    async fn transform_layer(&self, layer: LayerId, transform: &PlacementTransform) -> Result<()> {
        self.check("transform_layer")?;
        self.inner.transform_layer(layer, transform).await
    }

    async fn create_checkpoint(&self, name: &str) -> Result<()> {
        self.check("create_checkpoint")?;
        self.inner.create_checkpoint(name).await
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn failures(&self) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|notice| notice.level == NoticeLevel::Failure)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}
