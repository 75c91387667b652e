//! In-process document adapter backed by the `image` crate.
//!
//! Layers are RGBA buffers with a canvas offset, composited bottom to top.
//! It is what the headless driver edits and what the pipeline tests run against.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::{imageops, DynamicImage, GrayImage, ImageFormat as CodecFormat, Rgba, RgbaImage};
use tokio::sync::Mutex;

use crate::{
    error::{GenFillError, Result},
    host::traits::{DocumentPort, LayerId},
    models::{ImageFormat, LayerBounds, PlacementTransform, SelectionBounds},
};

#[derive(Debug, Clone)]
struct RasterLayer {
    id: LayerId,
    name: String,
    pixels: RgbaImage,
    left: i64,
    top: i64,
}

impl RasterLayer {
    fn bounds(&self) -> LayerBounds {
        LayerBounds::new(self.left, self.top, self.pixels.width(), self.pixels.height())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
    pub bounds: LayerBounds,
}

#[derive(Debug)]
struct DocumentState {
    width: u32,
    height: u32,
    layers: Vec<RasterLayer>,
    selection: Option<SelectionBounds>,
    /// Coverage over the selection box, 0 outside and 255 fully selected.
    selection_mask: Option<GrayImage>,
    clipboard: Option<(RgbaImage, i64, i64)>,
    checkpoints: Vec<String>,
    next_id: u64,
    revision: u64,
}

impl DocumentState {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            selection: None,
            selection_mask: None,
            clipboard: None,
            checkpoints: Vec::new(),
            next_id: 1,
            revision: 0,
        }
    }

    fn push_layer(&mut self, name: String, pixels: RgbaImage, left: i64, top: i64) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push(RasterLayer {
            id,
            name,
            pixels,
            left,
            top,
        });
        self.revision += 1;
        id
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut RasterLayer> {
        self.layers
            .iter_mut()
            .find(|layer| layer.id == id)
            .ok_or_else(|| GenFillError::host(format!("{} does not exist", id)))
    }

    fn layer(&self, id: LayerId) -> Result<&RasterLayer> {
        self.layers
            .iter()
            .find(|layer| layer.id == id)
            .ok_or_else(|| GenFillError::host(format!("{} does not exist", id)))
    }

    fn flatten(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.width, self.height);
        for layer in &self.layers {
            imageops::overlay(&mut canvas, &layer.pixels, layer.left, layer.top);
        }
        canvas
    }
}

/// A layered raster document. `closed()` models a host with nothing open.
#[derive(Debug)]
pub struct RasterDocument {
    state: Option<Mutex<DocumentState>>,
}

impl RasterDocument {
    pub fn blank(width: u32, height: u32) -> Self {
        Self::from_image("Background", DynamicImage::ImageRgba8(RgbaImage::new(width, height)))
    }

    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = RgbaImage::from_pixel(width, height, Rgba(color));
        Self::from_image("Background", DynamicImage::ImageRgba8(pixels))
    }

    pub fn from_image(name: &str, image: DynamicImage) -> Self {
        let pixels = image.to_rgba8();
        let mut state = DocumentState::new(pixels.width(), pixels.height());
        state.push_layer(name.to_string(), pixels, 0, 0);
        state.revision = 0;
        Self {
            state: Some(Mutex::new(state)),
        }
    }

    pub async fn open(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GenFillError::host(format!("failed to read {}: {}", path.display(), e)))?;
        let image = decode(&bytes)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Background".to_string());
        Ok(Self::from_image(&name, image))
    }

    pub fn closed() -> Self {
        Self { state: None }
    }

    fn state(&self) -> Result<&Mutex<DocumentState>> {
        self.state
            .as_ref()
            .ok_or_else(|| GenFillError::host("no document is open"))
    }

    pub async fn select(&self, bounds: SelectionBounds) -> Result<()> {
        let mut state = self.state()?.lock().await;
        state.selection = Some(bounds);
        state.selection_mask = None;
        state.revision += 1;
        Ok(())
    }

    /// Selects `bounds` with soft coverage. `mask` must match the box size.
    pub async fn select_masked(&self, bounds: SelectionBounds, mask: GrayImage) -> Result<()> {
        if mask.dimensions() != (bounds.width(), bounds.height()) {
            return Err(GenFillError::host(format!(
                "mask is {}x{} but the selection is {}",
                mask.width(),
                mask.height(),
                bounds
            )));
        }
        let mut state = self.state()?.lock().await;
        state.selection = Some(bounds);
        state.selection_mask = Some(mask);
        state.revision += 1;
        Ok(())
    }

    /// Layers from bottom to top.
    pub async fn layers(&self) -> Vec<LayerInfo> {
        let Ok(state) = self.state() else {
            return Vec::new();
        };
        let state = state.lock().await;
        state
            .layers
            .iter()
            .map(|layer| LayerInfo {
                id: layer.id,
                name: layer.name.clone(),
                bounds: layer.bounds(),
            })
            .collect()
    }

    pub async fn checkpoints(&self) -> Vec<String> {
        match self.state() {
            Ok(state) => state.lock().await.checkpoints.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Bumped on every change to layers, selection or history.
    pub async fn revision(&self) -> u64 {
        match self.state() {
            Ok(state) => state.lock().await.revision,
            Err(_) => 0,
        }
    }

    pub async fn flatten(&self) -> Result<RgbaImage> {
        Ok(self.state()?.lock().await.flatten())
    }

    pub async fn save_flattened(&self, path: &Path) -> Result<()> {
        let canvas = self.flatten().await?;
        let bytes = encode(canvas, ImageFormat::Png)?;
        write_file(path, &bytes).await
    }
}

#[async_trait]
impl DocumentPort for RasterDocument {
    async fn has_document(&self) -> bool {
        self.state.is_some()
    }

    async fn selection_bounds(&self) -> Result<Option<SelectionBounds>> {
        Ok(self.state()?.lock().await.selection)
    }

    async fn copy_merged(&self) -> Result<()> {
        let mut state = self.state()?.lock().await;
        let selection = state
            .selection
            .ok_or_else(|| GenFillError::host("copy merged needs an active selection"))?;

        let left = selection.left().clamp(0, i64::from(state.width));
        let top = selection.top().clamp(0, i64::from(state.height));
        let right = selection.right().clamp(0, i64::from(state.width));
        let bottom = selection.bottom().clamp(0, i64::from(state.height));
        if right <= left || bottom <= top {
            return Err(GenFillError::host("selection does not cover any canvas pixels"));
        }

        let canvas = state.flatten();
        let mut pixels = imageops::crop_imm(
            &canvas,
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
        .to_image();

        if let Some(mask) = &state.selection_mask {
            let mask_x = (left - selection.left()) as u32;
            let mask_y = (top - selection.top()) as u32;
            for (x, y, pixel) in pixels.enumerate_pixels_mut() {
                let coverage = u16::from(mask.get_pixel(x + mask_x, y + mask_y)[0]);
                pixel[3] = (u16::from(pixel[3]) * coverage / 255) as u8;
            }
        }

        state.clipboard = Some((pixels, left, top));
        Ok(())
    }

    async fn paste_as_layer(&self) -> Result<LayerId> {
        let mut state = self.state()?.lock().await;
        let (pixels, left, top) = state
            .clipboard
            .clone()
            .ok_or_else(|| GenFillError::host("clipboard is empty"))?;
        let name = format!("Layer {}", state.layers.len());
        Ok(state.push_layer(name, pixels, left, top))
    }

    async fn save_layer(&self, layer: LayerId, path: &Path, format: ImageFormat) -> Result<()> {
        let pixels = self.state()?.lock().await.layer(layer)?.pixels.clone();
        let bytes = encode(pixels, format)?;
        write_file(path, &bytes).await
    }

    async fn save_document(&self, path: &Path, format: ImageFormat) -> Result<()> {
        let canvas = self.flatten().await?;
        let bytes = encode(canvas, format)?;
        write_file(path, &bytes).await
    }

    async fn delete_layer(&self, layer: LayerId) -> Result<()> {
        let mut state = self.state()?.lock().await;
        let index = state
            .layers
            .iter()
            .position(|candidate| candidate.id == layer)
            .ok_or_else(|| GenFillError::host(format!("{} does not exist", layer)))?;
        state.layers.remove(index);
        state.revision += 1;
        Ok(())
    }

    async fn place_file(&self, path: &Path) -> Result<LayerId> {
        let state = self.state()?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GenFillError::host(format!("failed to read {}: {}", path.display(), e)))?;
        let pixels = decode(&bytes)?.to_rgba8();

        let mut state = state.lock().await;
        let placement =
            LayerBounds::centered(state.width, state.height, pixels.width(), pixels.height());
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Placed".to_string());
        Ok(state.push_layer(name, pixels, placement.left, placement.top))
    }

    async fn rename_layer(&self, layer: LayerId, name: &str) -> Result<()> {
        let mut state = self.state()?.lock().await;
        state.layer_mut(layer)?.name = name.to_string();
        state.revision += 1;
        Ok(())
    }

    async fn layer_bounds(&self, layer: LayerId) -> Result<LayerBounds> {
        Ok(self.state()?.lock().await.layer(layer)?.bounds())
    }

    async fn transform_layer(&self, layer: LayerId, transform: &PlacementTransform) -> Result<()> {
        let mut state = self.state()?.lock().await;
        let target = state.layer_mut(layer)?;
        let next = transform.apply(&target.bounds());
        if next.width == 0 || next.height == 0 {
            return Err(GenFillError::host(format!(
                "transform would collapse {} to {}x{}",
                layer, next.width, next.height
            )));
        }

        if (next.width, next.height) != target.pixels.dimensions() {
            target.pixels = imageops::resize(
                &target.pixels,
                next.width,
                next.height,
                imageops::FilterType::Triangle,
            );
        }
        target.left = next.left;
        target.top = next.top;
        state.revision += 1;
        Ok(())
    }

    async fn create_checkpoint(&self, name: &str) -> Result<()> {
        let mut state = self.state()?.lock().await;
        state.checkpoints.push(name.to_string());
        state.revision += 1;
        Ok(())
    }
}

fn codec_format(format: ImageFormat) -> CodecFormat {
    match format {
        ImageFormat::Png => CodecFormat::Png,
        ImageFormat::Jpeg => CodecFormat::Jpeg,
        ImageFormat::Webp => CodecFormat::WebP,
    }
}

fn encode(pixels: RgbaImage, format: ImageFormat) -> Result<Vec<u8>> {
    let image = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(pixels).to_rgb8()),
        _ => DynamicImage::ImageRgba8(pixels),
    };
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), codec_format(format))
        .map_err(|e| {
            GenFillError::host(format!("failed to encode {}: {}", format.mime_type(), e))
        })?;
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| GenFillError::host(format!("failed to decode image: {}", e)))
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| GenFillError::host(format!("failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::png_bytes;
    use image::GenericImageView;

    #[tokio::test]
    async fn copy_and_paste_keeps_selection_origin() {
        let document = RasterDocument::filled(40, 30, [200, 0, 0, 255]);
        document
            .select(SelectionBounds::from_edges(5, 10, 25, 30).unwrap())
            .await
            .unwrap();

        document.copy_merged().await.unwrap();
        let layer = document.paste_as_layer().await.unwrap();

        assert_eq!(
            document.layer_bounds(layer).await.unwrap(),
            LayerBounds::new(10, 5, 20, 20)
        );
        assert_eq!(document.layers().await.len(), 2);
    }

    #[tokio::test]
    async fn soft_mask_fades_copied_pixels() {
        let document = RasterDocument::filled(20, 20, [10, 20, 30, 255]);
        let bounds = SelectionBounds::from_rect(-2, 4, 10, 6).unwrap();
        let mask = GrayImage::from_fn(10, 6, |x, _| {
            image::Luma([if x < 5 { 255 } else if x < 8 { 128 } else { 0 }])
        });
        document.select_masked(bounds, mask).await.unwrap();

        document.copy_merged().await.unwrap();
        let layer = document.paste_as_layer().await.unwrap();
        assert_eq!(
            document.layer_bounds(layer).await.unwrap(),
            LayerBounds::new(0, 4, 8, 6)
        );

        let state = document.state().unwrap().lock().await;
        let pasted = &state.layer(layer).unwrap().pixels;
        assert_eq!(pasted.get_pixel(2, 0)[3], 255);
        assert_eq!(pasted.get_pixel(4, 0)[3], 128);
        assert_eq!(pasted.get_pixel(7, 5)[3], 0);
    }

    #[tokio::test]
    async fn mask_is_validated_and_cleared_by_select() {
        let document = RasterDocument::filled(20, 20, [5, 5, 5, 255]);
        let bounds = SelectionBounds::from_rect(0, 0, 10, 10).unwrap();
        assert!(document
            .select_masked(bounds, GrayImage::new(4, 4))
            .await
            .is_err());
        assert_eq!(document.selection_bounds().await.unwrap(), None);

        document
            .select_masked(bounds, GrayImage::new(10, 10))
            .await
            .unwrap();
        document.select(bounds).await.unwrap();
        document.copy_merged().await.unwrap();
        let layer = document.paste_as_layer().await.unwrap();

        let state = document.state().unwrap().lock().await;
        let pasted = &state.layer(layer).unwrap().pixels;
        assert!(pasted.pixels().all(|pixel| pixel[3] == 255));
    }

    #[tokio::test]
    async fn selection_is_clamped_to_canvas() {
        let document = RasterDocument::filled(20, 20, [0, 0, 255, 255]);
        document
            .select(SelectionBounds::from_edges(-5, -5, 10, 50).unwrap())
            .await
            .unwrap();
        document.copy_merged().await.unwrap();
        let layer = document.paste_as_layer().await.unwrap();
        assert_eq!(
            document.layer_bounds(layer).await.unwrap(),
            LayerBounds::new(0, 0, 20, 10)
        );
    }

    #[tokio::test]
    async fn placed_files_are_centered_and_transformable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated.png");
        std::fs::write(&path, png_bytes(64, 64, [0, 255, 0, 255])).unwrap();

        let document = RasterDocument::blank(200, 100);
        let layer = document.place_file(&path).await.unwrap();
        let placed = document.layer_bounds(layer).await.unwrap();
        assert_eq!(placed, LayerBounds::new(68, 18, 64, 64));

        let target = SelectionBounds::from_edges(10, 10, 60, 110).unwrap();
        let transform = PlacementTransform::fit(&target, &placed).unwrap();
        document.transform_layer(layer, &transform).await.unwrap();
        assert_eq!(
            document.layer_bounds(layer).await.unwrap(),
            LayerBounds::new(10, 10, 100, 50)
        );

        let canvas = document.flatten().await.unwrap();
        assert_eq!(canvas.get_pixel(10, 10), &Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(109, 59), &Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(110, 60)[3], 0);
    }

    #[tokio::test]
    async fn saved_layer_decodes_to_same_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.png");
        let document = RasterDocument::filled(16, 8, [1, 2, 3, 255]);
        let background = document.layers().await[0].id;

        document
            .save_layer(background, &path, ImageFormat::Png)
            .await
            .unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[tokio::test]
    async fn every_payload_format_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let document = RasterDocument::filled(12, 6, [90, 80, 70, 255]);

        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Webp] {
            let path = dir.path().join(format!("canvas.{}", format.extension()));
            document.save_document(&path, format).await.unwrap();
            let layer = document.place_file(&path).await.unwrap();
            let bounds = document.layer_bounds(layer).await.unwrap();
            assert_eq!((bounds.width, bounds.height), (12, 6), "{:?}", format);
        }
    }

    #[tokio::test]
    async fn closed_document_refuses_everything() {
        let document = RasterDocument::closed();
        assert!(!document.has_document().await);
        assert!(document.selection_bounds().await.is_err());
        assert!(document.create_checkpoint("x").await.is_err());
        assert!(document.layers().await.is_empty());
    }

    #[tokio::test]
    async fn deleting_unknown_layer_fails() {
        let document = RasterDocument::blank(4, 4);
        assert!(document.delete_layer(LayerId(99)).await.is_err());
    }
}
