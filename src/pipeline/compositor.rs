use std::sync::Arc;

use crate::{
    error::{GenFillError, Result},
    host::{DocumentPort, LayerId, StagingArea},
    models::{ImagePayload, LayerBounds, PlacementTransform, SelectionBounds},
};

pub const DEFAULT_LAYER_NAME: &str = "Gemini Generated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLayer {
    pub id: LayerId,
    pub name: String,
    pub bounds: LayerBounds,
}

/// Imports payloads as layers and fits them onto a selection.
#[derive(Clone)]
pub struct LayerCompositor {
    document: Arc<dyn DocumentPort>,
    staging: StagingArea,
}

impl LayerCompositor {
    pub fn new(document: Arc<dyn DocumentPort>, staging: StagingArea) -> Self {
        Self { document, staging }
    }

    /// Stages the payload, places it centered on the canvas and names it.
    pub async fn place_image(&self, payload: ImagePayload, name: &str) -> Result<PlacedLayer> {
        let name = if name.trim().is_empty() {
            DEFAULT_LAYER_NAME
        } else {
            name
        };

        let staged = self
            .staging
            .create(&format!("generated.{}", payload.format().extension()))
            .map_err(compositing_failure("stage result"))?;

        let placed = match staged.write(payload.bytes()).await {
            Ok(()) => self.document.place_file(staged.path()).await,
            Err(e) => Err(e),
        };
        staged.close();
        drop(payload);

        let id = placed.map_err(compositing_failure("place result"))?;
        self.document
            .rename_layer(id, name)
            .await
            .map_err(compositing_failure("rename layer"))?;
        let bounds = self
            .document
            .layer_bounds(id)
            .await
            .map_err(compositing_failure("read layer bounds"))?;

        log::info!("Placed '{}' as {} ({}x{})", name, id, bounds.width, bounds.height);
        Ok(PlacedLayer {
            id,
            name: name.to_string(),
            bounds,
        })
    }

    /// Moves and scales `layer` onto `bounds`. Without bounds the layer stays where it was placed.
    pub async fn fit_to_bounds(
        &self,
        layer: &PlacedLayer,
        bounds: Option<&SelectionBounds>,
    ) -> Result<PlacedLayer> {
        let Some(bounds) = bounds else {
            log::warn!(
                "No selection bounds available; leaving {} at its default placement",
                layer.id
            );
            return Ok(layer.clone());
        };

        let current = self
            .document
            .layer_bounds(layer.id)
            .await
            .map_err(compositing_failure("read layer bounds"))?;
        let transform = PlacementTransform::fit(bounds, &current)?;

        log::debug!(
            "Placing result at ({}, {}), scale {:.2}% x {:.2}%",
            bounds.left(),
            bounds.top(),
            transform.scale_x_percent,
            transform.scale_y_percent
        );
        self.document
            .transform_layer(layer.id, &transform)
            .await
            .map_err(compositing_failure("transform layer"))?;

        let fitted = self
            .document
            .layer_bounds(layer.id)
            .await
            .map_err(compositing_failure("read layer bounds"))?;
        Ok(PlacedLayer {
            bounds: fitted,
            ..layer.clone()
        })
    }

    /// Places the payload and fits it onto the selection, if there is one.
    pub async fn replace_selection_content(
        &self,
        payload: ImagePayload,
        name: &str,
        bounds: Option<SelectionBounds>,
    ) -> Result<PlacedLayer> {
        let layer = self.place_image(payload, name).await?;
        self.fit_to_bounds(&layer, bounds.as_ref()).await
    }
}

fn compositing_failure(step: &'static str) -> impl FnOnce(GenFillError) -> GenFillError {
    move |cause| match cause {
        GenFillError::Compositing { .. } => cause,
        other => GenFillError::compositing(format!("{}: {}", step, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RasterDocument;
    use crate::testing::{png_payload, webp_payload, FaultyDocument};

    fn setup(document: Arc<dyn DocumentPort>) -> (LayerCompositor, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(Some(dir.path().to_path_buf()));
        (LayerCompositor::new(document, staging), dir)
    }

    #[tokio::test]
    async fn places_centered_with_name() {
        let document = Arc::new(RasterDocument::blank(100, 100));
        let (compositor, dir) = setup(document.clone());

        let layer = compositor
            .place_image(png_payload(20, 10), "Generated: a lighthouse")
            .await
            .unwrap();

        assert_eq!(layer.bounds, LayerBounds::new(40, 45, 20, 10));
        let names: Vec<_> = document.layers().await.into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Background", "Generated: a lighthouse"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn webp_results_are_placed_and_fitted() {
        let document = Arc::new(RasterDocument::blank(120, 80));
        let (compositor, dir) = setup(document.clone());
        let bounds = SelectionBounds::from_edges(5, 10, 45, 70).unwrap();

        let layer = compositor
            .replace_selection_content(webp_payload(30, 20), "Generated Content", Some(bounds))
            .await
            .unwrap();

        assert_eq!(layer.bounds, LayerBounds::new(10, 5, 60, 40));
        let canvas = document.flatten().await.unwrap();
        assert_eq!(canvas.get_pixel(40, 20), &image::Rgba([20, 140, 220, 255]));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn blank_name_falls_back_to_default() {
        let document = Arc::new(RasterDocument::blank(10, 10));
        let (compositor, _dir) = setup(document);
        let layer = compositor.place_image(png_payload(2, 2), "  ").await.unwrap();
        assert_eq!(layer.name, DEFAULT_LAYER_NAME);
    }

    #[tokio::test]
    async fn fit_matches_selection_exactly() {
        let document = Arc::new(RasterDocument::blank(200, 100));
        let (compositor, _dir) = setup(document.clone());
        let bounds = SelectionBounds::from_edges(10, 10, 60, 110).unwrap();

        let layer = compositor
            .replace_selection_content(png_payload(64, 64), "Generated Content", Some(bounds))
            .await
            .unwrap();

        assert_eq!(layer.bounds, LayerBounds::new(10, 10, 100, 50));
        assert_eq!(
            document.layers().await.last().unwrap().bounds,
            LayerBounds::new(10, 10, 100, 50)
        );
    }

    #[tokio::test]
    async fn missing_bounds_leaves_layer_centered() {
        let document = Arc::new(RasterDocument::blank(200, 100));
        let (compositor, _dir) = setup(document);

        let layer = compositor
            .replace_selection_content(png_payload(50, 50), "Generated Content", None)
            .await
            .unwrap();
        assert_eq!(layer.bounds, LayerBounds::new(75, 25, 50, 50));
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_compositing_failure() {
        let document = Arc::new(RasterDocument::blank(10, 10));
        let (compositor, dir) = setup(document.clone());

        let err = compositor
            .place_image(ImagePayload::png(b"definitely not a png".to_vec()), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, GenFillError::Compositing { .. }));
        assert_eq!(document.layers().await.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn transform_failure_is_reported() {
        let document = Arc::new(FaultyDocument::new(RasterDocument::blank(50, 50)));
        document.fail_on("transform_layer");
        let (compositor, _dir) = setup(document);

        let err = compositor
            .replace_selection_content(
                png_payload(8, 8),
                "x",
                SelectionBounds::from_rect(0, 0, 16, 16),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("transform layer"));
    }
}
