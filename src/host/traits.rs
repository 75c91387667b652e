use std::path::Path;

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{ImageFormat, LayerBounds, PlacementTransform, SelectionBounds},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Narrow view of the host document used by the pipeline.
///
/// Every call may fail independently; the pipeline decides which failures
/// are faults and which are normal outcomes.
#[async_trait]
pub trait DocumentPort: Send + Sync {
    async fn has_document(&self) -> bool;

    /// Bounding box of the active selection, `None` when nothing is selected.
    async fn selection_bounds(&self) -> Result<Option<SelectionBounds>>;

    /// Copies the merged visible pixels under the selection to the clipboard.
    async fn copy_merged(&self) -> Result<()>;

    /// Pastes the clipboard in place as a new layer.
    async fn paste_as_layer(&self) -> Result<LayerId>;

    async fn save_layer(&self, layer: LayerId, path: &Path, format: ImageFormat) -> Result<()>;

    /// Encodes the flattened visible canvas.
    async fn save_document(&self, path: &Path, format: ImageFormat) -> Result<()>;

    async fn delete_layer(&self, layer: LayerId) -> Result<()>;

    /// Imports an image file as a new layer centered on the canvas.
    async fn place_file(&self, path: &Path) -> Result<LayerId>;

    async fn rename_layer(&self, layer: LayerId, name: &str) -> Result<()>;

    async fn layer_bounds(&self, layer: LayerId) -> Result<LayerBounds>;

    async fn transform_layer(&self, layer: LayerId, transform: &PlacementTransform) -> Result<()>;

    /// Records a named undo snapshot.
    async fn create_checkpoint(&self, name: &str) -> Result<()>;
}
